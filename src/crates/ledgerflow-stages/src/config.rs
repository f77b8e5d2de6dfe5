//! Process-wide stage configuration.
//!
//! One [`StageConfig`] is built at startup and shared (via `Arc`) across every stage executor
//! that needs a tunable. It carries only the values the pipeline's deterministic algorithms
//! depend on; tool-server URLs and timeouts live on `ledgerflow_tools::ToolConfig` instead.

/// Tunables for the deterministic parts of the pipeline: matching and approval policy.
#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    /// `match_threshold` used both by `MATCH_TWO_WAY` (to set `match_result`) and by the
    /// engine's `shouldCheckpoint` routing predicate — the two must agree, so this is the single
    /// source of truth for it.
    pub match_threshold: f64,
    /// Tolerance percent `t` used by the matching algorithm's amount/quantity/price scores.
    pub tolerance_pct: f64,
    /// Upper bound (inclusive) for automatic approval.
    pub auto_approve_limit: f64,
    /// Upper bound (inclusive) for manager-level approval.
    pub manager_approve_limit: f64,
    /// Risk score strictly above this escalates to `APPROVED_WITH_REVIEW`.
    pub risk_escalation_threshold: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.85,
            tolerance_pct: 5.0,
            auto_approve_limit: 10_000.0,
            manager_approve_limit: 50_000.0,
            risk_escalation_threshold: 0.5,
        }
    }
}

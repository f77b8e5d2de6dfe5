//! Description-based (dynamic) tool selection: an LLM picks a tool by name
//! from the discovered descriptions.
//!
//! The LLM API client itself is out of scope; [`ToolSelectorModel`] is the
//! seam a concrete client is wired through, occupying the same slot
//! `llm::ChatModel` fills for `router::llm_router`. Tests and the reference
//! binary use [`NullToolSelector`], which always defers to the capability
//! map — equivalent to an LLM that always returns an unrecognized name, a
//! valid fallback path rather than an error.

use async_trait::async_trait;

use crate::discovery::ToolDescription;

/// Given a capability, a short task description, and the candidate tools
/// discovered for the owning server, pick one tool's name — or `None` if no
/// candidate is suitable, triggering the capability-map fallback.
#[async_trait]
pub trait ToolSelectorModel: Send + Sync {
    async fn select(
        &self,
        capability: &str,
        task: &str,
        candidates: &[ToolDescription],
    ) -> Option<String>;
}

/// Selector that never picks a dynamic candidate. Every call falls through to
/// the static capability map: a returned name outside the discovered set
/// always lands back on the capability-based mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullToolSelector;

#[async_trait]
impl ToolSelectorModel for NullToolSelector {
    async fn select(&self, _capability: &str, _task: &str, _candidates: &[ToolDescription]) -> Option<String> {
        None
    }
}

/// Selector that picks the first discovered candidate whose name contains the
/// capability label as a substring — a cheap stand-in for an LLM prompted
/// with a pattern-selection template, useful wherever a test wants discovery
/// to actually resolve to something instead of the static map.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicToolSelector;

#[async_trait]
impl ToolSelectorModel for HeuristicToolSelector {
    async fn select(&self, capability: &str, _task: &str, candidates: &[ToolDescription]) -> Option<String> {
        candidates
            .iter()
            .find(|tool| tool.name.contains(capability) || tool.description.to_lowercase().contains(capability))
            .map(|tool| tool.name.clone())
    }
}

//! The capability-based (static) discovery mode: `capability -> tool_name -> server`.
//!
//! Every stage calls the orchestrator with a `Capability`, never a raw tool
//! name — the capability map is what turns that into a concrete
//! `(tool_name, server)` pair. Description-based discovery (§4.3) is tried
//! first when enabled; this map is always the fallback, and the sole
//! resolver when description-based discovery is off.

use ledgerflow_bus::ToolServer;

/// The high-level operation labels stages request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Storage,
    Ocr,
    Parsing,
    Normalize,
    Enrichment,
    ErpConnector,
    Matching,
    Db,
    Accounting,
    Policy,
    Email,
}

impl Capability {
    /// Stable label used in logs, events, and LLM-facing tool descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Storage => "storage",
            Capability::Ocr => "ocr",
            Capability::Parsing => "parsing",
            Capability::Normalize => "normalize",
            Capability::Enrichment => "enrichment",
            Capability::ErpConnector => "erp_connector",
            Capability::Matching => "matching",
            Capability::Db => "db",
            Capability::Accounting => "accounting",
            Capability::Policy => "policy",
            Capability::Email => "email",
        }
    }

    /// The concrete tool name and owning server this capability resolves to
    /// in the static map. COMMON hosts internal operations; ATLAS hosts
    /// external integrations.
    pub fn default_tool(&self) -> (&'static str, ToolServer) {
        match self {
            Capability::Storage => ("persist_invoice", ToolServer::Common),
            Capability::Ocr => ("extract_invoice_text", ToolServer::Atlas),
            Capability::Parsing => ("parse_line_items", ToolServer::Common),
            Capability::Normalize => ("normalize_invoice", ToolServer::Common),
            Capability::Enrichment => ("enrich_vendor", ToolServer::Atlas),
            Capability::ErpConnector => ("erp_fetch_or_post", ToolServer::Atlas),
            Capability::Matching => ("two_way_match", ToolServer::Common),
            Capability::Db => ("write_checkpoint_record", ToolServer::Common),
            Capability::Accounting => ("post_accounting_entries", ToolServer::Common),
            Capability::Policy => ("evaluate_approval_policy", ToolServer::Atlas),
            Capability::Email => ("send_notification", ToolServer::Atlas),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_resolves_to_a_server() {
        let all = [
            Capability::Storage,
            Capability::Ocr,
            Capability::Parsing,
            Capability::Normalize,
            Capability::Enrichment,
            Capability::ErpConnector,
            Capability::Matching,
            Capability::Db,
            Capability::Accounting,
            Capability::Policy,
            Capability::Email,
        ];
        for cap in all {
            let (tool, _server) = cap.default_tool();
            assert!(!tool.is_empty());
            assert!(!cap.as_str().is_empty());
        }
    }

    #[test]
    fn common_hosts_internal_atlas_hosts_external() {
        assert_eq!(Capability::Matching.default_tool().1, ToolServer::Common);
        assert_eq!(Capability::ErpConnector.default_tool().1, ToolServer::Atlas);
    }
}

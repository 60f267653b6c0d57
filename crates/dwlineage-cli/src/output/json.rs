//! JSON report formatting.

use anyhow::Result;
use dwlineage_core::{BatchReport, ProcessOutcome};

/// Format one script's outcome as pretty JSON.
pub fn format_outcome_json(outcome: &ProcessOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

/// Format a batch report as pretty JSON.
pub fn format_batch_json(report: &BatchReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwlineage_core::{EngineConfig, MemoryCatalog, ProcessMode, ScriptSource, UpdateCoordinator};

    #[test]
    fn test_outcome_json_carries_counts_and_errors() {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
        let ok = coordinator.process(
            &ScriptSource::new("load.sql", "INSERT INTO dw.t SELECT id FROM src.s"),
            ProcessMode::Clear,
        );
        let failed = coordinator.process(&ScriptSource::new("bad.sql", "INSERT INTO"), ProcessMode::Clear);

        let json: serde_json::Value =
            serde_json::from_str(&format_outcome_json(&ok).unwrap()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["scriptId"], "LOAD");
        assert_eq!(json["report"]["summaryEdges"], 1);

        let report = BatchReport::from_outcomes(vec![ok, failed]);
        let json: serde_json::Value =
            serde_json::from_str(&format_batch_json(&report).unwrap()).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][1]["error"]["code"], "PARSE_ERROR");
    }
}

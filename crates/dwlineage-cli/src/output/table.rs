//! Human-readable report output.

use dwlineage_core::{BatchReport, ProcessOutcome, ProcessStatus};
use owo_colors::OwoColorize;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Script")]
    script: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Statements")]
    statements: String,
    #[tabled(rename = "Detail")]
    detail_edges: String,
    #[tabled(rename = "Summary")]
    summary_edges: String,
    #[tabled(rename = "Targets")]
    targets: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl OutcomeRow {
    fn new(outcome: &ProcessOutcome, colored: bool) -> Self {
        let status = match outcome.status {
            ProcessStatus::Success => "success",
            ProcessStatus::Failed => "failed",
            ProcessStatus::Skipped => "skipped",
        };
        let status = match (colored, outcome.status) {
            (false, _) => status.to_string(),
            (true, ProcessStatus::Success) => status.green().to_string(),
            (true, ProcessStatus::Failed) => status.red().to_string(),
            (true, ProcessStatus::Skipped) => status.yellow().to_string(),
        };

        let report = outcome.report.as_ref();
        let count = |pick: fn(&dwlineage_core::ScriptReport) -> usize| {
            report.map(|r| pick(r).to_string()).unwrap_or_default()
        };
        Self {
            script: outcome.script_id.clone(),
            status,
            statements: count(|r| r.statements),
            detail_edges: count(|r| r.detail_edges),
            summary_edges: count(|r| r.summary_edges),
            targets: report.map(|r| r.targets.join(", ")).unwrap_or_default(),
            error: outcome
                .error
                .as_ref()
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_default(),
        }
    }
}

/// Format outcomes as a table followed by a one-line total.
pub fn format_table(report: &BatchReport, colored: bool) -> String {
    let mut out = String::new();
    if report.outcomes.is_empty() {
        let _ = writeln!(out, "No scripts processed");
        return out;
    }

    let rows: Vec<OutcomeRow> = report
        .outcomes
        .iter()
        .map(|outcome| OutcomeRow::new(outcome, colored))
        .collect();
    let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));

    let total = format!(
        "{} succeeded | {} failed | {} skipped",
        report.succeeded, report.failed, report.skipped
    );
    if colored {
        let _ = writeln!(out, "{}", total.bold());
    } else {
        let _ = writeln!(out, "{total}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwlineage_core::{EngineConfig, MemoryCatalog, ProcessMode, ScriptSource, UpdateCoordinator};

    #[test]
    fn test_table_lists_each_script() {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
        let outcomes = vec![
            coordinator.process(
                &ScriptSource::new("load.sql", "INSERT INTO dw.t SELECT id FROM src.s"),
                ProcessMode::Clear,
            ),
            coordinator.process(&ScriptSource::new("bad.sql", "INSERT INTO"), ProcessMode::Clear),
        ];

        let text = format_table(&BatchReport::from_outcomes(outcomes), false);
        assert!(text.contains("LOAD"));
        assert!(text.contains("DW.T"));
        assert!(text.contains("PARSE_ERROR"));
        assert!(text.contains("1 succeeded | 1 failed | 0 skipped"));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(
            format_table(&BatchReport::default(), false),
            "No scripts processed\n"
        );
    }
}

//! Output formatting for the command-line interface.
//!
//! Two modes: human-readable terminal output with colors, and JSON for
//! machine consumption. All rendering is pure string building; file
//! writing stays in the binary.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;

use crate::cli::OutputFormat;
use crate::reconcile::ReconciliationResult;
use crate::registry::ImportOutcome;
use crate::types::Severity;

/// A single import plus its optional reconciliation result.
#[derive(Serialize)]
pub struct ImportReport<'a> {
    #[serde(flatten)]
    pub outcome: &'a ImportOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<&'a ReconciliationResult>,
}

pub fn render_import(report: &ImportReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Terminal => Ok(render_import_terminal(report)),
    }
}

pub fn render_batch(outcomes: &[ImportOutcome], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcomes)?),
        OutputFormat::Terminal => Ok(render_batch_terminal(outcomes)),
    }
}

fn severity_label(severity: Severity) -> String {
    let label = format!("{severity:?}").to_uppercase();
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.green().to_string(),
        Severity::Info => label.dimmed().to_string(),
    }
}

fn render_import_terminal(report: &ImportReport) -> String {
    let mut out = String::new();
    let outcome = report.outcome;

    let status = if outcome.success {
        "imported".green().to_string()
    } else {
        "failed".red().bold().to_string()
    };
    let _ = writeln!(
        out,
        "{} [{}] {}",
        outcome.item_id.bold(),
        outcome.format.as_deref().unwrap_or("unknown"),
        status
    );

    if let Some(error) = &outcome.error {
        let _ = writeln!(out, "  {} {error}", "error:".red());
    }
    if let Some(validation) = &outcome.validation {
        for warning in &validation.warnings {
            let _ = writeln!(out, "  {} {warning}", "warning:".yellow());
        }
    }

    let Some(analysis) = &outcome.analysis else {
        return out;
    };

    let _ = writeln!(
        out,
        "  {:?} analysis: {} entities, {} relationships, {} threats, {} controls, {} risks",
        analysis.framework,
        analysis.entities.len(),
        analysis.relationships.len(),
        analysis.threats.len(),
        analysis.controls.len(),
        analysis.risks.len()
    );
    for threat in &analysis.threats {
        let _ = writeln!(
            out,
            "    {} {} ({})",
            severity_label(threat.severity),
            threat.name,
            threat.category
        );
    }

    if let Some(reconciliation) = report.reconciliation {
        out.push_str(&render_reconciliation_terminal(reconciliation));
    }
    out
}

fn render_reconciliation_terminal(result: &ReconciliationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  reconciliation: {} mapped, {} suggested, {} unmapped",
        result.mappings.len().to_string().green(),
        result.suggestions.len().to_string().yellow(),
        result.unmapped.len().to_string().red()
    );
    for mapping in &result.mappings {
        let _ = writeln!(
            out,
            "    {} -> {} ({:.2}; {})",
            mapping.entity.name,
            mapping.candidate_name.bold(),
            mapping.confidence,
            mapping.reason
        );
    }
    for suggestion in &result.suggestions {
        let _ = writeln!(
            out,
            "    {} {} -> {} ({:.2})",
            "?".yellow(),
            suggestion.entity.name,
            suggestion.candidate_name,
            suggestion.confidence
        );
    }
    for unmapped in &result.unmapped {
        let _ = writeln!(
            out,
            "    {} {} (best {:.2})",
            "x".red(),
            unmapped.entity.name,
            unmapped.best_score
        );
    }
    out
}

fn render_batch_terminal(outcomes: &[ImportOutcome]) -> String {
    let mut out = String::new();
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let _ = writeln!(
        out,
        "{} {succeeded}/{} items imported",
        "batch:".bold(),
        outcomes.len()
    );
    for outcome in outcomes {
        let report = ImportReport { outcome, reconciliation: None };
        out.push_str(&render_import_terminal(&report));
    }
    out
}

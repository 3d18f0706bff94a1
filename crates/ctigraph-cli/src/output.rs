//! Output formatting for the CLI.
//!
//! Artifacts always go to files; stdout carries a summary in the chosen
//! format. Quiet mode prints only what a script would pipe onwards.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ctigraph_domain::Triple;
use ctigraph_extractor::{DocumentScan, MergedTriples, PrefilterOutput};
use ctigraph_gatekeeper::ValidationReport;
use serde_json::json;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Active format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Summarize a prefilter run.
    pub fn format_prefilter(&self, sentences_seen: usize, output: &PrefilterOutput) -> Result<String> {
        let kept = output.sentences.len();
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "sentences_seen": sentences_seen,
                "sentences_kept": kept,
                "prompts": output.inputs.len(),
            }))?),
            OutputFormat::Table => Ok(key_value_table(&[
                ("Sentences seen", sentences_seen.to_string()),
                ("Sentences kept", kept.to_string()),
                ("Prompts", output.inputs.len().to_string()),
            ])),
            OutputFormat::Quiet => Ok(String::new()),
        }
    }

    /// Summarize a sentence batch.
    pub fn format_merged(&self, merged: &MergedTriples) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "total_inputs": merged.total_inputs,
                "total_triples": merged.total_triples,
                "unique_triples": merged.unique_triples,
                "errors": merged.errors,
            }))?),
            OutputFormat::Table => {
                let errors = if merged.errors > 0 {
                    self.colorize(&merged.errors.to_string(), "red")
                } else {
                    merged.errors.to_string()
                };
                Ok(key_value_table(&[
                    ("Inputs", merged.total_inputs.to_string()),
                    ("Triples extracted", merged.total_triples.to_string()),
                    ("Unique triples", merged.unique_triples.to_string()),
                    ("Errors", errors),
                ]))
            }
            OutputFormat::Quiet => Ok(String::new()),
        }
    }

    /// Summarize a whole-document scan.
    pub fn format_scan(&self, scan: &DocumentScan) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "source": scan.source,
                "model": scan.model,
                "strategy": scan.strategy,
                "windows": scan.windows,
                "extracted_total": scan.extracted_total,
                "validated_true": scan.validated_true,
                "errors": scan.errors,
            }))?),
            OutputFormat::Table => {
                let strategy = serde_json::to_value(scan.strategy)?
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                Ok(key_value_table(&[
                    ("Source", scan.source.clone()),
                    ("Model", scan.model.clone()),
                    ("Strategy", strategy),
                    ("Windows", scan.windows.to_string()),
                    ("Triples", scan.extracted_total.to_string()),
                    ("Supported", scan.validated_true.to_string()),
                    ("Errors", scan.errors.to_string()),
                ]))
            }
            OutputFormat::Quiet => Ok(String::new()),
        }
    }

    /// Render a validation report with per-reason counts.
    pub fn format_validation(&self, report: &ValidationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "total": report.total,
                "valid": report.valid,
                "invalid": report.invalid,
                "valid_rate": report.valid_rate(),
                "invalid_rate": report.invalid_rate(),
                "reason_counts": report.reason_counts,
            }))?),
            OutputFormat::Table => {
                let mut out = key_value_table(&[
                    ("Total", report.total.to_string()),
                    (
                        "Valid",
                        format!("{} ({})", report.valid, format_rate(report.valid_rate())),
                    ),
                    (
                        "Invalid",
                        format!("{} ({})", report.invalid, format_rate(report.invalid_rate())),
                    ),
                ]);
                if !report.reason_counts.is_empty() {
                    let mut reasons: Vec<_> = report.reason_counts.iter().collect();
                    reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

                    let mut builder = Builder::default();
                    builder.push_record(["Reason", "Count"]);
                    for (reason, count) in reasons {
                        builder.push_record([reason.clone(), count.to_string()]);
                    }
                    out.push('\n');
                    out.push_str(&styled(builder));
                }
                Ok(out)
            }
            OutputFormat::Quiet => Ok(format!("{} {}", report.valid, report.invalid)),
        }
    }

    /// Format triples.
    pub fn format_triples(&self, triples: &[Triple]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(triples)?),
            OutputFormat::Table => self.format_triples_table(triples),
            OutputFormat::Quiet => Ok(triples
                .iter()
                .filter_map(|t| t.id.as_ref().map(|id| id.to_string()))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_triples_table(&self, triples: &[Triple]) -> Result<String> {
        if triples.is_empty() {
            return Ok(self.colorize("No triples found.", "yellow"));
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Subject", "Predicate", "Object", "Confidence", "Paragraph"]);

        for triple in triples {
            let id = triple.id.as_ref().map(|id| id.to_string()).unwrap_or_default();
            let confidence = triple
                .confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            builder.push_record([
                id,
                entity_cell(&triple.subject.name, &triple.subject.entity_type),
                triple.predicate.clone(),
                entity_cell(&triple.object.name, &triple.object.entity_type),
                confidence,
                triple.metadata.paragraph_id.clone().unwrap_or_default(),
            ]);
        }

        Ok(styled(builder))
    }

    /// Report a written artifact; quiet mode prints the bare path.
    pub fn written(&self, path: &Path, count: usize, what: &str) -> String {
        match self.format {
            OutputFormat::Quiet => path.display().to_string(),
            _ => self.success(&format!("Wrote {} {} to {}", count, what, path.display())),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Print `text` unless it is empty.
pub fn emit(text: &str) {
    if !text.is_empty() {
        println!("{}", text);
    }
}

/// Status lines go to stderr in JSON mode so stdout stays parseable.
pub fn emit_status(formatter: &Formatter, text: &str) {
    match formatter.format() {
        OutputFormat::Json => eprintln!("{}", text),
        _ => emit(text),
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

fn entity_cell(name: &str, entity_type: &str) -> String {
    if entity_type.is_empty() {
        name.to_string()
    } else {
        format!("{} [{}]", name, entity_type)
    }
}

fn key_value_table(rows: &[(&str, String)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    for (key, value) in rows {
        builder.push_record([key.to_string(), value.clone()]);
    }
    styled(builder)
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

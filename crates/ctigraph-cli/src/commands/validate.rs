//! Validate command implementation.

use crate::artifacts::{read_triple_records, write_json};
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{emit, emit_status, Formatter};
use ctigraph_domain::Ontology;
use ctigraph_gatekeeper::{Gatekeeper, Partition, ValidationConfig};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Execute the validate command.
pub fn execute_validate(
    args: ValidateArgs,
    config: &Config,
    ontology: &Ontology,
    formatter: &Formatter,
) -> Result<()> {
    let settings = validation_settings(&args, &config.validation)?;
    let records = read_triple_records(&args.input)?;
    info!("Validating {} records from {}", records.len(), args.input.display());

    let partition = Gatekeeper::new(settings, ontology).partition(records);
    write_partition(&partition, &args.out_ok, &args.out_bad)?;

    let report = partition.report();
    emit(&formatter.format_validation(&report)?);
    emit_status(
        formatter,
        &formatter.written(&args.out_ok, report.valid, "valid triples"),
    );
    emit_status(
        formatter,
        &formatter.written(&args.out_bad, report.invalid, "invalid triples"),
    );

    Ok(())
}

/// Apply command-line overrides to the configured rules
fn validation_settings(args: &ValidateArgs, base: &ValidationConfig) -> Result<ValidationConfig> {
    let mut settings = base.clone();
    if let Some(max) = args.max_str_len {
        settings = settings.with_max_str_len(max);
    }
    if args.no_domain_range {
        settings.enforce_domain_range = false;
    }
    settings.require_confidence |= args.require_confidence;
    settings
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(settings)
}

fn write_partition(partition: &Partition, ok: &Path, bad: &Path) -> Result<()> {
    write_json(ok, &json!({ "triples": partition.valid }))?;
    write_json(bad, &json!({ "triples": partition.invalid }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::fs;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> ValidateArgs {
        ValidateArgs {
            input: dir.path().join("merged.json"),
            out_ok: dir.path().join("ok.json"),
            out_bad: dir.path().join("bad.json"),
            max_str_len: None,
            no_domain_range: false,
            require_confidence: false,
        }
    }

    #[test]
    fn test_partition_files() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir);
        let merged = json!({
            "total_inputs": 2,
            "triples": [
                {
                    "subject": {"name": "APT28", "type": "threat-actor"},
                    "predicate": "uses",
                    "object": {"name": "X-Agent", "type": "malware"},
                    "confidence": 0.9
                },
                {
                    "subject": {"name": "APT28", "type": "threat-actor"},
                    "predicate": "likes",
                    "object": {"name": "X-Agent", "type": "malware"}
                },
                "garbage"
            ]
        });
        write_json(&args.input, &merged).unwrap();
        let (ok, bad) = (args.out_ok.clone(), args.out_bad.clone());

        let ontology = Ontology::stix();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        execute_validate(args, &Config::default(), &ontology, &formatter).unwrap();

        let ok: serde_json::Value = serde_json::from_str(&fs::read_to_string(ok).unwrap()).unwrap();
        let bad: serde_json::Value = serde_json::from_str(&fs::read_to_string(bad).unwrap()).unwrap();
        assert_eq!(ok["triples"].as_array().unwrap().len(), 1);
        assert_eq!(ok["triples"][0], merged["triples"][0]);
        assert_eq!(bad["triples"].as_array().unwrap().len(), 2);
        assert_eq!(bad["triples"][1]["triple"], "garbage");
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let ontology = Ontology::stix();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let err = execute_validate(args(&dir), &Config::default(), &ontology, &formatter).unwrap_err();
        assert!(matches!(err, CliError::Input { .. }));
        assert!(!dir.path().join("ok.json").exists());
    }

    #[test]
    fn test_overrides() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.max_str_len = Some(40);
        args.no_domain_range = true;
        let settings = validation_settings(&args, &ValidationConfig::default()).unwrap();
        assert_eq!(settings.max_str_len, 40);
        assert!(!settings.enforce_domain_range);

        args.max_str_len = Some(0);
        assert!(validation_settings(&args, &ValidationConfig::default()).is_err());
    }
}

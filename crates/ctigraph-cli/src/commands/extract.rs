//! Extract command implementation.

use super::{apply_timeout, connect_ollama};
use crate::artifacts::{paragraph_map, read_jsonl, sentence_map, write_json};
use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit, emit_status, Formatter};
use ctigraph_domain::Ontology;
use ctigraph_extractor::{PromptRecord, TripleExtractor};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    ontology: &Ontology,
    formatter: &Formatter,
    cancel: &AtomicBool,
) -> Result<()> {
    let records: Vec<PromptRecord> = read_jsonl(&args.inputs)?;
    if records.is_empty() {
        warn!("{} has no prompt records", args.inputs.display());
    }
    let sentences = sentence_map(&args.filtered)?;
    let paragraphs = paragraph_map(&args.paragraphs)?;

    let mut settings = config.extractor.clone();
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    settings.validate_support |= args.validate_support;
    apply_timeout(&args.ollama, &mut settings);

    let provider = connect_ollama(&args.ollama, &settings, formatter).await?;
    let extractor = TripleExtractor::new(provider, ontology, settings)?;

    let merged = extractor
        .extract_batch(&records, &sentences, &paragraphs, cancel)
        .await;
    write_json(&args.out, &merged)?;

    emit(&formatter.format_merged(&merged)?);
    if cancel.load(Ordering::SeqCst) {
        eprintln!("{}", formatter.warning("Interrupted; partial results were written"));
    }
    emit_status(
        formatter,
        &formatter.written(&args.out, merged.unique_triples, "triples"),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OllamaArgs;
    use crate::config::OutputFormat;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_inputs_write_empty_merge() {
        let dir = TempDir::new().unwrap();
        let inputs = dir.path().join("inputs.jsonl");
        let out = dir.path().join("triples_merged.json");
        fs::write(&inputs, "\n").unwrap();

        let args = ExtractArgs {
            inputs,
            filtered: dir.path().join("filtered_sentences.json"),
            paragraphs: dir.path().join("page_paragraphs.json"),
            out: out.clone(),
            concurrency: None,
            validate_support: false,
            ollama: OllamaArgs {
                url: "http://127.0.0.1:9".to_string(),
                model: "gemma2:9b".to_string(),
                timeout: Some(1),
            },
        };
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        execute_extract(
            args,
            &Config::default(),
            &Ontology::stix(),
            &formatter,
            &AtomicBool::new(false),
        )
        .await
        .unwrap();

        let merged: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(merged["total_inputs"], 0);
        assert_eq!(merged["unique_triples"], 0);
        assert_eq!(merged["errors"], 0);
        assert_eq!(merged["triples"], serde_json::json!([]));
    }
}

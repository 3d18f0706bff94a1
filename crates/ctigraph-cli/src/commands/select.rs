//! Select command implementation.

use crate::artifacts::{read_json, read_triple_records, write_json};
use crate::cli::SelectArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit, emit_status, Formatter};
use ctigraph_domain::{Ontology, ParagraphDocument, Triple};
use ctigraph_extractor::PerUnitSelector;
use ctigraph_gatekeeper::Gatekeeper;
use tracing::{info, warn};

/// Execute the select command.
pub fn execute_select(
    args: SelectArgs,
    config: &Config,
    ontology: &Ontology,
    formatter: &Formatter,
) -> Result<()> {
    let doc: ParagraphDocument = read_json(&args.paragraphs)?;
    let records = read_triple_records(&args.merged)?;

    let total = records.len();
    let candidates: Vec<Triple> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(triple) => Some(triple),
            Err(e) => {
                warn!("Skipping malformed triple: {}", e);
                None
            }
        })
        .collect();
    info!("{} of {} records are well-formed triples", candidates.len(), total);

    let mut selector = PerUnitSelector::new(&config.extractor);
    if let Some(k) = args.per_par_max {
        selector = selector.with_per_unit_max(k);
    }
    if let Some(max) = args.ctx_max_ch {
        selector = selector.with_context_max_chars(max);
    }

    let gatekeeper = Gatekeeper::new(config.validation.clone(), ontology);
    let selected = selector.select_document(&doc, candidates, &gatekeeper)?;
    write_json(&args.out, &selected)?;

    emit(&formatter.format_triples(&selected)?);
    emit_status(
        formatter,
        &formatter.written(&args.out, selected.len(), "triples"),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_select_round_trip() {
        let dir = TempDir::new().unwrap();
        let paragraphs = dir.path().join("page_paragraphs.json");
        let merged = dir.path().join("triples_merged.json");
        let out = dir.path().join("triples_per_para.json");

        write_json(
            &paragraphs,
            &json!({
                "source": "report.pdf",
                "pages": [{"page": 1, "chunks": [
                    {"id": "Page 1 - Chunk 0", "text": "APT28 used X-Agent and Zebrocy against ministries."}
                ]}]
            }),
        )
        .unwrap();

        let triple = |subject: &str, object: &str, confidence: f64| {
            json!({
                "subject": {"name": subject, "type": "threat-actor"},
                "predicate": "uses",
                "object": {"name": object, "type": "malware"},
                "confidence": confidence,
                "metadata": {"page": 1, "paragraph_id": "Page 1 - Chunk 0", "sentence_id": "Page 1 - Chunk 0-s0"}
            })
        };
        write_json(
            &merged,
            &json!({"triples": [
                triple("APT28", "X-Agent", 0.7),
                triple("APT28", "Zebrocy", 0.9),
                triple("APT28", "Sofacy dropper", 0.8),
                {"subject": "not an object"}
            ]}),
        )
        .unwrap();

        let args = SelectArgs {
            paragraphs,
            merged,
            out: out.clone(),
            per_par_max: Some(2),
            ctx_max_ch: Some(10),
        };
        let ontology = Ontology::stix();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        execute_select(args, &Config::default(), &ontology, &formatter).unwrap();

        let selected: Vec<Triple> = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        let objects: Vec<_> = selected.iter().map(|t| t.object.name.as_str()).collect();
        assert_eq!(objects, vec!["Zebrocy", "Sofacy dropper"]);
        assert_eq!(selected[0].context.paragraph.as_deref(), Some("APT28 used..."));
    }
}

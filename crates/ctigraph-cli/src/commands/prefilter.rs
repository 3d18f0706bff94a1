//! Prefilter command implementation.

use crate::artifacts::{load_document, write_json, write_jsonl};
use crate::cli::PrefilterArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit, emit_status, Formatter};
use ctigraph_domain::Ontology;
use ctigraph_extractor::{prefilter, PromptBuilder, RuleTagger, SegmentFilter};
use tracing::info;

/// Execute the prefilter command.
pub fn execute_prefilter(
    args: PrefilterArgs,
    config: &Config,
    ontology: &Ontology,
    formatter: &Formatter,
) -> Result<()> {
    let doc = load_document(&args.document)?;

    let mut settings = config.extractor.clone();
    settings.require_verb |= args.require_verb;
    let filter = SegmentFilter::new(RuleTagger::new(), &settings);
    let prompts = PromptBuilder::new(ontology);

    let sentences_seen = doc.sentence_units().len();
    let output = prefilter(&doc, &filter, &prompts);
    info!(
        "Kept {} of {} sentences from {}",
        output.sentences.len(),
        sentences_seen,
        doc.source
    );

    write_json(&args.filtered, &output.sentences)?;
    write_jsonl(&args.inputs, &output.inputs)?;

    emit(&formatter.format_prefilter(sentences_seen, &output)?);
    if output.sentences.is_empty() {
        eprintln!(
            "{}",
            formatter.info("No sentence mentions an ontology-relevant entity or indicator")
        );
    }
    emit_status(
        formatter,
        &formatter.written(&args.filtered, output.sentences.len(), "sentences"),
    );
    emit_status(
        formatter,
        &formatter.written(&args.inputs, output.inputs.len(), "prompts"),
    );

    Ok(())
}

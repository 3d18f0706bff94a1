//! Scan command implementation.

use super::{apply_timeout, connect_ollama};
use crate::artifacts::{load_document, write_json};
use crate::cli::ScanArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit, emit_status, Formatter};
use ctigraph_domain::Ontology;
use ctigraph_extractor::TripleExtractor;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Execute the scan command.
pub async fn execute_scan(
    args: ScanArgs,
    config: &Config,
    ontology: &Ontology,
    formatter: &Formatter,
    cancel: &AtomicBool,
) -> Result<()> {
    let doc = load_document(&args.document)?;
    let text = doc.full_text();
    if text.trim().is_empty() {
        warn!("{} has no text", doc.source);
    }

    let mut settings = config.extractor.clone();
    match args.max_doc_chars {
        Some(0) => settings.max_document_chars = usize::MAX,
        Some(limit) => settings.max_document_chars = limit,
        None => {}
    }
    settings.validate_support |= args.validate_support;
    apply_timeout(&args.ollama, &mut settings);

    let provider = connect_ollama(&args.ollama, &settings, formatter).await?;
    let extractor = TripleExtractor::new(provider, ontology, settings)?;

    let scan = extractor.scan_document(&doc.source, &text, cancel).await;
    write_json(&args.out, &scan)?;

    emit(&formatter.format_scan(&scan)?);
    if cancel.load(Ordering::SeqCst) {
        eprintln!("{}", formatter.warning("Interrupted; partial results were written"));
    }
    emit_status(
        formatter,
        &formatter.written(&args.out, scan.extracted_total, "triples"),
    );

    Ok(())
}

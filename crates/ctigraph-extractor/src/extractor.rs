//! Batch orchestration: sentence batches and whole-document scans

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::gateway::CompletionGateway;
use crate::prompt::{support_prompt, PromptBuilder};
use crate::types::{DocumentScan, MergedTriples, PromptRecord};
use crate::window::WindowManager;
use ctigraph_domain::{
    assign_ids, dedupe, Canonicalizer, CompletionService, GenerationOptions, KeyMode, Ontology,
    Provenance, Triple, TripleContext,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Turns prompt records and documents into deduplicated triple sets
pub struct TripleExtractor<'o, L> {
    gateway: CompletionGateway<L>,
    config: ExtractorConfig,
    prompts: PromptBuilder<'o>,
    canonicalizer: Canonicalizer,
}

/// What one unit produced
#[derive(Debug, Default)]
struct UnitOutcome {
    triples: Vec<Triple>,
    failed: bool,
}

impl<'o, L> TripleExtractor<'o, L>
where
    L: CompletionService + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create an extractor; fails if `config` does not validate
    pub fn new(
        service: L,
        ontology: &'o Ontology,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            gateway: CompletionGateway::new(service, config.extraction_timeout()),
            prompts: PromptBuilder::new(ontology),
            canonicalizer: Canonicalizer::new(config.max_name_chars),
            config,
        })
    }

    /// Replace the prompt builder (custom guardrails)
    pub fn with_prompts(mut self, prompts: PromptBuilder<'o>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Model identifier of the completion service
    pub fn model_name(&self) -> &str {
        self.gateway.model_name()
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract every record, then deduplicate with provenance-aware keys
    ///
    /// Sentence and paragraph text missing from a record is back-filled
    /// from `sentences` (by sentence id) and `paragraphs` (by paragraph
    /// id). Unit failures are counted, never raised. When `cancel` is set
    /// the batch stops between units and returns what it has.
    pub async fn extract_batch(
        &self,
        records: &[PromptRecord],
        sentences: &HashMap<String, String>,
        paragraphs: &HashMap<String, String>,
        cancel: &AtomicBool,
    ) -> MergedTriples {
        let support = self
            .config
            .validate_support
            .then_some(self.config.generation);
        let prepared: Vec<PromptRecord> = records
            .iter()
            .map(|r| backfill(r.clone(), sentences, paragraphs))
            .collect();

        info!(
            "Extracting {} units (concurrency {})",
            prepared.len(),
            self.config.concurrency
        );

        let outcomes = if self.config.concurrency > 1 {
            self.run_concurrent(prepared, support, cancel).await
        } else {
            self.run_sequential(prepared, support, cancel).await
        };

        let errors = outcomes.iter().filter(|o| o.failed).count();
        let raw: Vec<Triple> = outcomes.into_iter().flat_map(|o| o.triples).collect();
        let total_triples = raw.len();
        let mut triples = dedupe(raw, KeyMode::ProvenanceAware);
        assign_ids(&mut triples);

        info!(
            "Batch complete: {} raw, {} unique, {} errors",
            total_triples,
            triples.len(),
            errors
        );

        MergedTriples {
            total_inputs: records.len(),
            total_triples,
            unique_triples: triples.len(),
            errors,
            triples,
        }
    }

    async fn run_sequential(
        &self,
        records: Vec<PromptRecord>,
        support: Option<GenerationOptions>,
        cancel: &AtomicBool,
    ) -> Vec<UnitOutcome> {
        let total = records.len();
        let mut outcomes = Vec::with_capacity(total);
        for (idx, record) in records.into_iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                warn!("Cancelled after {} of {} units", idx, total);
                break;
            }
            debug!("Unit {}/{}", idx + 1, total);
            outcomes.push(
                process_record(
                    self.gateway.clone(),
                    self.config.generation,
                    self.canonicalizer,
                    record,
                    support,
                )
                .await,
            );
        }
        outcomes
    }

    async fn run_concurrent(
        &self,
        records: Vec<PromptRecord>,
        support: Option<GenerationOptions>,
        cancel: &AtomicBool,
    ) -> Vec<UnitOutcome> {
        let total = records.len();
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<UnitOutcome>> = Vec::new();
        slots.resize_with(total, || None);
        let mut dispatched = 0;

        for (idx, record) in records.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            if cancel.load(Ordering::SeqCst) {
                warn!("Cancelled after dispatching {} of {} units", idx, total);
                break;
            }
            let gateway = self.gateway.clone();
            let options = self.config.generation;
            let canonicalizer = self.canonicalizer;
            tasks.spawn(async move {
                let outcome = process_record(gateway, options, canonicalizer, record, support).await;
                drop(permit);
                (idx, outcome)
            });
            dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => warn!("Extraction task failed: {}", e),
            }
        }

        // Completion order is arbitrary; keep input order for dedup and ids.
        // A slot left empty by a failed task counts as an error; slots after
        // a cancellation point were never dispatched and are skipped.
        slots
            .into_iter()
            .take(dispatched)
            .map(|slot| {
                slot.unwrap_or(UnitOutcome {
                    triples: Vec::new(),
                    failed: true,
                })
            })
            .collect()
    }

    /// Extract from a whole document with the single-shot/windowed policy
    pub async fn scan_document(&self, source: &str, text: &str, cancel: &AtomicBool) -> DocumentScan {
        let manager = WindowManager::new(&self.config);
        let run = manager
            .run(
                &self.gateway,
                &self.prompts,
                &self.config.document_generation,
                text,
                cancel,
            )
            .await;

        let mut triples = run.triples;
        assign_ids(&mut triples);
        let mut errors = run.errors;
        let mut validated_true = 0;

        if self.config.validate_support && !run.cancelled {
            for (triple, &window_idx) in triples.iter_mut().zip(&run.evidence) {
                if cancel.load(Ordering::SeqCst) {
                    warn!("Cancelled during support checks");
                    break;
                }
                let evidence = run
                    .windows
                    .get(window_idx)
                    .map(|w| w.text.as_str())
                    .unwrap_or(text);
                let prompt = support_prompt(evidence, triple);
                match self.gateway.check_support(&prompt, &self.config.generation).await {
                    Ok(check) => {
                        validated_true += usize::from(check.valid);
                        triple.validation = Some(check);
                    }
                    Err(e) => {
                        warn!("Support check failed for {}: {}", triple.display_line(), e);
                        errors += 1;
                    }
                }
            }
        }

        info!(
            "Scan of {} complete: {} triples, {} supported, {} errors",
            source,
            triples.len(),
            validated_true,
            errors
        );

        DocumentScan {
            source: source.to_string(),
            model: self.model_name().to_string(),
            strategy: run.strategy,
            windows: run.windows.len(),
            extracted_total: triples.len(),
            validated_true,
            errors,
            triples,
        }
    }
}

fn backfill(
    mut record: PromptRecord,
    sentences: &HashMap<String, String>,
    paragraphs: &HashMap<String, String>,
) -> PromptRecord {
    fn missing(field: &Option<String>) -> bool {
        field.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    if missing(&record.sentence) {
        if let Some(text) = record.sentence_id.as_ref().and_then(|id| sentences.get(id)) {
            record.sentence = Some(text.clone());
        }
    }
    if missing(&record.paragraph) {
        if let Some(text) = record.paragraph_id.as_ref().and_then(|id| paragraphs.get(id)) {
            record.paragraph = Some(text.clone());
        }
    }
    record
}

async fn process_record<L>(
    gateway: CompletionGateway<L>,
    options: GenerationOptions,
    canonicalizer: Canonicalizer,
    record: PromptRecord,
    support: Option<GenerationOptions>,
) -> UnitOutcome
where
    L: CompletionService + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let unit = record.sentence_id.as_deref().unwrap_or("?");
    if record.prompt.trim().is_empty() {
        warn!("Unit {}: {}", unit, ExtractorError::EmptyPrompt);
        return UnitOutcome {
            triples: Vec::new(),
            failed: true,
        };
    }

    let extraction = match gateway.extract(&record.prompt, &options).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!("Unit {}: {}", unit, e);
            return UnitOutcome {
                triples: Vec::new(),
                failed: true,
            };
        }
    };
    if extraction.failed() {
        warn!(
            "Unit {}: {}",
            unit,
            ExtractorError::Unparseable(extraction.note.as_str().to_string())
        );
        return UnitOutcome {
            triples: Vec::new(),
            failed: true,
        };
    }

    let metadata = Provenance {
        page: record.page,
        paragraph_id: record.paragraph_id.clone(),
        sentence_id: record.sentence_id.clone(),
    };
    let context = TripleContext {
        sentence: record.sentence.clone(),
        paragraph: record.paragraph.clone(),
    };
    let mut triples: Vec<Triple> = extraction
        .triples
        .into_iter()
        .map(|t| {
            canonicalizer
                .canonicalize(t)
                .with_metadata(metadata.clone())
                .with_context(context.clone())
        })
        .collect();

    if let Some(support_options) = support {
        let evidence = record
            .paragraph
            .as_deref()
            .or(record.sentence.as_deref())
            .unwrap_or_default();
        for triple in &mut triples {
            let prompt = support_prompt(evidence, triple);
            match gateway.check_support(&prompt, &support_options).await {
                Ok(check) => triple.validation = Some(check),
                Err(e) => warn!("Unit {}: support check failed: {}", unit, e),
            }
        }
    }

    debug!("Unit {}: {} triples", unit, triples.len());
    UnitOutcome {
        triples,
        failed: false,
    }
}

//! ctigraph Extractor
//!
//! Turns decomposed threat-report text into deduplicated,
//! provenance-tagged triples using a text completion service.
//!
//! # Overview
//!
//! The extractor sits between the Document Source and the Gatekeeper. It
//! decides which sentences are worth a completion call, renders prompts
//! against the installed ontology, reads whatever the model answers, and
//! merges the results.
//!
//! # Architecture
//!
//! ```text
//! Document → SegmentFilter → PromptBuilder → CompletionGateway
//!          → Canonicalizer → Deduplicator → Gatekeeper → PerUnitSelector
//! ```
//!
//! Whole-document scans go through the [`WindowManager`] instead, which
//! tries one prompt first and falls back to overlapping windows.
//!
//! # Key Features
//!
//! - **Lexical indicators**: IPs, domains, URLs, emails, files, CVEs, technique ids
//! - **Tolerant parsing**: prose-wrapped JSON, the escape string, one repair retry
//! - **Provenance**: page, paragraph and sentence ids on every triple
//! - **Bounded concurrency**: optional parallel units with input order restored
//!
//! # Example Usage
//!
//! ```no_run
//! use ctigraph_extractor::{ExtractorConfig, PromptRecord, TripleExtractor};
//! use ctigraph_domain::Ontology;
//! use ctigraph_llm::MockProvider;
//! use std::collections::HashMap;
//! use std::sync::atomic::AtomicBool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ontology = Ontology::stix();
//! let llm = MockProvider::new("No related entities and relations.");
//! let extractor = TripleExtractor::new(llm, &ontology, ExtractorConfig::default())?;
//!
//! let records = vec![PromptRecord {
//!     prompt: "...".to_string(),
//!     ..Default::default()
//! }];
//! let merged = extractor
//!     .extract_batch(&records, &HashMap::new(), &HashMap::new(), &AtomicBool::new(false))
//!     .await;
//!
//! println!("{} unique triples, {} errors", merged.unique_triples, merged.errors);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod filter;
mod gateway;
mod indicators;
mod parser;
mod prompt;
mod selector;
mod tagger;
mod types;
mod window;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::TripleExtractor;
pub use filter::{merge_entities, prefilter, SegmentDecision, SegmentFilter, ONTOLOGY_RELEVANT_LABELS};
pub use gateway::{triple_from_object, CompletionGateway, Extraction};
pub use indicators::{extract_indicators, has_indicator, IndicatorKind};
pub use parser::{parse_support, parse_triples, ParseNote, ParsedTriples};
pub use prompt::{
    repair, support_prompt, PromptBuilder, UnitKind, DEFAULT_GUARDRAILS, NO_TRIPLES_ESCAPE,
    REPAIR_SUFFIX, SUPPORT_INSTRUCTIONS,
};
pub use selector::{snippet, PerUnitSelector, SelectionScore};
pub use tagger::RuleTagger;
pub use types::{
    DocumentScan, FilteredSentence, MergedTriples, Mention, PrefilterOutput, PromptRecord,
    ScanStrategy,
};
pub use window::{split_windows, TextWindow, WindowAccumulator, WindowManager, WindowedExtraction};

//! Records produced and consumed by the extraction pipeline

use ctigraph_domain::Triple;
use serde::{Deserialize, Serialize};

/// An entity mention attached to a kept segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Surface text
    pub text: String,
    /// Tagger or indicator label (`ORG`, `DOMAIN`, `VULN_CVE`, ...)
    pub label: String,
}

impl Mention {
    /// Create a mention
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// A sentence kept by the segment filter (`filtered_sentences.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredSentence {
    /// Page number
    pub page: Option<u32>,
    /// Owning paragraph id
    pub paragraph_id: String,
    /// Sentence id
    pub sentence_id: String,
    /// Sentence text
    pub text: String,
    /// Relevant tagger spans merged with lexical indicators
    pub entities: Vec<Mention>,
}

/// One extraction unit (`inputs.jsonl` line)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Page number
    #[serde(default)]
    pub page: Option<u32>,
    /// Paragraph id
    #[serde(default)]
    pub paragraph_id: Option<String>,
    /// Sentence id
    #[serde(default)]
    pub sentence_id: Option<String>,
    /// Fully rendered prompt
    #[serde(default)]
    pub prompt: String,
    /// Sentence the prompt was built from
    #[serde(default)]
    pub sentence: Option<String>,
    /// Paragraph text, for provenance
    #[serde(default)]
    pub paragraph: Option<String>,
}

/// Output of the prefilter step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefilterOutput {
    /// Kept sentences with their entities
    pub sentences: Vec<FilteredSentence>,
    /// One prompt per kept sentence
    pub inputs: Vec<PromptRecord>,
}

/// Merged result of a sentence batch (`triples_merged.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTriples {
    /// Records read
    pub total_inputs: usize,
    /// Triples extracted before deduplication
    pub total_triples: usize,
    /// Triples after deduplication
    pub unique_triples: usize,
    /// Units that failed (transport, timeout, empty prompt, unparseable)
    pub errors: usize,
    /// Deduplicated triples with ids
    pub triples: Vec<Triple>,
}

/// Which phase of the two-phase policy produced a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// One prompt over the whole document
    SingleShot,
    /// Overlapping windows, merged
    Windowed,
}

/// Result of a whole-document scan (`triples_full_doc_scan.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentScan {
    /// Origin of the document
    pub source: String,
    /// Model that produced the triples
    pub model: String,
    /// Phase that produced the result
    pub strategy: ScanStrategy,
    /// Windows processed (1 for single-shot)
    pub windows: usize,
    /// Unique triples extracted
    pub extracted_total: usize,
    /// Triples the support check confirmed
    pub validated_true: usize,
    /// Failed completion calls
    pub errors: usize,
    /// Deduplicated triples with ids
    pub triples: Vec<Triple>,
}

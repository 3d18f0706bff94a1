//! ctigraph Domain Layer
//!
//! Core model and pure algorithms of the triple pipeline. Nothing here
//! performs I/O; collaborators are reached through the traits in
//! [`traits`].
//!
//! ## Key Concepts
//!
//! - **Triple**: a subject-predicate-object assertion with provenance
//! - **Ontology**: the closed type/predicate vocabulary with domain/range rules
//! - **Canonical key**: normalized tuple used to detect duplicates
//! - **Document Source**: page → paragraph → sentence text
//!
//! ## Architecture
//!
//! - Pure logic and record types only
//! - Process-wide ontology installed once, read-only afterwards
//! - Trait definitions for the completion service and the tagger

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod confidence;
pub mod dedup;
pub mod document;
pub mod error;
pub mod ontology;
pub mod provenance;
pub mod traits;
pub mod triple;

// Re-exports for convenience
pub use canonical::{casefold, Canonicalizer, KeyMode, TripleKey};
pub use dedup::{assign_ids, dedupe, dedupe_by_key};
pub use document::{Chunk, Page, ParagraphDocument, ParagraphRef, SentenceUnit};
pub use error::OntologyError;
pub use ontology::{Ontology, PredicateRule};
pub use provenance::Provenance;
pub use traits::{CompletionService, GenerationOptions, LinguisticTagger, TaggedSpan, VERB_LABEL};
pub use triple::{EntityRef, SupportCheck, Triple, TripleContext, TripleId};

//! Triple module - the fundamental unit of the knowledge graph

use crate::provenance::Provenance;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Display identifier of a triple within one run (`t001`, `t002`, ...)
///
/// IDs are assigned once, after deduplication, in final presentation order.
/// They are stable within a run and carry no meaning across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripleId(String);

impl TripleId {
    /// Build the ID for the given 1-based position
    ///
    /// # Examples
    ///
    /// ```
    /// use ctigraph_domain::TripleId;
    ///
    /// assert_eq!(TripleId::sequential(1).as_str(), "t001");
    /// assert_eq!(TripleId::sequential(1234).as_str(), "t1234");
    /// ```
    pub fn sequential(position: usize) -> Self {
        Self(format!("t{:03}", position))
    }

    /// Get the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an entity on either side of a triple
///
/// `entity_type` is kept exactly as declared; it must match an ontology
/// type verbatim to pass validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Free-text entity name
    #[serde(default)]
    pub name: String,

    /// Ontology type
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

impl EntityRef {
    /// Create a new entity reference
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// Human-auditable source snippets a triple was derived from
///
/// A denormalized copy for reviewers, never used for identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripleContext {
    /// Sentence text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,

    /// Paragraph text (possibly truncated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
}

impl TripleContext {
    /// True when neither snippet is present
    pub fn is_empty(&self) -> bool {
        self.sentence.is_none() && self.paragraph.is_none()
    }
}

/// Outcome of the independent support-check pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportCheck {
    /// Whether the evidence explicitly supports the triple
    pub valid: bool,

    /// Reported confidence, clamped to [0.0, 1.0]
    pub confidence: f64,
}

/// A subject-predicate-object assertion with provenance
///
/// Created from oracle output, refined by canonicalization, filtered by
/// deduplication and annotated by validation. Never mutated after it is
/// written to a final artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    /// Assigned after deduplication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TripleId>,

    /// Subject entity
    pub subject: EntityRef,

    /// Predicate token from the closed predicate set
    pub predicate: String,

    /// Object entity
    pub object: EntityRef,

    /// Confidence reported by the extraction oracle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Page/paragraph/sentence provenance
    #[serde(default)]
    pub metadata: Provenance,

    /// Source snippets
    #[serde(default, skip_serializing_if = "TripleContext::is_empty")]
    pub context: TripleContext,

    /// Support-check result, when that pass ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<SupportCheck>,

    /// Oracle object as received, kept when one of its fields did not
    /// have the expected JSON type
    ///
    /// Validators judge this form instead of the typed fields, so a
    /// string confidence or a bare-string entity is still reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Triple {
    /// Create a new triple with no provenance
    pub fn new(subject: EntityRef, predicate: impl Into<String>, object: EntityRef) -> Self {
        Self {
            id: None,
            subject,
            predicate: predicate.into(),
            object,
            confidence: None,
            metadata: Provenance::default(),
            context: TripleContext::default(),
            validation: None,
            raw: None,
        }
    }

    /// Set the oracle confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the provenance
    pub fn with_metadata(mut self, metadata: Provenance) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the source snippets
    pub fn with_context(mut self, context: TripleContext) -> Self {
        self.context = context;
        self
    }

    /// One-line rendering used in prompts and logs
    pub fn display_line(&self) -> String {
        format!(
            "(\"{}\"[{}] {} \"{}\"[{}])",
            self.subject.name,
            self.subject.entity_type,
            self.predicate,
            self.object.name,
            self.object.entity_type
        )
    }
}

//! Per-paragraph top-K selection

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use ctigraph_domain::{Canonicalizer, ParagraphDocument, Triple};
use ctigraph_gatekeeper::Gatekeeper;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Ranking key: typed sides, reported confidence, combined name length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionScore {
    /// Non-empty `type` fields across subject and object (0..=2)
    pub type_bonus: usize,
    /// Reported confidence, 0 when absent
    pub confidence: f64,
    /// Characters in both entity names
    pub name_length: usize,
}

impl SelectionScore {
    /// Score a candidate
    pub fn of(triple: &Triple) -> Self {
        let type_bonus = [&triple.subject, &triple.object]
            .iter()
            .filter(|e| !e.entity_type.is_empty())
            .count();
        Self {
            type_bonus,
            confidence: triple.confidence.unwrap_or(0.0),
            name_length: triple.subject.name.chars().count() + triple.object.name.chars().count(),
        }
    }

    fn rank(&self, other: &Self) -> Ordering {
        self.type_bonus
            .cmp(&other.type_bonus)
            .then_with(|| self.confidence.total_cmp(&other.confidence))
            .then_with(|| self.name_length.cmp(&other.name_length))
    }
}

/// Keeps the best few triples per paragraph
#[derive(Debug, Clone)]
pub struct PerUnitSelector {
    per_unit_max: usize,
    context_max_chars: usize,
    canonicalizer: Canonicalizer,
}

impl PerUnitSelector {
    /// Create a selector from `config`
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            per_unit_max: config.per_unit_max,
            context_max_chars: config.context_max_chars,
            canonicalizer: Canonicalizer::new(config.max_name_chars),
        }
    }

    /// Override the per-paragraph cap
    pub fn with_per_unit_max(mut self, per_unit_max: usize) -> Self {
        self.per_unit_max = per_unit_max;
        self
    }

    /// Override the snippet cap
    pub fn with_context_max_chars(mut self, context_max_chars: usize) -> Self {
        self.context_max_chars = context_max_chars;
        self
    }

    /// Top candidates for one paragraph, best first
    ///
    /// Equal scores keep their input order. Each selected triple gets the
    /// paragraph snippet as context.
    pub fn select(&self, mut candidates: Vec<Triple>, paragraph_text: &str) -> Vec<Triple> {
        candidates.sort_by(|a, b| SelectionScore::of(b).rank(&SelectionScore::of(a)));
        candidates.truncate(self.per_unit_max);

        let ctx = snippet(paragraph_text, self.context_max_chars);
        for triple in &mut candidates {
            triple.context.paragraph = Some(ctx.clone());
        }
        candidates
    }

    /// Select over a whole document
    ///
    /// Candidates are canonicalized and must pass the gatekeeper. They are
    /// joined to paragraphs on the exact `paragraph_id`; output follows
    /// document order.
    pub fn select_document(
        &self,
        doc: &ParagraphDocument,
        triples: Vec<Triple>,
        gatekeeper: &Gatekeeper<'_>,
    ) -> Result<Vec<Triple>, ExtractorError> {
        let mut by_paragraph: HashMap<String, Vec<Triple>> = HashMap::new();
        let mut rejected = 0;
        let mut unplaced = 0;

        for triple in triples {
            let triple = self.canonicalizer.canonicalize(triple);
            let verdict = gatekeeper.validate_triple(&triple)?;
            if !verdict.is_valid() {
                debug!("Skipping {}: {:?}", triple.display_line(), verdict.reason_codes());
                rejected += 1;
                continue;
            }
            match triple.metadata.paragraph_id.clone() {
                Some(pid) => by_paragraph.entry(pid).or_default().push(triple),
                None => unplaced += 1,
            }
        }

        let mut selected = Vec::new();
        for para in doc.paragraphs() {
            if let Some(candidates) = by_paragraph.remove(&para.chunk.id) {
                selected.extend(self.select(candidates, &para.chunk.text));
            }
        }
        unplaced += by_paragraph.values().map(Vec::len).sum::<usize>();

        if unplaced > 0 {
            warn!("{} triples did not match any paragraph id", unplaced);
        }
        info!(
            "Selected {} triples ({} failed validation)",
            selected.len(),
            rejected
        );
        Ok(selected)
    }
}

/// First `max_chars` characters of `text`, with `...` when cut
///
/// A cap of 0 returns the text unchanged.
pub fn snippet(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

//! Triple canonicalization and canonical keys

use crate::triple::{EntityRef, Triple};

/// Default cap on entity name length, in characters
pub const DEFAULT_MAX_NAME_CHARS: usize = 200;

/// Which fields take part in a canonical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Semantic fields plus page, paragraph and sentence id
    ProvenanceAware,
    /// Semantic fields only; used when merging across windows
    SemanticOnly,
}

/// Normalized tuple used to detect duplicate triples
///
/// Names are compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleKey {
    subject_name: String,
    subject_type: String,
    predicate: String,
    object_name: String,
    object_type: String,
    provenance: Option<(Option<u32>, Option<String>, Option<String>)>,
}

impl TripleKey {
    /// Compute the key of a triple, normalizing it on the fly
    pub fn of(triple: &Triple, mode: KeyMode) -> Self {
        let provenance = match mode {
            KeyMode::ProvenanceAware => Some((
                triple.metadata.page,
                triple.metadata.paragraph_id.clone(),
                triple.metadata.sentence_id.clone(),
            )),
            KeyMode::SemanticOnly => None,
        };
        Self {
            subject_name: collapse_whitespace(&triple.subject.name),
            subject_type: triple.subject.entity_type.trim().to_string(),
            predicate: normalize_predicate(&triple.predicate),
            object_name: collapse_whitespace(&triple.object.name),
            object_type: triple.object.entity_type.trim().to_string(),
            provenance,
        }
    }
}

/// Normalizes raw triples into comparable form
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    max_name_chars: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAME_CHARS)
    }
}

impl Canonicalizer {
    /// Create a canonicalizer with the given name cap
    pub fn new(max_name_chars: usize) -> Self {
        Self { max_name_chars }
    }

    /// Normalize names and predicate; types are left as declared
    pub fn canonicalize(&self, mut triple: Triple) -> Triple {
        self.normalize_entity(&mut triple.subject);
        self.normalize_entity(&mut triple.object);
        triple.predicate = normalize_predicate(&triple.predicate);
        triple
    }

    /// Normalized entity name
    pub fn name(&self, raw: &str) -> String {
        let capped: String = collapse_whitespace(raw)
            .chars()
            .take(self.max_name_chars)
            .collect();
        capped.trim_end().to_string()
    }

    fn normalize_entity(&self, entity: &mut EntityRef) {
        entity.name = self.name(&entity.name);
        entity.entity_type = entity.entity_type.trim().to_string();
    }
}

/// Trim and collapse internal whitespace runs to one space
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-fold for caseless comparison
///
/// Lowercases per character, then expands the full folds that lowercasing
/// leaves alone: `ß` to `ss`, final sigma, long s and Latin ligatures.
pub fn casefold(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            'ß' => folded.push_str("ss"),
            'ς' => folded.push('σ'),
            'ſ' => folded.push('s'),
            'ﬀ' => folded.push_str("ff"),
            'ﬁ' => folded.push_str("fi"),
            'ﬂ' => folded.push_str("fl"),
            'ﬃ' => folded.push_str("ffi"),
            'ﬄ' => folded.push_str("ffl"),
            'ﬅ' | 'ﬆ' => folded.push_str("st"),
            c => folded.push(c),
        }
    }
    folded
}

/// Lowercase a predicate and turn `-` and whitespace into `_`
pub fn normalize_predicate(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::Provenance;
    use proptest::prelude::*;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(
            EntityRef::new(s, "threat-actor"),
            p,
            EntityRef::new(o, "malware"),
        )
    }

    #[test]
    fn test_casefold_expands_full_folds() {
        assert_eq!(casefold("Straße"), casefold("STRASSE"));
        assert_eq!(casefold("Grüße"), "grüsse");
        assert_eq!(casefold("ΟΔΟΣ"), casefold("οδος"));
        assert_eq!(casefold("Oﬃce"), "office");
        assert_eq!(casefold("APT28"), "apt28");
    }

    #[test]
    fn test_predicate_normalization() {
        assert_eq!(normalize_predicate("  Uses-Technique "), "uses_technique");
        assert_eq!(normalize_predicate("communicates with"), "communicates_with");
        assert_eq!(normalize_predicate("attributed_to"), "attributed_to");
    }

    #[test]
    fn test_types_are_not_lowercased() {
        let mut t = triple("APT28", "uses", "X-Agent");
        t.subject.entity_type = " Threat-Actor ".to_string();
        let t = Canonicalizer::default().canonicalize(t);
        assert_eq!(t.subject.entity_type, "Threat-Actor");
    }

    #[test]
    fn test_name_is_capped() {
        let c = Canonicalizer::new(5);
        assert_eq!(c.name("  Cobalt   Strike "), "Cobal");
    }

    #[test]
    fn test_provenance_changes_only_the_aware_key() {
        let a = triple("APT28", "uses", "X-Agent")
            .with_metadata(Provenance::paragraph(Some(1), "Page 1 - Chunk 0"));
        let b = triple("APT28", "uses", "X-Agent")
            .with_metadata(Provenance::paragraph(Some(2), "Page 2 - Chunk 3"));
        assert_ne!(
            TripleKey::of(&a, KeyMode::ProvenanceAware),
            TripleKey::of(&b, KeyMode::ProvenanceAware)
        );
        assert_eq!(
            TripleKey::of(&a, KeyMode::SemanticOnly),
            TripleKey::of(&b, KeyMode::SemanticOnly)
        );
    }

    #[test]
    fn test_keys_are_case_sensitive_on_names() {
        // Entity-label merging casefolds; triple keys do not.
        let a = triple("APT28", "uses", "X-Agent");
        let b = triple("apt28", "uses", "X-Agent");
        assert_ne!(
            TripleKey::of(&a, KeyMode::SemanticOnly),
            TripleKey::of(&b, KeyMode::SemanticOnly)
        );
    }

    proptest! {
        #[test]
        fn prop_whitespace_padding_does_not_change_key(
            name in "[A-Za-z0-9]{1,12}( [A-Za-z0-9]{1,12}){0,3}",
            left in "[ \t]{0,4}",
            right in "[ \t\n]{0,4}",
        ) {
            let plain = triple(&name, "uses", "PlugX");
            let padded = triple(&format!("{}{}{}", left, name, right), "uses", "PlugX");
            for mode in [KeyMode::ProvenanceAware, KeyMode::SemanticOnly] {
                prop_assert_eq!(TripleKey::of(&plain, mode), TripleKey::of(&padded, mode));
            }
        }

        #[test]
        fn prop_canonicalize_is_idempotent(
            name in "[ A-Za-z-]{0,40}",
            pred in "[ A-Za-z_-]{1,20}",
        ) {
            let c = Canonicalizer::default();
            let once = c.canonicalize(triple(&name, &pred, "Emotet"));
            let twice = c.canonicalize(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}

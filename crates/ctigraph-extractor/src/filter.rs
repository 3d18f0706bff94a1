//! Segment filter and the prefilter batch
//!
//! Decides which sentences are worth a completion call: long enough, and
//! mentioning something the ontology can hold (a relevant tagger span or
//! a lexical indicator).

use crate::config::ExtractorConfig;
use crate::indicators::extract_indicators;
use crate::prompt::{PromptBuilder, UnitKind};
use crate::types::{FilteredSentence, Mention, PrefilterOutput, PromptRecord};
use ctigraph_domain::{casefold, LinguisticTagger, ParagraphDocument, TaggedSpan, VERB_LABEL};
use std::collections::HashSet;
use tracing::{debug, info};

/// Tagger labels that map onto ontology types
pub const ONTOLOGY_RELEVANT_LABELS: &[&str] = &["ORG", "PRODUCT", "GPE", "DATE", "FAC", "LOC"];

/// Keep/drop verdict with the entities that justified it
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDecision {
    /// Whether the segment goes on to extraction
    pub keep: bool,
    /// Relevant spans unioned with indicators
    pub entities: Vec<Mention>,
}

/// Keep/drop predicate over text segments
pub struct SegmentFilter<T> {
    tagger: T,
    min_chars: usize,
    require_verb: bool,
    relevant_labels: HashSet<String>,
}

impl<T: LinguisticTagger> SegmentFilter<T> {
    /// Create a filter using the thresholds in `config`
    pub fn new(tagger: T, config: &ExtractorConfig) -> Self {
        Self {
            tagger,
            min_chars: config.min_segment_chars,
            require_verb: config.require_verb,
            relevant_labels: ONTOLOGY_RELEVANT_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }

    /// Replace the set of ontology-relevant tagger labels
    pub fn with_relevant_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevant_labels = labels
            .into_iter()
            .map(|l| l.into().to_uppercase())
            .collect();
        self
    }

    /// Tag `text` and decide
    pub fn evaluate(&self, text: &str) -> SegmentDecision {
        let spans = self.tagger.tag(text);
        self.evaluate_tagged(text, &spans)
    }

    /// Decide using spans the caller already has
    pub fn evaluate_tagged(&self, text: &str, spans: &[TaggedSpan]) -> SegmentDecision {
        let relevant: Vec<&TaggedSpan> = spans
            .iter()
            .filter(|s| self.relevant_labels.contains(&s.label.to_uppercase()))
            .collect();
        let indicators = extract_indicators(text);
        let entities = merge_entities(&relevant, &indicators);

        if text.chars().count() < self.min_chars {
            return SegmentDecision { keep: false, entities };
        }
        if self.require_verb && !spans.iter().any(|s| s.label == VERB_LABEL) {
            return SegmentDecision { keep: false, entities };
        }

        let keep = !relevant.is_empty() || !indicators.is_empty();
        SegmentDecision { keep, entities }
    }
}

/// Union relevant spans and indicators, first occurrence per
/// `(label, casefolded text)` wins
pub fn merge_entities(spans: &[&TaggedSpan], indicators: &[Mention]) -> Vec<Mention> {
    let mut seen = HashSet::new();
    let candidates = spans
        .iter()
        .map(|s| Mention::new(s.text.clone(), s.label.to_uppercase()))
        .chain(indicators.iter().cloned());

    let mut merged = Vec::new();
    for mention in candidates {
        if seen.insert((mention.label.clone(), casefold(&mention.text))) {
            merged.push(mention);
        }
    }
    merged
}

/// Run the filter over every sentence of `doc` and render one sentence
/// prompt per kept sentence
pub fn prefilter<T: LinguisticTagger>(
    doc: &ParagraphDocument,
    filter: &SegmentFilter<T>,
    prompts: &PromptBuilder<'_>,
) -> PrefilterOutput {
    let mut output = PrefilterOutput::default();
    let mut seen = 0usize;

    for unit in doc.sentence_units() {
        seen += 1;
        let decision = filter.evaluate(&unit.text);
        if !decision.keep {
            debug!("Dropped {}", unit.sentence_id);
            continue;
        }

        let paragraph = doc
            .paragraph(&unit.paragraph_id)
            .map(|p| p.chunk.text.clone());

        output.inputs.push(PromptRecord {
            page: unit.page,
            paragraph_id: Some(unit.paragraph_id.clone()),
            sentence_id: Some(unit.sentence_id.clone()),
            prompt: prompts.build(UnitKind::Sentence, &unit.text),
            sentence: Some(unit.text.clone()),
            paragraph,
        });
        output.sentences.push(FilteredSentence {
            page: unit.page,
            paragraph_id: unit.paragraph_id,
            sentence_id: unit.sentence_id,
            text: unit.text,
            entities: decision.entities,
        });
    }

    info!(
        "Prefilter kept {} of {} sentences from {}",
        output.sentences.len(),
        seen,
        doc.source
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::RuleTagger;
    use ctigraph_domain::Ontology;

    struct FixedTagger(Vec<TaggedSpan>);

    impl LinguisticTagger for FixedTagger {
        fn tag(&self, _text: &str) -> Vec<TaggedSpan> {
            self.0.clone()
        }
    }

    fn filter_with(spans: Vec<TaggedSpan>) -> SegmentFilter<FixedTagger> {
        SegmentFilter::new(FixedTagger(spans), &ExtractorConfig::default())
    }

    #[test]
    fn test_short_segment_is_dropped() {
        let filter = filter_with(vec![TaggedSpan::new("Acme", "ORG")]);
        assert!(!filter.evaluate("Acme got hit.").keep);
    }

    #[test]
    fn test_relevant_span_keeps_segment() {
        let filter = filter_with(vec![TaggedSpan::new("Acme Corp", "ORG")]);
        let decision = filter.evaluate("Acme Corp disclosed an incident last week.");
        assert!(decision.keep);
        assert_eq!(decision.entities, vec![Mention::new("Acme Corp", "ORG")]);
    }

    #[test]
    fn test_irrelevant_labels_do_not_keep() {
        let filter = filter_with(vec![TaggedSpan::new("Alice", "PERSON")]);
        let decision = filter.evaluate("Alice wrote a long report about nothing.");
        assert!(!decision.keep);
        assert!(decision.entities.is_empty());
    }

    #[test]
    fn test_indicator_alone_keeps_segment() {
        let filter = filter_with(Vec::new());
        let decision = filter.evaluate("Beacons were sent to 203.0.113.7 every hour.");
        assert!(decision.keep);
        assert_eq!(decision.entities, vec![Mention::new("203.0.113.7", "IPv4")]);
    }

    #[test]
    fn test_verb_requirement() {
        let mut config = ExtractorConfig::default();
        config.require_verb = true;
        let no_verb = SegmentFilter::new(FixedTagger(vec![TaggedSpan::new("Acme Corp", "ORG")]), &config);
        assert!(!no_verb.evaluate("Acme Corp quarterly summary, page two").keep);

        let with_verb = SegmentFilter::new(
            FixedTagger(vec![
                TaggedSpan::new("Acme Corp", "ORG"),
                TaggedSpan::new("patched", VERB_LABEL),
            ]),
            &config,
        );
        assert!(with_verb.evaluate("Acme Corp patched the exposed servers").keep);
    }

    #[test]
    fn test_custom_relevant_labels() {
        let filter = filter_with(vec![TaggedSpan::new("APT28", "THREAT_ACTOR")]);
        assert!(!filter.evaluate("APT28 was active again this spring.").keep);

        let filter = filter_with(vec![TaggedSpan::new("APT28", "THREAT_ACTOR")])
            .with_relevant_labels(["threat_actor"]);
        assert!(filter.evaluate("APT28 was active again this spring.").keep);
    }

    // Entity merging casefolds; triple keys do not.
    #[test]
    fn test_merge_is_casefolded_and_first_wins() {
        let a = TaggedSpan::new("Acme", "org");
        let b = TaggedSpan::new("ACME", "ORG");
        let merged = merge_entities(&[&a, &b], &[Mention::new("acme.com", "DOMAIN")]);
        assert_eq!(
            merged,
            vec![Mention::new("Acme", "ORG"), Mention::new("acme.com", "DOMAIN")]
        );
    }

    #[test]
    fn test_merge_folds_beyond_lowercase() {
        let a = TaggedSpan::new("Hauptstraße", "LOC");
        let b = TaggedSpan::new("HAUPTSTRASSE", "LOC");
        let merged = merge_entities(&[&a, &b], &[]);
        assert_eq!(merged, vec![Mention::new("Hauptstraße", "LOC")]);
    }

    #[test]
    fn test_prefilter_builds_records() {
        let doc = ParagraphDocument::from_plain_text(
            "report.txt",
            "Emotet spread via malicious attachments. It contacted update.example.com in March 2023.\n\nshort one.",
        );
        let ontology = Ontology::stix();
        let filter = SegmentFilter::new(RuleTagger::new(), &ExtractorConfig::default());
        let out = prefilter(&doc, &filter, &PromptBuilder::new(&ontology));

        assert_eq!(out.sentences.len(), 1);
        assert_eq!(out.inputs.len(), 1);
        let kept = &out.sentences[0];
        assert_eq!(kept.sentence_id, "Page 1 - Chunk 0-s1");
        assert!(kept.entities.iter().any(|m| m.label == "DOMAIN"));
        assert!(kept.entities.iter().any(|m| m.label == "DATE"));

        let record = &out.inputs[0];
        assert_eq!(record.paragraph_id.as_deref(), Some("Page 1 - Chunk 0"));
        assert!(record.prompt.contains("Sentence:\nIt contacted update.example.com in March 2023."));
        assert!(record.paragraph.as_deref().unwrap().starts_with("Emotet spread"));
    }
}

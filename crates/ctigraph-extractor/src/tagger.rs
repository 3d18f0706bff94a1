//! Rule-based linguistic tagger
//!
//! A small dictionary-and-pattern tagger so the pipeline can run without an
//! NLP service, tuned for threat-report prose.
//!
//! Known actors, malware and products come from a gazetteer. Organisations
//! are found by their legal or institutional suffix, dates by month names
//! and ISO forms, and countries from a fixed list. Verbs come from a short
//! lexicon plus an `-ed` heuristic.

use ctigraph_domain::{LinguisticTagger, TaggedSpan, VERB_LABEL};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

const GAZETTEER: &[(&str, &str)] = &[
    ("APT28", "THREAT_ACTOR"),
    ("Fancy Bear", "THREAT_ACTOR"),
    ("APT29", "THREAT_ACTOR"),
    ("Cozy Bear", "THREAT_ACTOR"),
    ("Emotet", "MALWARE"),
    ("PlugX", "MALWARE"),
    ("Cobalt Strike", "MALWARE"),
    ("RouterOS", "PRODUCT"),
    ("Microsoft Windows", "PRODUCT"),
    ("Exchange Server", "PRODUCT"),
];

const COUNTRIES: &[&str] = &[
    "Afghanistan", "Australia", "Belarus", "Brazil", "Canada", "China", "Estonia",
    "France", "Georgia", "Germany", "India", "Iran", "Iraq", "Israel", "Italy", "Japan",
    "Kazakhstan", "Latvia", "Lithuania", "Netherlands", "North Korea", "Pakistan",
    "Poland", "Russia", "Saudi Arabia", "Singapore", "South Korea", "Spain", "Syria",
    "Taiwan", "Turkey", "Ukraine", "United Arab Emirates", "United Kingdom",
    "United States", "Vietnam",
];

const VERBS: &[&str] = &[
    "is", "are", "was", "were", "uses", "use", "used", "targets", "target", "exploits",
    "exploit", "deploys", "deploy", "drops", "drop", "delivers", "deliver", "hosts",
    "communicates", "connects", "downloads", "executes", "installs", "leverages",
    "sends", "steals", "spreads", "affects", "attributed", "observed", "linked",
    "compromised", "abuses", "runs", "creates", "contains", "resolves", "impersonates",
];

static GAZETTEER_RE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive_alternation(GAZETTEER.iter().map(|(phrase, _)| *phrase))
});

static COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive_alternation(COUNTRIES.iter().copied()));

static VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    let lexicon = VERBS.iter().map(|v| regex::escape(v)).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&format!(r"\b(?:{}|[a-z]{{3,}}ed)\b", lexicon))
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

static ORG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z][\w&-]*\s+){1,3}(?:Inc|Corp|Corporation|Ltd|LLC|GmbH|Group|Agency|Ministry|University|Bank|Labs|Foundation|Institute|Company)\b\.?",
    )
    .expect("valid regex")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:January|February|March|April|May|June|July|August|September|October|November|December)(?:\s+\d{1,2},?)?(?:\s+\d{4})?|\d{4}-\d{2}-\d{2}|(?:19|20)\d{2})\b",
    )
    .expect("valid regex")
});

fn case_insensitive_alternation<'a>(words: impl Iterator<Item = &'a str>) -> Regex {
    let alternation = words.map(regex::escape).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

/// Gazetteer and pattern tagger
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTagger;

impl RuleTagger {
    /// Create a tagger
    pub fn new() -> Self {
        Self
    }

    fn gazetteer_label(matched: &str) -> &'static str {
        GAZETTEER
            .iter()
            .find(|(phrase, _)| phrase.eq_ignore_ascii_case(matched))
            .map(|(_, label)| *label)
            .unwrap_or("PRODUCT")
    }
}

impl LinguisticTagger for RuleTagger {
    fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        let mut spans = Vec::new();

        for m in GAZETTEER_RE.find_iter(text) {
            let label = Self::gazetteer_label(m.as_str());
            spans.push(TaggedSpan::new(m.as_str(), label).at(m.start(), m.end()));
        }
        for m in ORG_RE.find_iter(text) {
            spans.push(TaggedSpan::new(m.as_str(), "ORG").at(m.start(), m.end()));
        }
        for m in DATE_RE.find_iter(text) {
            spans.push(TaggedSpan::new(m.as_str(), "DATE").at(m.start(), m.end()));
        }
        for m in COUNTRY_RE.find_iter(text) {
            spans.push(TaggedSpan::new(m.as_str(), "GPE").at(m.start(), m.end()));
        }
        for m in VERB_RE.find_iter(text) {
            spans.push(TaggedSpan::new(m.as_str(), VERB_LABEL).at(m.start(), m.end()));
        }

        spans.sort_by_key(|s| (s.start, s.end));
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_for(spans: &[TaggedSpan], text: &str) -> Vec<String> {
        spans
            .iter()
            .filter(|s| s.text == text)
            .map(|s| s.label.clone())
            .collect()
    }

    #[test]
    fn test_gazetteer_labels() {
        let spans = RuleTagger::new().tag("APT28 deployed Cobalt Strike against RouterOS devices");
        assert_eq!(labels_for(&spans, "APT28"), vec!["THREAT_ACTOR"]);
        assert_eq!(labels_for(&spans, "Cobalt Strike"), vec!["MALWARE"]);
        assert_eq!(labels_for(&spans, "RouterOS"), vec!["PRODUCT"]);
        assert_eq!(labels_for(&spans, "deployed"), vec![VERB_LABEL]);
    }

    #[test]
    fn test_org_date_and_country() {
        let spans = RuleTagger::new()
            .tag("Acme Security Group reported on March 3, 2023 that Ukraine was hit on 2023-02-28.");
        assert_eq!(labels_for(&spans, "Acme Security Group"), vec!["ORG"]);
        assert_eq!(labels_for(&spans, "March 3, 2023"), vec!["DATE"]);
        assert_eq!(labels_for(&spans, "2023-02-28"), vec!["DATE"]);
        assert_eq!(labels_for(&spans, "Ukraine"), vec!["GPE"]);
    }

    #[test]
    fn test_spans_are_ordered_and_offsets_match() {
        let text = "In 2021 Emotet targeted banks in Germany";
        let spans = RuleTagger::new().tag(text);
        let starts: Vec<_> = spans.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        for span in &spans {
            let (start, end) = (span.start.unwrap(), span.end.unwrap());
            assert_eq!(&text[start..end], span.text);
        }
    }

    #[test]
    fn test_plain_text_has_no_entities() {
        let spans = RuleTagger::new().tag("nothing of interest here");
        assert!(spans.iter().all(|s| s.label == VERB_LABEL));
    }
}

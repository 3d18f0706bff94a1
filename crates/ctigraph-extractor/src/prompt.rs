//! Prompt rendering for triple extraction and support checks

use ctigraph_domain::{Ontology, Triple};

/// Exact string the model is told to return when a unit holds no triples
pub const NO_TRIPLES_ESCAPE: &str = "No related entities and relations.";

/// Appended to a prompt for the single self-repair retry
pub const REPAIR_SUFFIX: &str =
    "\n\nYour previous output was not valid JSON. Return ONLY valid JSON.";

/// Instruction for the support-check pass
pub const SUPPORT_INSTRUCTIONS: &str = "Given a document and one triple, decide if the triple is explicitly supported (not implied). Return ONLY JSON: {\"valid\": true|false, \"confidence\": <0..1>}.";

/// Guardrails appended to every extraction prompt unless replaced
pub const DEFAULT_GUARDRAILS: &[&str] = &[
    "- Extract only relations explicitly stated in the document (no inference).",
    "- Keep entity names concise as they appear.",
    "- Ensure subject/object types match the allowed type rules.",
    "- If uncertain, skip the triple.",
];

const ROLE_LINE: &str =
    "You are a cybersecurity analyst. Extract subject-predicate-object triples.";

const OUTPUT_FORMAT: &str = r#"Return ONLY valid JSON:
[
  {
    "subject": {"name": "...", "type": "..."},
    "predicate": "...",
    "object": {"name": "...", "type": "..."},
    "confidence": 0.0
  }
]"#;

/// The kind of text unit a prompt wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A single filtered sentence
    Sentence,
    /// A paragraph chunk
    Paragraph,
    /// The whole document, single-shot
    Document,
    /// One window of a long document (zero-based index)
    Window {
        /// Window position
        index: usize,
        /// Number of windows
        total: usize,
    },
}

impl UnitKind {
    fn header(self) -> String {
        match self {
            UnitKind::Sentence => "Sentence".to_string(),
            UnitKind::Paragraph => "Paragraph".to_string(),
            UnitKind::Document => "Document".to_string(),
            UnitKind::Window { index, total } => {
                format!("Document window {}/{}", index + 1, total)
            }
        }
    }
}

/// Renders extraction prompts against a fixed ontology
///
/// Rendering is pure: the same unit and text always give the same prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'o> {
    ontology: &'o Ontology,
    rules: Vec<String>,
}

impl<'o> PromptBuilder<'o> {
    /// Create a builder with the default guardrails
    pub fn new(ontology: &'o Ontology) -> Self {
        Self {
            ontology,
            rules: DEFAULT_GUARDRAILS.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Replace the guardrail lines
    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Ontology the prompts are rendered against
    pub fn ontology(&self) -> &'o Ontology {
        self.ontology
    }

    /// Instruction block shared by every extraction prompt
    pub fn preamble(&self) -> String {
        let mut out = String::new();
        out.push_str(ROLE_LINE);
        out.push_str("\n\nRules:\n");
        out.push_str(&format!(
            "- Use only these entity types: [{}]\n",
            self.ontology.types().join(", ")
        ));
        out.push_str("- Use only these predicates and type rules:\n");
        for predicate in self.ontology.predicates() {
            out.push_str(&self.ontology.signature(predicate));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(OUTPUT_FORMAT);
        out.push_str(&format!(
            "\n\nIf none, return the JSON string \"{}\"",
            NO_TRIPLES_ESCAPE
        ));
        if !self.rules.is_empty() {
            out.push_str("\n\nWork strictly following the rules below:\n");
            out.push_str(&self.rules.join("\n"));
        }
        out
    }

    /// Render a prompt around `text`
    pub fn build(&self, unit: UnitKind, text: &str) -> String {
        format!(
            "{}\n\n{}:\n{}\n\nReturn JSON only.",
            self.preamble(),
            unit.header(),
            text
        )
    }

    /// Render a prompt, capping the embedded text at `max_chars` characters
    ///
    /// A cap of 0 disables truncation.
    pub fn build_with_budget(&self, unit: UnitKind, text: &str, max_chars: usize) -> String {
        if max_chars == 0 {
            return self.build(unit, text);
        }
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => self.build(unit, &text[..cut]),
            None => self.build(unit, text),
        }
    }
}

/// Prompt for the self-repair retry
pub fn repair(prompt: &str) -> String {
    format!("{}{}", prompt, REPAIR_SUFFIX)
}

/// Prompt asking whether `evidence` explicitly supports `triple`
pub fn support_prompt(evidence: &str, triple: &Triple) -> String {
    format!(
        "{}\n\nDocument:\n{}\n\nTriple:\n{}\n\nJSON only.",
        SUPPORT_INSTRUCTIONS,
        evidence,
        triple.display_line()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctigraph_domain::EntityRef;

    #[test]
    fn test_prompt_lists_schema_and_escape() {
        let ontology = Ontology::stix();
        let prompt = PromptBuilder::new(&ontology).build(UnitKind::Sentence, "APT28 uses X-Agent.");

        assert!(prompt.contains("threat-actor"));
        assert!(prompt.contains("uses(threat-actor|intrusion-set|campaign -> malware|tool"));
        assert!(prompt.contains("\"subject\": {\"name\": \"...\", \"type\": \"...\"}"));
        assert!(prompt.contains("No related entities and relations."));
        assert!(prompt.contains("If uncertain, skip the triple."));
        assert!(prompt.ends_with("Sentence:\nAPT28 uses X-Agent.\n\nReturn JSON only."));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let ontology = Ontology::stix();
        let builder = PromptBuilder::new(&ontology);
        assert_eq!(
            builder.build(UnitKind::Paragraph, "text"),
            builder.build(UnitKind::Paragraph, "text")
        );
    }

    #[test]
    fn test_window_header_is_one_based() {
        let ontology = Ontology::stix();
        let prompt = PromptBuilder::new(&ontology).build(UnitKind::Window { index: 0, total: 3 }, "w");
        assert!(prompt.contains("Document window 1/3:\nw"));
    }

    #[test]
    fn test_budget_truncates_on_char_boundary() {
        let ontology = Ontology::stix();
        let builder = PromptBuilder::new(&ontology);
        let prompt = builder.build_with_budget(UnitKind::Document, "ééééé", 3);
        assert!(prompt.contains("Document:\nééé\n\n"));
        assert_eq!(
            builder.build_with_budget(UnitKind::Document, "abc", 0),
            builder.build(UnitKind::Document, "abc")
        );
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        let ontology = Ontology::stix();
        let prompt = PromptBuilder::new(&ontology)
            .with_rules(["- Only report malware."])
            .build(UnitKind::Document, "doc");
        assert!(prompt.contains("- Only report malware."));
        assert!(!prompt.contains("If uncertain, skip the triple."));
    }

    #[test]
    fn test_repair_and_support_prompts() {
        assert!(repair("p").ends_with("Return ONLY valid JSON."));
        let triple = Triple::new(
            EntityRef::new("APT28", "threat-actor"),
            "uses",
            EntityRef::new("X-Agent", "malware"),
        );
        let prompt = support_prompt("APT28 uses X-Agent.", &triple);
        assert!(prompt.starts_with(SUPPORT_INSTRUCTIONS));
        assert!(prompt.contains("Triple:\n(\"APT28\"[threat-actor] uses \"X-Agent\"[malware])"));
    }
}

//! Closed ontology: entity types, predicates and domain/range rules
//!
//! The ontology is immutable configuration data. A process installs it once
//! at start-up (or falls back to the built-in STIX 2.1 vocabulary) and every
//! component reads the same `&'static Ontology` afterwards.

use crate::error::OntologyError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

static ONTOLOGY: OnceLock<Ontology> = OnceLock::new();

/// Allowed subject/object types for one predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateRule {
    subject_types: Vec<String>,
    object_types: Vec<String>,
}

impl PredicateRule {
    /// Create a rule from the allowed subject and object types
    pub fn new<S: Into<String>>(
        subject_types: impl IntoIterator<Item = S>,
        object_types: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            subject_types: subject_types.into_iter().map(Into::into).collect(),
            object_types: object_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Allowed subject types, in declaration order
    pub fn subject_types(&self) -> &[String] {
        &self.subject_types
    }

    /// Allowed object types, in declaration order
    pub fn object_types(&self) -> &[String] {
        &self.object_types
    }

    /// Check a subject type against the rule
    pub fn allows_subject(&self, entity_type: &str) -> bool {
        self.subject_types.iter().any(|t| t == entity_type)
    }

    /// Check an object type against the rule
    pub fn allows_object(&self, entity_type: &str) -> bool {
        self.object_types.iter().any(|t| t == entity_type)
    }
}

/// The closed type/predicate vocabulary triples must conform to
#[derive(Debug, Clone)]
pub struct Ontology {
    types: Vec<String>,
    predicates: Vec<String>,
    rules: HashMap<String, PredicateRule>,
    type_set: HashSet<String>,
    predicate_set: HashSet<String>,
}

impl Ontology {
    /// Build an ontology
    ///
    /// Predicates without a rule are unconstrained. Duplicate or empty
    /// names are rejected.
    pub fn new(
        types: Vec<String>,
        predicates: Vec<(String, Option<PredicateRule>)>,
    ) -> Result<Self, OntologyError> {
        if types.is_empty() {
            return Err(OntologyError::Invalid("no entity types declared".to_string()));
        }
        if predicates.is_empty() {
            return Err(OntologyError::Invalid("no predicates declared".to_string()));
        }

        let mut type_set = HashSet::new();
        for t in &types {
            if t.trim().is_empty() {
                return Err(OntologyError::Invalid("empty entity type".to_string()));
            }
            if !type_set.insert(t.clone()) {
                return Err(OntologyError::Invalid(format!("duplicate entity type '{}'", t)));
            }
        }

        let mut names = Vec::with_capacity(predicates.len());
        let mut predicate_set = HashSet::new();
        let mut rules = HashMap::new();
        for (name, rule) in predicates {
            if name.trim().is_empty() {
                return Err(OntologyError::Invalid("empty predicate".to_string()));
            }
            if !predicate_set.insert(name.clone()) {
                return Err(OntologyError::Invalid(format!("duplicate predicate '{}'", name)));
            }
            if let Some(rule) = rule {
                rules.insert(name.clone(), rule);
            }
            names.push(name);
        }

        Ok(Self {
            types,
            predicates: names,
            rules,
            type_set,
            predicate_set,
        })
    }

    /// Parse an ontology from TOML
    ///
    /// ```toml
    /// types = ["threat-actor", "malware"]
    ///
    /// [[predicates]]
    /// name = "uses"
    /// subjects = ["threat-actor"]
    /// objects = ["malware"]
    ///
    /// [[predicates]]
    /// name = "related_to"
    /// ```
    pub fn from_toml_str(toml_str: &str) -> Result<Self, OntologyError> {
        let file: OntologyFile = toml::from_str(toml_str)?;
        let predicates = file
            .predicates
            .into_iter()
            .map(|p| {
                let rule = match (p.subjects, p.objects) {
                    (Some(s), Some(o)) => Some(PredicateRule::new(s, o)),
                    (None, None) => None,
                    _ => {
                        return Err(OntologyError::Invalid(format!(
                            "predicate '{}' must declare both subjects and objects, or neither",
                            p.name
                        )))
                    }
                };
                Ok((p.name, rule))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(file.types, predicates)
    }

    /// The built-in STIX 2.1 derived vocabulary
    pub fn stix() -> Self {
        let predicates = STIX_PREDICATES
            .iter()
            .map(|name| {
                let rule = STIX_RULES
                    .iter()
                    .find(|(pred, _, _)| pred == name)
                    .map(|(_, subjects, objects)| {
                        PredicateRule::new(subjects.iter().copied(), objects.iter().copied())
                    });
                (name.to_string(), rule)
            })
            .collect();
        let types = STIX_TYPES.iter().map(|t| t.to_string()).collect();
        Self::new(types, predicates).expect("built-in ontology is well formed")
    }

    /// Entity types, in declaration order
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Predicates, in declaration order
    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    /// Check type membership (exact match)
    pub fn is_type(&self, entity_type: &str) -> bool {
        self.type_set.contains(entity_type)
    }

    /// Check predicate membership (exact match)
    pub fn is_predicate(&self, predicate: &str) -> bool {
        self.predicate_set.contains(predicate)
    }

    /// Domain/range rule of a predicate, if it declares one
    pub fn rule(&self, predicate: &str) -> Option<&PredicateRule> {
        self.rules.get(predicate)
    }

    /// Render `name(subject|types -> object|types)`; unconstrained
    /// predicates render as `name(any -> any)`
    pub fn signature(&self, predicate: &str) -> String {
        match self.rule(predicate) {
            Some(rule) => format!(
                "{}({} -> {})",
                predicate,
                rule.subject_types.join("|"),
                rule.object_types.join("|")
            ),
            None => format!("{}(any -> any)", predicate),
        }
    }
}

/// Install the process-wide ontology
///
/// May be called at most once, before the first call to [`global`].
pub fn install(ontology: Ontology) -> Result<&'static Ontology, OntologyError> {
    ONTOLOGY
        .set(ontology)
        .map_err(|_| OntologyError::AlreadyInstalled)?;
    Ok(global())
}

/// The process-wide ontology, defaulting to [`Ontology::stix`]
pub fn global() -> &'static Ontology {
    ONTOLOGY.get_or_init(Ontology::stix)
}

#[derive(Deserialize)]
struct OntologyFile {
    types: Vec<String>,
    #[serde(default)]
    predicates: Vec<PredicateEntry>,
}

#[derive(Deserialize)]
struct PredicateEntry {
    name: String,
    subjects: Option<Vec<String>>,
    objects: Option<Vec<String>>,
}

const STIX_TYPES: &[&str] = &[
    "threat-actor", "intrusion-set", "campaign", "malware", "tool", "infrastructure",
    "attack-pattern", "course-of-action", "indicator", "vulnerability", "software", "product",
    "organization", "identity", "sector", "country", "location", "city", "ipv4-addr",
    "ipv6-addr", "domain-name", "url", "file", "email-addr", "observed-data", "report",
    "sighting", "x-mitre-data-source", "x-mitre-data-component", "observable", "user-account",
    "directory", "autonomous-system", "date", "malware-analysis",
];

const STIX_PREDICATES: &[&str] = &[
    "uses", "targets", "attributed_to", "exploits", "affects", "mitigates", "indicates",
    "detects", "based_on", "derived_from", "observed_in", "communicates_with", "hosts",
    "delivers", "drops", "located_at", "uses_technique", "subtechnique_of", "revoked_by",
    "duplicate_of", "originates_from", "impacts", "resolves_to", "downloads_from", "writes_to",
    "reads_from", "emails_to", "observed_on", "analysis_of", "characterizes", "sighting_of",
    "sighted_at", "sighted_by", "variant_of",
];

type RuleRow = (&'static str, &'static [&'static str], &'static [&'static str]);

const STIX_RULES: &[RuleRow] = &[
    ("uses", &["threat-actor", "intrusion-set", "campaign"], &["malware", "tool", "infrastructure", "attack-pattern"]),
    ("targets", &["threat-actor", "intrusion-set", "campaign", "malware", "attack-pattern"], &["identity", "organization", "sector", "location", "country"]),
    ("attributed_to", &["campaign", "intrusion-set"], &["threat-actor"]),
    ("exploits", &["threat-actor", "malware", "tool"], &["vulnerability"]),
    ("affects", &["software", "product", "tool", "malware"], &["vulnerability"]),
    ("mitigates", &["course-of-action", "software", "organization", "product"], &["vulnerability", "malware", "attack-pattern"]),
    ("uses_technique", &["threat-actor", "malware", "tool", "campaign"], &["attack-pattern"]),
    ("originates_from", &["threat-actor", "intrusion-set"], &["location", "country"]),
    ("based_on", &["indicator"], &["file", "url", "domain-name", "ipv4-addr", "ipv6-addr", "email-addr", "observable", "artifact"]),
    ("derived_from", &["indicator"], &["report", "observed-data", "artifact", "log"]),
    ("detects", &["indicator", "tool", "x-mitre-data-source"], &["malware", "attack-pattern", "campaign", "intrusion-set", "infrastructure", "tool", "vulnerability"]),
    ("indicates", &["indicator"], &["malware", "campaign", "intrusion-set", "tool", "infrastructure", "attack-pattern", "vulnerability", "organization", "sector", "location"]),
    ("resolves_to", &["domain-name"], &["ipv4-addr", "ipv6-addr"]),
    ("hosts", &["infrastructure"], &["domain-name", "ipv4-addr", "ipv6-addr", "url", "file"]),
    ("delivers", &["infrastructure", "malware", "tool"], &["malware", "tool", "file", "url"]),
    ("drops", &["malware", "tool"], &["malware", "tool", "file"]),
    ("located_at", &["infrastructure", "organization", "identity"], &["location", "country", "city"]),
    ("observed_on", &["threat-actor", "malware", "tool", "infrastructure", "indicator", "attack-pattern"], &["date"]),
    ("impacts", &["threat-actor", "malware", "attack-pattern"], &["identity", "organization", "sector"]),
    ("communicates_with", &["infrastructure", "malware", "tool"], &["ipv4-addr", "ipv6-addr", "domain-name", "url"]),
    ("subtechnique_of", &["attack-pattern"], &["attack-pattern"]),
    ("variant_of", &["malware", "tool", "indicator", "attack-pattern"], &["malware", "tool", "indicator", "attack-pattern"]),
];

//! Triple validation logic

use crate::report::{InvalidTriple, Partition};
use crate::{GatekeeperError, ValidationConfig};
use ctigraph_domain::{ontology, Ontology, Triple};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Result of triple validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the triple passed validation
    pub status: ValidationStatus,

    /// Every reason that applied, in check order
    pub reasons: Vec<RejectionReason>,
}

impl ValidationResult {
    /// True when no reason applied
    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }

    /// Reason codes as strings
    pub fn reason_codes(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }

    fn from_reasons(reasons: Vec<RejectionReason>) -> Self {
        let status = if reasons.is_empty() {
            ValidationStatus::Accepted
        } else {
            ValidationStatus::Rejected
        };
        Self { status, reasons }
    }
}

/// Validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Triple conforms to the ontology
    Accepted,

    /// At least one check failed
    Rejected,
}

/// Which side of a triple a reason refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The subject entity
    Subject,
    /// The object entity
    Object,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Subject => f.write_str("subject"),
            Role::Object => f.write_str("object"),
        }
    }
}

/// Reasons for rejection
///
/// `Display` renders the stable reason code written to invalid-triple
/// artifacts (`object.type_invalid_for_uses`, `predicate_not_allowed`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The record is not a JSON object
    NotAnObject,
    /// `subject` is missing or not an object
    SubjectNotObject,
    /// `object` is missing or not an object
    ObjectNotObject,
    /// Predicate absent, blank or over length
    PredicateMissingOrEmpty,
    /// Predicate is not a lowercase token
    PredicateNotTokenlike,
    /// Predicate outside the closed predicate set
    PredicateNotAllowed,
    /// Predicate over the length bound
    PredicateTooLong,
    /// Entity name absent, blank or over length
    NameMissingOrEmpty(Role),
    /// Entity type absent, blank or over length
    TypeMissingOrEmpty(Role),
    /// Entity type outside the closed type set
    TypeNotAllowed(Role),
    /// Entity type violates the predicate's domain/range rule
    TypeInvalidForPredicate {
        /// Offending side
        role: Role,
        /// Predicate whose rule was violated
        predicate: String,
    },
    /// Confidence present but not a number
    ConfidenceNotNumeric,
    /// Confidence outside [0, 1]
    ConfidenceOutOfRange,
    /// Confidence required but absent
    ConfidenceMissing,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NotAnObject => f.write_str("not_an_object"),
            RejectionReason::SubjectNotObject => f.write_str("subject_not_object"),
            RejectionReason::ObjectNotObject => f.write_str("object_not_object"),
            RejectionReason::PredicateMissingOrEmpty => f.write_str("predicate_missing_or_empty"),
            RejectionReason::PredicateNotTokenlike => f.write_str("predicate_not_tokenlike"),
            RejectionReason::PredicateNotAllowed => f.write_str("predicate_not_allowed"),
            RejectionReason::PredicateTooLong => f.write_str("predicate_too_long"),
            RejectionReason::NameMissingOrEmpty(role) => write!(f, "{}.name_missing_or_empty", role),
            RejectionReason::TypeMissingOrEmpty(role) => write!(f, "{}.type_missing_or_empty", role),
            RejectionReason::TypeNotAllowed(role) => write!(f, "{}.type_not_allowed", role),
            RejectionReason::TypeInvalidForPredicate { role, predicate } => {
                write!(f, "{}.type_invalid_for_{}", role, predicate)
            }
            RejectionReason::ConfidenceNotNumeric => f.write_str("confidence_not_numeric"),
            RejectionReason::ConfidenceOutOfRange => f.write_str("confidence_out_of_range"),
            RejectionReason::ConfidenceMissing => f.write_str("confidence_missing"),
        }
    }
}

impl Serialize for RejectionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The Gatekeeper checks triples against an ontology
///
/// Validation is a pure function of the input record: it never mutates
/// the triple and returns the same reasons on every call.
pub struct Gatekeeper<'o> {
    config: ValidationConfig,
    ontology: &'o Ontology,
}

impl<'o> Gatekeeper<'o> {
    /// Create a new Gatekeeper over the given ontology
    pub fn new(config: ValidationConfig, ontology: &'o Ontology) -> Self {
        Self { config, ontology }
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a raw JSON record, accumulating every applicable reason
    ///
    /// A record carrying a `raw` oracle object is judged on that object.
    pub fn validate(&self, value: &Value) -> ValidationResult {
        let value = value.get("raw").unwrap_or(value);
        let Some(record) = value.as_object() else {
            return ValidationResult::from_reasons(vec![RejectionReason::NotAnObject]);
        };

        let mut reasons = Vec::new();

        // 1. Structure
        let subject = record.get("subject").and_then(Value::as_object);
        let object = record.get("object").and_then(Value::as_object);
        let predicate = record.get("predicate").and_then(Value::as_str);

        if subject.is_none() {
            reasons.push(RejectionReason::SubjectNotObject);
        }
        if object.is_none() {
            reasons.push(RejectionReason::ObjectNotObject);
        }
        if !self.nonempty(predicate) {
            reasons.push(RejectionReason::PredicateMissingOrEmpty);
        }

        // 2. Predicate form and membership
        if let Some(pred) = predicate {
            if !is_token(pred.trim()) {
                reasons.push(RejectionReason::PredicateNotTokenlike);
            }
            if !self.ontology.is_predicate(pred) {
                reasons.push(RejectionReason::PredicateNotAllowed);
            }
        }

        // 3. Names and types
        let (subject_name, subject_type) = entity_fields(subject);
        let (object_name, object_type) = entity_fields(object);

        if !self.nonempty(subject_name) {
            reasons.push(RejectionReason::NameMissingOrEmpty(Role::Subject));
        }
        if !self.nonempty(object_name) {
            reasons.push(RejectionReason::NameMissingOrEmpty(Role::Object));
        }
        if !self.nonempty(subject_type) {
            reasons.push(RejectionReason::TypeMissingOrEmpty(Role::Subject));
        }
        if !self.nonempty(object_type) {
            reasons.push(RejectionReason::TypeMissingOrEmpty(Role::Object));
        }
        if subject_type.is_some_and(|t| !self.ontology.is_type(t)) {
            reasons.push(RejectionReason::TypeNotAllowed(Role::Subject));
        }
        if object_type.is_some_and(|t| !self.ontology.is_type(t)) {
            reasons.push(RejectionReason::TypeNotAllowed(Role::Object));
        }

        // 4. Domain/range
        if self.config.enforce_domain_range {
            if let (Some(pred), Some(st), Some(ot)) = (predicate, subject_type, object_type) {
                self.check_domain_range(pred, st, ot, &mut reasons);
            }
        }

        // 5. Confidence
        match record.get("confidence") {
            Some(Value::Number(n)) => match n.as_f64() {
                Some(c) if (0.0..=1.0).contains(&c) => {}
                _ => reasons.push(RejectionReason::ConfidenceOutOfRange),
            },
            Some(_) => reasons.push(RejectionReason::ConfidenceNotNumeric),
            None if self.config.require_confidence => {
                reasons.push(RejectionReason::ConfidenceMissing)
            }
            None => {}
        }

        // 6. Predicate length
        if predicate.is_some_and(|p| p.chars().count() > self.config.max_str_len) {
            reasons.push(RejectionReason::PredicateTooLong);
        }

        ValidationResult::from_reasons(reasons)
    }

    /// Validate a typed triple
    pub fn validate_triple(&self, triple: &Triple) -> Result<ValidationResult, GatekeeperError> {
        let value = serde_json::to_value(triple)?;
        Ok(self.validate(&value))
    }

    /// Split records into valid (unchanged) and invalid (with reasons)
    pub fn partition<I>(&self, records: I) -> Partition
    where
        I: IntoIterator<Item = Value>,
    {
        let mut partition = Partition::default();
        for record in records {
            let result = self.validate(&record);
            if result.is_valid() {
                partition.valid.push(record);
            } else {
                partition.invalid.push(InvalidTriple {
                    triple: record,
                    reasons: result.reason_codes(),
                });
            }
        }
        partition
    }

    fn check_domain_range(
        &self,
        predicate: &str,
        subject_type: &str,
        object_type: &str,
        reasons: &mut Vec<RejectionReason>,
    ) {
        let Some(rule) = self.ontology.rule(predicate) else {
            return;
        };
        if !rule.allows_subject(subject_type) {
            reasons.push(RejectionReason::TypeInvalidForPredicate {
                role: Role::Subject,
                predicate: predicate.to_string(),
            });
        }
        if !rule.allows_object(object_type) {
            reasons.push(RejectionReason::TypeInvalidForPredicate {
                role: Role::Object,
                predicate: predicate.to_string(),
            });
        }
    }

    fn nonempty(&self, field: Option<&str>) -> bool {
        field.is_some_and(|s| {
            let trimmed = s.trim();
            !trimmed.is_empty() && trimmed.chars().count() <= self.config.max_str_len
        })
    }
}

impl Gatekeeper<'static> {
    /// Create a Gatekeeper over the process-wide ontology
    pub fn with_global(config: ValidationConfig) -> Self {
        Self::new(config, ontology::global())
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::with_global(ValidationConfig::default())
    }
}

/// Name and type of an entity record
///
/// A missing entity reads as empty strings, so it also fails the type
/// membership and domain/range checks. A present entity with a missing
/// or non-string field yields `None` for that field.
fn entity_fields(entity: Option<&Map<String, Value>>) -> (Option<&str>, Option<&str>) {
    match entity {
        None => (Some(""), Some("")),
        Some(map) => (
            map.get("name").and_then(Value::as_str),
            map.get("type").and_then(Value::as_str),
        ),
    }
}

/// `^[a-z][a-z_-]*$`
fn is_token(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctigraph_domain::{EntityRef, Provenance};
    use proptest::prelude::*;
    use serde_json::json;

    fn stix() -> &'static Ontology {
        ontology::global()
    }

    fn codes(gatekeeper: &Gatekeeper<'_>, value: Value) -> Vec<String> {
        gatekeeper.validate(&value).reason_codes()
    }

    fn valid_record() -> Value {
        json!({
            "subject": {"name": "APT28", "type": "threat-actor"},
            "predicate": "uses",
            "object": {"name": "X-Agent", "type": "malware"},
            "confidence": 0.8
        })
    }

    #[test]
    fn test_valid_triple() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let result = gatekeeper.validate(&valid_record());
        assert_eq!(result.status, ValidationStatus::Accepted);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_domain_range_violation() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let record = json!({
            "subject": {"name": "Acme Corp", "type": "organization"},
            "predicate": "uses",
            "object": {"name": "Acme Corp", "type": "organization"}
        });
        let reasons = codes(&gatekeeper, record);
        assert!(reasons.contains(&"object.type_invalid_for_uses".to_string()));
        assert!(reasons.contains(&"subject.type_invalid_for_uses".to_string()));
        assert_eq!(reasons.len(), 2);
    }

    #[test]
    fn test_permissive_skips_domain_range() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::permissive(), stix());
        let record = json!({
            "subject": {"name": "Acme Corp", "type": "organization"},
            "predicate": "uses",
            "object": {"name": "Acme Corp", "type": "organization"}
        });
        assert!(gatekeeper.validate(&record).is_valid());
    }

    #[test]
    fn test_unconstrained_predicate_skips_domain_range() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let record = json!({
            "subject": {"name": "Acme Corp", "type": "organization"},
            "predicate": "emails_to",
            "object": {"name": "ops@acme.example", "type": "email-addr"}
        });
        assert!(gatekeeper.validate(&record).is_valid());
    }

    #[test]
    fn test_not_an_object() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        assert_eq!(codes(&gatekeeper, json!("oops")), vec!["not_an_object"]);
        assert_eq!(codes(&gatekeeper, json!([1, 2])), vec!["not_an_object"]);
    }

    #[test]
    fn test_missing_subject_accumulates_reasons() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let record = json!({
            "subject": "APT28",
            "predicate": "uses",
            "object": {"name": "X-Agent", "type": "malware"}
        });
        assert_eq!(
            codes(&gatekeeper, record),
            vec![
                "subject_not_object",
                "subject.name_missing_or_empty",
                "subject.type_missing_or_empty",
                "subject.type_not_allowed",
                "subject.type_invalid_for_uses",
            ]
        );
    }

    #[test]
    fn test_predicate_checks() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let mut record = valid_record();
        record["predicate"] = json!("Uses");
        assert_eq!(
            codes(&gatekeeper, record.clone()),
            vec!["predicate_not_tokenlike", "predicate_not_allowed"]
        );

        record["predicate"] = json!("   ");
        assert_eq!(
            codes(&gatekeeper, record.clone()),
            vec![
                "predicate_missing_or_empty",
                "predicate_not_tokenlike",
                "predicate_not_allowed",
            ]
        );

        record.as_object_mut().unwrap().remove("predicate");
        assert_eq!(codes(&gatekeeper, record), vec!["predicate_missing_or_empty"]);
    }

    #[test]
    fn test_predicate_too_long() {
        let small = Ontology::new(
            vec!["a".to_string(), "b".to_string()],
            vec![("drops_payload".to_string(), None)],
        )
        .unwrap();
        let gatekeeper = Gatekeeper::new(ValidationConfig::default().with_max_str_len(8), &small);
        let record = json!({
            "subject": {"name": "x", "type": "a"},
            "predicate": "drops_payload",
            "object": {"name": "y", "type": "b"}
        });
        assert_eq!(
            codes(&gatekeeper, record),
            vec!["predicate_missing_or_empty", "predicate_too_long"]
        );
    }

    #[test]
    fn test_type_not_allowed_is_case_sensitive() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let mut record = valid_record();
        record["subject"]["type"] = json!("Threat Actor");
        assert_eq!(
            codes(&gatekeeper, record),
            vec!["subject.type_not_allowed", "subject.type_invalid_for_uses"]
        );
    }

    #[test]
    fn test_confidence_checks() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let mut record = valid_record();
        record["confidence"] = json!(1.2);
        assert_eq!(codes(&gatekeeper, record.clone()), vec!["confidence_out_of_range"]);
        record["confidence"] = json!("high");
        assert_eq!(codes(&gatekeeper, record.clone()), vec!["confidence_not_numeric"]);
        record["confidence"] = Value::Null;
        assert_eq!(codes(&gatekeeper, record.clone()), vec!["confidence_not_numeric"]);
        record.as_object_mut().unwrap().remove("confidence");
        assert!(gatekeeper.validate(&record).is_valid());

        let strict = Gatekeeper::new(ValidationConfig::strict(), stix());
        assert_eq!(codes(&strict, record), vec!["confidence_missing"]);
    }

    #[test]
    fn test_validate_typed_triple() {
        let gatekeeper = Gatekeeper::default_config();
        let triple = Triple::new(
            EntityRef::new("evil.example.com", "domain-name"),
            "resolves_to",
            EntityRef::new("203.0.113.7", "ipv4-addr"),
        )
        .with_metadata(Provenance::paragraph(Some(3), "Page 3 - Chunk 1"));
        assert!(gatekeeper.validate_triple(&triple).unwrap().is_valid());
    }

    #[test]
    fn test_partition_keeps_invalid_with_reasons() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let mut bad = valid_record();
        bad["predicate"] = json!("likes");
        let partition = gatekeeper.partition(vec![valid_record(), bad.clone(), json!(42)]);

        assert_eq!(partition.valid, vec![valid_record()]);
        assert_eq!(partition.invalid.len(), 2);
        assert_eq!(partition.invalid[0].triple, bad);
        assert_eq!(partition.invalid[0].reasons, vec!["predicate_not_allowed"]);
        assert_eq!(partition.invalid[1].reasons, vec!["not_an_object"]);
    }

    #[test]
    fn test_raw_oracle_object_is_judged() {
        let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
        let mut triple = Triple::new(
            EntityRef::new("", ""),
            "uses",
            EntityRef::new("X-Agent", "malware"),
        );
        triple.raw = Some(json!({
            "subject": "APT29",
            "predicate": "uses",
            "object": {"name": "X-Agent", "type": "malware"},
            "confidence": "high"
        }));

        let record = serde_json::to_value(&triple).unwrap();
        let partition = gatekeeper.partition(vec![record.clone()]);
        assert!(partition.valid.is_empty());
        assert_eq!(partition.invalid[0].triple, record);
        let reasons = &partition.invalid[0].reasons;
        assert_eq!(reasons[0], "subject_not_object");
        assert!(reasons.contains(&"confidence_not_numeric".to_string()));
        assert_eq!(partition.invalid[0].triple["raw"]["subject"], "APT29");
    }

    #[test]
    fn test_reason_serializes_as_code() {
        let reason = RejectionReason::TypeInvalidForPredicate {
            role: Role::Object,
            predicate: "drops".to_string(),
        };
        assert_eq!(serde_json::to_value(&reason).unwrap(), json!("object.type_invalid_for_drops"));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-2.0f64..2.0).prop_map(|f| json!(f)),
            prop::sample::select(vec!["uses", "threat-actor", "malware", "", "Uses", "x"])
                .prop_map(|s| json!(s)),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::vec(
                (
                    prop::sample::select(vec![
                        "subject", "object", "predicate", "confidence", "name", "type",
                    ]),
                    inner,
                ),
                0..5,
            )
            .prop_map(|pairs| {
                Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
            })
        })
    }

    proptest! {
        #[test]
        fn prop_validate_is_deterministic(value in arb_json()) {
            let gatekeeper = Gatekeeper::new(ValidationConfig::default(), stix());
            let first = gatekeeper.validate(&value);
            let second = gatekeeper.validate(&value);
            prop_assert_eq!(first.is_valid(), first.reasons.is_empty());
            prop_assert_eq!(first, second);
        }
    }
}

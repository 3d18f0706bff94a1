//! Completion gateway: timeout, tolerant parse and the single repair retry

use crate::error::ExtractorError;
use crate::parser::{parse_support, parse_triples, ParseNote};
use crate::prompt::repair;
use ctigraph_domain::{CompletionService, EntityRef, GenerationOptions, SupportCheck, Triple};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Triples recovered from one unit, with the note of the attempt that won
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Converted triples, not yet canonicalized
    pub triples: Vec<Triple>,
    /// Interpretation of the winning response
    pub note: ParseNote,
    /// Completion calls made (1 or 2)
    pub attempts: u8,
}

impl Extraction {
    /// True when no usable response was recovered after the retry
    pub fn failed(&self) -> bool {
        self.note.is_failure()
    }
}

/// Wraps a [`CompletionService`] with a deadline and the parsing policy
pub struct CompletionGateway<L> {
    service: Arc<L>,
    timeout: Duration,
}

impl<L> Clone for CompletionGateway<L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            timeout: self.timeout,
        }
    }
}

impl<L> CompletionGateway<L>
where
    L: CompletionService + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a gateway
    pub fn new(service: L, timeout: Duration) -> Self {
        Self::from_shared(Arc::new(service), timeout)
    }

    /// Create a gateway around a shared service
    pub fn from_shared(service: Arc<L>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Model identifier of the wrapped service
    pub fn model_name(&self) -> &str {
        self.service.model_name()
    }

    /// One completion call under the deadline
    pub async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ExtractorError> {
        let service = Arc::clone(&self.service);
        let prompt = prompt.to_string();
        let options = *options;

        // The service is synchronous
        let call = tokio::task::spawn_blocking(move || {
            service
                .complete(&prompt, &options)
                .map_err(|e| ExtractorError::Llm(e.to_string()))
        });

        timeout(self.timeout, call)
            .await
            .map_err(|_| ExtractorError::Timeout(self.timeout))?
            .map_err(|e| ExtractorError::Llm(format!("Task join error: {}", e)))?
    }

    /// Extract triples, retrying once with a corrective suffix when the
    /// first response cannot be read
    ///
    /// A response that still fails after the retry is returned with its
    /// failure note; the caller decides how to count it.
    pub async fn extract(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Extraction, ExtractorError> {
        let response = self.complete(prompt, options).await?;
        let first = parse_triples(&response);
        debug!(
            "Parsed {} raw triples (note '{}')",
            first.triples.len(),
            first.note.as_str()
        );

        if !first.note.is_failure() {
            return Ok(Extraction {
                triples: convert_all(&first.triples),
                note: first.note,
                attempts: 1,
            });
        }

        warn!("Unreadable response ({}), retrying once", first.note.as_str());
        let response = self.complete(&repair(prompt), options).await?;
        let second = parse_triples(&response);

        let winner = if !second.triples.is_empty() || second.note == ParseNote::Clean {
            second
        } else {
            first
        };
        if winner.note.is_failure() {
            warn!("Response still unreadable after retry ({})", winner.note.as_str());
        }
        Ok(Extraction {
            triples: convert_all(&winner.triples),
            note: winner.note,
            attempts: 2,
        })
    }

    /// Run a support check; unreadable answers after the retry count as
    /// unsupported with zero confidence
    pub async fn check_support(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<SupportCheck, ExtractorError> {
        let response = self.complete(prompt, options).await?;
        if let Some(check) = parse_support(&response) {
            return Ok(check);
        }

        warn!("Unreadable support check, retrying once");
        let response = self.complete(&repair(prompt), options).await?;
        Ok(parse_support(&response).unwrap_or(SupportCheck {
            valid: false,
            confidence: 0.0,
        }))
    }
}

fn convert_all(objects: &[Map<String, Value>]) -> Vec<Triple> {
    objects.iter().map(triple_from_object).collect()
}

/// Convert a parsed object into a [`Triple`]
///
/// Fields of the wrong shape read as empty strings or no confidence. When
/// any field differs from the expected JSON type the object itself is kept
/// in [`Triple::raw`] so the gatekeeper reports what the oracle sent.
pub fn triple_from_object(obj: &Map<String, Value>) -> Triple {
    let predicate = obj
        .get("predicate")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let mut triple = Triple::new(
        entity_from(obj.get("subject")),
        predicate,
        entity_from(obj.get("object")),
    );
    triple.confidence = obj.get("confidence").and_then(Value::as_f64);
    if !well_typed(obj) {
        debug!("Keeping raw oracle object for {}", triple.display_line());
        triple.raw = Some(Value::Object(obj.clone()));
    }
    triple
}

fn entity_from(value: Option<&Value>) -> EntityRef {
    let Some(Value::Object(entity)) = value else {
        return EntityRef::new("", "");
    };
    let field = |key: &str| entity.get(key).and_then(Value::as_str).unwrap_or_default();
    EntityRef::new(field("name"), field("type"))
}

fn well_typed(obj: &Map<String, Value>) -> bool {
    let entity_ok = |key: &str| match obj.get(key) {
        Some(Value::Object(entity)) => ["name", "type"]
            .iter()
            .all(|field| entity.get(*field).is_some_and(Value::is_string)),
        _ => false,
    };
    entity_ok("subject")
        && entity_ok("object")
        && obj.get("predicate").is_some_and(Value::is_string)
        && obj.get("confidence").map_or(true, Value::is_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctigraph_llm::MockProvider;
    use serde_json::json;

    const GOOD: &str = r#"[{"subject": {"name": "APT28", "type": "threat-actor"}, "predicate": "uses", "object": {"name": "X-Agent", "type": "malware"}, "confidence": 0.9}]"#;

    fn gateway(mock: MockProvider) -> CompletionGateway<MockProvider> {
        CompletionGateway::new(mock, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_clean_response_needs_one_call() {
        let mock = MockProvider::new(GOOD);
        let gw = gateway(mock);
        let out = gw.extract("p", &GenerationOptions::default()).await.unwrap();
        assert_eq!(out.attempts, 1);
        assert_eq!(out.triples.len(), 1);
        assert_eq!(out.triples[0].subject, EntityRef::new("APT28", "threat-actor"));
        assert_eq!(out.triples[0].confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_escape_string_is_not_retried() {
        let mock = MockProvider::new("No related entities and relations.");
        let gw = gateway(mock);
        let out = gw.extract("p", &GenerationOptions::default()).await.unwrap();
        assert!(out.triples.is_empty());
        assert_eq!(out.note.as_str(), "no_triples_string");
        assert_eq!(out.attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_supersedes_on_success() {
        let mock = MockProvider::new("[]");
        mock.push_script(["Sorry, here you go: {oops", GOOD]);
        let shared = Arc::new(mock);
        let gw = CompletionGateway::from_shared(Arc::clone(&shared), Duration::from_secs(5));

        let out = gw.extract("p", &GenerationOptions::default()).await.unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.note, ParseNote::Clean);
        assert_eq!(out.triples.len(), 1);
        let prompts = shared.prompts();
        assert!(prompts[1].ends_with("Return ONLY valid JSON."));
    }

    #[tokio::test]
    async fn test_failure_survives_retry() {
        let mock = MockProvider::new("still not json");
        let gw = gateway(mock);
        let out = gw.extract("p", &GenerationOptions::default()).await.unwrap();
        assert!(out.failed());
        assert_eq!(out.note, ParseNote::ParseError);
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn test_escape_on_retry_keeps_first_note() {
        let mock = MockProvider::new("No related entities and relations.");
        mock.push_script([r#"{"unexpected": true}"#]);
        let gw = gateway(mock);
        let out = gw.extract("p", &GenerationOptions::default()).await.unwrap();
        assert_eq!(out.note, ParseNote::UnexpectedJsonShape);
    }

    #[tokio::test]
    async fn test_service_error_is_propagated() {
        let mock = MockProvider::new("[]");
        mock.add_error("boom");
        let gw = gateway(mock);
        let err = gw.extract("boom", &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, ExtractorError::Llm(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock = MockProvider::new("[]").with_delay(Duration::from_millis(500));
        let gw = CompletionGateway::new(mock, Duration::from_millis(20));
        let err = gw.complete("p", &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, ExtractorError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_support_check_retry_and_default() {
        let mock = MockProvider::new("nope");
        mock.push_script(["garbage", r#"{"valid": true, "confidence": 1.5}"#]);
        let gw = gateway(mock);
        let check = gw.check_support("p", &GenerationOptions::default()).await.unwrap();
        assert_eq!(check, SupportCheck { valid: true, confidence: 1.0 });

        let check = gw.check_support("p", &GenerationOptions::default()).await.unwrap();
        assert_eq!(check, SupportCheck { valid: false, confidence: 0.0 });
    }

    #[test]
    fn test_well_formed_object_has_no_raw_copy() {
        let value: Value = serde_json::from_str(GOOD).unwrap();
        let triple = triple_from_object(value[0].as_object().unwrap());
        assert_eq!(triple.confidence, Some(0.9));
        assert!(triple.raw.is_none());
    }

    #[test]
    fn test_malformed_fields_keep_raw_object() {
        let obj = json!({"subject": "APT28", "predicate": 5, "object": {"name": "X", "type": 3}, "confidence": "0.4"});
        let triple = triple_from_object(obj.as_object().unwrap());
        assert_eq!(triple.subject, EntityRef::new("", ""));
        assert_eq!(triple.predicate, "");
        assert_eq!(triple.object, EntityRef::new("X", ""));
        assert_eq!(triple.confidence, None);
        assert_eq!(triple.raw, Some(obj));
    }
}

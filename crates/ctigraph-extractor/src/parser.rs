//! Tolerant parsing of completion output
//!
//! Models wrap JSON in prose, emit half a list, or answer with the escape
//! string. Nothing here fails: every outcome is a value with a note.

use crate::prompt::NO_TRIPLES_ESCAPE;
use ctigraph_domain::confidence::clamp_unit;
use ctigraph_domain::SupportCheck;
use serde_json::{Map, Value};
use tracing::warn;

/// How a completion response was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseNote {
    /// A JSON list was found
    #[default]
    Clean,
    /// The model returned the escape string
    NoTriplesString,
    /// No JSON could be recovered
    ParseError,
    /// JSON was recovered but is neither a list nor the escape string
    UnexpectedJsonShape,
}

impl ParseNote {
    /// Note string as written to logs and artifacts (`""` when clean)
    pub fn as_str(self) -> &'static str {
        match self {
            ParseNote::Clean => "",
            ParseNote::NoTriplesString => "no_triples_string",
            ParseNote::ParseError => "parse_error",
            ParseNote::UnexpectedJsonShape => "unexpected_json_shape",
        }
    }

    /// True when a self-repair retry is warranted
    pub fn is_failure(self) -> bool {
        matches!(self, ParseNote::ParseError | ParseNote::UnexpectedJsonShape)
    }
}

/// Raw triple objects recovered from one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTriples {
    /// Objects having `subject`, `predicate` and `object` keys
    pub triples: Vec<Map<String, Value>>,
    /// Interpretation of the response
    pub note: ParseNote,
}

fn recover_json(response: &str, open: char, close: char) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        return Some(value);
    }
    let start = response.find(open)?;
    let end = response.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Parse an extraction response
pub fn parse_triples(response: &str) -> ParsedTriples {
    let Some(value) = recover_json(response.trim(), '[', ']') else {
        // The bare escape string is not JSON
        if is_escape(response) {
            return ParsedTriples {
                triples: Vec::new(),
                note: ParseNote::NoTriplesString,
            };
        }
        return ParsedTriples {
            triples: Vec::new(),
            note: ParseNote::ParseError,
        };
    };

    match value {
        Value::Array(items) => {
            let total = items.len();
            let triples: Vec<_> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(obj)
                        if obj.contains_key("subject")
                            && obj.contains_key("predicate")
                            && obj.contains_key("object") =>
                    {
                        Some(obj)
                    }
                    _ => None,
                })
                .collect();
            if triples.len() < total {
                warn!("Dropped {} malformed list items", total - triples.len());
            }
            ParsedTriples {
                triples,
                note: ParseNote::Clean,
            }
        }
        Value::String(s) if is_escape(&s) => ParsedTriples {
            triples: Vec::new(),
            note: ParseNote::NoTriplesString,
        },
        _ => ParsedTriples {
            triples: Vec::new(),
            note: ParseNote::UnexpectedJsonShape,
        },
    }
}

fn is_escape(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case(NO_TRIPLES_ESCAPE)
}

/// Parse a support-check response
///
/// `None` when no JSON object can be recovered. A recovered object with a
/// missing or non-boolean `valid` reads as `false`; confidence is clamped
/// into `[0, 1]`.
pub fn parse_support(response: &str) -> Option<SupportCheck> {
    let value = recover_json(response.trim(), '{', '}')?;
    let obj = value.as_object()?;
    let valid = obj.get("valid").and_then(Value::as_bool).unwrap_or(false);
    let confidence = obj
        .get("confidence")
        .and_then(number_like)
        .map(clamp_unit)
        .unwrap_or(0.0);
    Some(SupportCheck { valid, confidence })
}

/// Read a number or a numeric string
pub(crate) fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Provenance tracking back to page/paragraph/sentence

use serde::{Deserialize, Deserializer, Serialize};

/// Where a triple was found in the source document
///
/// `paragraph_id` uses the Document Source's stable chunk id
/// (`"Page <p> - Chunk <i>"`); numeric ids in older artifacts are read as
/// their decimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Page number, if known
    #[serde(default)]
    pub page: Option<u32>,

    /// Paragraph (chunk) id
    #[serde(default, deserialize_with = "string_or_number")]
    pub paragraph_id: Option<String>,

    /// Sentence id (`"<paragraph_id>-s<index>"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<String>,
}

impl Provenance {
    /// Provenance of a sentence unit
    pub fn sentence(
        page: Option<u32>,
        paragraph_id: impl Into<String>,
        sentence_id: impl Into<String>,
    ) -> Self {
        Self {
            page,
            paragraph_id: Some(paragraph_id.into()),
            sentence_id: Some(sentence_id.into()),
        }
    }

    /// Provenance of a whole paragraph
    pub fn paragraph(page: Option<u32>, paragraph_id: impl Into<String>) -> Self {
        Self {
            page,
            paragraph_id: Some(paragraph_id.into()),
            sentence_id: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<IdRepr> = Option::deserialize(deserializer)?;
    Ok(repr.map(|r| match r {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    }))
}

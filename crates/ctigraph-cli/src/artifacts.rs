//! Reading and writing the JSON artifacts passed between commands.

use crate::cli::DocumentArgs;
use crate::error::{CliError, Result};
use ctigraph_domain::ParagraphDocument;
use ctigraph_extractor::FilteredSentence;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
    serde_json::from_str(&contents).map_err(|e| CliError::input(path, e))
}

/// Read a JSON-lines file, skipping blank lines
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| CliError::input(path, format!("line {}: {}", n + 1, e)))
        })
        .collect()
}

/// Write pretty JSON with a trailing newline
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    fs::write(path, contents)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Write one compact JSON object per line
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let mut contents = String::new();
    for item in items {
        contents.push_str(&serde_json::to_string(item)?);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    debug!("Wrote {} lines to {}", items.len(), path.display());
    Ok(())
}

/// Load the source document from `--text` or `--paragraphs`
pub fn load_document(args: &DocumentArgs) -> Result<ParagraphDocument> {
    match &args.text {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
            Ok(ParagraphDocument::from_plain_text(path.display().to_string(), &text))
        }
        None => {
            let mut doc: ParagraphDocument = read_json(&args.paragraphs)?;
            if doc.source.is_empty() {
                doc.source = args.paragraphs.display().to_string();
            }
            Ok(doc)
        }
    }
}

/// Triple records from `{"triples": [...]}` or a bare list
pub fn read_triple_records(path: &Path) -> Result<Vec<Value>> {
    match read_json::<Value>(path)? {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("triples") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(CliError::input(path, "expected a \"triples\" list")),
        },
        _ => Err(CliError::input(
            path,
            "expected a list or an object with a \"triples\" list",
        )),
    }
}

/// `sentence_id -> text` from a filtered-sentences file; empty when absent
pub fn sentence_map(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        debug!("{} not found, no sentence back-fill", path.display());
        return Ok(HashMap::new());
    }
    let sentences: Vec<FilteredSentence> = read_json(path)?;
    Ok(sentences
        .into_iter()
        .map(|s| (s.sentence_id, s.text))
        .collect())
}

/// `paragraph_id -> text` from a paragraphs file; empty when absent
pub fn paragraph_map(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        debug!("{} not found, no paragraph back-fill", path.display());
        return Ok(HashMap::new());
    }
    let doc: ParagraphDocument = read_json(path)?;
    Ok(doc
        .paragraphs()
        .map(|p| (p.chunk.id.clone(), p.chunk.text.clone()))
        .collect())
}

//! Document Source: page → paragraph → sentence text
//!
//! Layout parsing happens upstream. These types mirror the
//! `page_paragraphs.json` artifact and derive the sentence-level stream
//! from it.

use serde::{Deserialize, Serialize};

/// A paragraph-level chunk with its stable id (`"Page <p> - Chunk <i>"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable, document-unique id
    pub id: String,
    /// Paragraph text
    #[serde(default)]
    pub text: String,
}

/// One page of chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number, when the layout parser knew it
    #[serde(default)]
    pub page: Option<u32>,
    /// Chunks in reading order
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// A decomposed source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphDocument {
    /// Origin file name or URI
    #[serde(default)]
    pub source: String,
    /// Pages in order
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// A paragraph with the page it sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphRef<'a> {
    /// Page number
    pub page: Option<u32>,
    /// The chunk itself
    pub chunk: &'a Chunk,
}

/// One sentence of the sentence-level stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceUnit {
    /// Page number
    pub page: Option<u32>,
    /// Owning chunk id
    pub paragraph_id: String,
    /// `"<paragraph_id>-s<index>"`
    pub sentence_id: String,
    /// Sentence text, trimmed
    pub text: String,
}

impl ParagraphDocument {
    /// Build a single-page document from plain text
    ///
    /// Blank lines end a paragraph. Bullet-like lines become their own
    /// chunk. Wrapped lines are joined with [`dehyphenate_join`].
    pub fn from_plain_text(source: impl Into<String>, text: &str) -> Self {
        const PAGE: u32 = 1;
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();

        fn flush(chunks: &mut Vec<Chunk>, current: &mut String) {
            let text = current.trim();
            if !text.is_empty() {
                chunks.push(Chunk {
                    id: chunk_id(Some(PAGE), chunks.len()),
                    text: text.to_string(),
                });
            }
            current.clear();
        }

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                flush(&mut chunks, &mut current);
            } else if looks_like_bullet(line) {
                flush(&mut chunks, &mut current);
                current.push_str(line);
                flush(&mut chunks, &mut current);
            } else if current.is_empty() {
                current.push_str(line);
            } else {
                push_dehyphenated(&mut current, line);
            }
        }
        flush(&mut chunks, &mut current);

        Self {
            source: source.into(),
            pages: vec![Page {
                page: Some(PAGE),
                chunks,
            }],
        }
    }

    /// Iterate non-empty paragraphs in reading order
    pub fn paragraphs(&self) -> impl Iterator<Item = ParagraphRef<'_>> {
        self.pages.iter().flat_map(|page| {
            page.chunks
                .iter()
                .filter(|chunk| !chunk.text.trim().is_empty())
                .map(move |chunk| ParagraphRef {
                    page: page.page,
                    chunk,
                })
        })
    }

    /// Find a paragraph by its exact id
    pub fn paragraph(&self, id: &str) -> Option<ParagraphRef<'_>> {
        self.paragraphs().find(|p| p.chunk.id == id)
    }

    /// Whole-document text
    ///
    /// Paragraphs of one page are joined with de-hyphenation; pages are
    /// separated by a blank line.
    pub fn full_text(&self) -> String {
        let mut full = String::new();
        let mut current_page: Option<Option<u32>> = None;
        for para in self.paragraphs() {
            let text = para.chunk.text.trim();
            if full.is_empty() {
                full.push_str(text);
            } else if current_page != Some(para.page) {
                full.push_str("\n\n");
                full.push_str(text);
            } else {
                push_dehyphenated(&mut full, text);
            }
            current_page = Some(para.page);
        }
        full
    }

    /// Split every paragraph into sentence units
    ///
    /// Indices count every sentence of a paragraph, so ids stay stable
    /// regardless of which sentences a later filter keeps.
    pub fn sentence_units(&self) -> Vec<SentenceUnit> {
        self.paragraphs()
            .flat_map(|para| {
                split_sentences(&para.chunk.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(idx, text)| SentenceUnit {
                        page: para.page,
                        paragraph_id: para.chunk.id.clone(),
                        sentence_id: format!("{}-s{}", para.chunk.id, idx),
                        text,
                    })
            })
            .collect()
    }
}

/// Chunk id in the `"Page <p> - Chunk <i>"` form
pub fn chunk_id(page: Option<u32>, index: usize) -> String {
    match page {
        Some(p) => format!("Page {} - Chunk {}", p, index),
        None => format!("Page None - Chunk {}", index),
    }
}

/// Join two wrapped fragments
///
/// A trailing hyphen on `prev` is removed and no space is inserted;
/// otherwise exactly one space separates the fragments.
pub fn dehyphenate_join(prev: &str, cur: &str) -> String {
    let mut joined = String::with_capacity(prev.len() + cur.len() + 1);
    joined.push_str(prev);
    push_dehyphenated(&mut joined, cur);
    joined
}

/// [`dehyphenate_join`] appending to `buf` in place
pub fn push_dehyphenated(buf: &mut String, cur: &str) {
    let cur = cur.trim_start();
    let trimmed_len = buf.trim_end().len();
    if buf[..trimmed_len].ends_with('-') {
        buf.truncate(trimmed_len - 1);
    } else if !buf.is_empty() && !buf.ends_with(' ') {
        buf.push(' ');
    }
    buf.push_str(cur);
}

/// Detect bullet or list-item lines
pub fn looks_like_bullet(line: &str) -> bool {
    let t = line.trim_start();
    if t.starts_with(['-', '•', '◦', '∙', '‣']) {
        return true;
    }

    // (1) 1. 1)
    let rest = t.strip_prefix('(').unwrap_or(t);
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let mut tail = rest[digits..].chars();
        if matches!(tail.next(), Some('.') | Some(')'))
            && tail.next().is_some_and(char::is_whitespace)
        {
            return true;
        }
    }

    // a) B)
    let mut chars = t.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some(')'), Some(ws)) if c.is_ascii_alphabetic() && ws.is_whitespace()
    )
}

/// Split text into trimmed sentences on `.`, `?` or `!` followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '?' | '!') {
            if let Some(&(_, next)) = iter.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    push_trimmed(&mut sentences, &text[start..end]);
                    start = end;
                }
            }
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

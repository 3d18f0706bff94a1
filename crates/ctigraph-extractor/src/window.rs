//! Window manager for whole-document extraction
//!
//! Documents that fit one prompt are extracted single-shot. Longer
//! documents, and documents whose single-shot pass comes back empty, are
//! split into overlapping windows that are extracted independently and
//! merged with semantic-only deduplication.

use crate::config::ExtractorConfig;
use crate::gateway::CompletionGateway;
use crate::prompt::{PromptBuilder, UnitKind};
use crate::types::ScanStrategy;
use ctigraph_domain::{
    Canonicalizer, CompletionService, GenerationOptions, KeyMode, Triple, TripleKey,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A character range of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    /// Zero-based window position
    pub index: usize,
    /// First character (inclusive)
    pub start: usize,
    /// Last character (exclusive)
    pub end: usize,
    /// Window text
    pub text: String,
}

/// Split `text` into windows of `window` characters starting every
/// `stride` characters
///
/// The last window ends at the end of the text. A stride of 0 or one not
/// below the window size yields non-overlapping windows.
pub fn split_windows(text: &str, window: usize, stride: usize) -> Vec<TextWindow> {
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;
    if total == 0 {
        return Vec::new();
    }

    let window = if window == 0 { total } else { window };
    let stride = if stride == 0 || stride > window { window } else { stride };

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(total);
        windows.push(TextWindow {
            index: windows.len(),
            start,
            end,
            text: text[offsets[start]..offsets[end]].to_string(),
        });
        if end == total {
            break;
        }
        start += stride;
    }
    windows
}

/// Semantically deduplicated triples from successive windows
///
/// Remembers the window each triple was first seen in, so later passes
/// can check it against the text it came from.
#[derive(Debug, Default)]
pub struct WindowAccumulator {
    seen: HashSet<TripleKey>,
    triples: Vec<Triple>,
    evidence: Vec<usize>,
}

impl WindowAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one window's canonical triples; returns how many were new
    pub fn push_window(&mut self, window_index: usize, triples: Vec<Triple>) -> usize {
        let before = self.triples.len();
        for triple in triples {
            if self.seen.insert(TripleKey::of(&triple, KeyMode::SemanticOnly)) {
                self.triples.push(triple);
                self.evidence.push(window_index);
            }
        }
        self.triples.len() - before
    }

    /// Unique triples so far
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// True when nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Triples with the index of the window each was first found in
    pub fn into_parts(self) -> (Vec<Triple>, Vec<usize>) {
        (self.triples, self.evidence)
    }
}

/// Result of the two-phase policy
#[derive(Debug, Clone)]
pub struct WindowedExtraction {
    /// Phase that produced the triples
    pub strategy: ScanStrategy,
    /// Windows used; the single-shot phase uses one window over the whole text
    pub windows: Vec<TextWindow>,
    /// Unique canonical triples, without ids
    pub triples: Vec<Triple>,
    /// For each triple, the index into `windows` it was first found in
    pub evidence: Vec<usize>,
    /// Failed completion calls of the phase that produced the result
    pub errors: usize,
    /// True when the run stopped early on cancellation
    pub cancelled: bool,
}

/// Drives the single-shot then windowed policy
#[derive(Debug, Clone)]
pub struct WindowManager {
    max_document_chars: usize,
    window_chars: usize,
    window_stride: usize,
    canonicalizer: Canonicalizer,
}

impl WindowManager {
    /// Create a manager from the size settings in `config`
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            max_document_chars: config.max_document_chars,
            window_chars: config.window_chars,
            window_stride: config.window_stride,
            canonicalizer: Canonicalizer::new(config.max_name_chars),
        }
    }

    /// Windows this manager would use for `text`
    pub fn plan(&self, text: &str) -> Vec<TextWindow> {
        split_windows(text, self.window_chars, self.window_stride)
    }

    /// Extract from `text`
    ///
    /// Blank text makes no calls and yields no windows. A single-shot
    /// failure that falls back to windows is logged, not counted.
    pub async fn run<L>(
        &self,
        gateway: &CompletionGateway<L>,
        prompts: &PromptBuilder<'_>,
        options: &GenerationOptions,
        text: &str,
        cancel: &AtomicBool,
    ) -> WindowedExtraction
    where
        L: CompletionService + Send + Sync + 'static,
        L::Error: std::fmt::Display,
    {
        if text.trim().is_empty() {
            info!("Document has no text, nothing to extract");
            return WindowedExtraction {
                strategy: ScanStrategy::SingleShot,
                windows: Vec::new(),
                triples: Vec::new(),
                evidence: Vec::new(),
                errors: 0,
                cancelled: false,
            };
        }

        let total_chars = text.chars().count();
        let mut errors = 0;

        if total_chars <= self.max_document_chars {
            let prompt = prompts.build_with_budget(UnitKind::Document, text, self.max_document_chars);
            let (triples, failed) = self.extract_unit(gateway, &prompt, options).await;

            let mut acc = WindowAccumulator::new();
            acc.push_window(0, triples);
            if !acc.is_empty() {
                info!("Single-shot extraction found {} triples", acc.len());
                let (triples, evidence) = acc.into_parts();
                return WindowedExtraction {
                    strategy: ScanStrategy::SingleShot,
                    windows: vec![TextWindow {
                        index: 0,
                        start: 0,
                        end: total_chars,
                        text: text.to_string(),
                    }],
                    triples,
                    evidence,
                    errors: 0,
                    cancelled: false,
                };
            }
            if failed {
                warn!("Single-shot extraction failed, falling back to windows");
            } else {
                info!("Single-shot extraction found nothing, falling back to windows");
            }
        } else {
            info!(
                "Document has {} chars (budget {}), using windows",
                total_chars, self.max_document_chars
            );
        }

        let windows = self.plan(text);
        let total = windows.len();
        let mut acc = WindowAccumulator::new();
        let mut cancelled = false;

        for window in &windows {
            if cancel.load(Ordering::SeqCst) {
                warn!("Cancelled after {} of {} windows", window.index, total);
                cancelled = true;
                break;
            }
            let unit = UnitKind::Window {
                index: window.index,
                total,
            };
            let prompt = prompts.build(unit, &window.text);
            let (triples, failed) = self.extract_unit(gateway, &prompt, options).await;
            errors += usize::from(failed);
            let added = acc.push_window(window.index, triples);
            debug!(
                "Window {}/{} [{}..{}): {} new, {} total",
                window.index + 1,
                total,
                window.start,
                window.end,
                added,
                acc.len()
            );
        }

        let (triples, evidence) = acc.into_parts();
        info!(
            "Windowed extraction found {} unique triples over {} windows",
            triples.len(),
            total
        );
        WindowedExtraction {
            strategy: ScanStrategy::Windowed,
            windows,
            triples,
            evidence,
            errors,
            cancelled,
        }
    }

    /// One unit; failures are logged and reported, never raised
    async fn extract_unit<L>(
        &self,
        gateway: &CompletionGateway<L>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> (Vec<Triple>, bool)
    where
        L: CompletionService + Send + Sync + 'static,
        L::Error: std::fmt::Display,
    {
        match gateway.extract(prompt, options).await {
            Ok(extraction) => {
                let failed = extraction.failed();
                let triples = extraction
                    .triples
                    .into_iter()
                    .map(|t| self.canonicalizer.canonicalize(t))
                    .collect();
                (triples, failed)
            }
            Err(e) => {
                warn!("Extraction call failed: {}", e);
                (Vec::new(), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctigraph_domain::EntityRef;

    fn triple(s: &str, o: &str) -> Triple {
        Triple::new(
            EntityRef::new(s, "threat-actor"),
            "uses",
            EntityRef::new(o, "malware"),
        )
    }

    #[test]
    fn test_windows_overlap_and_cover() {
        let text = "x".repeat(300);
        let windows = split_windows(&text, 100, 60);
        let ranges: Vec<_> = windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(ranges, vec![(0, 100), (60, 160), (120, 220), (180, 280), (240, 300)]);
        assert!(windows.iter().all(|w| w.text.chars().count() == w.end - w.start));
    }

    #[test]
    fn test_short_text_is_one_window() {
        let windows = split_windows("short", 100, 60);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "short");
        assert!(split_windows("", 100, 60).is_empty());
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let text = "é".repeat(10);
        let windows = split_windows(&text, 4, 3);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].text, "éééé");
    }

    #[test]
    fn test_degenerate_stride_terminates() {
        let windows = split_windows(&"a".repeat(25), 10, 0);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].end, 25);
    }

    #[test]
    fn test_accumulator_dedupes_across_windows() {
        let mut acc = WindowAccumulator::new();
        assert_eq!(acc.push_window(0, vec![triple("APT28", "X-Agent"), triple("APT28", "X-Agent")]), 1);
        assert_eq!(acc.push_window(1, vec![triple("APT28", "X-Agent"), triple("APT29", "WellMess")]), 1);
        let (triples, evidence) = acc.into_parts();
        assert_eq!(triples.len(), 2);
        assert_eq!(evidence, vec![0, 1]);
    }
}

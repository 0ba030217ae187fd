//! Sentence-aware text chunking.
//!
//! Text is cut into pieces at sentence boundaries (`[.!?]+` followed by
//! whitespace). Each piece keeps its terminator and trailing whitespace, so
//! the pieces tile the source exactly and every chunk is a verbatim slice
//! `&text[start_position..end_position]`.
//!
//! Pieces accumulate into a buffer whose budget is `max_tokens × 4`
//! characters. The buffer is flushed when the next piece would overflow it.
//! A sentence over budget is re-split into words under the same rule, and a
//! word over budget is hard-split on char boundaries, so no chunk ever
//! exceeds the budget.

use once_cell::sync::Lazy;
use regex::Regex;

use tessera_core::defaults::CHARS_PER_TOKEN;
use tessera_core::TextChunk;

/// Sentence terminator plus the whitespace that follows it.
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence regex"));

/// A word with any leading and trailing whitespace.
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\S+\s*").expect("valid word regex"));

/// Character budget for a token budget. A zero budget is treated as one token.
pub fn max_chars_for(max_tokens: usize) -> usize {
    max_tokens.max(1) * CHARS_PER_TOKEN
}

/// Split `text` into ordered, contiguous chunks of at most
/// `max_tokens × 4` characters.
///
/// Returns no chunks for empty input and at least one otherwise.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = max_chars_for(max_tokens);
    let mut acc = Accumulator::new(max_chars);

    for (start, end) in sentence_spans(text) {
        let piece = &text[start..end];
        let piece_chars = piece.chars().count();

        if piece_chars <= max_chars {
            acc.push(start, end, piece_chars);
            continue;
        }

        acc.flush();
        for (w_start, w_end) in word_spans(piece) {
            let word = &piece[w_start..w_end];
            let word_chars = word.chars().count();

            if word_chars <= max_chars {
                acc.push(start + w_start, start + w_end, word_chars);
            } else {
                for (h_start, h_end, h_chars) in hard_spans(word, max_chars) {
                    acc.push(
                        start + w_start + h_start,
                        start + w_start + h_end,
                        h_chars,
                    );
                }
            }
        }
    }
    acc.flush();

    acc.spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| TextChunk {
            index,
            text: text[start..end].to_string(),
            start_position: start,
            end_position: end,
        })
        .collect()
}

/// Byte spans of sentence pieces. Together they cover `text` exactly.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        spans.push((start, m.end()));
        start = m.end();
    }
    if start < text.len() {
        spans.push((start, text.len()));
    }
    spans
}

/// Byte spans of words within `piece`. Whitespace-only input is one span.
fn word_spans(piece: &str) -> Vec<(usize, usize)> {
    let spans: Vec<(usize, usize)> = WORD
        .find_iter(piece)
        .map(|m| (m.start(), m.end()))
        .collect();

    if spans.is_empty() {
        vec![(0, piece.len())]
    } else {
        spans
    }
}

/// Split `word` into windows of at most `max_chars` characters.
fn hard_spans(word: &str, max_chars: usize) -> Vec<(usize, usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (pos, _) in word.char_indices() {
        if chars == max_chars {
            spans.push((start, pos, chars));
            start = pos;
            chars = 0;
        }
        chars += 1;
    }
    if chars > 0 {
        spans.push((start, word.len(), chars));
    }
    spans
}

/// Greedy accumulator over contiguous spans.
struct Accumulator {
    max_chars: usize,
    spans: Vec<(usize, usize)>,
    start: usize,
    end: usize,
    chars: usize,
}

impl Accumulator {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            spans: Vec::new(),
            start: 0,
            end: 0,
            chars: 0,
        }
    }

    fn push(&mut self, start: usize, end: usize, chars: usize) {
        if self.chars > 0 && self.chars + chars > self.max_chars {
            self.flush();
        }
        if self.chars == 0 {
            self.start = start;
        }
        self.end = end;
        self.chars += chars;
    }

    fn flush(&mut self) {
        if self.chars > 0 {
            self.spans.push((self.start, self.end));
            self.chars = 0;
        }
    }
}

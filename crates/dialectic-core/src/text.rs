//! Word counting and paragraph-first segmentation of long input.
//!
//! The segmenter keeps semantic units intact where it can:
//!
//! 1. Text within the word budget is returned untouched as a single chunk.
//! 2. Otherwise whole paragraphs are packed greedily into chunks, joined by a
//!    blank line.
//! 3. A paragraph that alone exceeds the budget is re-split on sentence
//!    terminators (`.`, `!`, `?`) and its sentences are packed greedily,
//!    re-joined with `". "` and closed with a trailing period.
//!
//! A single sentence longer than the budget is never split further; it
//! becomes its own oversized chunk.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SENTENCE_TERMINATORS: OnceLock<Regex> = OnceLock::new();

fn sentence_terminators() -> &'static Regex {
    SENTENCE_TERMINATORS.get_or_init(|| Regex::new(r"[.!?]+").expect("valid sentence regex"))
}

/// Whitespace-delimited word count used for limits and chunk sizing.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// An ordered, 1-indexed slice of an input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based position within the segmented input.
    pub index: usize,
    pub text: String,
    pub word_count: usize,
}

/// Split `text` into ordered chunks of at most `max_words` words.
///
/// Deterministic: the same input and budget always produce the same output.
/// A budget of zero is treated as one.
pub fn segment(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    if word_count(text) <= max_words {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    // `lines()` covers both single and blank-line paragraph breaks.
    for paragraph in text.lines().map(str::trim).filter(|p| !p.is_empty()) {
        let words = word_count(paragraph);

        if words > max_words {
            flush_paragraphs(&mut chunks, &mut current, &mut current_words);
            pack_sentences(paragraph, max_words, &mut chunks);
            continue;
        }

        if current_words + words > max_words && !current.is_empty() {
            flush_paragraphs(&mut chunks, &mut current, &mut current_words);
        }
        current.push(paragraph);
        current_words += words;
    }
    flush_paragraphs(&mut chunks, &mut current, &mut current_words);

    chunks
}

/// Segment `text` and attach 1-based indices and word counts.
pub fn chunks(text: &str, max_words: usize) -> Vec<Chunk> {
    segment(text, max_words)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            index: i + 1,
            word_count: word_count(&text),
            text,
        })
        .collect()
}

fn flush_paragraphs(chunks: &mut Vec<String>, current: &mut Vec<&str>, current_words: &mut usize) {
    if current.is_empty() {
        return;
    }
    chunks.push(current.join("\n\n"));
    current.clear();
    *current_words = 0;
}

fn pack_sentences(paragraph: &str, max_words: usize, chunks: &mut Vec<String>) {
    let mut sentences: Vec<&str> = Vec::new();
    let mut sentence_words = 0usize;

    for sentence in sentence_terminators()
        .split(paragraph)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let words = word_count(sentence);
        if sentence_words + words > max_words && !sentences.is_empty() {
            chunks.push(format!("{}.", sentences.join(". ")));
            sentences.clear();
            sentence_words = 0;
        }
        sentences.push(sentence);
        sentence_words += words;
    }

    if !sentences.is_empty() {
        chunks.push(format!("{}.", sentences.join(". ")));
    }
}

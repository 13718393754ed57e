//! Splitting primitives shared by the splitters

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// One way of cutting text into smaller pieces. Pieces concatenate back to the input.
#[derive(Debug, Clone)]
pub enum SplitRule {
    /// Split on a separator, which stays attached to the following piece
    Separator(String),
    /// Each regex match is a piece; unmatched gaps are attached to the previous piece
    Regex(Regex),
    /// Unicode sentence boundaries
    Sentences,
    /// Single characters
    Chars,
}

impl SplitRule {
    pub fn separator(sep: impl Into<String>) -> Self {
        Self::Separator(sep.into())
    }

    pub fn apply(&self, text: &str) -> Vec<String> {
        match self {
            Self::Separator(sep) => split_keep_separator(text, sep),
            Self::Regex(regex) => split_by_regex(text, regex),
            Self::Sentences => text
                .split_sentence_bounds()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Chars => text.chars().map(String::from).collect(),
        }
    }
}

pub fn split_keep_separator(text: &str, sep: &str) -> Vec<String> {
    if sep.is_empty() {
        return vec![text.to_string()];
    }

    let mut parts = text.split(sep);
    let mut pieces = Vec::new();

    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|p| format!("{}{}", sep, p)));
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn split_by_regex(text: &str, regex: &Regex) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut last_end = 0;

    for m in regex.find_iter(text) {
        let gap = &text[last_end..m.start()];
        match pieces.last_mut() {
            Some(prev) => prev.push_str(gap),
            None if !gap.is_empty() => pieces.push(gap.to_string()),
            None => {}
        }
        if !m.as_str().is_empty() {
            pieces.push(m.as_str().to_string());
        }
        last_end = m.end();
    }

    let tail = &text[last_end..];
    if !tail.is_empty() {
        match pieces.last_mut() {
            Some(prev) => prev.push_str(tail),
            None => pieces.push(tail.to_string()),
        }
    }
    pieces
}

/// Trims chunks and drops the blank ones
pub fn postprocess_chunks(chunks: Vec<String>) -> Vec<String> {
    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

//! One node per sentence, each carrying the surrounding sentences as context

use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::node::Metadata;
use crate::domain::splitter::{SentenceWindowItem, TextSplitter};
use crate::domain::Node;

pub const WINDOW_METADATA_KEY: &str = "window";
pub const ORIGINAL_TEXT_METADATA_KEY: &str = "original_text";
const DEFAULT_WINDOW_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct SentenceWindowSplitter {
    window_size: usize,
}

impl Default for SentenceWindowSplitter {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl SentenceWindowSplitter {
    /// `window_size` sentences are taken on each side
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn split_windows(&self, text: &str) -> Vec<SentenceWindowItem> {
        let sentences: Vec<&str> = text
            .split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let start = index.saturating_sub(self.window_size);
                let end = (index + self.window_size + 1).min(sentences.len());

                SentenceWindowItem {
                    index,
                    sentence: sentence.to_string(),
                    window: sentences[start..end].join(" "),
                }
            })
            .collect()
    }

    /// Nodes embed the sentence; the window travels in metadata for later replacement
    pub fn to_nodes(&self, text: &str, metadata: &Metadata) -> Vec<Node> {
        self.split_windows(text)
            .into_iter()
            .map(|item| {
                Node::new(item.sentence.clone())
                    .with_all_metadata(metadata.clone())
                    .with_metadata(WINDOW_METADATA_KEY, Value::String(item.window))
                    .with_metadata(ORIGINAL_TEXT_METADATA_KEY, Value::String(item.sentence))
            })
            .collect()
    }
}

impl TextSplitter for SentenceWindowSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_windows(text)
            .into_iter()
            .map(|item| item.sentence)
            .collect()
    }

    fn name(&self) -> &'static str {
        "sentence_window"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "One. Two. Three. Four. Five.";

    #[test]
    fn test_windows_clamp_at_edges() {
        let items = SentenceWindowSplitter::new(1).split_windows(TEXT);

        assert_eq!(items.len(), 5);
        assert_eq!(items[0].sentence, "One.");
        assert_eq!(items[0].window, "One. Two.");
        assert_eq!(items[2].window, "Two. Three. Four.");
        assert_eq!(items[4].window, "Four. Five.");
        assert_eq!(items[4].index, 4);
    }

    #[test]
    fn test_zero_window_is_sentence_itself() {
        let items = SentenceWindowSplitter::new(0).split_windows(TEXT);
        assert!(items.iter().all(|i| i.sentence == i.window));
    }

    #[test]
    fn test_to_nodes_carries_window_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("doc.txt"));

        let nodes = SentenceWindowSplitter::new(1)
            .to_nodes("First one. Second one.", &metadata);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].content(), "First one.");
        assert_eq!(nodes[0].metadata_str(WINDOW_METADATA_KEY), Some("First one. Second one."));
        assert_eq!(nodes[0].metadata_str("source"), Some("doc.txt"));
    }

    #[test]
    fn test_empty_input() {
        assert!(SentenceWindowSplitter::default().split("   ").is_empty());
    }
}

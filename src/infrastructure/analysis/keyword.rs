//! Frequency-based topic extraction and lead-sentence summaries

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::analysis::ContentAnalyzer;
use crate::domain::DomainError;

const MIN_TOPIC_CHARS: usize = 4;
const MIN_SENTENCE_CHARS: usize = 21;
const SUMMARY_SENTENCES: usize = 3;
const NO_SUMMARY: &str = "No summary available.";

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
        "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
        "these", "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
        "them", "my", "your", "his", "its", "our", "their", "from", "into", "than", "then",
        "there", "which", "what", "when", "where", "also",
    ]
    .into_iter()
    .collect()
});

/// Local analyzer needing no external service
#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Most frequent non-stop words; ties keep first-occurrence order
    pub fn top_keywords(content: &str, max_topics: usize) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

        for word in content.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();

            if word.chars().count() < MIN_TOPIC_CHARS || STOP_WORDS.contains(word.as_str()) {
                continue;
            }

            let first_seen = counts.len();
            counts.entry(word).or_insert((0, first_seen)).0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(word, (count, first_seen))| (word, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(max_topics)
            .map(|(word, _, _)| word)
            .collect()
    }

    /// First sentences long enough to carry meaning
    pub fn lead_summary(content: &str) -> String {
        let sentences: Vec<&str> = content
            .unicode_sentences()
            .map(|s| s.trim().trim_end_matches(['.', '!', '?']).trim())
            .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
            .take(SUMMARY_SENTENCES)
            .collect();

        if sentences.is_empty() {
            return NO_SUMMARY.to_string();
        }

        format!("{}.", sentences.join(". "))
    }
}

#[async_trait]
impl ContentAnalyzer for KeywordAnalyzer {
    async fn extract_topics(
        &self,
        content: &str,
        max_topics: usize,
    ) -> Result<Vec<String>, DomainError> {
        Ok(Self::top_keywords(content, max_topics))
    }

    async fn summarize(&self, content: &str) -> Result<Option<String>, DomainError> {
        Ok(Some(Self::lead_summary(content)))
    }
}

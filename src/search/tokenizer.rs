use crate::config::IndexingConfig;
use crate::types::Utterance;
use std::collections::HashSet;

/// Common English stop words removed from index tokens when enabled.
/// Words shorter than the default minimum length are filtered before this
/// set applies, so it only lists words of three letters or more.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see", "two",
    "who", "did", "get", "that", "this", "with", "from", "they", "have", "what", "been", "were",
    "will", "your", "each", "which", "their", "there", "about", "would", "could", "should",
    "these", "those", "then", "them", "than", "into", "over", "just", "also", "when", "where",
    "here", "some", "more", "very", "like", "only",
];

/// Tokenization options for the search index
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    /// Tokens shorter than this many characters are dropped
    pub min_word_length: usize,
    /// Maximum number of tokens kept per document
    pub max_tokens: usize,
    /// Whether stop words are removed
    pub remove_stop_words: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            min_word_length: 3,
            max_tokens: 1000,
            remove_stop_words: true,
        }
    }
}

impl From<&IndexingConfig> for TokenizerOptions {
    fn from(config: &IndexingConfig) -> Self {
        TokenizerOptions {
            min_word_length: config.min_word_length,
            max_tokens: config.max_tokens,
            remove_stop_words: config.remove_stop_words,
        }
    }
}

/// Assemble the searchable content for a transcript.
///
/// The title is repeated three times so title terms outweigh body terms
/// without a separate ranking field.
pub fn build_search_content(title: &str, description: &str, utterances: &[Utterance]) -> String {
    let spoken = utterances
        .iter()
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    format!("{} {} {} {} {}", title, title, title, description, spoken)
}

/// Tokenize text for indexing: lowercase, strip punctuation, split on
/// whitespace, drop short tokens and stop words, deduplicate preserving
/// first occurrence, cap the total count. Deterministic for a given input
/// and options.
pub fn tokenize(text: &str, options: &TokenizerOptions) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for raw in lowered.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() < options.min_word_length {
            continue;
        }

        if options.remove_stop_words && STOP_WORDS.contains(&raw) {
            continue;
        }

        if seen.insert(raw.to_string()) {
            tokens.push(raw.to_string());
            if tokens.len() >= options.max_tokens {
                break;
            }
        }
    }

    tokens
}

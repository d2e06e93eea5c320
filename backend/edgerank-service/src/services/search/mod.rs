/// Search Module
///
/// Full-text lookup over post messages.
///
/// # Architecture
/// - **Normalize**: canonical word form shared by indexing and querying
/// - **Trie**: prefix tree with per-word postings (word, prefix, multi-term
///   and exact-phrase queries)
/// - **Highlight**: ANSI marking of matched words for terminal output
pub mod highlight;
pub mod normalize;
pub mod trie;

pub use highlight::{highlight, highlight_all};
pub use normalize::{normalize_message, normalize_word};
pub use trie::{Posting, Postings, ScoredPost, Trie, LAST_TERM_BONUS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid search index: {0}")]
    InvalidIndex(String),

    #[error("Search index references unknown post {0}")]
    UnknownPost(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// A line of user search input, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// `word*`: list indexed words with this prefix.
    Prefix(String),
    /// `"some phrase"`: contiguous phrase match.
    Exact(String),
    /// Anything else: relevance-scored terms.
    Terms(String),
    /// Blank input, a bare `*`, or a phrase missing its closing quote.
    Empty,
}

impl SearchRequest {
    pub fn parse(input: &str) -> Self {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Self::Empty;
        }

        if let Some(prefix) = input.strip_suffix('*') {
            let prefix = prefix.trim();
            if prefix.is_empty() {
                return Self::Empty;
            }
            return Self::Prefix(prefix.to_string());
        }

        // Only a leading quote opens a phrase; quotes elsewhere are term text.
        if let Some(rest) = input.strip_prefix('"') {
            return match rest.strip_suffix('"') {
                Some(phrase) if !phrase.trim().is_empty() => Self::Exact(phrase.trim().to_string()),
                _ => Self::Empty,
            };
        }

        Self::Terms(input)
    }
}

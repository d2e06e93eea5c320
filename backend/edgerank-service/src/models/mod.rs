use event_store::Post;
use serde::Serialize;
use std::sync::Arc;

/// Where a ranked post came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RankSource {
    Feed,     // recommended statuses
    Terms,    // multi-term search
    Phrase,   // exact phrase search
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedPost {
    pub post: Arc<Post>,
    /// Sort key: edge rank, plus relevance for term searches.
    pub score: f64,
    pub edge_rank: f64,
    pub relevance: Option<u32>,
    pub source: RankSource,
    /// Normalized terms to highlight when printing.
    pub matched_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexStats {
    pub users: usize,
    pub posts: usize,
    pub interactions: usize,
    pub graph_nodes: usize,
    pub base_edges: usize,
    pub propagated_edges: usize,
    pub indexed_words: usize,
}

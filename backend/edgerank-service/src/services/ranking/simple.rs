use super::scorer::edge_rank;
use crate::models::{RankSource, RankedPost};
use crate::services::affinity::AffinityGraph;
use crate::services::search::ScoredPost;
use chrono::{DateTime, Utc};
use event_store::Post;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Ranking Layer - edge-rank ordering against the propagated affinity graph
pub struct RankingLayer {
    graph: Arc<AffinityGraph>,
    as_of: DateTime<Utc>,
}

impl RankingLayer {
    pub fn new(graph: Arc<AffinityGraph>, as_of: DateTime<Utc>) -> Self {
        Self { graph, as_of }
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn edge_rank(&self, viewer: &str, post: &Post) -> f64 {
        edge_rank(&self.graph, viewer, post, self.as_of)
    }

    /// Every post ordered by edge rank for `viewer`, top `limit`.
    pub fn recommend<'a>(
        &self,
        viewer: &str,
        posts: impl IntoIterator<Item = &'a Arc<Post>>,
        limit: usize,
    ) -> Vec<RankedPost> {
        let ranked = posts
            .into_iter()
            .map(|post| {
                let edge_rank = self.edge_rank(viewer, post);
                RankedPost {
                    post: Arc::clone(post),
                    score: edge_rank,
                    edge_rank,
                    relevance: None,
                    source: RankSource::Feed,
                    matched_terms: Vec::new(),
                }
            })
            .collect();

        let ranked = sort_and_truncate(ranked, limit);
        debug!(viewer, returned = ranked.len(), "Feed ranked");
        ranked
    }

    /// Order term-search hits by relevance plus edge rank.
    pub fn rank_search_hits(
        &self,
        viewer: &str,
        hits: Vec<ScoredPost>,
        limit: usize,
    ) -> Vec<RankedPost> {
        let ranked = hits
            .into_iter()
            .map(|hit| {
                let edge_rank = self.edge_rank(viewer, &hit.post);
                RankedPost {
                    score: f64::from(hit.score) + edge_rank,
                    edge_rank,
                    relevance: Some(hit.score),
                    source: RankSource::Terms,
                    matched_terms: hit.matched_terms,
                    post: hit.post,
                }
            })
            .collect();

        sort_and_truncate(ranked, limit)
    }

    /// Order exact-phrase hits by edge rank alone.
    pub fn rank_exact(&self, viewer: &str, posts: Vec<Arc<Post>>, limit: usize) -> Vec<RankedPost> {
        let ranked = posts
            .into_iter()
            .map(|post| {
                let edge_rank = self.edge_rank(viewer, &post);
                RankedPost {
                    post,
                    score: edge_rank,
                    edge_rank,
                    relevance: None,
                    source: RankSource::Phrase,
                    matched_terms: Vec::new(),
                }
            })
            .collect();

        sort_and_truncate(ranked, limit)
    }
}

/// Descending by score; ties fall back to post id so output is stable.
fn sort_and_truncate(mut ranked: Vec<RankedPost>, limit: usize) -> Vec<RankedPost> {
    // NaN scores compare equal and are ordered by id
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.post.id.cmp(&b.post.id))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(id: &str, author: &str, likes: u32, age_days: i64, as_of: DateTime<Utc>) -> Arc<Post> {
        Arc::new(Post {
            id: id.to_string(),
            message: format!("post {id}"),
            status_type: "status".to_string(),
            link: String::new(),
            published_at: as_of - Duration::days(age_days),
            author: author.to_string(),
            reaction_count: likes,
            comment_count: 0,
            share_count: 0,
            like_count: likes,
            love_count: 0,
            wow_count: 0,
            haha_count: 0,
            sad_count: 0,
            angry_count: 0,
        })
    }

    fn layer(as_of: DateTime<Utc>) -> RankingLayer {
        let mut graph = AffinityGraph::default();
        graph.add_contribution("alice", "bob", 3.0, true);
        RankingLayer::new(Arc::new(graph), as_of)
    }

    #[test]
    fn test_recommend_orders_descending() {
        let as_of = Utc::now();
        let posts = vec![
            post("p1", "carol", 2, 0, as_of),
            post("p2", "bob", 2, 0, as_of),
            post("p3", "carol", 40, 0, as_of),
        ];

        let ranked = layer(as_of).recommend("alice", &posts, 10);
        let ids: Vec<&str> = ranked.iter().map(|r| r.post.id.as_str()).collect();
        // p3: 20, p2: 1 + 3, p1: 1
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_recommend_truncates_and_breaks_ties_by_id() {
        let as_of = Utc::now();
        let posts = vec![
            post("b", "carol", 2, 0, as_of),
            post("a", "carol", 2, 0, as_of),
            post("c", "carol", 2, 0, as_of),
        ];

        let ranked = layer(as_of).recommend("alice", &posts, 2);
        let ids: Vec<&str> = ranked.iter().map(|r| r.post.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_rank_search_hits_adds_relevance() {
        let as_of = Utc::now();
        let hits = vec![
            ScoredPost {
                score: 12,
                post: post("p1", "carol", 0, 0, as_of),
                matched_terms: vec!["quick".into(), "fox".into()],
            },
            ScoredPost {
                score: 1,
                post: post("p2", "bob", 0, 0, as_of),
                matched_terms: vec!["fox".into()],
            },
        ];

        let ranked = layer(as_of).rank_search_hits("alice", hits, 10);
        assert_eq!(ranked[0].post.id, "p1");
        assert_eq!(ranked[0].relevance, Some(12));
        assert!((ranked[1].score - 4.0).abs() < 1e-12);
        assert_eq!(ranked[1].source, RankSource::Terms);
    }

    #[test]
    fn test_rank_exact_uses_edge_rank() {
        let as_of = Utc::now();
        let posts = vec![post("p1", "carol", 0, 0, as_of), post("p2", "bob", 0, 0, as_of)];

        let ranked = layer(as_of).rank_exact("alice", posts, 10);
        assert_eq!(ranked[0].post.id, "p2");
        assert_eq!(ranked[0].score, ranked[0].edge_rank);
    }
}

/// Post Scoring Module
///
/// Engagement, staged content decay and the final edge-rank score.
use crate::services::affinity::AffinityGraph;
use crate::utils::{decay_divisor, elapsed_days};
use chrono::{DateTime, Utc};
use event_store::Post;

// Engagement weights per counter
const COMMENT_WEIGHT: f64 = 1.0;
const SHARE_WEIGHT: f64 = 2.0;
const LIKE_WEIGHT: f64 = 0.5;
const LOVE_WEIGHT: f64 = 1.0;
const WOW_WEIGHT: f64 = 1.5;
const HAHA_WEIGHT: f64 = 0.5;
const SAD_WEIGHT: f64 = 0.25;
const ANGRY_WEIGHT: f64 = 0.25;

/// Weighted sum of a post's engagement counters.
///
/// The haha and sad terms are multiplied together rather than summed, so a
/// post with only one of the two gets nothing from either. Existing rankings
/// depend on this, so it is kept as is.
pub fn engagement_score(post: &Post) -> f64 {
    f64::from(post.comment_count) * COMMENT_WEIGHT
        + f64::from(post.share_count) * SHARE_WEIGHT
        + f64::from(post.like_count) * LIKE_WEIGHT
        + f64::from(post.love_count) * LOVE_WEIGHT
        + f64::from(post.wow_count) * WOW_WEIGHT
        + f64::from(post.haha_count) * HAHA_WEIGHT * f64::from(post.sad_count) * SAD_WEIGHT
        + f64::from(post.angry_count) * ANGRY_WEIGHT
}

/// Staged decay on whole days of age: flat on day zero, then 5x, then 20x
/// from the third day on.
pub fn time_decay(age_days: i64) -> f64 {
    if age_days < 1 {
        1.0
    } else if age_days < 3 {
        5.0 * age_days as f64
    } else {
        20.0 * age_days as f64
    }
}

pub fn content_score(post: &Post, as_of: DateTime<Utc>) -> f64 {
    engagement_score(post) / time_decay(elapsed_days(as_of, post.published_at))
}

/// Content score plus the viewer's affinity toward the author, scaled down by
/// the post's age. Unknown viewers and strangers get the content score only.
pub fn edge_rank(graph: &AffinityGraph, viewer: &str, post: &Post, as_of: DateTime<Utc>) -> f64 {
    let affinity = graph.edge_weight(viewer, &post.author).unwrap_or(0.0);
    let age_days = elapsed_days(as_of, post.published_at);
    (content_score(post, as_of) + affinity) / decay_divisor(age_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(published_at: DateTime<Utc>) -> Post {
        Post {
            id: "p1".to_string(),
            message: "hello".to_string(),
            status_type: "status".to_string(),
            link: String::new(),
            published_at,
            author: "bob".to_string(),
            reaction_count: 0,
            comment_count: 0,
            share_count: 0,
            like_count: 0,
            love_count: 0,
            wow_count: 0,
            haha_count: 0,
            sad_count: 0,
            angry_count: 0,
        }
    }

    #[test]
    fn test_engagement_weights() {
        let mut p = post(Utc::now());
        p.comment_count = 2;
        p.share_count = 1;
        p.like_count = 4;
        p.love_count = 1;
        p.wow_count = 2;
        p.angry_count = 4;
        // 2 + 2 + 2 + 1 + 3 + 1
        assert!((engagement_score(&p) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_haha_and_sad_multiply() {
        let mut p = post(Utc::now());
        p.haha_count = 4;
        assert_eq!(engagement_score(&p), 0.0);

        p.sad_count = 2;
        // 4 * 0.5 * 2 * 0.25
        assert!((engagement_score(&p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_decay_stages() {
        assert_eq!(time_decay(-2), 1.0);
        assert_eq!(time_decay(0), 1.0);
        assert_eq!(time_decay(1), 5.0);
        assert_eq!(time_decay(2), 10.0);
        assert_eq!(time_decay(3), 60.0);
        assert_eq!(time_decay(10), 200.0);
    }

    #[test]
    fn test_content_score_non_negative() {
        let now = Utc::now();
        let mut p = post(now + Duration::days(3));
        assert!(content_score(&p, now) >= 0.0);

        p.like_count = 10;
        p.published_at = now - Duration::days(2);
        assert!((content_score(&p, now) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_edge_rank_with_and_without_affinity() {
        let now = Utc::now();
        let mut p = post(now - Duration::days(2));
        p.like_count = 20; // engagement 10, content 10 / 10 = 1

        let mut graph = AffinityGraph::default();
        graph.add_contribution("alice", "bob", 3.0, true);

        assert!((edge_rank(&graph, "alice", &p, now) - 2.0).abs() < 1e-12);
        assert!((edge_rank(&graph, "carol", &p, now) - 0.5).abs() < 1e-12);
        assert!((edge_rank(&graph, "nobody", &p, now) - 0.5).abs() < 1e-12);
    }
}

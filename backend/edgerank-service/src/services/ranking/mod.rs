/// Ranking Module
///
/// Orders posts for a viewer by edge rank.
///
/// # Workflow
/// 1. Engagement counters → content score, decayed in stages by age
/// 2. Add the viewer's propagated affinity toward the author
/// 3. Divide by age in days (at least one)
/// 4. Term searches add relevance on top before sorting
pub mod scorer;
pub mod simple;

pub use scorer::{content_score, edge_rank, engagement_score, time_decay};
pub use simple::RankingLayer;

pub mod affinity;
pub mod ranking;
pub mod search;
pub mod snapshot;

pub use affinity::{AffinityGraph, AffinityGraphBuilder};
pub use ranking::RankingLayer;
pub use search::{SearchRequest, Trie};
pub use snapshot::SnapshotStore;

pub mod config;
pub mod context;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

pub use config::Config;
pub use context::{FeedContext, SearchOutcome};
pub use services::{AffinityGraph, AffinityGraphBuilder, RankingLayer, SearchRequest, SnapshotStore, Trie};
pub use session::Session;

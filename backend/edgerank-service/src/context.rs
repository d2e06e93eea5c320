use crate::models::{IndexStats, RankedPost};
use crate::services::affinity::{propagate, AffinityGraph, AffinityGraphBuilder};
use crate::services::ranking::RankingLayer;
use crate::services::search::{SearchRequest, Trie};
use crate::services::snapshot::{FeedSnapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use event_store::EventStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Answer to one search request.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Words(Vec<String>),
    Posts(Vec<RankedPost>),
    Empty,
}

/// Everything queries need, built once and then read-only. Share it behind an
/// `Arc` across tasks.
pub struct FeedContext {
    store: Arc<EventStore>,
    base_graph: Arc<AffinityGraph>,
    graph: Arc<AffinityGraph>,
    trie: Arc<Trie>,
    ranking: RankingLayer,
}

impl FeedContext {
    /// Build both graphs and the search index from a validated store.
    pub fn build(store: EventStore, as_of: DateTime<Utc>) -> Self {
        let started = Instant::now();
        let base_graph = AffinityGraphBuilder::new(&store, as_of).build();
        let graph = propagate(&base_graph);
        let trie = Trie::build(store.posts());

        let context = Self::assemble(store, base_graph, graph, trie, as_of);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            as_of = %as_of,
            "Feed context built"
        );
        context
    }

    pub fn from_snapshot(snapshot: FeedSnapshot, as_of: DateTime<Utc>) -> Self {
        Self::assemble(
            snapshot.store,
            snapshot.base_graph,
            snapshot.graph,
            snapshot.trie,
            as_of,
        )
    }

    fn assemble(
        store: EventStore,
        base_graph: AffinityGraph,
        graph: AffinityGraph,
        trie: Trie,
        as_of: DateTime<Utc>,
    ) -> Self {
        let graph = Arc::new(graph);
        Self {
            store: Arc::new(store),
            base_graph: Arc::new(base_graph),
            ranking: RankingLayer::new(Arc::clone(&graph), as_of),
            graph,
            trie: Arc::new(trie),
        }
    }

    pub async fn write_snapshot(&self, snapshots: &SnapshotStore) -> crate::services::snapshot::Result<()> {
        snapshots
            .write(&self.store, &self.base_graph, &self.graph, &self.trie)
            .await
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Affinity before friend-of-friend propagation.
    pub fn base_graph(&self) -> &AffinityGraph {
        &self.base_graph
    }

    /// Affinity used for ranking.
    pub fn graph(&self) -> &AffinityGraph {
        &self.graph
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.ranking.as_of()
    }

    pub fn edge_rank(&self, viewer: &str, post_id: &str) -> Option<f64> {
        self.store
            .post(post_id)
            .map(|post| self.ranking.edge_rank(viewer, post))
    }

    pub fn recommend(&self, viewer: &str, limit: usize) -> Vec<RankedPost> {
        self.ranking.recommend(viewer, self.store.posts(), limit)
    }

    pub fn search(&self, viewer: &str, request: &SearchRequest, limit: usize) -> SearchOutcome {
        let outcome = match request {
            SearchRequest::Prefix(prefix) => SearchOutcome::Words(self.trie.search_prefix(prefix)),
            SearchRequest::Exact(phrase) => {
                let hits = self.trie.search_exact_query(phrase);
                SearchOutcome::Posts(self.ranking.rank_exact(viewer, hits, limit))
            }
            SearchRequest::Terms(query) => {
                let hits = self.trie.search_query(query);
                SearchOutcome::Posts(self.ranking.rank_search_hits(viewer, hits, limit))
            }
            SearchRequest::Empty => SearchOutcome::Empty,
        };

        debug!(viewer, request = ?request, "Search served");
        outcome
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            users: self.store.users().len(),
            posts: self.store.post_count(),
            interactions: self.store.shares().len()
                + self.store.reactions().len()
                + self.store.comments().len(),
            graph_nodes: self.graph.node_count(),
            base_edges: self.base_graph.edge_count(),
            propagated_edges: self.graph.edge_count(),
            indexed_words: self.trie.word_count(),
        }
    }
}

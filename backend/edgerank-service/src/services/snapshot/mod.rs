/// Snapshot Module
///
/// Persists a built feed (entities, both affinity graphs and the search
/// index) as JSON files in one directory, and loads them back with the same
/// invariants a fresh build guarantees.
use crate::services::affinity::{AffinityError, AffinityGraph};
use crate::services::search::{SearchError, Trie};
use event_store::EventStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const GRAPH_FILE: &str = "graph.json";
pub const BASE_GRAPH_FILE: &str = "base_graph.json";
pub const TRIE_FILE: &str = "trie.json";
pub const ENTITIES_FILE: &str = "entities.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Affinity graph in {path} is inconsistent: {source}")]
    Graph {
        path: PathBuf,
        #[source]
        source: AffinityError,
    },

    #[error("Search index in {path} is inconsistent: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: SearchError,
    },

    #[error("Snapshot is inconsistent: {0}")]
    Mismatch(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Everything needed to serve queries without re-reading the raw events.
#[derive(Debug)]
pub struct FeedSnapshot {
    pub store: EventStore,
    pub base_graph: AffinityGraph,
    pub graph: AffinityGraph,
    pub trie: Trie,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write(
        &self,
        store: &EventStore,
        base_graph: &AffinityGraph,
        graph: &AffinityGraph,
        trie: &Trie,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SnapshotError::Io {
                path: self.dir.clone(),
                source,
            })?;

        self.write_file(ENTITIES_FILE, store).await?;
        self.write_file(BASE_GRAPH_FILE, base_graph).await?;
        self.write_file(GRAPH_FILE, graph).await?;
        self.write_file(TRIE_FILE, trie).await?;

        info!(dir = %self.dir.display(), "Snapshot written");
        Ok(())
    }

    /// Load and validate all four files. The entity store revalidates its
    /// references while deserializing; graphs and index are checked here.
    pub async fn load(&self) -> Result<FeedSnapshot> {
        let store: EventStore = self.read_file(ENTITIES_FILE).await?;
        let base_graph: AffinityGraph = self.read_file(BASE_GRAPH_FILE).await?;
        let graph: AffinityGraph = self.read_file(GRAPH_FILE).await?;
        let trie: Trie = self.read_file(TRIE_FILE).await?;

        for (file, g) in [(BASE_GRAPH_FILE, &base_graph), (GRAPH_FILE, &graph)] {
            g.validate().map_err(|source| SnapshotError::Graph {
                path: self.dir.join(file),
                source,
            })?;
            if let Some(user) = store.users().iter().find(|user| !g.contains_node(user)) {
                return Err(SnapshotError::Mismatch(format!(
                    "user {user} is missing from {file}"
                )));
            }
        }

        trie.validate().map_err(|source| SnapshotError::Index {
            path: self.dir.join(TRIE_FILE),
            source,
        })?;
        if let Some(post_id) = trie.post_ids().into_iter().find(|id| store.post(id).is_none()) {
            return Err(SnapshotError::Mismatch(format!(
                "indexed post {post_id} is missing from {ENTITIES_FILE}"
            )));
        }

        info!(
            dir = %self.dir.display(),
            users = store.users().len(),
            posts = store.post_count(),
            edges = graph.edge_count(),
            words = trie.word_count(),
            "Snapshot loaded"
        );

        Ok(FeedSnapshot {
            store,
            base_graph,
            graph,
            trie,
        })
    }

    async fn write_file<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let bytes = serde_json::to_vec(value).map_err(|source| SnapshotError::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Snapshot file written");
        Ok(())
    }

    async fn read_file<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Json { path, source })
    }
}

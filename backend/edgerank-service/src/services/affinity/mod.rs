/// Affinity Module
///
/// Weighted, directed user→user graph describing how strongly each user is
/// drawn to another user's content.
///
/// # Architecture
/// - **Builder**: accumulates friendship baselines and time-decayed share,
///   reaction and comment contributions in a single pass
/// - **Propagation**: derives a second graph with attenuated friend-of-friend
///   affinity layered on top of the built one
///
/// Both stages return a fresh [`AffinityGraph`]; a graph is never mutated once
/// it leaves this module.
pub mod builder;
pub mod propagation;

pub use builder::{reaction_weight, AffinityGraphBuilder};
pub use propagation::propagate;

use event_store::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("self edge on {0}")]
    SelfEdge(String),

    #[error("edge {from} -> {to} references a user outside the node set")]
    DanglingEdge { from: String, to: String },

    #[error("edge {from} -> {to} has invalid weight {weight}")]
    InvalidWeight { from: String, to: String, weight: f64 },
}

pub type Result<T> = std::result::Result<T, AffinityError>;

/// Accumulated affinity from one user toward another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinityEdge {
    pub weight: f64,
    pub is_friend: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffinityGraph {
    nodes: BTreeSet<UserId>,
    /// from → (to → edge)
    edges: BTreeMap<UserId, BTreeMap<UserId, AffinityEdge>>,
}

impl AffinityGraph {
    pub(crate) fn with_nodes(nodes: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            edges: BTreeMap::new(),
        }
    }

    /// Add `weight` to the edge `from → to`, creating it if absent.
    /// `is_friend` is OR-ed into the existing flag. Self edges are dropped.
    pub(crate) fn add_contribution(&mut self, from: &str, to: &str, weight: f64, is_friend: bool) {
        if from == to {
            return;
        }
        self.nodes.insert(from.to_string());
        self.nodes.insert(to.to_string());

        let edge = self
            .edges
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_insert(AffinityEdge {
                weight: 0.0,
                is_friend: false,
            });
        edge.weight += weight;
        edge.is_friend |= is_friend;
    }

    pub(crate) fn mark_friend(&mut self, from: &str, to: &str) {
        if let Some(edge) = self.edges.get_mut(from).and_then(|out| out.get_mut(to)) {
            edge.is_friend = true;
        }
    }

    /// Sum every edge of `other` into `self`.
    pub(crate) fn merge(&mut self, other: AffinityGraph) {
        self.nodes.extend(other.nodes);
        for (from, out) in other.edges {
            for (to, edge) in out {
                self.add_contribution(&from, &to, edge.weight, edge.is_friend);
            }
        }
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&AffinityEdge> {
        self.edges.get(from).and_then(|out| out.get(to))
    }

    /// Accumulated weight of `from → to`; `None` for unknown users or when the
    /// two have never interacted.
    pub fn edge_weight(&self, from: &str, to: &str) -> Option<f64> {
        self.edge(from, to).map(|edge| edge.weight)
    }

    pub fn edge_is_friend(&self, from: &str, to: &str) -> bool {
        self.edge(from, to).map_or(false, |edge| edge.is_friend)
    }

    /// Outgoing edges of `user`, ordered by target id.
    pub fn neighbors<'a>(
        &'a self,
        user: &str,
    ) -> impl Iterator<Item = (&'a UserId, &'a AffinityEdge)> + 'a {
        self.edges.get(user).into_iter().flatten()
    }

    /// Outgoing edges of `user` that carry the friend flag.
    pub fn friend_neighbors<'a>(
        &'a self,
        user: &str,
    ) -> impl Iterator<Item = (&'a UserId, &'a AffinityEdge)> + 'a {
        self.neighbors(user).filter(|(_, edge)| edge.is_friend)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &UserId> {
        self.nodes.iter()
    }

    pub fn contains_node(&self, user: &str) -> bool {
        self.nodes.contains(user)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&UserId, &UserId, &AffinityEdge)> {
        self.edges
            .iter()
            .flat_map(|(from, out)| out.iter().map(move |(to, edge)| (from, to, edge)))
    }

    /// Check the invariants a built graph always satisfies. Used on graphs
    /// restored from a snapshot.
    pub fn validate(&self) -> Result<()> {
        for (from, to, edge) in self.edges() {
            if from == to {
                return Err(AffinityError::SelfEdge(from.clone()));
            }
            if !self.nodes.contains(from) || !self.nodes.contains(to) {
                return Err(AffinityError::DanglingEdge {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(AffinityError::InvalidWeight {
                    from: from.clone(),
                    to: to.clone(),
                    weight: edge.weight,
                });
            }
        }
        Ok(())
    }
}

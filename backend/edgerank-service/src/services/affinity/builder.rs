use super::AffinityGraph;
use crate::utils::decayed;
use chrono::{DateTime, Utc};
use event_store::{EventStore, Friendships, Interaction, ReactionKind};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Static weight of a friendship, in both directions.
pub const FRIENDSHIP_WEIGHT: f64 = 3.0;
/// Base weight of a share before time decay.
pub const SHARE_WEIGHT: f64 = 2.0;
/// Base weight of a comment before time decay.
pub const COMMENT_WEIGHT: f64 = 1.0;

/// Base weight of a reaction before time decay.
pub fn reaction_weight(kind: ReactionKind) -> f64 {
    match kind {
        ReactionKind::Like => 0.5,
        ReactionKind::Love => 1.0,
        ReactionKind::Wow => 1.5,
        ReactionKind::Haha => 0.5,
        ReactionKind::Sad => 0.25,
        ReactionKind::Angry => 0.75,
        ReactionKind::Special => 0.0,
    }
}

/// Builds the base affinity graph from a validated [`EventStore`].
///
/// Each event category is accumulated into its own partial graph on a scoped
/// thread. Partials are merged in a fixed order, so the result does not depend
/// on thread scheduling, and friend flags are settled by a sweep over the
/// merged graph afterwards.
pub struct AffinityGraphBuilder<'a> {
    store: &'a EventStore,
    as_of: DateTime<Utc>,
}

impl<'a> AffinityGraphBuilder<'a> {
    /// `as_of` is the reference time all event ages are measured against.
    pub fn new(store: &'a EventStore, as_of: DateTime<Utc>) -> Self {
        Self { store, as_of }
    }

    pub fn build(&self) -> AffinityGraph {
        let started = Instant::now();
        let mut graph = AffinityGraph::with_nodes(self.store.users().iter().cloned());
        graph.merge(self.friendship_baseline());

        let (shares, reactions, comments) = std::thread::scope(|scope| {
            let shares = scope.spawn(|| self.accumulate(self.store.shares(), |_| SHARE_WEIGHT));
            let reactions = scope.spawn(|| {
                self.accumulate(self.store.reactions(), |reaction| {
                    reaction_weight(reaction.kind)
                })
            });
            let comments = self.accumulate(self.store.comments(), |_| COMMENT_WEIGHT);

            (join_partial(shares), join_partial(reactions), comments)
        });

        graph.merge(shares);
        graph.merge(reactions);
        graph.merge(comments);

        let sweeps = settle_friend_flags(&mut graph, self.store.friendships());

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            friend_flag_sweeps = sweeps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Affinity graph built"
        );

        graph
    }

    fn friendship_baseline(&self) -> AffinityGraph {
        let mut partial = AffinityGraph::default();
        for (a, b) in self.store.friendships().pairs() {
            partial.add_contribution(a, b, FRIENDSHIP_WEIGHT, true);
            partial.add_contribution(b, a, FRIENDSHIP_WEIGHT, true);
        }
        partial
    }

    /// One pass over `events`, each contributing `base_weight / max(1, age)`
    /// to `actor → author`.
    fn accumulate<E, F>(&self, events: &[E], base_weight: F) -> AffinityGraph
    where
        E: Interaction,
        F: Fn(&E) -> f64,
    {
        let mut partial = AffinityGraph::default();
        for event in events {
            let Some(author) = self.store.author_of(event.post_id()) else {
                warn!(
                    post_id = event.post_id(),
                    actor = event.actor(),
                    "Interaction targets a post missing from the store, skipping"
                );
                continue;
            };
            let contribution = decayed(base_weight(event), self.as_of, event.occurred_at());
            partial.add_contribution(event.actor(), author, contribution, false);
        }
        debug!(events = events.len(), edges = partial.edge_count(), "Partial graph accumulated");
        partial
    }
}

fn join_partial(handle: std::thread::ScopedJoinHandle<'_, AffinityGraph>) -> AffinityGraph {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Raise `is_friend` on every edge `a → b` where `b` is in `a`'s friend list
/// or `b → a` is already flagged. Repeats until nothing changes and returns
/// the number of sweeps that changed at least one edge.
fn settle_friend_flags(graph: &mut AffinityGraph, friendships: &Friendships) -> usize {
    let mut sweeps = 0;
    loop {
        let pending: Vec<(String, String)> = graph
            .edges()
            .filter(|(from, to, edge)| {
                !edge.is_friend
                    && (friendships.are_friends(from, to) || graph.edge_is_friend(to, from))
            })
            .map(|(from, to, _)| (from.clone(), to.clone()))
            .collect();

        if pending.is_empty() {
            return sweeps;
        }
        for (from, to) in &pending {
            graph.mark_friend(from, to);
        }
        sweeps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use event_store::{Comment, Post, Reaction, Share};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 6, 1, 12, 0, 0).unwrap()
    }

    fn post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            message: String::new(),
            status_type: "status".to_string(),
            link: String::new(),
            published_at: as_of() - Duration::days(30),
            author: author.to_string(),
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

    fn share(actor: &str, post_id: &str, days_ago: i64) -> Share {
        Share {
            actor: actor.to_string(),
            post_id: post_id.to_string(),
            shared_at: as_of() - Duration::days(days_ago),
        }
    }

    fn reaction(actor: &str, post_id: &str, kind: ReactionKind, days_ago: i64) -> Reaction {
        Reaction {
            actor: actor.to_string(),
            post_id: post_id.to_string(),
            kind,
            reacted_at: as_of() - Duration::days(days_ago),
        }
    }

    fn comment(actor: &str, post_id: &str, days_ago: i64) -> Comment {
        Comment {
            id: format!("{actor}-{post_id}-{days_ago}"),
            actor: actor.to_string(),
            post_id: post_id.to_string(),
            parent_id: None,
            message: String::new(),
            published_at: as_of() - Duration::days(days_ago),
            reaction_count: 0,
            like_count: 0,
        }
    }

    fn store(shares: Vec<Share>, reactions: Vec<Reaction>, comments: Vec<Comment>) -> EventStore {
        let friendships = Friendships::from_adjacency(vec![
            ("alice".to_string(), vec!["bob".to_string()]),
            ("carol".to_string(), Vec::new()),
        ]);
        EventStore::new(
            Vec::new(),
            friendships,
            vec![post("p_bob", "bob"), post("p_carol", "carol"), post("p_alice", "alice")],
            shares,
            reactions,
            comments,
        )
        .unwrap()
    }

    #[test]
    fn test_friendship_baseline() {
        let store = store(Vec::new(), Vec::new(), Vec::new());
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        assert_eq!(graph.edge_weight("alice", "bob"), Some(3.0));
        assert_eq!(graph.edge_weight("bob", "alice"), Some(3.0));
        assert!(graph.edge_is_friend("alice", "bob"));
        assert!(graph.edge_is_friend("bob", "alice"));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_interactions_accumulate_with_decay() {
        let store = store(
            vec![share("alice", "p_carol", 4)],
            vec![reaction("alice", "p_carol", ReactionKind::Wow, 0)],
            vec![comment("alice", "p_carol", 2)],
        );
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        // 2.0 / 4 + 1.5 / 1 + 1.0 / 2
        let weight = graph.edge_weight("alice", "carol").unwrap();
        assert!((weight - 2.5).abs() < 1e-12);
        assert!(!graph.edge_is_friend("alice", "carol"));
    }

    #[test]
    fn test_interaction_between_friends_keeps_friend_flag() {
        let store = store(vec![share("alice", "p_bob", 1)], Vec::new(), Vec::new());
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        assert!((graph.edge_weight("alice", "bob").unwrap() - 5.0).abs() < 1e-12);
        assert!(graph.edge_is_friend("alice", "bob"));
    }

    #[test]
    fn test_no_self_affinity() {
        let store = store(
            vec![share("alice", "p_alice", 1)],
            vec![reaction("bob", "p_bob", ReactionKind::Love, 1)],
            vec![comment("carol", "p_carol", 1)],
        );
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        for user in ["alice", "bob", "carol"] {
            assert_eq!(graph.edge_weight(user, user), None);
        }
    }

    #[test]
    fn test_future_events_are_clamped() {
        let store = store(vec![share("carol", "p_alice", -3)], Vec::new(), Vec::new());
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        assert_eq!(graph.edge_weight("carol", "alice"), Some(SHARE_WEIGHT));
    }

    #[test]
    fn test_older_events_contribute_less() {
        let recent = store(vec![share("carol", "p_alice", 1)], Vec::new(), Vec::new());
        let old = store(vec![share("carol", "p_alice", 10)], Vec::new(), Vec::new());

        let recent = AffinityGraphBuilder::new(&recent, as_of()).build();
        let old = AffinityGraphBuilder::new(&old, as_of()).build();

        assert!(old.edge_weight("carol", "alice").unwrap() < recent.edge_weight("carol", "alice").unwrap());
    }

    #[test]
    fn test_special_reaction_creates_zero_weight_edge() {
        let store = store(
            Vec::new(),
            vec![reaction("carol", "p_bob", ReactionKind::Special, 1)],
            Vec::new(),
        );
        let graph = AffinityGraphBuilder::new(&store, as_of()).build();

        assert_eq!(graph.edge_weight("carol", "bob"), Some(0.0));
    }

    #[test]
    fn test_event_order_does_not_change_graph() {
        let shares = vec![
            share("alice", "p_carol", 3),
            share("carol", "p_bob", 1),
            share("bob", "p_carol", 7),
        ];
        let reactions = vec![
            reaction("carol", "p_alice", ReactionKind::Haha, 2),
            reaction("alice", "p_carol", ReactionKind::Angry, 5),
            reaction("bob", "p_alice", ReactionKind::Sad, 0),
        ];
        let comments = vec![
            comment("carol", "p_alice", 9),
            comment("alice", "p_bob", 2),
            comment("alice", "p_carol", 1),
        ];

        let forward = store(shares.clone(), reactions.clone(), comments.clone());
        let reversed = store(
            shares.into_iter().rev().collect(),
            reactions.into_iter().rev().collect(),
            comments.into_iter().rev().collect(),
        );

        let forward = AffinityGraphBuilder::new(&forward, as_of()).build();
        let reversed = AffinityGraphBuilder::new(&reversed, as_of()).build();

        assert_eq!(forward.edge_count(), reversed.edge_count());
        for (from, to, edge) in forward.edges() {
            let other = reversed.edge(from, to).expect("edge missing after reorder");
            assert!((edge.weight - other.weight).abs() < 1e-9);
            assert_eq!(edge.is_friend, other.is_friend);
        }
    }

    #[test]
    fn test_reaction_weights() {
        assert_eq!(reaction_weight(ReactionKind::Like), 0.5);
        assert_eq!(reaction_weight(ReactionKind::Love), 1.0);
        assert_eq!(reaction_weight(ReactionKind::Wow), 1.5);
        assert_eq!(reaction_weight(ReactionKind::Haha), 0.5);
        assert_eq!(reaction_weight(ReactionKind::Sad), 0.25);
        assert_eq!(reaction_weight(ReactionKind::Angry), 0.75);
        assert_eq!(reaction_weight(ReactionKind::Special), 0.0);
    }
}

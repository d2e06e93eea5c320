//! Immutable store of posts, friendships and interaction events.
//!
//! The store is validated once when it is constructed: every event must point
//! at an ingested post, and every post author and event actor must be a known
//! user. Nothing downstream re-checks these references.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub mod csv_source;
pub mod error;
pub mod models;

pub use csv_source::CsvEventSource;
pub use error::{Result, StoreError};
pub use models::{
    Comment, Friendships, Interaction, InteractionEvent, Post, PostId, Reaction, ReactionKind,
    Share, UserId,
};

/// Source of a fully materialized [`EventStore`].
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn load(&self) -> Result<EventStore>;
}

/// Serialized shape of the store. Deserializing goes through
/// [`EventStore::new`], so a snapshot is validated exactly like fresh input.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEventStore {
    users: BTreeSet<UserId>,
    friendships: Friendships,
    posts: Vec<Post>,
    shares: Vec<Share>,
    reactions: Vec<Reaction>,
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawEventStore", into = "RawEventStore")]
pub struct EventStore {
    users: BTreeSet<UserId>,
    friendships: Friendships,
    posts: BTreeMap<PostId, Arc<Post>>,
    shares: Vec<Share>,
    reactions: Vec<Reaction>,
    comments: Vec<Comment>,
}

impl EventStore {
    /// Validate and assemble a store. Users listed in `friendships` are added
    /// to `users` automatically.
    pub fn new(
        users: impl IntoIterator<Item = UserId>,
        friendships: Friendships,
        posts: Vec<Post>,
        shares: Vec<Share>,
        reactions: Vec<Reaction>,
        comments: Vec<Comment>,
    ) -> Result<Self> {
        let mut users: BTreeSet<UserId> = users.into_iter().collect();
        users.extend(friendships.users().cloned());

        let mut post_map = BTreeMap::new();
        for post in posts {
            if !users.contains(&post.author) {
                return Err(StoreError::UnknownUser {
                    user_id: post.author.clone(),
                    record: format!("post {}", post.id),
                });
            }
            if post_map.contains_key(&post.id) {
                return Err(StoreError::DuplicatePost(post.id));
            }
            post_map.insert(post.id.clone(), Arc::new(post));
        }

        let store = Self {
            users,
            friendships,
            posts: post_map,
            shares,
            reactions,
            comments,
        };
        store.validate_interactions()?;

        tracing::debug!(
            users = store.users.len(),
            posts = store.posts.len(),
            shares = store.shares.len(),
            reactions = store.reactions.len(),
            comments = store.comments.len(),
            "Event store assembled"
        );

        Ok(store)
    }

    fn validate_interactions(&self) -> Result<()> {
        for (index, event) in self.interactions().enumerate() {
            let record = || format!("{} #{} by {}", event.kind(), index, event.actor());
            if !self.posts.contains_key(event.post_id()) {
                return Err(StoreError::UnknownPost {
                    post_id: event.post_id().to_string(),
                    record: record(),
                });
            }
            if !self.users.contains(event.actor()) {
                return Err(StoreError::UnknownUser {
                    user_id: event.actor().to_string(),
                    record: record(),
                });
            }
        }
        Ok(())
    }

    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.users
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.users.contains(user)
    }

    pub fn friendships(&self) -> &Friendships {
        &self.friendships
    }

    pub fn post(&self, id: &str) -> Option<&Arc<Post>> {
        self.posts.get(id)
    }

    pub fn posts(&self) -> impl Iterator<Item = &Arc<Post>> {
        self.posts.values()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Every interaction event, shares first, then reactions, then comments.
    pub fn interactions(&self) -> impl Iterator<Item = InteractionEvent<'_>> {
        self.shares
            .iter()
            .map(InteractionEvent::Share)
            .chain(self.reactions.iter().map(InteractionEvent::Reaction))
            .chain(self.comments.iter().map(InteractionEvent::Comment))
    }

    /// Author of the post an interaction targets. Always present for a
    /// validated store.
    pub fn author_of(&self, post_id: &str) -> Option<&str> {
        self.posts.get(post_id).map(|post| post.author.as_str())
    }
}

impl TryFrom<RawEventStore> for EventStore {
    type Error = StoreError;

    fn try_from(raw: RawEventStore) -> Result<Self> {
        EventStore::new(
            raw.users,
            raw.friendships,
            raw.posts,
            raw.shares,
            raw.reactions,
            raw.comments,
        )
    }
}

impl From<EventStore> for RawEventStore {
    fn from(store: EventStore) -> Self {
        RawEventStore {
            users: store.users,
            friendships: store.friendships,
            posts: store
                .posts
                .into_values()
                .map(|post| Arc::try_unwrap(post).unwrap_or_else(|shared| (*shared).clone()))
                .collect(),
            shares: store.shares,
            reactions: store.reactions,
            comments: store.comments,
        }
    }
}

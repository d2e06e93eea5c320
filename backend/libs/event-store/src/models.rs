use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type UserId = String;
pub type PostId = String;

/// A published status. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub message: String,
    pub status_type: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub author: UserId,
    pub reaction_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub like_count: u32,
    pub love_count: u32,
    pub wow_count: u32,
    pub haha_count: u32,
    pub sad_count: u32,
    pub angry_count: u32,
}

/// Reaction types. The dataset spells them in plural ("likes", "wows").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    #[serde(alias = "likes")]
    Like,
    #[serde(alias = "loves")]
    Love,
    #[serde(alias = "wows")]
    Wow,
    #[serde(alias = "hahas")]
    Haha,
    #[serde(alias = "sads")]
    Sad,
    #[serde(alias = "angrys")]
    Angry,
    Special,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Wow => "wow",
            ReactionKind::Haha => "haha",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
            ReactionKind::Special => "special",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub actor: UserId,
    pub post_id: PostId,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub actor: UserId,
    pub post_id: PostId,
    pub kind: ReactionKind,
    pub reacted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub actor: UserId,
    pub post_id: PostId,
    pub parent_id: Option<String>,
    pub message: String,
    pub published_at: DateTime<Utc>,
    pub reaction_count: u32,
    pub like_count: u32,
}

/// Common view over the three interaction event types.
pub trait Interaction {
    fn actor(&self) -> &str;
    fn post_id(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

impl Interaction for Share {
    fn actor(&self) -> &str {
        &self.actor
    }

    fn post_id(&self) -> &str {
        &self.post_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.shared_at
    }
}

impl Interaction for Reaction {
    fn actor(&self) -> &str {
        &self.actor
    }

    fn post_id(&self) -> &str {
        &self.post_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.reacted_at
    }
}

impl Interaction for Comment {
    fn actor(&self) -> &str {
        &self.actor
    }

    fn post_id(&self) -> &str {
        &self.post_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// Borrowed, type-tagged interaction used when all categories are walked together.
#[derive(Debug, Clone, Copy)]
pub enum InteractionEvent<'a> {
    Share(&'a Share),
    Reaction(&'a Reaction),
    Comment(&'a Comment),
}

impl InteractionEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionEvent::Share(_) => "share",
            InteractionEvent::Reaction(_) => "reaction",
            InteractionEvent::Comment(_) => "comment",
        }
    }

    fn inner(&self) -> &dyn Interaction {
        match self {
            InteractionEvent::Share(e) => *e,
            InteractionEvent::Reaction(e) => *e,
            InteractionEvent::Comment(e) => *e,
        }
    }
}

impl Interaction for InteractionEvent<'_> {
    fn actor(&self) -> &str {
        self.inner().actor()
    }

    fn post_id(&self) -> &str {
        self.inner().post_id()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.inner().occurred_at()
    }
}

/// Symmetric friendship adjacency.
///
/// Inserting A→B also records B→A, so lookups never depend on which side of
/// the pair listed the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Friendships {
    adjacency: BTreeMap<UserId, BTreeSet<UserId>>,
}

impl Friendships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `user -> [friend, ...]` rows.
    pub fn from_adjacency<I, F>(rows: I) -> Self
    where
        I: IntoIterator<Item = (UserId, F)>,
        F: IntoIterator<Item = UserId>,
    {
        let mut friendships = Self::new();
        for (user, friends) in rows {
            friendships.adjacency.entry(user.clone()).or_default();
            for friend in friends {
                friendships.insert(&user, &friend);
            }
        }
        friendships
    }

    /// Record a friendship. Self-friendship is ignored.
    pub fn insert(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub fn are_friends(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .map_or(false, |friends| friends.contains(b))
    }

    /// Every user that appears on either side of a friendship row.
    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.adjacency.keys()
    }

    /// Each unordered pair exactly once, smaller id first.
    pub fn pairs(&self) -> impl Iterator<Item = (&UserId, &UserId)> {
        self.adjacency.iter().flat_map(|(user, friends)| {
            friends
                .iter()
                .filter(move |friend| user < *friend)
                .map(move |friend| (user, friend))
        })
    }
}

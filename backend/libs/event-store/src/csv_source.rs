//! CSV ingestion for the status dataset.
//!
//! Layout under the data directory:
//! - `friends.csv`: `name, friend_count, friend...` (variable width)
//! - `<partition>_statuses.csv`, `<partition>_shares.csv`,
//!   `<partition>_reactions.csv`, `<partition>_comments.csv`
//!
//! Columns are matched by header name, so column order in the files does not
//! matter. Partition files that do not exist are skipped.

use crate::error::{Result, StoreError};
use crate::models::{Comment, Friendships, Post, Reaction, ReactionKind, Share, UserId};
use crate::{EventSource, EventStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp format used throughout the dataset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn de_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, Deserialize)]
struct StatusRow {
    status_id: String,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    status_type: String,
    #[serde(default)]
    status_link: String,
    #[serde(deserialize_with = "de_timestamp")]
    status_published: DateTime<Utc>,
    author: String,
    num_reactions: u32,
    num_comments: u32,
    num_shares: u32,
    num_likes: u32,
    num_loves: u32,
    num_wows: u32,
    num_hahas: u32,
    num_sads: u32,
    num_angrys: u32,
}

impl From<StatusRow> for Post {
    fn from(row: StatusRow) -> Self {
        Post {
            id: row.status_id,
            message: row.status_message,
            status_type: row.status_type,
            link: row.status_link,
            published_at: row.status_published,
            author: row.author.trim().to_string(),
            reaction_count: row.num_reactions,
            comment_count: row.num_comments,
            share_count: row.num_shares,
            like_count: row.num_likes,
            love_count: row.num_loves,
            wow_count: row.num_wows,
            haha_count: row.num_hahas,
            sad_count: row.num_sads,
            angry_count: row.num_angrys,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShareRow {
    status_id: String,
    sharer: String,
    #[serde(deserialize_with = "de_timestamp")]
    status_shared: DateTime<Utc>,
}

impl From<ShareRow> for Share {
    fn from(row: ShareRow) -> Self {
        Share {
            actor: row.sharer.trim().to_string(),
            post_id: row.status_id,
            shared_at: row.status_shared,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReactionRow {
    status_id: String,
    type_of_reaction: ReactionKind,
    reactor: String,
    #[serde(deserialize_with = "de_timestamp")]
    reacted: DateTime<Utc>,
}

impl From<ReactionRow> for Reaction {
    fn from(row: ReactionRow) -> Self {
        Reaction {
            actor: row.reactor.trim().to_string(),
            post_id: row.status_id,
            kind: row.type_of_reaction,
            reacted_at: row.reacted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    comment_id: String,
    status_id: String,
    #[serde(default, deserialize_with = "de_optional_string")]
    parent_id: Option<String>,
    #[serde(default)]
    comment_message: String,
    comment_author: String,
    #[serde(deserialize_with = "de_timestamp")]
    comment_published: DateTime<Utc>,
    #[serde(default)]
    num_reactions: u32,
    #[serde(default)]
    num_likes: u32,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.comment_id,
            actor: row.comment_author.trim().to_string(),
            post_id: row.status_id,
            parent_id: row.parent_id,
            message: row.comment_message,
            published_at: row.comment_published,
            reaction_count: row.num_reactions,
            like_count: row.num_likes,
        }
    }
}

fn csv_error(source_name: &str) -> impl Fn(csv::Error) -> StoreError + '_ {
    move |source| StoreError::Csv {
        path: source_name.to_string(),
        source,
    }
}

fn read_rows<R, Row, T>(reader: R, source_name: &str) -> Result<Vec<T>>
where
    R: Read,
    Row: for<'de> Deserialize<'de>,
    T: From<Row>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    csv_reader
        .deserialize::<Row>()
        .map(|row| row.map(T::from).map_err(csv_error(source_name)))
        .collect()
}

/// Parse `friends.csv`. The second column (declared friend count) is ignored;
/// the listed names are authoritative.
pub fn read_friends<R: Read>(reader: R, source_name: &str) -> Result<Vec<(UserId, Vec<UserId>)>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(csv_error(source_name))?;
        let Some(name) = record.get(0).map(str::trim).filter(|name| !name.is_empty()) else {
            continue;
        };
        let friends = record
            .iter()
            .skip(2)
            .map(str::trim)
            .filter(|friend| !friend.is_empty())
            .map(str::to_string)
            .collect();
        rows.push((name.to_string(), friends));
    }
    Ok(rows)
}

pub fn read_posts<R: Read>(reader: R, source_name: &str) -> Result<Vec<Post>> {
    read_rows::<R, StatusRow, Post>(reader, source_name)
}

pub fn read_shares<R: Read>(reader: R, source_name: &str) -> Result<Vec<Share>> {
    read_rows::<R, ShareRow, Share>(reader, source_name)
}

pub fn read_reactions<R: Read>(reader: R, source_name: &str) -> Result<Vec<Reaction>> {
    read_rows::<R, ReactionRow, Reaction>(reader, source_name)
}

pub fn read_comments<R: Read>(reader: R, source_name: &str) -> Result<Vec<Comment>> {
    read_rows::<R, CommentRow, Comment>(reader, source_name)
}

/// Loads the dataset from a directory of CSV files.
pub struct CsvEventSource {
    data_dir: PathBuf,
    partitions: Vec<String>,
}

impl CsvEventSource {
    pub fn new(data_dir: impl Into<PathBuf>, partitions: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            partitions,
        }
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read every existing `<partition>_<kind>.csv` and concatenate the rows.
    async fn read_partitioned<T>(
        &self,
        kind: &str,
        parse: fn(&[u8], &str) -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for partition in &self.partitions {
            let path = self.data_dir.join(format!("{partition}_{kind}.csv"));
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|source| StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            if !exists {
                warn!(path = %path.display(), "Dataset file missing, skipping");
                continue;
            }
            let bytes = Self::read_file(&path).await?;
            let parsed = parse(&bytes, &path.display().to_string())?;
            info!(path = %path.display(), rows = parsed.len(), "Loaded dataset file");
            rows.extend(parsed);
        }
        Ok(rows)
    }
}

#[async_trait]
impl EventSource for CsvEventSource {
    async fn load(&self) -> Result<EventStore> {
        let friends_path = self.data_dir.join("friends.csv");
        let bytes = Self::read_file(&friends_path).await?;
        let adjacency = read_friends(bytes.as_slice(), &friends_path.display().to_string())?;
        let users: Vec<UserId> = adjacency.iter().map(|(user, _)| user.clone()).collect();
        let friendships = Friendships::from_adjacency(adjacency);

        let posts = self
            .read_partitioned("statuses", |bytes, name| read_posts(bytes, name))
            .await?;
        let shares = self
            .read_partitioned("shares", |bytes, name| read_shares(bytes, name))
            .await?;
        let reactions = self
            .read_partitioned("reactions", |bytes, name| read_reactions(bytes, name))
            .await?;
        let comments = self
            .read_partitioned("comments", |bytes, name| read_comments(bytes, name))
            .await?;

        EventStore::new(users, friendships, posts, shares, reactions, comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2018-03-04 05:06:07").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2018, 3, 4));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (5, 6, 7));
        assert!(parse_timestamp("04/03/2018").is_err());
    }

    #[test]
    fn test_read_friends_flexible_rows() {
        let data = "Name,Count,Friends\nAlice,2,Bob,Carol\nBob,1,Alice\nDave,0\n";
        let rows = read_friends(data.as_bytes(), "friends.csv").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "Alice");
        assert_eq!(rows[0].1, vec!["Bob".to_string(), "Carol".to_string()]);
        assert!(rows[2].1.is_empty());
    }

    #[test]
    fn test_read_posts_by_header_name() {
        let data = "\
status_id,status_message,status_type,status_link,status_published,author,num_reactions,num_comments,num_shares,num_likes,num_loves,num_wows,num_hahas,num_sads,num_angrys
p1,\"Hello, world\",status,,2018-01-01 10:00:00,Alice,3,1,0,2,1,0,0,0,0
";
        let posts = read_posts(data.as_bytes(), "statuses.csv").unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].message, "Hello, world");
        assert_eq!(posts[0].author, "Alice");
        assert_eq!(posts[0].like_count, 2);
    }

    #[test]
    fn test_read_reactions_and_comments() {
        let reactions = "status_id,type_of_reaction,reactor,reacted\np1,loves,Bob,2018-01-02 00:00:00\n";
        let reactions = read_reactions(reactions.as_bytes(), "reactions.csv").unwrap();
        assert_eq!(reactions[0].kind, ReactionKind::Love);
        assert_eq!(reactions[0].actor, "Bob");

        let comments = "\
comment_id,status_id,parent_id,comment_message,comment_author,comment_published,num_reactions,num_likes
c1,p1,,nice,Bob,2018-01-02 00:00:00,0,0
";
        let comments = read_comments(comments.as_bytes(), "comments.csv").unwrap();
        assert_eq!(comments[0].actor, "Bob");
        assert!(comments[0].parent_id.is_none());
    }

    #[test]
    fn test_malformed_row_names_source() {
        let data = "status_id,sharer,status_shared\np1,Bob,yesterday\n";
        let err = read_shares(data.as_bytes(), "test_shares.csv").unwrap_err();
        assert!(err.to_string().contains("test_shares.csv"));
    }

    #[tokio::test]
    async fn test_csv_source_loads_partitions() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("friends.csv"), "Name,Count,Friends\nAlice,1,Bob\n").unwrap();
        std::fs::write(
            dir.join("original_statuses.csv"),
            "status_id,status_message,status_type,status_link,status_published,author,num_reactions,num_comments,num_shares,num_likes,num_loves,num_wows,num_hahas,num_sads,num_angrys\n\
             p1,hi,status,,2018-01-01 10:00:00,Alice,0,0,0,0,0,0,0,0,0\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("original_shares.csv"),
            "status_id,sharer,status_shared\np1,Bob,2018-01-02 10:00:00\n",
        )
        .unwrap();

        let source = CsvEventSource::new(dir, vec!["original".to_string(), "test".to_string()]);
        let store = source.load().await.unwrap();

        assert_eq!(store.post_count(), 1);
        assert_eq!(store.shares().len(), 1);
        assert!(store.reactions().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_partition_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("friends.csv"), "Name,Count,Friends\nAlice,1,Bob\n").unwrap();
        // a regular file used as a directory component
        std::fs::write(dir.join("blocker"), "").unwrap();

        let source = CsvEventSource::new(dir, vec!["blocker/original".to_string()]);
        let err = source.load().await.unwrap_err();

        assert!(matches!(err, StoreError::Io { ref path, .. } if path.contains("blocker")));
    }
}

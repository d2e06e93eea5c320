use super::normalize::{normalize_message, normalize_word};
use super::{Result, SearchError};
use event_store::{Post, PostId};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Bonus for posts already matched by earlier terms that also match the final
/// term of a multi-term query.
pub const LAST_TERM_BONUS: u32 = 10;

/// Occurrences of one word in one post.
#[derive(Debug, Clone)]
pub struct Posting {
    pub occurrences: u32,
    pub post: Arc<Post>,
}

pub type Postings = BTreeMap<PostId, Posting>;

static EMPTY_POSTINGS: Postings = BTreeMap::new();

/// A post matched by a multi-term query.
#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub score: u32,
    pub post: Arc<Post>,
    /// Normalized query terms that hit this post, in query order.
    pub matched_terms: Vec<String>,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    is_end_of_word: bool,
    postings: Postings,
}

// Tear the tree down with an explicit stack; the derived drop would recurse
// once per character of the longest word.
impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut stack: Vec<TrieNode> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}

/// Prefix tree over normalized words. Built once from the post corpus and
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    word_count: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every whitespace-separated word of every post message.
    pub fn build<'a>(posts: impl IntoIterator<Item = &'a Arc<Post>>) -> Self {
        let started = Instant::now();
        let mut trie = Self::new();
        let mut post_count = 0usize;
        for post in posts {
            for word in post.message.split_whitespace() {
                trie.insert(word, post);
            }
            post_count += 1;
        }

        info!(
            posts = post_count,
            words = trie.word_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search index built"
        );
        trie
    }

    /// Record one occurrence of `word` in `post`. Words that normalize to
    /// nothing are ignored.
    pub fn insert(&mut self, word: &str, post: &Arc<Post>) {
        let word = normalize_word(word);
        if word.is_empty() {
            return;
        }
        self.insert_occurrences(&word, post, 1);
    }

    fn insert_occurrences(&mut self, normalized: &str, post: &Arc<Post>, occurrences: u32) {
        let mut node = &mut self.root;
        for c in normalized.chars() {
            node = node.children.entry(c).or_default();
        }

        if !node.is_end_of_word {
            node.is_end_of_word = true;
            self.word_count += 1;
        }
        node.postings
            .entry(post.id.clone())
            .and_modify(|posting| posting.occurrences += occurrences)
            .or_insert_with(|| Posting {
                occurrences,
                post: Arc::clone(post),
            });
    }

    fn find_node(&self, normalized: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for c in normalized.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    /// Number of distinct indexed words.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Ids of every post referenced by any posting.
    pub fn post_ids(&self) -> BTreeSet<&PostId> {
        collect_words(&self.root, String::new())
            .into_iter()
            .flat_map(|(_, node)| node.postings.keys())
            .collect()
    }

    /// Postings of a single word; empty when the word was never indexed.
    pub fn search_word(&self, word: &str) -> &Postings {
        let word = normalize_word(word);
        match self.find_node(&word) {
            Some(node) if node.is_end_of_word => &node.postings,
            _ => &EMPTY_POSTINGS,
        }
    }

    /// Every indexed word starting with `prefix`, in preorder by character.
    /// An empty prefix matches nothing.
    pub fn search_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_word(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        match self.find_node(&prefix) {
            Some(node) => collect_words(node, prefix)
                .into_iter()
                .map(|(word, _)| word)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Score posts against whitespace-separated terms. A post seeds with its
    /// occurrence count for the first term that hits it; later terms add
    /// their counts, and a hit on the final term adds [`LAST_TERM_BONUS`].
    /// The result is unordered.
    pub fn search_query(&self, query: &str) -> Vec<ScoredPost> {
        let terms: Vec<&str> = query.split_whitespace().collect();
        let last_index = terms.len().saturating_sub(1);
        let mut results: BTreeMap<PostId, ScoredPost> = BTreeMap::new();

        for (index, raw) in terms.iter().enumerate() {
            let term = normalize_word(raw);
            if term.is_empty() {
                continue;
            }

            for (post_id, posting) in self.search_word(&term) {
                match results.entry(post_id.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(ScoredPost {
                            score: posting.occurrences,
                            post: Arc::clone(&posting.post),
                            matched_terms: vec![term.clone()],
                        });
                    }
                    Entry::Occupied(entry) => {
                        let hit = entry.into_mut();
                        hit.score += posting.occurrences;
                        if index == last_index {
                            hit.score += LAST_TERM_BONUS;
                        }
                        if !hit.matched_terms.contains(&term) {
                            hit.matched_terms.push(term.clone());
                        }
                    }
                }
            }
        }

        debug!(query, terms = terms.len(), hits = results.len(), "Query evaluated");
        results.into_values().collect()
    }

    /// Posts whose normalized message contains the normalized `phrase` as a
    /// contiguous substring. Candidates come from the postings of the
    /// phrase's first word.
    pub fn search_exact_query(&self, phrase: &str) -> Vec<Arc<Post>> {
        let phrase = normalize_message(phrase);
        let Some(first_word) = phrase.split(' ').next().filter(|word| !word.is_empty()) else {
            return Vec::new();
        };

        let results: Vec<Arc<Post>> = self
            .search_word(first_word)
            .values()
            .filter(|posting| normalize_message(&posting.post.message).contains(&phrase))
            .map(|posting| Arc::clone(&posting.post))
            .collect();

        debug!(phrase = %phrase, hits = results.len(), "Exact phrase evaluated");
        results
    }

    /// Check that postings are present exactly on terminal nodes.
    pub fn validate(&self) -> Result<()> {
        let mut stack: Vec<(String, &TrieNode)> = vec![(String::new(), &self.root)];
        while let Some((word, node)) = stack.pop() {
            if node.is_end_of_word == node.postings.is_empty() {
                return Err(SearchError::InvalidIndex(format!(
                    "node '{word}' has terminal={} with {} postings",
                    node.is_end_of_word,
                    node.postings.len()
                )));
            }
            for (c, child) in &node.children {
                let mut next = word.clone();
                next.push(*c);
                stack.push((next, child));
            }
        }
        Ok(())
    }
}

/// Every terminal node at or below `node`, paired with its full word.
/// Iterative preorder: children are visited in character order.
fn collect_words(node: &TrieNode, prefix: String) -> Vec<(String, &TrieNode)> {
    let mut words = Vec::new();
    let mut stack = vec![(prefix, node)];
    while let Some((word, node)) = stack.pop() {
        for (c, child) in node.children.iter().rev() {
            let mut next = word.clone();
            next.push(*c);
            stack.push((next, child));
        }
        if node.is_end_of_word {
            words.push((word, node));
        }
    }
    words
}

// ============================================
// Snapshot form
// ============================================
//
// The tree is persisted as a flat word list rather than nested nodes so that
// long tokens do not hit serializer recursion limits. Loading replays the
// words through the normal insert path.

#[derive(Serialize, Deserialize)]
struct TrieSnapshot {
    posts: Vec<Post>,
    words: Vec<IndexedWord>,
}

#[derive(Serialize, Deserialize)]
struct IndexedWord {
    word: String,
    postings: BTreeMap<PostId, u32>,
}

impl Trie {
    fn to_snapshot(&self) -> TrieSnapshot {
        let mut posts: BTreeMap<&str, &Post> = BTreeMap::new();
        let words = collect_words(&self.root, String::new())
            .into_iter()
            .map(|(word, node)| {
                let postings = node
                    .postings
                    .iter()
                    .map(|(post_id, posting)| {
                        posts.insert(post_id.as_str(), posting.post.as_ref());
                        (post_id.clone(), posting.occurrences)
                    })
                    .collect();
                IndexedWord { word, postings }
            })
            .collect();

        TrieSnapshot {
            posts: posts.into_values().cloned().collect(),
            words,
        }
    }

    fn from_snapshot(snapshot: TrieSnapshot) -> Result<Self> {
        let posts: BTreeMap<PostId, Arc<Post>> = snapshot
            .posts
            .into_iter()
            .map(|post| (post.id.clone(), Arc::new(post)))
            .collect();

        let mut trie = Self::new();
        for entry in snapshot.words {
            if entry.word.is_empty() || normalize_word(&entry.word) != entry.word {
                return Err(SearchError::InvalidIndex(format!(
                    "word '{}' is not in normalized form",
                    entry.word
                )));
            }
            if entry.postings.is_empty() {
                return Err(SearchError::InvalidIndex(format!(
                    "word '{}' has no postings",
                    entry.word
                )));
            }
            for (post_id, occurrences) in entry.postings {
                let post = posts
                    .get(&post_id)
                    .ok_or_else(|| SearchError::UnknownPost(post_id.clone()))?;
                if occurrences == 0 {
                    return Err(SearchError::InvalidIndex(format!(
                        "word '{}' has zero occurrences in post {post_id}",
                        entry.word
                    )));
                }
                trie.insert_occurrences(&entry.word, post, occurrences);
            }
        }
        Ok(trie)
    }
}

impl Serialize for Trie {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Trie {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let snapshot = TrieSnapshot::deserialize(deserializer)?;
        Trie::from_snapshot(snapshot).map_err(de::Error::custom)
    }
}

//! Line-oriented terminal session: log in by name, then browse the ranked
//! feed or search it.

use crate::context::{FeedContext, SearchOutcome};
use crate::models::{RankSource, RankedPost};
use crate::services::search::{highlight_all, SearchRequest};
use event_store::csv_source::TIMESTAMP_FORMAT;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const NAME_PROMPT: &str = "Enter a user's name: ";
const UNKNOWN_USER: &str = "User with that name doesnt exist.";
const MENU: &str = "[1] Get recommended statuses\n[2] Search\n[3] Log Out\n";
const CHOICE_PROMPT: &str = "> ";
const SEARCH_PROMPT: &str = "Enter search: ";
const SEPARATOR: &str = "------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Recommended,
    Search,
    LogOut,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<u8>().ok()? {
            1 => Some(Self::Recommended),
            2 => Some(Self::Search),
            3 => Some(Self::LogOut),
            _ => None,
        }
    }
}

/// Title-case every run of letters: the first letter after a non-letter is
/// upper-cased, the rest lower-cased.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.trim().chars() {
        if c.is_alphabetic() {
            if at_word_start {
                output.extend(c.to_uppercase());
            } else {
                output.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(c);
            at_word_start = true;
        }
    }
    output
}

pub struct Session<'a, R, W> {
    context: &'a FeedContext,
    input: R,
    output: W,
    result_limit: usize,
}

impl<'a, R, W> Session<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(context: &'a FeedContext, input: R, output: W, result_limit: usize) -> Self {
        Self {
            context,
            input,
            output,
            result_limit,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until the user logs out or input ends.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let Some(viewer) = self.login().await? else {
            return Ok(());
        };
        info!(viewer = %viewer, "Session started");

        loop {
            self.write(MENU).await?;
            let Some(line) = self.prompt(CHOICE_PROMPT).await? else {
                break;
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::Recommended) => {
                    let posts = self.context.recommend(&viewer, self.result_limit);
                    self.print_posts(&posts).await?;
                }
                Some(MenuChoice::Search) => {
                    let Some(query) = self.prompt(SEARCH_PROMPT).await? else {
                        break;
                    };
                    let request = SearchRequest::parse(&query);
                    let outcome = self.context.search(&viewer, &request, self.result_limit);
                    self.print_outcome(outcome).await?;
                }
                Some(MenuChoice::LogOut) => break,
                None => debug!(input = %line.trim(), "Ignoring menu input"),
            }
        }

        info!(viewer = %viewer, "Session ended");
        self.output.flush().await
    }

    async fn login(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let Some(line) = self.prompt(NAME_PROMPT).await? else {
                return Ok(None);
            };
            let name = title_case(&line);
            if self.context.store().contains_user(&name) {
                return Ok(Some(name));
            }
            self.write(UNKNOWN_USER).await?;
            self.write("\n").await?;
        }
    }

    /// Write `prompt` and read one line; `None` at end of input.
    async fn prompt(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.write(prompt).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    async fn print_outcome(&mut self, outcome: SearchOutcome) -> std::io::Result<()> {
        match outcome {
            SearchOutcome::Words(words) => {
                let line = format!("{}\n", words.join(", "));
                self.write(&line).await
            }
            SearchOutcome::Posts(posts) => self.print_posts(&posts).await,
            SearchOutcome::Empty => Ok(()),
        }
    }

    async fn print_posts(&mut self, posts: &[RankedPost]) -> std::io::Result<()> {
        for ranked in posts {
            let text = format_post(ranked);
            self.write(&text).await?;
        }
        Ok(())
    }

    async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.output.write_all(text.as_bytes()).await
    }
}

/// Render one post as printed in listings. Term-search hits get their
/// matched words highlighted.
pub fn format_post(ranked: &RankedPost) -> String {
    let post = &ranked.post;
    let message = match ranked.source {
        RankSource::Terms => highlight_all(&ranked.matched_terms, &post.message),
        RankSource::Feed | RankSource::Phrase => post.message.clone(),
    };

    format!(
        "Message: {message}\nAuthor: {}\nPublish Time: {}\nReactions: {}\nComments: {}\nShares: {}\n\n{SEPARATOR}\n\n",
        post.author,
        post.published_at.format(TIMESTAMP_FORMAT),
        post.reaction_count,
        post.comment_count,
        post.share_count,
    )
}

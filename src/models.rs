//! Data models for the aggregation engine.
//!
//! This module contains the payload types returned by the fetcher and
//! the derived views published by the aggregators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Category of numbers served by the numeric endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    /// Prime numbers
    Primes,
    /// Fibonacci numbers
    Fibo,
    /// Even numbers (default)
    #[default]
    Even,
    /// Random numbers
    Rand,
}

impl NumberKind {
    /// Path segment of the endpoint serving this kind.
    pub fn path(&self) -> &'static str {
        match self {
            NumberKind::Primes => "primes",
            NumberKind::Fibo => "fibo",
            NumberKind::Even => "evens",
            NumberKind::Rand => "rand",
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberKind::Primes => write!(f, "primes"),
            NumberKind::Fibo => write!(f, "fibo"),
            NumberKind::Even => write!(f, "even"),
            NumberKind::Rand => write!(f, "rand"),
        }
    }
}

/// A user as listed by the users endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Key of the user in the users map.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A post owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    /// Identifier of the owning user. Posts listed without one are
    /// attributed to the user they were fetched for.
    #[serde(
        default,
        rename = "userid",
        alias = "userId",
        alias = "user_id",
        deserialize_with = "string_or_number"
    )]
    pub user_id: String,
    #[serde(default)]
    pub content: String,
}

impl Post {
    pub fn new(id: u64, user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            content: content.into(),
        }
    }
}

/// Outcome of a single comment fetch.
///
/// The failure is kept distinct from a real zero so diagnostics can tell
/// them apart; ranking only ever sees [`CommentCount::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "count")]
pub enum CommentCount {
    Counted(usize),
    Failed,
}

impl CommentCount {
    /// Count used for ranking; failed fetches rank as zero.
    pub fn value(&self) -> usize {
        match self {
            CommentCount::Counted(n) => *n,
            CommentCount::Failed => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CommentCount::Failed)
    }
}

/// A user together with the number of posts fetched for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedUser {
    pub user: User,
    pub post_count: usize,
}

/// A post together with its comment fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingPost {
    pub post: Post,
    pub comments: CommentCount,
}

impl TrendingPost {
    pub fn comment_count(&self) -> usize {
        self.comments.value()
    }
}

/// Diagnostics for one completed fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub users: usize,
    pub posts: usize,
    /// Users whose posts could not be fetched.
    pub failed_post_fetches: usize,
    /// Posts whose comments could not be fetched.
    pub failed_comment_fetches: usize,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// The views published at the end of a social fetch cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialViews {
    pub top_users: Vec<RankedUser>,
    pub trending_posts: Vec<TrendingPost>,
    pub feed: Vec<Post>,
    /// `None` until the first cycle completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CycleStats>,
}

impl SocialViews {
    pub fn is_empty(&self) -> bool {
        self.top_users.is_empty() && self.trending_posts.is_empty() && self.feed.is_empty()
    }
}

/// Metadata shared by every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Base URL the data was fetched from.
    pub base_url: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// State of the sliding window after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowReport {
    pub metadata: ReportMetadata,
    pub number_kind: NumberKind,
    pub capacity: usize,
    /// Batch received by the last successful fetch.
    pub latest: Vec<i64>,
    pub previous: Vec<i64>,
    pub current: Vec<i64>,
    pub average: f64,
}

/// Published social views after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialReport {
    pub metadata: ReportMetadata,
    pub views: SocialViews,
    /// Set when the last cycle aborted; `views` are then the stale ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accepts an identifier written either as a JSON string or a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

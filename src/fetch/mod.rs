//! Remote data access.
//!
//! The aggregators only see the [`Fetcher`] trait; [`HttpFetcher`] is the
//! production implementation backed by reqwest.

mod client;

pub use client::{FetcherConfig, HttpFetcher};

use crate::models::{NumberKind, Post, User};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Endpoint category for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Users,
    UserPosts(String),
    PostComments(u64),
    Numbers(NumberKind),
}

impl Endpoint {
    /// Path relative to the base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Users => "users".to_string(),
            Endpoint::UserPosts(user_id) => format!("users/{}/posts", user_id),
            Endpoint::PostComments(post_id) => format!("posts/{}/comments", post_id),
            Endpoint::Numbers(kind) => kind.path().to_string(),
        }
    }

    /// Top-level key the response body must carry.
    pub fn payload_key(&self) -> &'static str {
        match self {
            Endpoint::Users => "users",
            Endpoint::UserPosts(_) => "posts",
            Endpoint::PostComments(_) => "comments",
            Endpoint::Numbers(_) => "numbers",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Failure of a single fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: Endpoint,
        status: reqwest::StatusCode,
    },

    #[error("{endpoint} response is missing a valid '{field}' field")]
    Shape {
        endpoint: Endpoint,
        field: &'static str,
    },

    #[error("{endpoint} response could not be decoded: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Whether the response arrived but did not have the expected shape.
    pub fn is_shape(&self) -> bool {
        matches!(self, FetchError::Shape { .. } | FetchError::Decode { .. })
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Shape { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// One network call per method, returning a shape-validated payload.
///
/// Implementations do not retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Users in the order the endpoint lists them. Names must be strings.
    async fn users(&self) -> Result<Vec<User>, FetchError>;

    async fn user_posts(&self, user_id: &str) -> Result<Vec<Post>, FetchError>;

    /// Number of comments on a post. Only the list itself is validated,
    /// not the individual comments.
    async fn post_comments(&self, post_id: u64) -> Result<usize, FetchError>;

    async fn numbers(&self, kind: NumberKind) -> Result<Vec<i64>, FetchError>;
}

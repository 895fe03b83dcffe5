//! HTTP implementation of the [`Fetcher`] trait.

use super::{Endpoint, FetchError, Fetcher};
use crate::models::{NumberKind, Post, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Per-call timeout for the numeric endpoints.
    pub numbers_timeout: Duration,
    /// Per-call timeout for users, posts and comments.
    pub social_timeout: Duration,
    /// Sent as a bearer token when set.
    pub auth_token: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://20.244.56.144/test".to_string(),
            numbers_timeout: Duration::from_millis(500),
            social_timeout: Duration::from_secs(5),
            auth_token: None,
        }
    }
}

/// Fetcher backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    config: FetcherConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("feedpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path()
        )
    }

    fn timeout(&self, endpoint: &Endpoint) -> Duration {
        match endpoint {
            Endpoint::Numbers(_) => self.config.numbers_timeout,
            _ => self.config.social_timeout,
        }
    }

    /// GET the endpoint and return the value under its payload key.
    async fn get_payload(&self, endpoint: &Endpoint) -> Result<Value, FetchError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let mut request = self.http_client.get(&url).timeout(self.timeout(endpoint));
        if let Some(ref token) = self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.clone(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let mut body: Value =
            serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
                endpoint: endpoint.clone(),
                source,
            })?;

        let field = endpoint.payload_key();
        match body.get_mut(field).map(Value::take) {
            Some(payload) if !payload.is_null() => Ok(payload),
            _ => Err(FetchError::Shape {
                endpoint: endpoint.clone(),
                field,
            }),
        }
    }

    /// Fetch a payload that must be a JSON array of `T`.
    async fn get_list<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<Vec<T>, FetchError> {
        let payload = self.get_payload(&endpoint).await?;
        if !payload.is_array() {
            return Err(FetchError::Shape {
                field: endpoint.payload_key(),
                endpoint,
            });
        }

        serde_json::from_value(payload).map_err(|source| FetchError::Decode { endpoint, source })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn users(&self) -> Result<Vec<User>, FetchError> {
        let endpoint = Endpoint::Users;
        let payload = self.get_payload(&endpoint).await?;

        let Value::Object(map) = payload else {
            return Err(FetchError::Shape {
                endpoint,
                field: "users",
            });
        };

        // Map order is response order (serde_json preserve_order).
        map.into_iter()
            .map(|(id, name)| match name {
                Value::String(name) => Ok(User::new(id, name)),
                _ => Err(FetchError::Shape {
                    endpoint: Endpoint::Users,
                    field: "users",
                }),
            })
            .collect()
    }

    async fn user_posts(&self, user_id: &str) -> Result<Vec<Post>, FetchError> {
        let mut posts: Vec<Post> = self.get_list(Endpoint::UserPosts(user_id.to_string())).await?;

        for post in posts.iter_mut().filter(|p| p.user_id.is_empty()) {
            post.user_id = user_id.to_string();
        }

        Ok(posts)
    }

    async fn post_comments(&self, post_id: u64) -> Result<usize, FetchError> {
        let comments: Vec<IgnoredAny> = self.get_list(Endpoint::PostComments(post_id)).await?;
        Ok(comments.len())
    }

    async fn numbers(&self, kind: NumberKind) -> Result<Vec<i64>, FetchError> {
        self.get_list(Endpoint::Numbers(kind)).await
    }
}

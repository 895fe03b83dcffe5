//! Social aggregation: users → posts → comments fan-out and ranking.

use super::aggregator;
use crate::fetch::{FetchError, Fetcher};
use crate::models::{CommentCount, CycleStats, Post, RankedUser, SocialViews, TrendingPost, User};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Tuning for a social fetch cycle.
#[derive(Debug, Clone, Copy)]
pub struct SocialSettings {
    /// Length of the top-users and trending-posts views.
    pub top_k: usize,
    /// Maximum sub-fetches in flight per fan-out stage.
    pub concurrency: usize,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            concurrency: 4,
        }
    }
}

/// Where the aggregator is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CyclePhase {
    Idle,
    FetchingUsers,
    FetchingPostsAndComments,
    Ready,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "idle"),
            CyclePhase::FetchingUsers => write!(f, "fetching users"),
            CyclePhase::FetchingPostsAndComments => write!(f, "fetching posts and comments"),
            CyclePhase::Ready => write!(f, "ready"),
        }
    }
}

/// A cycle could not enumerate its users.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("aggregation failed: {0}")]
    AggregationFailed(#[source] FetchError),
}

/// Fans out social fetches and publishes ranked views.
///
/// Views are replaced as a whole at the end of a successful cycle; readers
/// always see the last published snapshot. Only one cycle runs at a time.
pub struct SocialAggregator {
    fetcher: Arc<dyn Fetcher>,
    settings: SocialSettings,
    views: RwLock<Arc<SocialViews>>,
    phase: Mutex<CyclePhase>,
    cycle: tokio::sync::Mutex<()>,
}

impl SocialAggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: SocialSettings) -> Self {
        let settings = SocialSettings {
            top_k: settings.top_k.max(1),
            concurrency: settings.concurrency.max(1),
        };

        Self {
            fetcher,
            settings,
            views: RwLock::new(Arc::new(SocialViews::default())),
            phase: Mutex::new(CyclePhase::Idle),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one full fetch cycle and publish its views.
    ///
    /// Only a failure to list users aborts the cycle; the previously
    /// published views are then left in place.
    pub async fn run(&self) -> Result<Arc<SocialViews>, AggregationError> {
        let _cycle = self.cycle.lock().await;
        let started = Instant::now();
        let resting = self.phase();

        self.set_phase(CyclePhase::FetchingUsers);
        let users = match self.fetcher.users().await {
            Ok(users) => users,
            Err(e) => {
                error!("Error fetching users: {}", e);
                self.set_phase(resting);
                return Err(AggregationError::AggregationFailed(e));
            }
        };
        info!("Fetched {} users", users.len());

        self.set_phase(CyclePhase::FetchingPostsAndComments);
        let per_user = self.fetch_posts(users).await;

        let posts: Vec<Post> = per_user
            .iter()
            .flat_map(|(_, posts)| posts.iter().flatten().cloned())
            .collect();
        info!("Fetched {} posts", posts.len());

        let tally = self.fetch_comment_counts(&posts).await;

        let failed_post_fetches = per_user.iter().filter(|(_, p)| p.is_none()).count();
        let post_counts: Vec<(User, usize)> = per_user
            .into_iter()
            .map(|(user, posts)| (user, posts.map_or(0, |p| p.len())))
            .collect();

        let views = Arc::new(SocialViews {
            top_users: aggregator::top_users(&post_counts, self.settings.top_k),
            trending_posts: aggregator::trending_posts(&posts, &tally, self.settings.top_k),
            feed: aggregator::feed(&posts),
            stats: Some(CycleStats {
                users: post_counts.len(),
                posts: posts.len(),
                failed_post_fetches,
                failed_comment_fetches: aggregator::failed_comment_fetches(&tally),
                completed_at: Utc::now(),
                duration_seconds: started.elapsed().as_secs_f64(),
            }),
        });

        *self.views.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&views);
        self.set_phase(CyclePhase::Ready);

        if failed_post_fetches > 0 {
            warn!("{} user post fetches failed this cycle", failed_post_fetches);
        }
        debug!("Published social views in {:.3}s", started.elapsed().as_secs_f64());

        Ok(views)
    }

    /// Fetch every user's posts. `None` marks a failed fetch.
    ///
    /// Results come back in user order whatever order the requests finish in.
    async fn fetch_posts(&self, users: Vec<User>) -> Vec<(User, Option<Vec<Post>>)> {
        let fetcher = &self.fetcher;

        stream::iter(users)
            .map(|user| async move {
                match fetcher.user_posts(&user.id).await {
                    Ok(posts) => {
                        debug!("User {} has {} posts", user.id, posts.len());
                        (user, Some(posts))
                    }
                    Err(e) => {
                        warn!("Error fetching posts for user {}: {}", user.id, e);
                        (user, None)
                    }
                }
            })
            .buffered(self.settings.concurrency)
            .collect()
            .await
    }

    /// Fetch comment counts, one request per distinct post id.
    ///
    /// The tally is keyed by post id, so posts sharing an id share a count.
    async fn fetch_comment_counts(&self, posts: &[Post]) -> HashMap<u64, CommentCount> {
        let fetcher = &self.fetcher;
        let mut seen = HashSet::new();
        let post_ids: Vec<u64> = posts
            .iter()
            .map(|p| p.id)
            .filter(|id| seen.insert(*id))
            .collect();

        if post_ids.len() < posts.len() {
            debug!(
                "{} duplicate post ids share a comment fetch",
                posts.len() - post_ids.len()
            );
        }

        stream::iter(post_ids)
            .map(|post_id| async move {
                let count = match fetcher.post_comments(post_id).await {
                    Ok(count) => CommentCount::Counted(count),
                    Err(e) => {
                        warn!("Error fetching comments for post {}: {}", post_id, e);
                        CommentCount::Failed
                    }
                };
                (post_id, count)
            })
            .buffered(self.settings.concurrency)
            .collect()
            .await
    }

    /// The last published views.
    pub fn snapshot(&self) -> Arc<SocialViews> {
        Arc::clone(&self.views.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn current_top_users(&self) -> Vec<RankedUser> {
        self.snapshot().top_users.clone()
    }

    pub fn current_trending_posts(&self) -> Vec<TrendingPost> {
        self.snapshot().trending_posts.clone()
    }

    pub fn current_feed(&self) -> Vec<Post> {
        self.snapshot().feed.clone()
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: CyclePhase) {
        debug!("Social cycle phase: {}", phase);
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }
}

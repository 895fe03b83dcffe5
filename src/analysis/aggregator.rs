//! Ranking reductions over a completed fetch cycle.
//!
//! These are pure functions; the social aggregator calls them only after
//! every fan-out stage has joined.

use crate::models::{CommentCount, Post, RankedUser, TrendingPost, User};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Rank users by descending post count, keeping fetch order on ties.
pub fn top_users(post_counts: &[(User, usize)], n: usize) -> Vec<RankedUser> {
    let mut ranked: Vec<RankedUser> = post_counts
        .iter()
        .map(|(user, count)| RankedUser {
            user: user.clone(),
            post_count: *count,
        })
        .collect();

    // sort_by_key is stable
    ranked.sort_by_key(|r| Reverse(r.post_count));
    ranked.truncate(n);
    ranked
}

/// Rank posts by descending comment count, keeping aggregation order on ties.
///
/// Posts without a tally entry rank as zero.
pub fn trending_posts(
    posts: &[Post],
    tally: &HashMap<u64, CommentCount>,
    n: usize,
) -> Vec<TrendingPost> {
    let mut trending: Vec<TrendingPost> = posts
        .iter()
        .map(|post| TrendingPost {
            post: post.clone(),
            comments: tally
                .get(&post.id)
                .copied()
                .unwrap_or(CommentCount::Failed),
        })
        .collect();

    trending.sort_by_key(|t| Reverse(t.comment_count()));
    trending.truncate(n);
    trending
}

/// All posts, newest (highest id) first.
pub fn feed(posts: &[Post]) -> Vec<Post> {
    let mut feed = posts.to_vec();
    feed.sort_by_key(|p| Reverse(p.id));
    feed
}

/// Count comment fetches that failed.
pub fn failed_comment_fetches(tally: &HashMap<u64, CommentCount>) -> usize {
    tally.values().filter(|c| c.is_failed()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User::new(id, format!("User {}", id))
    }

    fn post(id: u64, user_id: &str) -> Post {
        Post::new(id, user_id, format!("post {}", id))
    }

    #[test]
    fn test_top_users_ties_keep_fetch_order() {
        let counts = vec![(user("A"), 3), (user("B"), 5), (user("C"), 5)];

        let top = top_users(&counts, 5);
        let ids: Vec<_> = top.iter().map(|r| r.user.id.as_str()).collect();

        assert_eq!(ids, vec!["B", "C", "A"]);
        assert_eq!(top[0].post_count, 5);
    }

    #[test]
    fn test_top_users_truncates() {
        let counts: Vec<_> = (0..8).map(|i| (user(&i.to_string()), i)).collect();

        let top = top_users(&counts, 5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].user.id, "7");
        assert_eq!(top[4].user.id, "3");
    }

    #[test]
    fn test_trending_failed_counts_as_zero() {
        let posts = vec![post(1, "u"), post(2, "u"), post(3, "u")];
        let tally: HashMap<_, _> = [
            (1, CommentCount::Counted(2)),
            (2, CommentCount::Counted(5)),
            (3, CommentCount::Failed),
        ]
        .into_iter()
        .collect();

        let trending = trending_posts(&posts, &tally, 5);
        let ids: Vec<_> = trending.iter().map(|t| t.post.id).collect();

        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(trending[2].comment_count(), 0);
        assert!(trending[2].comments.is_failed());
        assert_eq!(failed_comment_fetches(&tally), 1);
    }

    #[test]
    fn test_trending_ties_keep_aggregation_order() {
        let posts = vec![post(4, "a"), post(9, "b"), post(1, "a")];
        let tally: HashMap<_, _> = posts
            .iter()
            .map(|p| (p.id, CommentCount::Counted(1)))
            .collect();

        let ids: Vec<_> = trending_posts(&posts, &tally, 2)
            .iter()
            .map(|t| t.post.id)
            .collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_feed_is_newest_first() {
        let posts = vec![post(3, "a"), post(17, "b"), post(8, "a"), post(11, "c")];

        let ids: Vec<_> = feed(&posts).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![17, 11, 8, 3]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(top_users(&[], 5).is_empty());
        assert!(trending_posts(&[], &HashMap::new(), 5).is_empty());
        assert!(feed(&[]).is_empty());
    }
}

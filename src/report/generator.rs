//! Markdown and JSON report generation.
//!
//! This module renders aggregator snapshots for people (Markdown) and for
//! other tools (JSON).

use crate::models::{Post, RankedUser, ReportMetadata, SocialReport, TrendingPost, WindowReport};
use anyhow::Result;
use serde::Serialize;

/// Generate the Markdown report for a window run.
pub fn generate_window_markdown(report: &WindowReport) -> String {
    let mut output = String::new();

    output.push_str("# Average Calculator\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str("## Latest Numbers\n\n");
    output.push_str(&format!(
        "*Source: {} | Capacity: {}*\n\n",
        report.number_kind, report.capacity
    ));
    output.push_str(&join_or(&report.latest, "No numbers received"));
    output.push_str("\n\n");

    output.push_str("## Window State\n\n");
    output.push_str(&format!(
        "- **Previous:** {}\n",
        join_or(&report.previous, "N/A")
    ));
    output.push_str(&format!(
        "- **Current:** {}\n",
        join_or(&report.current, "No numbers stored")
    ));
    output.push_str(&format!("- **Average:** {:.2}\n\n", report.average));

    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown report for a social run.
///
/// `feed_limit` caps the rendered feed only.
pub fn generate_social_markdown(report: &SocialReport, feed_limit: Option<usize>) -> String {
    let mut output = String::new();

    output.push_str("# Social Pulse\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref error) = report.error {
        output.push_str(&format!(
            "> ⚠️ **Last refresh failed:** {}\n>\n> Showing the previously published views.\n\n",
            error
        ));
    }

    if let Some(ref stats) = report.views.stats {
        output.push_str("## Cycle\n\n");
        output.push_str("| Users | Posts | Failed post fetches | Failed comment fetches |\n");
        output.push_str("|:---:|:---:|:---:|:---:|\n");
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n\n",
            stats.users, stats.posts, stats.failed_post_fetches, stats.failed_comment_fetches
        ));
        output.push_str(&format!(
            "*Completed {} in {:.1}s*\n\n",
            stats.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.duration_seconds
        ));
    }

    output.push_str(&generate_top_users_section(&report.views.top_users));
    output.push_str(&generate_trending_section(&report.views.trending_posts));
    output.push_str(&generate_feed_section(&report.views.feed, feed_limit));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Endpoint:** {}\n", metadata.base_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_top_users_section(users: &[RankedUser]) -> String {
    let mut section = String::from("## Top Users\n\n");

    if users.is_empty() {
        section.push_str("No top users found.\n\n");
        return section;
    }

    section.push_str("| # | User | Posts |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (i, ranked) in users.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            ranked.user.name,
            ranked.post_count
        ));
    }
    section.push('\n');

    section
}

fn generate_trending_section(posts: &[TrendingPost]) -> String {
    let mut section = String::from("## Trending Posts\n\n");

    if posts.is_empty() {
        section.push_str("No trending posts found.\n\n");
        return section;
    }

    section.push_str("| # | Post | Comments |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (i, trending) in posts.iter().enumerate() {
        let comments = if trending.comments.is_failed() {
            "0 (unavailable)".to_string()
        } else {
            trending.comment_count().to_string()
        };
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            trending.post.content,
            comments
        ));
    }
    section.push('\n');

    section
}

fn generate_feed_section(feed: &[Post], limit: Option<usize>) -> String {
    let mut section = String::from("## Feed\n\n");

    if feed.is_empty() {
        section.push_str("No posts in feed.\n\n");
        return section;
    }

    let shown = limit.unwrap_or(feed.len()).min(feed.len());
    for post in &feed[..shown] {
        section.push_str(&format!(
            "- **#{}** (user {}): {}\n",
            post.id, post.user_id, post.content
        ));
    }
    if shown < feed.len() {
        section.push_str(&format!("\n*…and {} older posts*\n", feed.len() - shown));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by FeedPulse*\n");

    footer
}

fn join_or(values: &[i64], empty: &str) -> String {
    if values.is_empty() {
        return empty.to_string();
    }
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentCount, CycleStats, NumberKind, SocialViews, User};
    use chrono::Utc;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            base_url: "http://localhost:9876/test".to_string(),
            generated_at: Utc::now(),
            duration_seconds: 1.5,
        }
    }

    fn social_report() -> SocialReport {
        let posts: Vec<Post> = (1..=4)
            .rev()
            .map(|id| Post::new(id, "1", format!("post number {}", id)))
            .collect();

        SocialReport {
            metadata: metadata(),
            views: SocialViews {
                top_users: vec![RankedUser {
                    user: User::new("1", "Ada"),
                    post_count: 4,
                }],
                trending_posts: vec![
                    TrendingPost {
                        post: posts[1].clone(),
                        comments: CommentCount::Counted(3),
                    },
                    TrendingPost {
                        post: posts[0].clone(),
                        comments: CommentCount::Failed,
                    },
                ],
                feed: posts,
                stats: Some(CycleStats {
                    users: 1,
                    posts: 4,
                    failed_post_fetches: 0,
                    failed_comment_fetches: 1,
                    completed_at: Utc::now(),
                    duration_seconds: 0.4,
                }),
            },
            error: None,
        }
    }

    #[test]
    fn test_generate_social_markdown() {
        let markdown = generate_social_markdown(&social_report(), None);

        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Top Users"));
        assert!(markdown.contains("| 1 | Ada | 4 |"));
        assert!(markdown.contains("## Trending Posts"));
        assert!(markdown.contains("0 (unavailable)"));
        assert!(markdown.contains("- **#4** (user 1): post number 4"));
        assert!(!markdown.contains("Last refresh failed"));
    }

    #[test]
    fn test_feed_limit_only_affects_rendering() {
        let report = social_report();
        let markdown = generate_social_markdown(&report, Some(2));

        assert!(markdown.contains("post number 3"));
        assert!(!markdown.contains("**#1**"));
        assert!(markdown.contains("and 2 older posts"));
        assert_eq!(report.views.feed.len(), 4);
    }

    #[test]
    fn test_stale_views_are_flagged() {
        let mut report = social_report();
        report.error = Some("aggregation failed: /users returned HTTP 500".to_string());

        let markdown = generate_social_markdown(&report, None);
        assert!(markdown.contains("Last refresh failed"));
        assert!(markdown.contains("HTTP 500"));
    }

    #[test]
    fn test_empty_social_views() {
        let report = SocialReport {
            metadata: metadata(),
            views: SocialViews::default(),
            error: None,
        };

        let markdown = generate_social_markdown(&report, None);
        assert!(markdown.contains("No top users found."));
        assert!(markdown.contains("No trending posts found."));
        assert!(markdown.contains("No posts in feed."));
        assert!(!markdown.contains("## Cycle"));
    }

    #[test]
    fn test_generate_window_markdown() {
        let report = WindowReport {
            metadata: metadata(),
            number_kind: NumberKind::Even,
            capacity: 10,
            latest: vec![6, 8],
            previous: vec![2, 4],
            current: vec![2, 4, 6, 8],
            average: 5.0,
        };

        let markdown = generate_window_markdown(&report);
        assert!(markdown.contains("*Source: even | Capacity: 10*"));
        assert!(markdown.contains("- **Previous:** 2, 4"));
        assert!(markdown.contains("- **Current:** 2, 4, 6, 8"));
        assert!(markdown.contains("- **Average:** 5.00"));
    }

    #[test]
    fn test_generate_window_markdown_empty() {
        let report = WindowReport {
            metadata: metadata(),
            number_kind: NumberKind::Primes,
            capacity: 10,
            latest: vec![],
            previous: vec![],
            current: vec![],
            average: 0.0,
        };

        let markdown = generate_window_markdown(&report);
        assert!(markdown.contains("No numbers received"));
        assert!(markdown.contains("- **Previous:** N/A"));
        assert!(markdown.contains("No numbers stored"));
        assert!(markdown.contains("- **Average:** 0.00"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&social_report()).unwrap();

        assert!(json.contains("\"top_users\""));
        assert!(json.contains("\"trending_posts\""));
        assert!(json.contains("\"feed\""));
        assert!(json.contains("\"status\": \"failed\""));
        assert!(!json.contains("\"error\""));
    }
}

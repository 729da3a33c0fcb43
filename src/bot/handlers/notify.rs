use tracing::{debug, info};

use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::utils::chat_mention;
use crate::bot::Context;
use crate::notify::NotificationKind;
use crate::webhooks::github::GitHubEvent;

/// Titles of automated housekeeping PRs and issues; those never get announced.
const AUTOMATED_TITLE_MARKERS: &[&str] = &[
    "Automatic update of dependency",
    "Automatic dependency re-locking",
    "Release of",
];

pub(crate) fn is_automated_title(title: &str) -> bool {
    AUTOMATED_TITLE_MARKERS
        .iter()
        .any(|marker| title.starts_with(marker))
}

/// Announces opened and closed PRs to the chat space.
pub struct PrLifecycleNotifier;

#[rocket::async_trait]
impl EventHandler for PrLifecycleNotifier {
    fn name(&self) -> &'static str {
        "pr-lifecycle-notifier"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequest(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;

        if is_automated_title(&pr.title) {
            debug!("{} is automated housekeeping, not announcing it", pr.html_url);
            return Ok(());
        }

        let thread_key = format!("pull_request_{}_{}", event.repository.name, pr.id);

        match event.action.as_str() {
            "opened" | "reopened" => {
                ctx.chat
                    .notify(
                        NotificationKind::PullRequest,
                        &format!("🆕 {} a new Pull Request has been *opened*!", pr.html_url),
                        &thread_key,
                        pr.html_url.as_str(),
                    )
                    .await?;
            }
            "closed" => {
                let message = match pr.merged {
                    true => format!(
                        "👌 Pull Request *{}* has been merged by '{}' 🍻",
                        pr.title, event.sender.login
                    ),
                    false => format!(
                        "👌 Pull Request *{}* has been *closed* with *unmerged commits*! 🚧",
                        pr.title
                    ),
                };
                ctx.chat
                    .notify(
                        NotificationKind::Plain,
                        &message,
                        &thread_key,
                        pr.html_url.as_str(),
                    )
                    .await?;
            }
            _ => {}
        }

        Ok(())
    }
}

/// Tells the chat space that a review has been requested, at most once per
/// (repo, PR, reviewer) within the dedupe window.
pub struct ReviewRequestNotifier;

#[rocket::async_trait]
impl EventHandler for ReviewRequestNotifier {
    fn name(&self) -> &'static str {
        "review-request-notifier"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequest(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;

        if is_automated_title(&pr.title) {
            return Ok(());
        }

        for reviewer in &pr.requested_reviewers {
            if !ctx.should_notify(&event.repository.name, pr.id, &reviewer.login) {
                continue;
            }

            info!("requesting review by {} on {}", reviewer.login, pr.html_url);
            ctx.chat
                .notify(
                    NotificationKind::Plain,
                    &format!(
                        "🔎 a review by {} has been requested",
                        chat_mention(&ctx.config.user_map, &reviewer.login)
                    ),
                    &format!("pull_request_{}_{}", event.repository.name, pr.id),
                    pr.html_url.as_str(),
                )
                .await?;
        }

        Ok(())
    }
}

/// Announces submitted reviews, with a different text for approvals.
pub struct ReviewSubmittedNotifier;

#[rocket::async_trait]
impl EventHandler for ReviewSubmittedNotifier {
    fn name(&self) -> &'static str {
        "review-submitted-notifier"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequestReview(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;
        debug!("working on {}", pr);

        let message = match event.review.state.as_str() {
            "approved" => format!(
                "📗 '{}' *approved* this Pull Request!",
                event.review.user.login
            ),
            _ => format!(
                "📔 some new comment by '{}' has arrived...",
                event.review.user.login
            ),
        };

        ctx.chat
            .notify(
                NotificationKind::Plain,
                &message,
                &format!("pull_request_{}_{}", event.repository.name, pr.id),
                pr.html_url.as_str(),
            )
            .await?;

        Ok(())
    }
}

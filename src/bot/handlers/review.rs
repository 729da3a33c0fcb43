use tracing::debug;

use crate::bot::handlers::{has_label, is_rebaseable};
use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::Context;
use crate::webhooks::github::GitHubEvent;

pub(crate) const NEEDS_REBASE_LABEL: &str = "do-not-merge/needs-rebase";

const DEPENDENCY_UPDATE_PREFIX: &str = "Automatic update of dependency";

/// Labels a PR `approved` once a review approves it.
pub struct ApprovedLabel;

#[rocket::async_trait]
impl EventHandler for ApprovedLabel {
    fn name(&self) -> &'static str {
        "approved-label"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequestReview(event) => event,
            _ => return Ok(()),
        };
        if event.review.state != "approved" {
            return Ok(());
        }

        let pr = &event.pull_request;
        if pr.merged || pr.state != "open" {
            debug!("{} is no longer open, not labeling it approved", pr.html_url);
            return Ok(());
        }

        if !has_label(pr, "approved") {
            ctx.github
                .add_labels(
                    &event.repository.owner.login,
                    &event.repository.name,
                    pr.number,
                    &["approved"],
                )
                .await?;
        }

        Ok(())
    }
}

/// Mirrors the PR's mergeability into the needs-rebase label.
pub struct NeedsRebaseLabel;

#[rocket::async_trait]
impl EventHandler for NeedsRebaseLabel {
    fn name(&self) -> &'static str {
        "needs-rebase-label"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequestReview(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;

        if pr.state != "open" {
            return Ok(());
        }

        if is_rebaseable(pr) {
            if !has_label(pr, NEEDS_REBASE_LABEL) {
                ctx.github
                    .add_labels(owner, repo, pr.number, &[NEEDS_REBASE_LABEL])
                    .await?;
            }
        } else if has_label(pr, NEEDS_REBASE_LABEL) {
            ctx.github
                .remove_label(owner, repo, pr.number, NEEDS_REBASE_LABEL)
                .await?;
        }

        Ok(())
    }
}

/// Automated dependency updates don't need a human reviewer; approve them on
/// arrival.
pub struct DependencyUpdateAutoApprove;

#[rocket::async_trait]
impl EventHandler for DependencyUpdateAutoApprove {
    fn name(&self) -> &'static str {
        "dependency-update-auto-approve"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequest(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;

        if !pr.title.starts_with(DEPENDENCY_UPDATE_PREFIX) {
            return Ok(());
        }

        debug!("automatic update, will auto-approve {}", pr.html_url);
        ctx.github
            .add_labels(
                &event.repository.owner.login,
                &event.repository.name,
                pr.number,
                &["approved"],
            )
            .await?;

        Ok(())
    }
}

use tracing::{debug, info};

use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::Context;
use crate::github::{ApiError, GitHubClient};
use crate::webhooks::github::GitHubEvent;

/// Keeps PRs current with their base branch: when the base has moved on and
/// GitHub flags the PR as rebaseable, trigger an update-branch.
pub struct AutoRebase;

#[rocket::async_trait]
impl EventHandler for AutoRebase {
    fn name(&self) -> &'static str {
        "auto-rebase"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let (repository, pr) = match event {
            GitHubEvent::PullRequest(event) => (&event.repository, &event.pull_request),
            GitHubEvent::PullRequestReview(event) => (&event.repository, &event.pull_request),
            _ => return Ok(()),
        };

        // a merged PR is never touched
        if pr.merged {
            debug!("{} is already merged, nothing to rebase", pr.html_url);
            return Ok(());
        }

        merge_base_into_pull_request(
            &ctx.github,
            &repository.owner.login,
            &repository.name,
            pr.number,
            false,
        )
        .await?;

        Ok(())
    }
}

/// Merges the base branch into the pull request by triggering an
/// update-branch. Returns whether an update was triggered. With `dry_run` no
/// change is made via the API.
pub(crate) async fn merge_base_into_pull_request(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
    dry_run: bool,
) -> Result<bool, ApiError> {
    let head_sha = match github.default_branch_head_sha(owner, repo).await? {
        Some(sha) => sha,
        None => {
            debug!("{}/{} has no commits, nothing to rebase onto", owner, repo);
            return Ok(false);
        }
    };

    let pr = github.pull_request(owner, repo, number).await?;
    if pr.merged {
        debug!("{} is already merged, nothing to rebase", pr.html_url);
        return Ok(false);
    }

    let rebaseable = pr.rebaseable.unwrap_or(false);
    if rebaseable && pr.base.sha != head_sha {
        info!(
            "rebasing pull request {} in {}/{}, head sha = {} and pull request's base sha = {}",
            number, owner, repo, head_sha, pr.base.sha
        );

        if dry_run {
            info!("just a dry-run...");
            return Ok(true);
        }

        github.update_branch(owner, repo, number).await?;
        Ok(true)
    } else {
        debug!(
            "not triggering a rebase, head sha = {} and pull request's base sha = {}",
            head_sha, pr.base.sha
        );
        Ok(false)
    }
}

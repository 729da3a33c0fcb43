use tracing::info;

use crate::bot::router::{EventHandler, HandlerError, Router};
use crate::bot::Context;
use crate::webhooks::github::events::PullRequest;
use crate::webhooks::github::{EventKind, GitHubEvent};

pub mod issues;
pub mod notify;
pub mod rebase;
pub mod release;
pub mod review;
pub mod wip;

/// True iff some label on the PR contains `name` as a substring.
pub(crate) fn has_label(pull_request: &PullRequest, name: &str) -> bool {
    pull_request
        .labels
        .iter()
        .any(|label| label.name.contains(name))
}

/// Whether the PR needs its base branch merged in: its mergeability has been
/// computed and is false. A merged PR never does; `mergeable == None` means
/// GitHub is still computing and is treated as "no" (the next delivery
/// re-evaluates).
pub(crate) fn is_rebaseable(pull_request: &PullRequest) -> bool {
    !pull_request.merged && pull_request.mergeable == Some(false)
}

/// The full routing table. Built once when the bot task starts.
pub fn routes() -> Router {
    Router::new()
        .on(EventKind::Ping, &[], Ping)
        .on(
            EventKind::PullRequest,
            &["opened", "reopened", "synchronize", "edited"],
            wip::WipState,
        )
        .on(EventKind::PullRequest, &["opened", "edited"], rebase::AutoRebase)
        .on(
            EventKind::PullRequest,
            &["opened", "reopened"],
            review::DependencyUpdateAutoApprove,
        )
        .on(
            EventKind::PullRequest,
            &["opened", "reopened", "closed"],
            notify::PrLifecycleNotifier,
        )
        .on(
            EventKind::PullRequest,
            &["review_requested"],
            notify::ReviewRequestNotifier,
        )
        .on(EventKind::PullRequest, &["closed"], release::ReleaseTagger)
        .on(EventKind::PullRequestReview, &["submitted"], rebase::AutoRebase)
        .on(EventKind::PullRequestReview, &["submitted"], review::ApprovedLabel)
        .on(EventKind::PullRequestReview, &["submitted"], review::NeedsRebaseLabel)
        .on(
            EventKind::PullRequestReview,
            &["submitted"],
            notify::ReviewSubmittedNotifier,
        )
        .on(EventKind::Issues, &["labeled"], issues::IssueTriage)
        .on(EventKind::Issues, &["opened", "reopened"], issues::IssueOpened)
}

struct Ping;

#[rocket::async_trait]
impl EventHandler for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn handle(&self, _ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        if let GitHubEvent::Ping(event) = event {
            info!(
                "processing ping with hook id {:?}, sharing zen: {}",
                event.hook_id, event.zen
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_utils::pull_request;
    use serde_json::json;

    #[test]
    fn has_label_matches_substrings() {
        let pr = pull_request(json!({ "labels": [{ "name": "do-not-merge/needs-rebase" }] }));

        assert!(has_label(&pr, "do-not-merge/needs-rebase"));
        assert!(has_label(&pr, "needs-rebase"));
        assert!(!has_label(&pr, "approved"));
    }

    #[test]
    fn has_label_is_false_for_empty_label_list() {
        let pr = pull_request(json!({}));
        assert!(!has_label(&pr, "approved"));
    }

    #[test]
    fn unmerged_pr_with_failed_mergeability_is_rebaseable() {
        let pr = pull_request(json!({ "merged": false, "mergeable": false }));
        assert!(is_rebaseable(&pr));
    }

    #[test]
    fn merged_pr_is_never_rebaseable() {
        let pr = pull_request(json!({ "merged": true, "mergeable": false }));
        assert!(!is_rebaseable(&pr));
    }

    #[test]
    fn unknown_mergeability_is_not_rebaseable() {
        let pr = pull_request(json!({ "merged": false, "mergeable": null }));
        assert!(!is_rebaseable(&pr));

        let pr = pull_request(json!({ "merged": false, "mergeable": true }));
        assert!(!is_rebaseable(&pr));
    }
}

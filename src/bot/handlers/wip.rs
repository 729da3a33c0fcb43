use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::debug;

use crate::bot::handlers::has_label;
use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::Context;
use crate::webhooks::github::GitHubEvent;

pub(crate) const WIP_LABEL: &str = "do-not-merge/work-in-progress";

const CHECK_RUN_NAME: &str = "🤖 SrcOps work-in-progress state";

const WIP_MARKERS: &[&str] = &[
    "wip",
    "🚧",
    "dnm",
    "work in progress",
    "work-in-progress",
    "do not merge",
    "do-not-merge",
    "draft",
];

/// True iff the title flags the PR as not ready to merge.
pub(crate) fn is_wip(title: &str) -> bool {
    let title = title.to_lowercase();
    WIP_MARKERS.iter().any(|marker| title.contains(marker))
}

/// Keeps the work-in-progress label and check-run in sync with the PR title.
pub struct WipState;

#[rocket::async_trait]
impl EventHandler for WipState {
    fn name(&self) -> &'static str {
        "wip-state"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequest(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;

        debug!("working on {}", pr.html_url);

        let wip = is_wip(&pr.title);

        let check_run = ctx
            .github
            .create_check_run(owner, repo, CHECK_RUN_NAME, &pr.head.sha)
            .await?;
        ctx.github
            .update_check_run(
                owner,
                repo,
                check_run,
                &json!({ "name": CHECK_RUN_NAME, "status": "in_progress" }),
            )
            .await?;

        if wip {
            if !has_label(pr, WIP_LABEL) {
                ctx.github
                    .add_labels(owner, repo, pr.number, &[WIP_LABEL])
                    .await?;
            }
        } else {
            ctx.github
                .remove_label(owner, repo, pr.number, WIP_LABEL)
                .await?;
        }

        let output = match wip {
            true => json!({
                "title": "🤖 This PR is work-in-progress: It is incomplete",
                "summary": "🚧 Please do not merge this PR as it is still work-in-progress.",
                "text": format!("Debug info:\nis_wip_pr={}\npr_title={}\nwip_markers={:?}",
                                wip, pr.title, WIP_MARKERS),
            }),
            false => json!({
                "title": "🤖 This PR is NOT work-in-progress: Good to go",
                "summary": "This change is no longer work-in-progress.",
                "text": format!("Debug info:\nis_wip_pr={}\npr_title={}\nwip_markers={:?}",
                                wip, pr.title, WIP_MARKERS),
            }),
        };

        ctx.github
            .update_check_run(
                owner,
                repo,
                check_run,
                &json!({
                    "name": CHECK_RUN_NAME,
                    "status": "completed",
                    "conclusion": if wip { "neutral" } else { "success" },
                    "completed_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                    "output": output,
                }),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_with_markers_are_wip() {
        for title in [
            "WIP: add frobnicator",
            "wip add frobnicator",
            "🚧 frobnicate the barborator",
            "DNM until release is cut",
            "this is a work in progress",
            "work-in-progress: refactor",
            "DO NOT MERGE yet",
            "do-not-merge: broken CI",
            "draft of the new parser",
            "[Draft] new parser",
        ] {
            assert!(is_wip(title), "{}", title);
        }
    }

    #[test]
    fn titles_without_markers_are_not_wip() {
        for title in [
            "add frobnicator",
            "Fix typo in README",
            "Automatic update of dependency storages",
            "Release of version 0.6.0",
        ] {
            assert!(!is_wip(title), "{}", title);
        }
    }
}

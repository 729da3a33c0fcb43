use tracing::{debug, info};

use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::Context;
use crate::notify::NotificationKind;
use crate::webhooks::github::GitHubEvent;

/// Automated issue titles that don't warrant anyone's attention.
const IGNORED_ISSUE_PREFIXES: &[&str] = &[
    "Automatic update of dependency",
    "Automatic dependency re-locking",
    "Initial dependency lock",
    "Failed to update dependencies",
];

const RELEASE_ISSUE_PREFIX: &str = "Release of version";

/// Escalates issues labeled `bug` by adding `human_intervention_required`.
pub struct IssueTriage;

#[rocket::async_trait]
impl EventHandler for IssueTriage {
    fn name(&self) -> &'static str {
        "issue-triage"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::Issues(event) => event,
            _ => return Ok(()),
        };
        let issue = &event.issue;

        if !issue.labels.iter().any(|label| label.name == "bug") {
            return Ok(());
        }

        debug!("I found a bug!! {}", issue.html_url);
        ctx.github
            .add_labels(
                &event.repository.owner.login,
                &event.repository.name,
                issue.number,
                &["human_intervention_required"],
            )
            .await?;

        Ok(())
    }
}

/// Greets new issues: release issues get the `bot` label, everything
/// non-automated is announced to the chat space.
pub struct IssueOpened;

#[rocket::async_trait]
impl EventHandler for IssueOpened {
    fn name(&self) -> &'static str {
        "issue-opened"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::Issues(event) => event,
            _ => return Ok(()),
        };
        let issue = &event.issue;

        info!("working on issue {} ({}): opened", issue, issue.html_url);

        if IGNORED_ISSUE_PREFIXES
            .iter()
            .any(|prefix| issue.title.starts_with(prefix))
        {
            debug!("{} is automated housekeeping, not sending notification", issue.html_url);
            return Ok(());
        }

        if issue.title.starts_with(RELEASE_ISSUE_PREFIX) {
            debug!("{} is a release issue", issue.html_url);
            ctx.github
                .add_labels(
                    &event.repository.owner.login,
                    &event.repository.name,
                    issue.number,
                    &["bot"],
                )
                .await?;
        }

        ctx.chat
            .notify(
                NotificationKind::Issue,
                &format!(
                    "{} just opened an issue: *{}*... 🚨 check {} for details",
                    issue.user.login, issue.title, issue.html_url
                ),
                &format!("issue_{}_{}", event.repository.name, issue.id),
                issue.html_url.as_str(),
            )
            .await?;

        Ok(())
    }
}

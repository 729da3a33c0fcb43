use regex::Regex;
use tracing::{debug, info};

use crate::bot::handlers::has_label;
use crate::bot::router::{EventHandler, HandlerError};
use crate::bot::Context;
use crate::notify::NotificationKind;
use crate::webhooks::github::events::PullRequest;
use crate::webhooks::github::GitHubEvent;

/// Only merged PRs opened by the bot itself and labeled `bot` produce a
/// release tag.
pub(crate) fn eligible_release_pullrequest(pull_request: &PullRequest, bot_login: &str) -> bool {
    pull_request.merged && pull_request.user.login == bot_login && has_label(pull_request, "bot")
}

/// Issue number from a `Closes: #<n>` line in the PR body.
pub(crate) fn closed_issue_number(body: &str) -> Option<u64> {
    let pattern = Regex::new(r"(?mi)^closes:?\s*#(\d+)").expect("static pattern is valid");
    pattern
        .captures(body)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse().ok())
}

/// Turns a merged release PR into a tag on the merge commit, closing the
/// release issue it came from.
pub struct ReleaseTagger;

#[rocket::async_trait]
impl EventHandler for ReleaseTagger {
    fn name(&self) -> &'static str {
        "release-tagger"
    }

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError> {
        let event = match event {
            GitHubEvent::PullRequest(event) => event,
            _ => return Ok(()),
        };
        let pr = &event.pull_request;

        if !eligible_release_pullrequest(pr, &ctx.config.bot_login) {
            debug!("{} is not an eligible release PR", pr.html_url);
            return Ok(());
        }

        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let sha = pr
            .merge_commit_sha
            .as_deref()
            .ok_or(HandlerError::MissingField("merge_commit_sha"))?;
        // the source branch carries the release name
        let tag = &pr.head.r#ref;

        info!("tagging {} as {} in {}/{}", sha, tag, owner, repo);
        ctx.github.create_tag(owner, repo, tag, sha).await?;

        if let Some(issue) = closed_issue_number(pr.body.as_deref().unwrap_or_default()) {
            ctx.github
                .create_comment(
                    owner,
                    repo,
                    issue,
                    &format!("I have tagged commit {} to be release {} 🎉", sha, tag),
                )
                .await?;
            ctx.github.close_issue(owner, repo, issue).await?;
        }

        ctx.chat
            .notify(
                NotificationKind::Plain,
                &format!(
                    "I have tagged {} to be release {} of {} 🥳",
                    sha, tag, event.repository.full_name
                ),
                &format!("pull_request_{}", event.repository.name),
                pr.html_url.as_str(),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_utils::pull_request;
    use serde_json::json;

    #[test]
    fn merged_pr_without_bot_label_is_never_eligible() {
        let pr = pull_request(json!({
            "merged": true,
            "user": { "login": "sesheta", "id": 1 },
            "labels": [{ "name": "approved" }],
        }));
        assert!(!eligible_release_pullrequest(&pr, "sesheta"));
    }

    #[test]
    fn unmerged_pr_is_never_eligible() {
        let pr = pull_request(json!({
            "merged": false,
            "user": { "login": "sesheta", "id": 1 },
            "labels": [{ "name": "bot" }],
        }));
        assert!(!eligible_release_pullrequest(&pr, "sesheta"));
    }

    #[test]
    fn pr_by_someone_else_is_not_eligible() {
        let pr = pull_request(json!({
            "merged": true,
            "user": { "login": "alice", "id": 2 },
            "labels": [{ "name": "bot" }],
        }));
        assert!(!eligible_release_pullrequest(&pr, "sesheta"));
    }

    #[test]
    fn merged_bot_pr_with_bot_label_is_eligible() {
        let pr = pull_request(json!({
            "merged": true,
            "user": { "login": "sesheta", "id": 1 },
            "labels": [{ "name": "bot" }],
        }));
        assert!(eligible_release_pullrequest(&pr, "sesheta"));
    }

    #[test]
    fn closes_line_yields_the_issue_number() {
        assert_eq!(closed_issue_number("Closes: #123"), Some(123));
        assert_eq!(closed_issue_number("closes #7"), Some(7));
        assert_eq!(
            closed_issue_number("Release of version 0.6.0\n\nCloses: #42\n"),
            Some(42)
        );
    }

    #[test]
    fn body_without_closes_line_yields_nothing() {
        assert_eq!(closed_issue_number(""), None);
        assert_eq!(closed_issue_number("fixes nothing"), None);
        // the line has to start with the keyword
        assert_eq!(closed_issue_number("this closes #12"), None);
    }
}

use anyhow::anyhow;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use tracing::{debug, error, warn};

mod signing;
use signing::SignedGitHubPayload;

pub mod events;
pub use events::{EventKind, GitHubEvent};

use crate::webhooks::{Event, EventSender};

const X_GITHUB_EVENT: &str = "X-GitHub-Event";

pub struct GitHubSecret(pub String);

/// The event name from the `X-GitHub-Event` header.
///
/// Only events the app subscribes to are accepted; anything else is a bad
/// delivery and gets a 400 before the payload is even read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubEventType {
    Ping,
    PullRequest,
    PullRequestReview,
    Issues,
    IssueComment,
}

impl GitHubEventType {
    fn from_header(value: &str) -> Option<Self> {
        match value {
            "ping" => Some(Self::Ping),
            "pull_request" => Some(Self::PullRequest),
            "pull_request_review" => Some(Self::PullRequestReview),
            "issues" => Some(Self::Issues),
            "issue_comment" => Some(Self::IssueComment),
            _ => None,
        }
    }

    fn parse_payload(self, payload: &str) -> Result<GitHubEvent, serde_json::Error> {
        Ok(match self {
            Self::Ping => GitHubEvent::Ping(serde_json::from_str(payload)?),
            Self::PullRequest => GitHubEvent::PullRequest(serde_json::from_str(payload)?),
            Self::PullRequestReview => {
                GitHubEvent::PullRequestReview(serde_json::from_str(payload)?)
            }
            Self::Issues => GitHubEvent::Issues(serde_json::from_str(payload)?),
            Self::IssueComment => GitHubEvent::IssueComment(serde_json::from_str(payload)?),
        })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventType {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITHUB_EVENT).collect::<Vec<_>>();
        if event_types.len() != 1 {
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request header needs exactly one event type"),
            ));
        }

        let event_type = event_types[0];

        match GitHubEventType::from_header(event_type) {
            Some(ev_type) => Outcome::Success(ev_type),
            None => Outcome::Error((
                Status::BadRequest,
                anyhow!("not subscribed to '{}' events", event_type),
            )),
        }
    }
}

#[rocket::post("/api/webhooks/github", data = "<payload>")]
pub fn github_webhook(
    event_type: GitHubEventType,
    payload: SignedGitHubPayload,
    sender: &State<EventSender>,
) -> &'static str {
    match event_type.parse_payload(&payload.0) {
        Ok(event) => {
            debug!(
                "received {:?} event with action {:?}",
                event.kind(),
                event.action()
            );
            // a malformed or unroutable event is a no-op, but a closed channel
            // means the bot task is gone
            if sender.0.send(Event::GitHub(event)).is_err() {
                error!("event channel was closed, dropping event");
            }
        }
        Err(e) => warn!("couldn't parse {:?} payload: {}", event_type, e),
    }

    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribed_event_names_are_recognized() {
        assert_eq!(
            GitHubEventType::from_header("pull_request"),
            Some(GitHubEventType::PullRequest)
        );
        assert_eq!(
            GitHubEventType::from_header("pull_request_review"),
            Some(GitHubEventType::PullRequestReview)
        );
        assert_eq!(GitHubEventType::from_header("issues"), Some(GitHubEventType::Issues));
        assert_eq!(
            GitHubEventType::from_header("issue_comment"),
            Some(GitHubEventType::IssueComment)
        );
        assert_eq!(GitHubEventType::from_header("ping"), Some(GitHubEventType::Ping));

        assert_eq!(GitHubEventType::from_header("workflow_run"), None);
        assert_eq!(GitHubEventType::from_header(""), None);
    }

    #[test]
    fn ping_payload_parses() {
        let payload = json!({ "zen": "Design for failure.", "hook_id": 1 }).to_string();
        let event = GitHubEventType::Ping.parse_payload(&payload).unwrap();

        match event {
            GitHubEvent::Ping(ping) => assert_eq!(ping.zen, "Design for failure."),
            other => panic!("parsed into the wrong event: {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(GitHubEventType::PullRequest.parse_payload("{}").is_err());
        assert!(GitHubEventType::Issues.parse_payload("not json").is_err());
    }
}

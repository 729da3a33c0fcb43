use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::config::SrcOpsConfig;
use crate::dedupe::DedupeCache;
use crate::github::GitHubClient;
use crate::notify::ChatNotifier;
use crate::webhooks::Event;

pub mod chat;
pub mod handlers;
pub mod messages;
pub mod router;

pub(crate) mod utils;

use router::Router;

const NOTIFICATION_CACHE_LEN: usize = 100;
const NOTIFICATION_CACHE_AGE: Duration = Duration::from_secs(10);

/// Everything a handler needs to act on an event: configuration, the API
/// clients, and the notification dedupe cache. One instance is shared by the
/// bot task and the chat route.
pub struct Context {
    pub config: SrcOpsConfig,
    /// bare HTTP client, for endpoints that aren't GitHub or the chat space
    pub http: reqwest::Client,
    pub github: GitHubClient,
    pub chat: ChatNotifier,
    pub notifications: DedupeCache,
}

impl Context {
    pub fn new(config: SrcOpsConfig) -> anyhow::Result<Self> {
        let token = config.github_token()?;
        let http = GitHubClient::default_http().context("couldn't build HTTP client")?;
        let github = GitHubClient::new(http.clone(), config.github_api_url.clone(), token);
        let chat = ChatNotifier::new(http.clone(), config.chat_space_url.clone());

        Ok(Context {
            config,
            http,
            github,
            chat,
            notifications: DedupeCache::new(NOTIFICATION_CACHE_LEN, NOTIFICATION_CACHE_AGE),
        })
    }

    /// Decides if a review-request notification goes out. The bot's own
    /// account is never notified; everyone else at most once per (repo, PR,
    /// reviewer) within the dedupe window.
    pub fn should_notify(
        &self,
        repository_name: &str,
        pull_request_id: u64,
        requested_reviewer_login: &str,
    ) -> bool {
        if requested_reviewer_login == self.config.bot_login {
            return false;
        }

        self.notifications.insert_if_absent(&format!(
            "{}_{}_{}",
            repository_name, pull_request_id, requested_reviewer_login
        ))
    }
}

/// The bot task: drains the event channel and routes every event through the
/// policy handlers.
pub struct SrcOps {
    ctx: Arc<Context>,
    router: Router,
}

impl SrcOps {
    pub fn new(ctx: Arc<Context>) -> Self {
        SrcOps {
            ctx,
            router: handlers::routes(),
        }
    }

    pub async fn run(self, mut events: UnboundedReceiver<Event>) {
        debug!("running...");

        // deliveries are independent, so each one is handled in its own task;
        // the only state they share is the context
        let router = Arc::new(self.router);

        loop {
            let event = match events.recv().await {
                Some(event) => event,
                None => {
                    info!("all channel senders were dropped, exiting receive loop");
                    break;
                }
            };
            debug!("received event: {:?}", event);

            match event {
                Event::GitHub(event) => {
                    let ctx = self.ctx.clone();
                    let router = router.clone();
                    tokio::spawn(async move {
                        router.dispatch(&ctx, &event).await;
                    });
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use serde_json::{json, Value};

    use super::Context;
    use crate::config::SrcOpsConfig;
    use crate::webhooks::github::events::PullRequest;
    use crate::webhooks::GitHubEvent;

    pub(crate) fn test_config() -> SrcOpsConfig {
        serde_yaml::from_str(
            r#"
            github_org: acme
            github_secret: hook-secret
            github_token: test-token
            chat_secret: chat-secret
            chat_space_url: "https://chat.example.com/v1/spaces/XYZ/messages"
            ci_trigger_url: "https://ci.example.com/trigger"
            "#,
        )
        .expect("test config parses")
    }

    pub(crate) fn test_context() -> Context {
        Context::new(test_config()).expect("test context builds")
    }

    /// A minimal but complete PR payload, with `overrides` merged on top.
    pub(crate) fn pull_request(overrides: Value) -> PullRequest {
        let mut value = json!({
            "id": 100,
            "number": 1,
            "html_url": "https://github.com/acme/widgets/pull/1",
            "title": "add frobnicator",
            "state": "open",
            "user": { "login": "alice", "id": 2 },
            "base": { "ref": "master", "sha": "0000000000" },
            "head": { "ref": "feature", "sha": "1111111111" },
            "merged": false,
        });
        if let (Some(base), Some(overrides)) = (value.as_object_mut(), overrides.as_object()) {
            for (key, val) in overrides {
                base.insert(key.clone(), val.clone());
            }
        }
        serde_json::from_value(value).expect("test PR payload deserializes")
    }

    pub(crate) fn issue_comment_event(action: &str, body: &str) -> GitHubEvent {
        let value = json!({
            "action": action,
            "repository": {
                "name": "widgets",
                "full_name": "acme/widgets",
                "owner": { "login": "acme", "id": 1 },
                "html_url": "https://github.com/acme/widgets",
            },
            "sender": { "login": "alice", "id": 2 },
            "issue": {
                "id": 200,
                "number": 3,
                "html_url": "https://github.com/acme/widgets/issues/3",
                "title": "the frobnicator is broken",
                "user": { "login": "alice", "id": 2 },
            },
            "comment": {
                "html_url": "https://github.com/acme/widgets/issues/3#issuecomment-1",
                "body": body,
            },
        });
        GitHubEvent::IssueComment(serde_json::from_value(value).expect("test event deserializes"))
    }

    pub(crate) fn pull_request_event(action: &str) -> GitHubEvent {
        let value = json!({
            "action": action,
            "repository": {
                "name": "widgets",
                "full_name": "acme/widgets",
                "owner": { "login": "acme", "id": 1 },
                "html_url": "https://github.com/acme/widgets",
            },
            "sender": { "login": "alice", "id": 2 },
            "pull_request": {
                "id": 100,
                "number": 1,
                "html_url": "https://github.com/acme/widgets/pull/1",
                "title": "add frobnicator",
                "state": "open",
                "user": { "login": "alice", "id": 2 },
                "base": { "ref": "master", "sha": "0000000000" },
                "head": { "ref": "feature", "sha": "1111111111" },
                "merged": false,
            },
        });
        GitHubEvent::PullRequest(serde_json::from_value(value).expect("test event deserializes"))
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_context;

    #[test]
    fn the_bot_itself_is_never_notified() {
        let ctx = test_context();
        assert!(!ctx.should_notify("widgets", 100, "sesheta"));
        // and the refusal doesn't use up the dedupe slot for others
        assert!(ctx.should_notify("widgets", 100, "alice"));
    }

    #[test]
    fn duplicate_review_requests_are_suppressed() {
        let ctx = test_context();
        assert!(ctx.should_notify("widgets", 100, "alice"));
        assert!(!ctx.should_notify("widgets", 100, "alice"));
        // a different reviewer or PR is a different key
        assert!(ctx.should_notify("widgets", 100, "bob"));
        assert!(ctx.should_notify("widgets", 101, "alice"));
    }
}

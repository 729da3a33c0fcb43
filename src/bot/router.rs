use thiserror::Error;
use tracing::{debug, error, warn};

use crate::bot::Context;
use crate::github::ApiError;
use crate::notify::NotifyError;
use crate::webhooks::github::{EventKind, GitHubEvent};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The payload didn't carry a field this handler needs; the event is
    /// dropped, not failed.
    #[error("event payload is missing {0}")]
    MissingField(&'static str),
}

impl HandlerError {
    /// Transient failures get a calmer log line; GitHub redelivers and the
    /// next event re-evaluates.
    fn is_transient(&self) -> bool {
        matches!(self, HandlerError::Api(err) if err.is_transient())
    }
}

/// A policy rule reacting to one kind of webhook event.
#[rocket::async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &Context, event: &GitHubEvent) -> Result<(), HandlerError>;
}

struct Route {
    kind: EventKind,
    /// qualifying actions; empty means the handler takes the event regardless
    actions: &'static [&'static str],
    handler: Box<dyn EventHandler>,
}

/// Routing table from (event kind, action) to handlers.
///
/// Handlers are fault-isolated: an error is logged and doesn't keep the
/// remaining handlers from running.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Router { routes: Vec::new() }
    }

    pub fn on(
        mut self,
        kind: EventKind,
        actions: &'static [&'static str],
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.routes.push(Route {
            kind,
            actions,
            handler: Box::new(handler),
        });
        self
    }

    /// Invokes every handler matching the event. Returns how many ran.
    pub async fn dispatch(&self, ctx: &Context, event: &GitHubEvent) -> usize {
        let action = event.action();
        let mut dispatched = 0;

        for route in &self.routes {
            if route.kind != event.kind() {
                continue;
            }
            if !route.actions.is_empty() {
                match action {
                    Some(action) if route.actions.contains(&action) => {}
                    _ => continue,
                }
            }

            dispatched += 1;
            debug!("dispatching {:?} event to '{}'", event.kind(), route.handler.name());
            if let Err(err) = route.handler.handle(ctx, event).await {
                if err.is_transient() {
                    warn!(
                        "handler '{}' hit a transient failure on {:?}/{}: {}",
                        route.handler.name(),
                        event.kind(),
                        action.unwrap_or("-"),
                        err
                    );
                } else {
                    error!(
                        "handler '{}' failed on {:?}/{}: {}",
                        route.handler.name(),
                        event.kind(),
                        action.unwrap_or("-"),
                        err
                    );
                }
            }
        }

        if dispatched == 0 {
            debug!(
                "no handler registered for {:?}/{}",
                event.kind(),
                action.unwrap_or("-")
            );
        }

        dispatched
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::bot::test_utils::{issue_comment_event, pull_request_event, test_context};

    struct Recording {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[rocket::async_trait]
    impl EventHandler for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn handle(&self, _ctx: &Context, _event: &GitHubEvent) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail {
                true => Err(HandlerError::MissingField("nothing, really")),
                false => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn matching_action_dispatches() {
        let ctx = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new().on(
            EventKind::PullRequest,
            &["opened", "edited"],
            Recording {
                calls: calls.clone(),
                fail: false,
            },
        );

        let ran = router.dispatch(&ctx, &pull_request_event("opened")).await;
        assert_eq!(ran, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_matching_action_is_a_noop() {
        let ctx = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new().on(
            EventKind::PullRequest,
            &["closed"],
            Recording {
                calls: calls.clone(),
                fail: false,
            },
        );

        let ran = router.dispatch(&ctx, &pull_request_event("opened")).await;
        assert_eq!(ran, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_action_set_matches_any_action() {
        let ctx = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new().on(
            EventKind::PullRequest,
            &[],
            Recording {
                calls: calls.clone(),
                fail: false,
            },
        );

        router.dispatch(&ctx, &pull_request_event("whatever")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn event_kind_without_registered_handler_is_a_noop() {
        let ctx = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new().on(
            EventKind::PullRequest,
            &[],
            Recording {
                calls: calls.clone(),
                fail: false,
            },
        );

        let event = issue_comment_event("created", "Build succeeded.");
        assert_eq!(router.dispatch(&ctx, &event).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_the_next_one() {
        let ctx = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .on(
                EventKind::PullRequest,
                &["opened"],
                Recording {
                    calls: calls.clone(),
                    fail: true,
                },
            )
            .on(
                EventKind::PullRequest,
                &["opened"],
                Recording {
                    calls: calls.clone(),
                    fail: false,
                },
            );

        let ran = router.dispatch(&ctx, &pull_request_event("opened")).await;
        assert_eq!(ran, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

pub mod card;

/// What a notification is about; decides between a plain text payload and a
/// card with an open-link button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PullRequest,
    Issue,
    Plain,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("chat space rejected the message (status {status})")]
    Rejected { status: u16 },
}

/// Posts messages into the configured chat space.
#[derive(Clone)]
pub struct ChatNotifier {
    http: reqwest::Client,
    space_url: Url,
}

impl ChatNotifier {
    pub fn new(http: reqwest::Client, space_url: Url) -> Self {
        ChatNotifier { http, space_url }
    }

    /// Sends one message to the space, threaded under `thread_key`.
    pub async fn notify(
        &self,
        kind: NotificationKind,
        message: &str,
        thread_key: &str,
        url: &str,
    ) -> Result<(), NotifyError> {
        let body = match kind {
            NotificationKind::PullRequest => card::pull_request_card(message, url),
            NotificationKind::Issue => card::issue_card(message, url),
            NotificationKind::Plain => serde_json::json!({ "text": message }),
        };

        let mut request_url = self.space_url.clone();
        request_url
            .query_pairs_mut()
            .append_pair("threadKey", thread_key);

        trace!("posting chat message to {}", request_url);
        let response = self.http.post(request_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("chat notification sent on thread '{}'", thread_key);
        Ok(())
    }
}

impl std::fmt::Debug for ChatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatNotifier").finish_non_exhaustive()
    }
}

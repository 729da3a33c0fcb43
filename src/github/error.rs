use reqwest::StatusCode;
use thiserror::Error;

/// Outcome taxonomy for GitHub API calls.
///
/// Callers branch on the variant instead of catching exceptions: a 404 on a
/// label delete is routinely treated as success, rate limiting and 5xx are
/// transient, any other 4xx is fatal for the current handling cycle.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("rate limited by GitHub (status {status})")]
    RateLimited { status: u16 },

    /// Any other 4xx. Retrying won't help.
    #[error("GitHub API client error (status {status}): {body}")]
    Client { status: u16, body: String },

    /// 5xx, transient on GitHub's side.
    #[error("GitHub API server error (status {status})")]
    Server { status: u16 },

    /// Connection-level failure, including timeouts.
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("couldn't decode GitHub API response")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Classifies a non-2xx response.
    pub(crate) fn from_response(status: StatusCode, url: &str, body: String) -> Self {
        match status.as_u16() {
            404 => ApiError::NotFound {
                url: url.to_owned(),
            },
            429 => ApiError::RateLimited { status: 429 },
            // GitHub reports an exhausted rate limit as 403 with an
            // explanatory message rather than 429
            403 if body.contains("rate limit") => ApiError::RateLimited { status: 403 },
            s if (400..500).contains(&s) => ApiError::Client { status: s, body },
            s => ApiError::Server { status: s },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Transient errors are logged and given up on; GitHub redelivers webhooks
    /// and the next event re-evaluates the state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::Server { .. } | ApiError::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_its_own_variant() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, "u", String::new());
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn rate_limit_is_transient() {
        let err = ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, "u", String::new());
        assert!(err.is_transient());

        let err = ApiError::from_response(
            StatusCode::FORBIDDEN,
            "u",
            "API rate limit exceeded".to_string(),
        );
        assert!(matches!(err, ApiError::RateLimited { status: 403 }));
    }

    #[test]
    fn other_client_errors_are_fatal() {
        let err = ApiError::from_response(StatusCode::UNPROCESSABLE_ENTITY, "u", "nope".into());
        assert!(matches!(err, ApiError::Client { status: 422, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "u", String::new());
        assert!(matches!(err, ApiError::Server { status: 502 }));
        assert!(err.is_transient());
    }
}

use std::fmt::Display;

use serde::Deserialize;
use url::Url;

use crate::bot::utils::shorten_content;

mod issue_comment;
mod issues;
mod ping;
mod pull_request;
mod pull_request_review;

pub use issue_comment::*;
pub use issues::*;
pub use ping::*;
pub use pull_request::*;
pub use pull_request_review::*;

/// The webhook event names the GitHub App subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ping,
    PullRequest,
    PullRequestReview,
    Issues,
    IssueComment,
}

#[derive(Debug)]
pub enum GitHubEvent {
    Ping(PingEvent),
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestReviewEvent),
    Issues(IssuesEvent),
    IssueComment(IssueCommentEvent),
}

impl GitHubEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GitHubEvent::Ping(_) => EventKind::Ping,
            GitHubEvent::PullRequest(_) => EventKind::PullRequest,
            GitHubEvent::PullRequestReview(_) => EventKind::PullRequestReview,
            GitHubEvent::Issues(_) => EventKind::Issues,
            GitHubEvent::IssueComment(_) => EventKind::IssueComment,
        }
    }

    /// The payload's `action` field; `ping` deliveries don't carry one.
    pub fn action(&self) -> Option<&str> {
        match self {
            GitHubEvent::Ping(_) => None,
            GitHubEvent::PullRequest(event) => Some(&event.action),
            GitHubEvent::PullRequestReview(event) => Some(&event.action),
            GitHubEvent::Issues(event) => Some(&event.action),
            GitHubEvent::IssueComment(event) => Some(&event.action),
        }
    }

    pub fn repository(&self) -> Option<&Repository> {
        match self {
            GitHubEvent::Ping(event) => event.repository.as_ref(),
            GitHubEvent::PullRequest(event) => Some(&event.repository),
            GitHubEvent::PullRequestReview(event) => Some(&event.repository),
            GitHubEvent::Issues(event) => Some(&event.repository),
            GitHubEvent::IssueComment(event) => Some(&event.repository),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: GitHubUser,
    pub html_url: Url,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub html_url: Url,
    pub title: String,
    pub user: GitHubUser,
    #[serde(default)]
    pub labels: Vec<Label>,
    // an issue can be a PR, in this case the object contains a `pull_request`
    // key with urls to the PR
    pub pull_request: Option<PullRequestLinks>,
}

impl Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} ({})", self.number, shorten_content(&self.title))
    }
}

#[derive(Debug, Deserialize)]
pub struct PullRequestLinks {
    pub html_url: Url,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub html_url: Url,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: GitHubUser,
    /// "open" or "closed"
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub requested_reviewers: Vec<GitHubUser>,
    pub base: PrRef,
    pub head: PrRef,
    #[serde(default)]
    pub merged: bool,
    /// `None` while GitHub is still computing mergeability in the background
    #[serde(default)]
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub rebaseable: Option<bool>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

impl Display for PullRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PR #{}: {} by {}",
            self.number,
            shorten_content(&self.title),
            self.user.login
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct PrRef {
    pub r#ref: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct Review {
    pub state: String,
    pub user: GitHubUser,
    pub html_url: Url,
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    pub html_url: Url,
    pub body: String,
}

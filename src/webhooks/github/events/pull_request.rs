use serde::Deserialize;

use crate::webhooks::github::events::{GitHubUser, Label, PullRequest, Repository};

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: GitHubUser,
    pub pull_request: PullRequest,
    /// set on `review_requested` / `review_request_removed`
    pub requested_reviewer: Option<GitHubUser>,
    /// set on `labeled` / `unlabeled`
    pub label: Option<Label>,
}

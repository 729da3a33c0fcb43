use serde::Deserialize;

use crate::webhooks::github::events::{GitHubUser, PullRequest, Repository, Review};

#[derive(Debug, Deserialize)]
pub struct PullRequestReviewEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: GitHubUser,
    pub pull_request: PullRequest,
    pub review: Review,
}

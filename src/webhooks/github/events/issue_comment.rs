use serde::Deserialize;

use crate::webhooks::github::events::{Comment, GitHubUser, Issue, Repository};

#[derive(Debug, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: GitHubUser,
    pub issue: Issue,
    pub comment: Comment,
}

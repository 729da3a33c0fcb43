use serde::Deserialize;

use crate::webhooks::github::events::{GitHubUser, Issue, Label, Repository};

#[derive(Debug, Deserialize)]
pub struct IssuesEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: GitHubUser,
    pub issue: Issue,
    /// set on `labeled` / `unlabeled`
    pub label: Option<Label>,
}

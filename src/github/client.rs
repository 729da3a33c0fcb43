use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::github::error::ApiError;
use crate::webhooks::github::events::PullRequest;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client over the GitHub REST (and GraphQL) API.
///
/// One instance lives in the bot context and is shared by all handlers; the
/// underlying `reqwest::Client` is cheaply cloneable and bounds every call
/// with a network timeout.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CheckRunCreated {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct IssueCreated {
    html_url: Url,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, base: Url, token: String) -> Self {
        GitHubClient { http, base, token }
    }

    /// Builds the shared HTTP client used for all outbound calls.
    pub fn default_http() -> Result<reqwest::Client, ApiError> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(client)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base.join(path).map_err(|e| ApiError::Client {
            status: 0,
            body: format!("invalid API path {}: {}", path, e),
        })?;
        trace!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status, &url, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }

    pub async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ApiError> {
        self.get_json(&format!("/repos/{}/{}/pulls/{}", owner, repo, number))
            .await
    }

    /// SHA of the latest commit on the repository's default branch, or `None`
    /// for an empty repository.
    pub async fn default_branch_head_sha(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<String>, ApiError> {
        let commits: Vec<CommitItem> = self
            .get_json(&format!("/repos/{}/{}/commits?per_page=1", owner, repo))
            .await?;
        Ok(commits.into_iter().next().map(|c| c.sha))
    }

    pub async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[&str],
    ) -> Result<(), ApiError> {
        let request = self
            .request(
                Method::POST,
                &format!("/repos/{}/{}/issues/{}/labels", owner, repo, number),
            )?
            .json(&json!({ "labels": labels }));
        self.send(request).await?;
        Ok(())
    }

    /// Removes a label from an issue or PR. A 404 means the label wasn't there
    /// to begin with, which is what the caller wanted anyway.
    pub async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), ApiError> {
        let encoded = label.replace('/', "%2F");
        let request = self.request(
            Method::DELETE,
            &format!("/repos/{}/{}/issues/{}/labels/{}", owner, repo, number, encoded),
        )?;
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!("label '{}' already absent from {}/{}#{}", label, owner, repo, number);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Creates a check-run in `queued` state and returns its id.
    pub async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
    ) -> Result<u64, ApiError> {
        let request = self
            .request(Method::POST, &format!("/repos/{}/{}/check-runs", owner, repo))?
            .json(&json!({
                "name": name,
                "head_sha": head_sha,
                "status": "queued",
                "started_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            }));
        let response = self.send(request).await?;
        let body = response.text().await?;
        let created: CheckRunCreated = serde_json::from_str(&body).map_err(ApiError::Decode)?;
        Ok(created.id)
    }

    pub async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let request = self
            .request(
                Method::PATCH,
                &format!("/repos/{}/{}/check-runs/{}", owner, repo, check_run_id),
            )?
            .json(body);
        self.send(request).await?;
        Ok(())
    }

    /// PUT on the update-branch endpoint; GitHub acknowledges with 202 and
    /// performs the merge asynchronously.
    pub async fn update_branch(&self, owner: &str, repo: &str, number: u64) -> Result<(), ApiError> {
        let request = self
            .request(
                Method::PUT,
                &format!("/repos/{}/{}/pulls/{}/update-branch", owner, repo, number),
            )?
            .json(&json!({}));
        self.send(request).await?;
        Ok(())
    }

    /// Opens an issue and returns its html URL.
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        assignees: &[&str],
        labels: &[&str],
    ) -> Result<Url, ApiError> {
        let request = self
            .request(Method::POST, &format!("/repos/{}/{}/issues", owner, repo))?
            .json(&json!({
                "title": title,
                "assignees": assignees,
                "labels": labels,
            }));
        let response = self.send(request).await?;
        let body = response.text().await?;
        let created: IssueCreated = serde_json::from_str(&body).map_err(ApiError::Decode)?;
        Ok(created.html_url)
    }

    pub async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .request(
                Method::POST,
                &format!("/repos/{}/{}/issues/{}/comments", owner, repo, number),
            )?
            .json(&json!({ "body": body }));
        self.send(request).await?;
        Ok(())
    }

    pub async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> Result<(), ApiError> {
        let request = self
            .request(
                Method::PATCH,
                &format!("/repos/{}/{}/issues/{}", owner, repo, number),
            )?
            .json(&json!({ "state": "closed" }));
        self.send(request).await?;
        Ok(())
    }

    /// Creates a lightweight tag ref pointing at `sha`.
    pub async fn create_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        sha: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &format!("/repos/{}/{}/git/refs", owner, repo))?
            .json(&json!({
                "ref": format!("refs/tags/{}", tag),
                "sha": sha,
            }));
        self.send(request).await?;
        Ok(())
    }

    /// Single GraphQL query against the same host; used for bulk searches.
    pub async fn graphql(&self, query: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.base.join("/graphql").map_err(|e| ApiError::Client {
            status: 0,
            body: format!("invalid graphql URL: {}", e),
        })?;
        let request = self
            .http
            .post(url)
            .header("Authorization", format!("bearer {}", self.token))
            .json(&json!({ "query": query }));
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

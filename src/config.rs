use std::collections::HashMap;
use std::env;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

const GITHUB_TOKEN_VAR: &str = "GITHUB_ACCESS_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct SrcOpsConfig {
    /// GitHub organization whose repositories the bot watches
    pub github_org: String,
    /// Secret shared with GitHub to sign webhook payloads
    pub github_secret: String,
    /// Access token for the GitHub API. Can be omitted from the config file,
    /// in which case it is read from the `GITHUB_ACCESS_TOKEN` environment
    /// variable.
    #[serde(default)]
    pub github_token: Option<String>,
    /// Base URL of the GitHub REST API
    #[serde(default = "default_github_api_url")]
    pub github_api_url: Url,
    /// Shared secret expected in the `Authorization` header of chat events
    pub chat_secret: String,
    /// Message-creation URL of the chat space the bot posts notifications to
    pub chat_space_url: Url,
    /// Webhook URL of the CI pipeline triggered by the `deliver` command
    pub ci_trigger_url: Url,
    /// The bot's own GitHub account. Never notified, and the only author whose
    /// merged release PRs get tagged.
    #[serde(default = "default_bot_login")]
    pub bot_login: String,
    /// Chat phrases that open a release issue
    #[serde(default = "default_release_commands")]
    pub release_commands: Vec<String>,
    /// Roster returned by the `gti` / `grti` chat commands
    #[serde(default = "default_inhabitants")]
    pub inhabitants: Vec<String>,
    /// GitHub login -> chat user id, used to render mentions
    #[serde(default)]
    pub user_map: HashMap<String, String>,
}

impl SrcOpsConfig {
    /// The GitHub token from the config file, or from the environment when the
    /// file doesn't carry one.
    pub fn github_token(&self) -> anyhow::Result<String> {
        match &self.github_token {
            Some(token) => Ok(token.clone()),
            None => env::var(GITHUB_TOKEN_VAR).with_context(|| {
                format!(
                    "no github_token in config file and {} isn't set",
                    GITHUB_TOKEN_VAR
                )
            }),
        }
    }
}

fn default_github_api_url() -> Url {
    Url::parse("https://api.github.com").expect("static URL is well-formed")
}

fn default_bot_login() -> String {
    "sesheta".to_string()
}

fn default_release_commands() -> Vec<String> {
    [
        "create new minor release",
        "create new major release",
        "create new patch release",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_inhabitants() -> Vec<String> {
    [
        "bissenbay",
        "fridex",
        "goern",
        "harshad16",
        "KPostOffice",
        "pacospace",
        "saisankargochhayat",
        "sub-mod",
        "xtuchyna",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

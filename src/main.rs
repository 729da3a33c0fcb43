use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rocket::routes;
use tokio::sync::mpsc::unbounded_channel;
use url::Url;

mod bot;
use bot::handlers::rebase::merge_base_into_pull_request;
use bot::{Context, SrcOps};

mod config;
use config::SrcOpsConfig;

mod dedupe;

mod github;
use github::GitHubClient;

mod notify;

mod webhooks;
use webhooks::chat::{chat_event, ChatSecret};
use webhooks::github::GitHubSecret;
use webhooks::{github_webhook, EventSender};

#[derive(Parser)]
#[clap(version, about = "GitHub SrcOps automation bot")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for GitHub webhook deliveries and chat events
    Serve {
        /// Configuration file for the bot
        #[clap(short, long, parse(from_os_str))]
        config: PathBuf,
    },
    /// Trigger a rebase of one pull request onto its base branch
    Rebase {
        /// Be verbose about what's going on
        #[clap(long)]
        verbose: bool,
        /// Just a dry run, no changes are made via the GitHub API
        #[clap(short = 'r', long)]
        dry_run: bool,
        /// A token to authenticate with GitHub; defaults to GITHUB_ACCESS_TOKEN
        #[clap(short = 't', long)]
        github_access_token: Option<String>,
        owner: String,
        repo: String,
        pull_request: u64,
    },
    /// List the most recently opened PRs that are still sitting open
    StalledPrs {
        /// A token to authenticate with GitHub; defaults to GITHUB_ACCESS_TOKEN
        #[clap(short = 't', long)]
        github_access_token: Option<String>,
        /// Organization to search
        org: String,
    },
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    match opts.command {
        Command::Serve { config } => {
            init_tracing(false);
            serve(config).await
        }
        Command::Rebase {
            verbose,
            dry_run,
            github_access_token,
            owner,
            repo,
            pull_request,
        } => {
            init_tracing(verbose);
            let github = standalone_client(github_access_token)?;

            let triggered =
                merge_base_into_pull_request(&github, &owner, &repo, pull_request, dry_run).await?;
            if !triggered {
                anyhow::bail!("pull request update has not been triggered");
            }
            Ok(())
        }
        Command::StalledPrs {
            github_access_token,
            org,
        } => {
            init_tracing(false);
            let github = standalone_client(github_access_token)?;
            stalled_prs(&github, &org).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// API client for the one-shot subcommands, which don't load a config file.
fn standalone_client(token_flag: Option<String>) -> anyhow::Result<GitHubClient> {
    let token = match token_flag {
        Some(token) => token,
        None => env::var("GITHUB_ACCESS_TOKEN")
            .context("no --github-access-token and GITHUB_ACCESS_TOKEN isn't set")?,
    };
    let http = GitHubClient::default_http().context("couldn't build HTTP client")?;
    let base = Url::parse("https://api.github.com").expect("static URL is well-formed");
    Ok(GitHubClient::new(http, base, token))
}

async fn serve(config_path: PathBuf) -> anyhow::Result<()> {
    let config_file = File::open(&config_path)
        .with_context(|| format!("couldn't open {}:", config_path.display()))?;
    let config: SrcOpsConfig = serde_yaml::from_reader(BufReader::new(config_file))
        .context("couldn't parse config file")?;

    let (sender, receiver) = unbounded_channel();
    let github_secret = config.github_secret.clone();
    let chat_secret = config.chat_secret.clone();

    let ctx = Arc::new(Context::new(config).context("failed to create bot context")?);
    let bot = SrcOps::new(ctx.clone());
    tokio::spawn(async move { bot.run(receiver).await });

    let rocket = rocket::build()
        .mount("/", routes![github_webhook, chat_event])
        .manage(EventSender(sender))
        .manage(GitHubSecret(github_secret))
        .manage(ChatSecret(chat_secret))
        .manage(ctx);
    rocket.launch().await.map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

async fn stalled_prs(github: &GitHubClient, org: &str) -> anyhow::Result<()> {
    let query = format!(
        r#"{{
  search(query: "org:{} is:pr is:open sort:desc", type: ISSUE, last: 5) {{
    edges {{
      node {{
        ... on PullRequest {{
          url
          title
          createdAt
        }}
      }}
    }}
  }}
}}"#,
        org
    );

    let response = github
        .graphql(&query)
        .await
        .context("stalled PR search failed")?;
    let edges = response["data"]["search"]["edges"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    println!("Some Pull Requests are stalled:");
    for edge in &edges {
        let node = &edge["node"];
        let title = node["title"].as_str().unwrap_or("?");
        let url = node["url"].as_str().unwrap_or("");
        let created_at = node["createdAt"]
            .as_str()
            .and_then(|timestamp| DateTime::parse_from_rfc3339(timestamp).ok());

        match created_at {
            Some(at) => {
                let days = (Utc::now() - at.with_timezone(&Utc)).num_days();
                println!("\t'{}' created {} days ago ⋅ {}", title, days, url);
            }
            None => println!("\t'{}' ⋅ {}", title, url),
        }
    }

    Ok(())
}

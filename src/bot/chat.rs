use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::bot::messages::{status_message, DELIVER_USAGE, FALLBACK_RESPONSES, HELP_MESSAGE};
use crate::bot::utils::chat_mention;
use crate::bot::Context;
use crate::webhooks::chat::ChatEvent;

/// What the classifier made of one line of chat text.
///
/// Confidence is binary: a rule either matched (1.0) or nothing did (0.0).
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub kind: Option<IntentKind>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentKind {
    Help,
    Release {
        repo_name: String,
        text: String,
    },
    /// `deliver <repo>:<tag>`; both parameters are `None` when the trailing
    /// token didn't split cleanly, and the caller answers with a usage hint
    TagRelease {
        repo_name: Option<String>,
        tag: Option<String>,
    },
    Status,
    Gti,
    Grti,
}

fn matched(kind: IntentKind) -> Intent {
    Intent {
        kind: Some(kind),
        confidence: 1.0,
    }
}

/// Classifies one line of chat text. Ordered rules, first match wins; total
/// and deterministic over every input.
pub fn get_intent(release_commands: &[String], text: &str) -> Intent {
    let lower = text.to_lowercase();
    let last_token = text.split_whitespace().last().unwrap_or_default();

    if lower.starts_with("help") {
        return matched(IntentKind::Help);
    }

    if release_commands
        .iter()
        .any(|command| lower.starts_with(&command.to_lowercase()))
    {
        return matched(IntentKind::Release {
            repo_name: last_token.to_owned(),
            text: text.to_owned(),
        });
    }

    if lower.starts_with("deliver") {
        let parts = last_token.split(':').collect::<Vec<_>>();
        let (repo_name, tag) = match parts.as_slice() {
            [repo_name, tag] => (Some(repo_name.to_string()), Some(tag.to_string())),
            _ => (None, None),
        };
        return matched(IntentKind::TagRelease { repo_name, tag });
    }

    if lower.starts_with("status") || lower.starts_with("how are you") {
        return matched(IntentKind::Status);
    }

    if lower.starts_with("gti") || lower.starts_with("get thoth inhabitants") {
        return matched(IntentKind::Gti);
    }

    if lower.starts_with("grti") || lower.starts_with("get random thoth inhabitant") {
        return matched(IntentKind::Grti);
    }

    Intent {
        kind: None,
        confidence: 0.0,
    }
}

/// Handles one chat event envelope; `None` means no reply is owed.
pub async fn process_event(ctx: &Context, event: &ChatEvent) -> Option<String> {
    match event.event_type.as_str() {
        "ADDED_TO_SPACE" => {
            let space = event.space.as_ref()?;
            if space.space_type.as_deref() != Some("ROOM") {
                return None;
            }
            let name = space.display_name.as_deref().unwrap_or("this space");
            Some(format!("Thanks for adding me to \"{}\"!", name))
        }
        "MESSAGE" => {
            let message = event.message.as_ref()?;
            let thread = message
                .thread
                .as_ref()
                .map(|t| t.name.as_str())
                .unwrap_or("-");
            Some(process_user_text(ctx, thread, &message.text).await)
        }
        other => {
            debug!("ignoring chat event of type '{}'", other);
            None
        }
    }
}

/// Processes the text, gets the intent, and acts accordingly.
pub async fn process_user_text(ctx: &Context, thread_id: &str, text: &str) -> String {
    info!("message on thread {}: {}", thread_id, text);

    // if the message was sent in a room, it starts with our mention
    let parsed_text = match text.starts_with('@') {
        true => text.split_once(' ').map(|(_, rest)| rest).unwrap_or(""),
        false => text,
    };

    let intent = get_intent(&ctx.config.release_commands, parsed_text);

    match intent.kind {
        Some(IntentKind::Help) => HELP_MESSAGE.to_string(),
        Some(IntentKind::Status) => status_message(),
        Some(IntentKind::Release { repo_name, text }) => {
            make_release_issue(ctx, &repo_name, &text).await
        }
        Some(IntentKind::TagRelease {
            repo_name: Some(repo_name),
            tag: Some(tag),
        }) => trigger_tag_release(ctx, &repo_name, &tag).await,
        Some(IntentKind::TagRelease { .. }) => DELIVER_USAGE.to_string(),
        Some(IntentKind::Gti) => {
            let mut inhabitants = ctx
                .config
                .inhabitants
                .iter()
                .map(|login| chat_mention(&ctx.config.user_map, login))
                .collect::<Vec<_>>();
            inhabitants.shuffle(&mut rand::thread_rng());
            inhabitants.join(" 🔗 ")
        }
        Some(IntentKind::Grti) => {
            let picked = ctx
                .config
                .inhabitants
                .choose(&mut rand::thread_rng())
                .map(|login| chat_mention(&ctx.config.user_map, login))
                .unwrap_or_else(|| "nobody at all".to_string());
            format!(
                "⭐ In this Universe, based on relative position of planets \
                 and all the galaxies I picked {} ⭐",
                picked
            )
        }
        None => FALLBACK_RESPONSES
            .choose(&mut rand::thread_rng())
            .expect("fallback responses are never empty")
            .to_string(),
    }
}

/// Opens a release issue; the issue title is the command text minus the
/// leading verb and the trailing "for <repo>".
async fn make_release_issue(ctx: &Context, repo_name: &str, text: &str) -> String {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let title = match words.len() > 3 {
        true => words[1..words.len() - 2].join(" "),
        false => String::new(),
    };

    match ctx
        .github
        .create_issue(
            &ctx.config.github_org,
            repo_name,
            &title,
            &[&ctx.config.bot_login],
            &["bot"],
        )
        .await
    {
        Ok(link) => format!("Release issue is successfully created at - <{}|Link>", link),
        Err(err) => {
            warn!("couldn't create release issue in {}: {}", repo_name, err);
            format!("Creating the issue failed. \n Log - {}", err)
        }
    }
}

/// Posts the delivery request to the CI trigger webhook.
async fn trigger_tag_release(ctx: &Context, repo_name: &str, tag: &str) -> String {
    info!("tag_release... {}:{}", repo_name, tag);

    let payload = json!({
        "ref": tag,
        "ref_type": "tag",
        "repo_url": format!("https://github.com/{}/{}", ctx.config.github_org, repo_name),
        "repo_name": repo_name,
    });

    match ctx
        .http
        .post(ctx.config.ci_trigger_url.clone())
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => {
            debug!("CI trigger answered with status {}", response.status());
            format!(
                "I have told the CI pipeline to deliver `{}` of repository `{}`",
                tag, repo_name
            )
        }
        Err(err) => {
            warn!("couldn't reach the CI trigger webhook: {}", err);
            format!(
                "I couldn't reach the CI pipeline to deliver `{}` of repository `{}`, \
                 please try again later",
                tag, repo_name
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SrcOpsConfig;

    fn release_commands() -> Vec<String> {
        let config: SrcOpsConfig = serde_yaml::from_str(
            r#"
            github_org: acme
            github_secret: s
            chat_secret: s
            chat_space_url: "https://chat.example.com/v1/spaces/XYZ/messages"
            ci_trigger_url: "https://ci.example.com/trigger"
            "#,
        )
        .expect("config parses");
        config.release_commands
    }

    #[test]
    fn status_intents() {
        let commands = release_commands();

        for text in ["status", "how are you", "How are you?"] {
            let intent = get_intent(&commands, text);
            assert_eq!(intent.kind, Some(IntentKind::Status), "{}", text);
            assert_eq!(intent.confidence, 1.0);
        }
    }

    #[test]
    fn unrecognized_text_has_no_intent() {
        let commands = release_commands();

        for text in ["", "what's the weather like?", "deploy everything"] {
            let intent = get_intent(&commands, text);
            assert_eq!(intent.kind, None, "{}", text);
            assert_eq!(intent.confidence, 0.0);
        }
    }

    #[test]
    fn help_matches_prefix() {
        let intent = get_intent(&release_commands(), "help me out");
        assert_eq!(intent.kind, Some(IntentKind::Help));
    }

    #[test]
    fn release_command_extracts_last_token_as_repo() {
        let text = "create new patch release for storages";
        let intent = get_intent(&release_commands(), text);

        assert_eq!(
            intent.kind,
            Some(IntentKind::Release {
                repo_name: "storages".to_string(),
                text: text.to_string(),
            })
        );
    }

    #[test]
    fn deliver_splits_repo_and_tag() {
        let intent = get_intent(&release_commands(), "deliver storages:v1.2.3");
        assert_eq!(
            intent.kind,
            Some(IntentKind::TagRelease {
                repo_name: Some("storages".to_string()),
                tag: Some("v1.2.3".to_string()),
            })
        );
    }

    #[test]
    fn deliver_without_colon_yields_null_parameters() {
        let intent = get_intent(&release_commands(), "deliver storages");
        assert_eq!(
            intent.kind,
            Some(IntentKind::TagRelease {
                repo_name: None,
                tag: None,
            })
        );
    }

    #[test]
    fn deliver_with_too_many_colons_yields_null_parameters() {
        let intent = get_intent(&release_commands(), "deliver a:b:c");
        assert_eq!(
            intent.kind,
            Some(IntentKind::TagRelease {
                repo_name: None,
                tag: None,
            })
        );
    }

    #[tokio::test]
    async fn being_added_to_a_room_is_thanked() {
        let ctx = crate::bot::test_utils::test_context();
        let event: ChatEvent = serde_json::from_value(json!({
            "type": "ADDED_TO_SPACE",
            "space": { "type": "ROOM", "displayName": "DevOps" },
        }))
        .expect("chat event parses");

        let reply = process_event(&ctx, &event).await;
        assert_eq!(reply, Some("Thanks for adding me to \"DevOps\"!".to_string()));
    }

    #[tokio::test]
    async fn unknown_chat_event_types_get_no_reply() {
        let ctx = crate::bot::test_utils::test_context();
        let event: ChatEvent = serde_json::from_value(json!({ "type": "CARD_CLICKED" }))
            .expect("chat event parses");

        assert_eq!(process_event(&ctx, &event).await, None);
    }

    #[tokio::test]
    async fn mention_is_stripped_before_classification() {
        let ctx = crate::bot::test_utils::test_context();
        let reply = process_user_text(&ctx, "thread", "@Sesheta status").await;
        assert_eq!(reply, status_message());
    }

    #[tokio::test]
    async fn unparseable_deliver_parameters_get_a_usage_hint() {
        let ctx = crate::bot::test_utils::test_context();
        let reply = process_user_text(&ctx, "thread", "deliver storages").await;
        assert_eq!(reply, DELIVER_USAGE);
    }

    #[tokio::test]
    async fn help_is_answered_verbatim() {
        let ctx = crate::bot::test_utils::test_context();
        let reply = process_user_text(&ctx, "thread", "help").await;
        assert_eq!(reply, HELP_MESSAGE);
    }

    #[test]
    fn roster_abbreviations_match() {
        let commands = release_commands();

        assert_eq!(get_intent(&commands, "gti").kind, Some(IntentKind::Gti));
        assert_eq!(
            get_intent(&commands, "get thoth inhabitants").kind,
            Some(IntentKind::Gti)
        );
        assert_eq!(get_intent(&commands, "GRTI").kind, Some(IntentKind::Grti));
        assert_eq!(
            get_intent(&commands, "get random thoth inhabitant").kind,
            Some(IntentKind::Grti)
        );
    }
}

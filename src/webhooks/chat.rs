use std::sync::Arc;

use anyhow::anyhow;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    serde::json::Json,
    Request, State,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bot::{chat, Context};

const AUTHORIZATION: &str = "Authorization";

pub struct ChatSecret(pub String);

/// Envelope of a chat-platform event, as delivered to the bot endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub space: Option<Space>,
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Space {
    #[serde(rename = "type")]
    pub space_type: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub thread: Option<Thread>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct Thread {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub text: String,
}

pub(crate) struct ChatAuthorization;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ChatAuthorization {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let authorization = request.headers().get(AUTHORIZATION).collect::<Vec<_>>();
        if authorization.len() != 1 {
            trace!("couldn't locate {} header", AUTHORIZATION);
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request needs an authorization header"),
            ));
        }
        let authorization = authorization[0];
        let secret = &request.guard::<&State<ChatSecret>>().await.unwrap().0;

        if authorization != secret {
            trace!("secret validation failed, stopping here...");
            return Outcome::Error((Status::BadRequest, anyhow!("secret doesn't match")));
        }

        trace!("validated chat request");
        Outcome::Success(ChatAuthorization)
    }
}

/// Chat front-end: answers in-request, unlike the GitHub webhook which goes
/// through the event channel.
#[rocket::post("/api/chat/events", format = "json", data = "<event>")]
pub(crate) async fn chat_event(
    _token: ChatAuthorization,
    event: Json<ChatEvent>,
    ctx: &State<Arc<Context>>,
) -> Option<Json<ChatReply>> {
    let event = event.into_inner();
    debug!("received chat event of type '{}'", event.event_type);

    let ctx: &Context = ctx.inner().as_ref();
    chat::process_event(ctx, &event)
        .await
        .map(|text| Json(ChatReply { text }))
}

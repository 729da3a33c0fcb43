use std::collections::HashMap;

pub(crate) fn shorten_content(content: &str) -> String {
    let max_length = 72;
    if content.len() <= max_length {
        content.to_owned()
    } else {
        content.chars().take(max_length).collect::<String>() + "…"
    }
}

/// Renders a GitHub login as a chat mention when the user map knows it,
/// otherwise falls back to the plain login.
pub(crate) fn chat_mention(user_map: &HashMap<String, String>, login: &str) -> String {
    match user_map.get(login) {
        Some(id) => format!("<users/{}>", id),
        None => login.to_owned(),
    }
}

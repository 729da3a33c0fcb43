//! Card payloads for the chat-space message API.
//!
//! Cards carry the message as a text paragraph plus a button opening the
//! related GitHub page. The card name repeats the resource id, taken from the
//! last URL segment.

use serde_json::{json, Value};

fn card_with_button(message: &str, button_text: &str, url: &str) -> Value {
    json!([{
        "sections": [{
            "widgets": [
                { "textParagraph": { "text": message } },
                {
                    "buttons": [{
                        "textButton": {
                            "text": button_text,
                            "onClick": { "openLink": { "url": url } },
                        }
                    }]
                },
            ]
        }]
    }])
}

fn last_url_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

pub fn pull_request_card(message: &str, url: &str) -> Value {
    json!({
        "cards": card_with_button(message, "open this PR", url),
        "name": format!("pull_request-{}", last_url_segment(url)),
    })
}

pub fn issue_card(message: &str, url: &str) -> Value {
    json!({
        "cards": card_with_button(message, "open this Issue", url),
        "name": format!("issue-{}", last_url_segment(url)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_card_is_named_after_the_pr() {
        let card = pull_request_card("new PR", "https://github.com/org/repo/pull/42");
        assert_eq!(card["name"], "pull_request-42");

        let widgets = &card["cards"][0]["sections"][0]["widgets"];
        assert_eq!(widgets[0]["textParagraph"]["text"], "new PR");
        assert_eq!(
            widgets[1]["buttons"][0]["textButton"]["onClick"]["openLink"]["url"],
            "https://github.com/org/repo/pull/42"
        );
    }

    #[test]
    fn issue_card_button_opens_the_issue() {
        let card = issue_card("bug!", "https://github.com/org/repo/issues/7");
        assert_eq!(card["name"], "issue-7");
        assert_eq!(
            card["cards"][0]["sections"][0]["widgets"][1]["buttons"][0]["textButton"]["text"],
            "open this Issue"
        );
    }
}

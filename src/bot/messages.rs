//! Canned chat texts.

pub const HELP_MESSAGE: &str = "\
    Here are some things you can do -\n\
    - Create a release issue\n\
      - `create new <minor/major/patch> release for <repository name>`\n\
    - Deliver a tagged release to the CI pipeline\n\
      - `deliver <repository name>:<tag>`\n\
    - Get a listing of the inhabitants\n\
      - `get thoth inhabitants`, or `gti` for short\n\
    - Get one inhabitant, randomly\n\
      - `get random thoth inhabitant`, or `grti` for short\n\
    - `status` or `how are you` to check up on me\n\
    ";

pub const DELIVER_USAGE: &str =
    "Uhh... cant find repo_name or tag, please use `repo_name:tag`!";

pub fn status_message() -> String {
    format!(
        "✨ it feels great to run v{} of myself today!",
        env!("CARGO_PKG_VERSION")
    )
}

/// Replies used when no intent matched; one is picked at random.
pub const FALLBACK_RESPONSES: &[&str] = &[
    "I'm not sure I understood that. Try `help`!",
    "Hmm, that one's beyond me. `help` lists what I can do.",
    "Interesting! But I don't know how to act on it. Maybe `help`?",
    "🤖 my rule book has nothing on that. `help` shows my commands.",
];

use apb_core::{
    domain::{ChatId, UserId},
    messaging::types::{Command, IncomingUpdate},
};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(crate) fn command_update(
    chat_id: ChatId,
    user_id: UserId,
    username: Option<String>,
    text: &str,
) -> IncomingUpdate {
    let (name, args) = parse_command(text);
    IncomingUpdate::Command(Command {
        chat_id,
        user_id,
        username,
        name,
        args,
    })
}

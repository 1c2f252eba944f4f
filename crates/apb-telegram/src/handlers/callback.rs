use apb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{CallbackQuery, IncomingUpdate},
};

/// Build a callback update. `message` is `(chat_id, message_id)` of the message
/// carrying the button; without it the reply goes to the user's private chat.
/// Returns `None` when there is no payload to act on.
pub(crate) fn callback_update(
    user_id: i64,
    username: Option<String>,
    callback_id: &str,
    data: Option<&str>,
    message: Option<(i64, i32)>,
) -> Option<IncomingUpdate> {
    let data = data.filter(|d| !d.is_empty())?;

    let message = message.map(|(chat, id)| MessageRef {
        chat_id: ChatId(chat),
        message_id: MessageId(id),
    });
    let chat_id = message.map(|m| m.chat_id).unwrap_or(ChatId(user_id));

    Some(IncomingUpdate::Callback(CallbackQuery {
        chat_id,
        user_id: UserId(user_id),
        username,
        callback_id: callback_id.to_string(),
        data: data.to_string(),
        message,
    }))
}

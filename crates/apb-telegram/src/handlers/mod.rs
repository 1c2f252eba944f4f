//! Telegram update handlers.
//!
//! Each handler is a thin adapter that turns a teloxide update into an
//! `IncomingUpdate` and hands it to the conversation engine. Engine failures
//! are logged and answered with a generic notice; they never stop polling.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use apb_core::{
    conversation::ConversationEngine,
    domain::{ChatId, UserId},
    messaging::{
        port::MessagingPort,
        types::{IncomingUpdate, TextMessage},
    },
};

use crate::router::AppState;

mod callback;
mod commands;

const FAILURE_NOTICE: &str =
    "An unexpected error occurred. Please try again or use /cancel to reset.";

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let message = q.message.as_ref().map(|m| (m.chat.id.0, m.id.0));
    let Some(update) = callback::callback_update(
        q.from.id.0 as i64,
        q.from.username.clone(),
        &q.id,
        q.data.as_deref(),
        message,
    ) else {
        // Still acknowledge so the client stops its spinner.
        let _ = bot.answer_callback_query(q.id).await;
        return Ok(());
    };

    dispatch(&state.engine, state.messenger.as_ref(), update).await;
    Ok(())
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let user_id = UserId(user.id.0 as i64);
    let username = user.username.clone();

    let update = if text.starts_with('/') {
        commands::command_update(chat_id, user_id, username, text)
    } else {
        IncomingUpdate::Text(TextMessage {
            chat_id,
            user_id,
            username,
            text: text.to_string(),
        })
    };

    dispatch(&state.engine, state.messenger.as_ref(), update).await;
    Ok(())
}

async fn dispatch(engine: &ConversationEngine, messenger: &dyn MessagingPort, update: IncomingUpdate) {
    let chat_id = update.chat_id();
    let user_id = update.user_id();
    let input = describe(&update);

    if let Err(e) = engine.handle(update).await {
        tracing::error!(user_id = user_id.0, input = %input, error = %e, "update handling failed");
        if let Err(notify_err) = messenger.send_html(chat_id, FAILURE_NOTICE).await {
            tracing::warn!(user_id = user_id.0, error = %notify_err, "failed to send error notice");
        }
    }
}

/// Short log label for an update. Free text is never logged: it may be a password.
fn describe(update: &IncomingUpdate) -> String {
    match update {
        IncomingUpdate::Command(c) => format!("/{}", c.name),
        IncomingUpdate::Text(t) => format!("text ({} chars)", t.text.chars().count()),
        IncomingUpdate::Callback(q) => format!("callback {}", q.data),
    }
}

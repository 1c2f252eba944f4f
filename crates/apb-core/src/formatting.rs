//! Presentation: Telegram HTML for listings, menus and the welcome text.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};

use crate::{
    listing::{is_absolute_url, Listing},
    messaging::types::{InlineButton, InlineKeyboard},
    payload::CallbackAction,
};

const BUTTON_LABEL_MAX: usize = 40;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `YYYY-MM-DD HH:MM` in local time, `N/A` for missing/invalid stamps.
pub fn format_timestamp(ms: i64) -> String {
    format_timestamp_in(ms, &Local)
}

pub fn format_timestamp_in<Tz>(ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if ms <= 0 {
        return "N/A".to_string();
    }
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
        None => "N/A".to_string(),
    }
}

pub fn welcome_html() -> String {
    "👋 Welcome to the <b>WEB3 Airdrop Portal Bot</b>!\n\n\
Here's what you can do:\n\
•  /list - See all available airdrops.\n\
•  /search &lt;query&gt; - Find airdrops by title, description, or referral code.\n\
•  /admin_login - (Admins only) Access management features.\n\
•  /admin_logout - (Admins only) Log out from admin session.\n\n\
<b>⚠️ Note: This bot's data is stored in memory and will be lost on restart.</b>\n\
Feel free to explore!"
        .to_string()
}

/// Numbered index of listings plus one "View Details" button per shown entry.
///
/// The text never exceeds `max_len` bytes: entries that would not fit are
/// dropped and summarized, and a header that alone is too long is left out.
pub fn listing_index(
    header_html: &str,
    listings: &[Listing],
    max_len: usize,
) -> (String, InlineKeyboard) {
    let head = format!("{header_html}\n\n");
    let mut text = if head.len() <= max_len {
        head
    } else {
        String::new()
    };
    let mut buttons = Vec::new();

    for (i, l) in listings.iter().enumerate() {
        let line = format!("{}. <b>{}</b>\n", i + 1, escape_html(&l.title));
        let remaining = listings.len() - i;
        let footer = more_footer(remaining);
        if text.len() + line.len() + footer.len() > max_len {
            if text.len() + footer.len() <= max_len {
                text.push_str(&footer);
            }
            break;
        }
        text.push_str(&line);
        buttons.push(InlineButton::callback(
            truncate_label(&format!("View Details: {}", l.title)),
            CallbackAction::Details(l.id.clone()).encode(),
        ));
    }

    (text, InlineKeyboard::one_per_row(buttons))
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn more_footer(remaining: usize) -> String {
    format!("<i>…and {remaining} more</i>")
}

/// Full listing card with link and referral buttons.
pub fn listing_details(l: &Listing) -> (String, InlineKeyboard) {
    let description = if l.description.is_empty() {
        "<i>No description provided.</i>".to_string()
    } else {
        escape_html(&l.description)
    };
    let referral = if l.referral.is_empty() {
        "<i>N/A</i>".to_string()
    } else {
        format!("<code>{}</code>", escape_html(&l.referral))
    };
    let url = escape_html(&l.url);

    let text = format!(
        "<b>🚀 {title}</b>\n\n\
<b>Description:</b> {description}\n\
<b>Referral Code:</b> {referral}\n\
<b>URL:</b> <a href=\"{url}\">{url}</a>\n\n\
<i>Added/Last Updated: {updated}</i>\n\
<i>(ID: {id})</i>",
        title = escape_html(&l.title),
        updated = format_timestamp(l.timestamp),
        id = escape_html(l.id.as_str()),
    );

    let mut row = Vec::new();
    if is_absolute_url(&l.url) {
        row.push(InlineButton::url("Visit Airdrop", l.url.clone()));
    }
    if !l.referral.is_empty() {
        row.push(InlineButton::callback(
            "Copy Referral Code",
            CallbackAction::CopyReferral(l.id.clone()).encode(),
        ));
    }
    let rows = if row.is_empty() { vec![] } else { vec![row] };

    (text, InlineKeyboard::new(rows))
}

pub fn referral_html(code: &str) -> String {
    format!(
        "<b>Referral Code:</b>\n<code>{}</code>\n<i>(Tap the code above to copy it to your clipboard.)</i>",
        escape_html(code)
    )
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > BUTTON_LABEL_MAX {
        format!(
            "{}...",
            label.chars().take(BUTTON_LABEL_MAX).collect::<String>()
        )
    } else {
        label.to_string()
    }
}

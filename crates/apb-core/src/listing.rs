//! Listing records and the sanitizer that canonicalizes raw field input.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::ListingId;

/// Built-in fallback icon (inline SVG) for listings without a usable icon URL.
pub const DEFAULT_ICON: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAyNCAyNCI+PHBhdGggZmlsbD0iIzkwYjBjOCIgZD0iTTEyLDIyQzYuNDgsMjIsMiwxNy41MiwyLDEyUzYuNDgsMiwxMiwyczEwLDQuNDgsMTAsMTBTSDE3LjUyLDIyLDEyLDIyLzBNMjQsMThjLTQuNDEsMC04LTMuNTktOC04czMuNTktOCw4LTggOCwzLjU5LDgsOFMxOS41OSwyMCwyNCwxOHoiLz48L2Vncz4=";

pub const UNTITLED: &str = "Untitled Link";
pub const URL_PLACEHOLDER: &str = "#";

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

/// A canonical catalog entry. Only `sanitize` produces these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub referral: String,
    /// Creation or last-modification time, epoch milliseconds.
    pub timestamp: i64,
}

/// Raw, possibly incomplete listing input (flow drafts, seed files, re-sanitization).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFields {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub referral: Option<String>,
    pub timestamp: Option<i64>,
}

impl From<Listing> for ListingFields {
    fn from(l: Listing) -> Self {
        Self {
            title: Some(l.title),
            url: Some(l.url),
            icon: Some(l.icon),
            description: Some(l.description),
            referral: Some(l.referral),
            timestamp: Some(l.timestamp),
        }
    }
}

/// The closed set of fields an admin may change through the edit flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditableField {
    Title,
    Url,
    Icon,
    Description,
    Referral,
}

impl EditableField {
    pub const ALL: [EditableField; 5] = [
        EditableField::Title,
        EditableField::Url,
        EditableField::Icon,
        EditableField::Description,
        EditableField::Referral,
    ];

    /// Stable key used in button payloads.
    pub fn key(self) -> &'static str {
        match self {
            EditableField::Title => "title",
            EditableField::Url => "url",
            EditableField::Icon => "icon",
            EditableField::Description => "description",
            EditableField::Referral => "referral",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Human label for menus and confirmations.
    pub fn label(self) -> &'static str {
        match self {
            EditableField::Title => "Title",
            EditableField::Url => "URL",
            EditableField::Icon => "Icon URL",
            EditableField::Description => "Description",
            EditableField::Referral => "Referral Code",
        }
    }

    pub fn apply(self, fields: &mut ListingFields, value: String) {
        let slot = match self {
            EditableField::Title => &mut fields.title,
            EditableField::Url => &mut fields.url,
            EditableField::Icon => &mut fields.icon,
            EditableField::Description => &mut fields.description,
            EditableField::Referral => &mut fields.referral,
        };
        *slot = Some(value);
    }
}

/// Canonicalize raw fields into a listing.
///
/// Idempotent: `sanitize(sanitize(f, id).into(), id)` equals `sanitize(f, id)`.
/// Without `existing_id` a random UUID token is assigned.
pub fn sanitize(fields: ListingFields, existing_id: Option<ListingId>) -> Listing {
    let title = non_blank(fields.title).unwrap_or_else(|| UNTITLED.to_string());
    let url = non_blank(fields.url).unwrap_or_else(|| URL_PLACEHOLDER.to_string());
    let icon = resolve_icon(fields.icon.as_deref().unwrap_or(""), &url);

    Listing {
        id: existing_id.unwrap_or_else(|| ListingId(Uuid::new_v4().to_string())),
        title,
        url,
        icon,
        description: trimmed(fields.description),
        referral: trimmed(fields.referral),
        timestamp: fields.timestamp.unwrap_or_else(now_ms),
    }
}

/// Icon policy: empty → favicon for the url's host (or default);
/// non-empty → kept only when it is an absolute URL.
pub fn resolve_icon(icon: &str, url: &str) -> String {
    let icon = icon.trim();
    if icon.is_empty() {
        return match host_of(url) {
            Some(host) => favicon_url(&host),
            None => DEFAULT_ICON.to_string(),
        };
    }
    if is_absolute_url(icon) {
        icon.to_string()
    } else {
        DEFAULT_ICON.to_string()
    }
}

pub fn favicon_url(host: &str) -> String {
    format!("{FAVICON_SERVICE}?domain={host}&sz=128")
}

/// True when `raw` parses with both a scheme and a non-empty host.
pub fn is_absolute_url(raw: &str) -> bool {
    host_of(raw).is_some()
}

pub fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn trimmed(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

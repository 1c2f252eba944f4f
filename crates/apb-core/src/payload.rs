//! Button payloads: `<operation>_<identifier>` strings the gateway hands back verbatim.

use crate::{domain::ListingId, listing::EditableField};

const DETAILS: &str = "details_";
const COPY_REFERRAL: &str = "copyref_";
const EDIT_FIELD: &str = "editfield_";
const CONFIRM_DELETE: &str = "confirmdelete_";
const CANCEL_DELETE: &str = "canceldelete";
const CANCEL_KEY: &str = "cancel";

/// Bot API limit on callback data, in bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

/// Whether every payload that can carry `id` stays within [`MAX_CALLBACK_DATA_LEN`].
pub fn fits_in_payload(id: &ListingId) -> bool {
    CallbackAction::ConfirmDelete(id.clone()).encode().len() <= MAX_CALLBACK_DATA_LEN
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldChoice {
    Field(EditableField),
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Details(ListingId),
    CopyReferral(ListingId),
    EditField(FieldChoice),
    ConfirmDelete(ListingId),
    CancelDelete,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Details(id) => format!("{DETAILS}{id}"),
            CallbackAction::CopyReferral(id) => format!("{COPY_REFERRAL}{id}"),
            CallbackAction::EditField(FieldChoice::Field(f)) => format!("{EDIT_FIELD}{}", f.key()),
            CallbackAction::EditField(FieldChoice::Cancel) => format!("{EDIT_FIELD}{CANCEL_KEY}"),
            CallbackAction::ConfirmDelete(id) => format!("{CONFIRM_DELETE}{id}"),
            CallbackAction::CancelDelete => CANCEL_DELETE.to_string(),
        }
    }

    /// `None` for payloads this bot never produced (stale clients, other bots).
    pub fn parse(data: &str) -> Option<Self> {
        if data == CANCEL_DELETE {
            return Some(CallbackAction::CancelDelete);
        }
        if let Some(key) = data.strip_prefix(EDIT_FIELD) {
            if key == CANCEL_KEY {
                return Some(CallbackAction::EditField(FieldChoice::Cancel));
            }
            return EditableField::from_key(key)
                .map(|f| CallbackAction::EditField(FieldChoice::Field(f)));
        }

        if let Some(id) = listing_suffix(data, DETAILS) {
            return Some(CallbackAction::Details(id));
        }
        if let Some(id) = listing_suffix(data, COPY_REFERRAL) {
            return Some(CallbackAction::CopyReferral(id));
        }
        listing_suffix(data, CONFIRM_DELETE).map(CallbackAction::ConfirmDelete)
    }
}

fn listing_suffix(data: &str, prefix: &str) -> Option<ListingId> {
    data.strip_prefix(prefix)
        .filter(|id| !id.is_empty())
        .map(|id| ListingId(id.to_string()))
}

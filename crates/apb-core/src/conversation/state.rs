//! Per-identity conversation state. Each variant carries exactly what its step has collected.

use crate::{domain::ListingId, listing::EditableField};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    /// Waiting for the master secret.
    AdminLogin,
    Add(AddState),
    Edit(EditState),
    Delete(DeleteState),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    AdminLogin,
    Add,
    Edit,
    Delete,
}

impl FlowState {
    pub fn kind(&self) -> FlowKind {
        match self {
            FlowState::AdminLogin => FlowKind::AdminLogin,
            FlowState::Add(_) => FlowKind::Add,
            FlowState::Edit(_) => FlowKind::Edit,
            FlowState::Delete(_) => FlowKind::Delete,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddState {
    Title,
    Url {
        title: String,
    },
    Icon {
        title: String,
        url: String,
    },
    Description {
        title: String,
        url: String,
        icon: String,
    },
    Referral {
        title: String,
        url: String,
        icon: String,
        description: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditState {
    AwaitId,
    AwaitSecret { id: ListingId, title: String },
    AwaitFieldChoice { id: ListingId, title: String },
    AwaitNewValue { id: ListingId, field: EditableField },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteState {
    AwaitId,
    AwaitSecret { id: ListingId, title: String },
}

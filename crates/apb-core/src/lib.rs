//! Core domain + application logic for the airdrop listing bot.
//!
//! Framework-agnostic: the chat gateway lives behind [`messaging::port::MessagingPort`],
//! implemented in adapter crates.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod listing;
pub mod logging;
pub mod messaging;
pub mod payload;

pub use errors::{Error, Result};

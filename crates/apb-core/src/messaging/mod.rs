//! Messaging gateway abstractions (Telegram today).

pub mod port;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::{env, path::PathBuf};

use crate::{
    admin::{AdminSecrets, Secret},
    errors::Error,
    Result,
};

/// Typed configuration, loaded once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub secrets: AdminSecrets,
    /// Optional JSON array of listings to pre-populate the catalog with.
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Load `.env` (never overriding the real environment), then read the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;

        let secrets = AdminSecrets {
            master: Secret::new(&required(&lookup, "ADMIN_MASTER_PASSWORD")?),
            edit: Secret::new(&required(&lookup, "EDIT_LINK_PASSWORD")?),
            delete: Secret::new(&required(&lookup, "DELETE_LINK_PASSWORD")?),
        };

        let seed_file = lookup("AIRDROP_SEED_FILE")
            .and_then(non_empty)
            .map(PathBuf::from);

        Ok(Self {
            telegram_bot_token,
            secrets,
            seed_file,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

//! Admin authentication: shared secrets and the set of logged-in identities.

use std::{collections::HashSet, fmt};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::domain::UserId;

/// A configured password. Only its SHA-256 digest is kept in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    digest: [u8; 32],
}

impl Secret {
    pub fn new(plain: &str) -> Self {
        Self {
            digest: Sha256::digest(plain.as_bytes()).into(),
        }
    }

    /// Exact comparison against user input (no trimming).
    pub fn matches(&self, supplied: &str) -> bool {
        let other: [u8; 32] = Sha256::digest(supplied.as_bytes()).into();
        self.digest
            .iter()
            .zip(other.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// The three admin secrets. Immutable for the process lifetime.
#[derive(Clone, Debug)]
pub struct AdminSecrets {
    pub master: Secret,
    pub edit: Secret,
    pub delete: Secret,
}

/// Identities that passed the master secret check during this process lifetime.
pub struct AdminRegistry {
    master: Secret,
    sessions: Mutex<HashSet<UserId>>,
}

impl AdminRegistry {
    pub fn new(master: Secret) -> Self {
        Self {
            master,
            sessions: Mutex::new(HashSet::new()),
        }
    }

    pub async fn login(&self, user_id: UserId, supplied: &str) -> bool {
        if !self.master.matches(supplied) {
            return false;
        }
        self.sessions.lock().await.insert(user_id);
        true
    }

    /// Returns false when the identity was not logged in.
    pub async fn logout(&self, user_id: UserId) -> bool {
        self.sessions.lock().await.remove(&user_id)
    }

    pub async fn is_authenticated(&self, user_id: UserId) -> bool {
        self.sessions.lock().await.contains(&user_id)
    }
}

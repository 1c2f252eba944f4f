//! In-memory listing catalog shared by every conversation.
//!
//! All mutations (including id allocation) take the write half of one lock, so
//! concurrent adds/edits/deletes never interleave. Reads clone a snapshot.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    domain::ListingId,
    errors::Error,
    listing::{
        favicon_url, host_of, now_ms, sanitize, EditableField, Listing, ListingFields,
        DEFAULT_ICON,
    },
    payload::fits_in_payload,
    Result,
};

/// A pre-existing record used to populate the catalog at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedListing {
    #[serde(default)]
    pub id: Option<ListingId>,
    #[serde(flatten)]
    pub fields: ListingFields,
}

#[derive(Debug)]
struct CatalogState {
    listings: Vec<Listing>,
    next_id: u64,
}

impl CatalogState {
    fn position(&self, id: &ListingId) -> Option<usize> {
        self.listings.iter().position(|l| &l.id == id)
    }

    fn allocate_id(&mut self) -> Result<ListingId> {
        loop {
            let candidate = ListingId(self.next_id.to_string());
            self.next_id = self
                .next_id
                .checked_add(1)
                .ok_or_else(|| Error::Internal("listing id counter exhausted".to_string()))?;
            if self.position(&candidate).is_none() {
                return Ok(candidate);
            }
        }
    }
}

pub struct CatalogStore {
    inner: RwLock<CatalogState>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogState {
                listings: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Build a store from pre-existing records. Ids are kept (or generated when
    /// missing or blank) and the counter starts past the largest numeric id.
    /// Ids too long to fit in a button payload are rejected.
    pub fn with_listings(seed: Vec<SeedListing>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut listings = Vec::with_capacity(seed.len());
        for s in seed {
            let id = s.id.filter(|id| !id.as_str().trim().is_empty());
            let listing = sanitize(s.fields, id);
            if !fits_in_payload(&listing.id) {
                return Err(Error::Config(format!(
                    "listing id too long for button payloads: {}",
                    listing.id
                )));
            }
            if !seen.insert(listing.id.clone()) {
                return Err(Error::Config(format!(
                    "duplicate listing id in seed data: {}",
                    listing.id
                )));
            }
            listings.push(listing);
        }

        let next_id = listings
            .iter()
            .filter_map(|l| l.id.as_number())
            .max()
            .map(|max| max.saturating_add(1))
            .unwrap_or(1);

        Ok(Self {
            inner: RwLock::new(CatalogState { listings, next_id }),
        })
    }

    /// Read a JSON array of seed listings.
    pub fn load_seed_file(path: &Path) -> Result<Vec<SeedListing>> {
        let txt = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&txt)?)
    }

    pub async fn create(&self, fields: ListingFields) -> Result<Listing> {
        let mut st = self.inner.write().await;
        let id = st.allocate_id()?;
        let listing = sanitize(fields, Some(id));
        st.listings.push(listing.clone());
        Ok(listing)
    }

    pub async fn find_by_id(&self, id: &ListingId) -> Option<Listing> {
        let st = self.inner.read().await;
        st.listings.iter().find(|l| &l.id == id).cloned()
    }

    /// All listings, newest first. Equal timestamps keep storage order.
    pub async fn list(&self) -> Vec<Listing> {
        let mut out = self.inner.read().await.listings.clone();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Case-insensitive substring match on title, description and referral.
    ///
    /// Callers reject empty queries; an empty query here matches everything.
    pub async fn search(&self, query: &str) -> Vec<Listing> {
        let q = query.trim().to_lowercase();
        self.list()
            .await
            .into_iter()
            .filter(|l| {
                l.title.to_lowercase().contains(&q)
                    || l.description.to_lowercase().contains(&q)
                    || l.referral.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Set one field, refresh the timestamp and re-sanitize. `None` if the id is gone.
    pub async fn update(
        &self,
        id: &ListingId,
        field: EditableField,
        value: String,
    ) -> Option<Listing> {
        let mut st = self.inner.write().await;
        let idx = st.position(id)?;
        let current = st.listings[idx].clone();

        let mut fields = ListingFields::from(current.clone());
        if field == EditableField::Url && icon_is_derived(&current) {
            fields.icon = None;
        }
        field.apply(&mut fields, value);
        fields.timestamp = Some(now_ms().max(current.timestamp.saturating_add(1)));

        let updated = sanitize(fields, Some(current.id));
        st.listings[idx] = updated.clone();
        Some(updated)
    }

    pub async fn remove(&self, id: &ListingId) -> Option<Listing> {
        let mut st = self.inner.write().await;
        let idx = st.position(id)?;
        Some(st.listings.remove(idx))
    }

    /// Returns whether a record was actually removed.
    pub async fn delete(&self, id: &ListingId) -> bool {
        self.remove(id).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.listings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn icon_is_derived(l: &Listing) -> bool {
    if l.icon == DEFAULT_ICON {
        return true;
    }
    host_of(&l.url).map(|h| favicon_url(&h)).as_deref() == Some(l.icon.as_str())
}

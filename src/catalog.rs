//! Static collection table
//!
//! The table is a JSON object keyed by collection identifier (the candy
//! machine config address). It is loaded once and never mutated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use solana_sdk::pubkey::MAX_SEED_LEN;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// The uuid is a PDA seed and cannot exceed the seed length limit
    #[error("Collection {id}: uuid is {len} bytes (max {MAX_SEED_LEN})")]
    UuidTooLong { id: String, len: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    #[serde(default)]
    pub share: Option<u8>,
    #[serde(default)]
    pub verified: Option<bool>,
}

/// One row of the collection table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub name: String,
    /// Candy machine uuid (second seed of the sale account)
    pub uuid: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(deserialize_with = "price_from_string_or_number")]
    pub price: f64,
    pub total: u64,
    #[serde(default)]
    pub main_image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creators: Vec<Creator>,
}

fn price_from_string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Price {
        Number(f64),
        Text(String),
    }

    match Price::deserialize(deserializer)? {
        Price::Number(n) => Ok(n),
        Price::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

impl CollectionMetadata {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        parse_start_date(&self.start_date)
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) and `YYYY-MM-DD`.
pub fn parse_start_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Default)]
pub struct CollectionCatalog {
    entries: HashMap<String, CollectionMetadata>,
}

impl CollectionCatalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: HashMap<String, CollectionMetadata> = serde_json::from_str(json)?;
        if let Some((id, meta)) = entries.iter().find(|(_, m)| m.uuid.len() > MAX_SEED_LEN) {
            return Err(CatalogError::UuidTooLong { id: id.clone(), len: meta.uuid.len() });
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn lookup(&self, id: &str) -> Option<&CollectionMetadata> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Display fields for one collection; blank when the id is unknown
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionDisplay {
    pub id: String,
    pub exists: bool,
    pub title: String,
    pub uuid: String,
    pub image: String,
    pub description: String,
    pub price_sol: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub total_supply: u64,
    pub creators: Vec<Creator>,
}

impl CollectionDisplay {
    pub fn resolve(catalog: &CollectionCatalog, id: &str) -> Self {
        match catalog.lookup(id) {
            Some(meta) => Self {
                id: id.to_string(),
                exists: true,
                title: meta.name.clone(),
                uuid: meta.uuid.clone(),
                image: meta.main_image.clone(),
                description: meta.description.clone(),
                price_sol: meta.price,
                start_time: meta.start_time(),
                total_supply: meta.total,
                creators: meta.creators.clone(),
            },
            None => {
                debug!(collection = %id, "Collection not in catalog, rendering blank");
                Self {
                    id: id.to_string(),
                    ..Self::default()
                }
            }
        }
    }
}

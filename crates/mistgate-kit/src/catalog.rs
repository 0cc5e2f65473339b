//! Content directory consumed by the gate and challenge paths.

use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use mistgate_core::{
    errors::Error,
    types::{AccountAddress, MistAmount},
};

/// One sellable content item. Immutable after registration.
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Unique, stable identifier.
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub description: String,
    /// Price in the smallest fee-denominated unit; must be > 0.
    pub price: MistAmount,
    /// Address payments for this item go to.
    pub creator: AccountAddress,
    /// Opaque locator for the underlying asset.
    pub locator: Url,
    /// Only surfaced once access is proven.
    #[builder(into)]
    pub payload: String,
}

/// Catalog listing entry; carries no gated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: MistAmount,
    pub creator: AccountAddress,
}

impl From<&ContentRecord> for ContentSummary {
    fn from(record: &ContentRecord) -> Self {
        ContentSummary {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            price: record.price,
            creator: record.creator,
        }
    }
}

/// Lookup contract the gate and challenge paths consume.
pub trait ContentDirectory: Send + Sync {
    fn get(&self, content_id: &str) -> Option<&ContentRecord>;

    /// All records in catalog order.
    fn list(&self) -> &[ContentRecord];
}

/// Registration-order in-memory catalog. Populated at load time and
/// immutable afterwards, so shared references need no further
/// synchronization.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: Vec<ContentRecord>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        InMemoryCatalog::default()
    }

    pub fn register(&mut self, record: ContentRecord) -> Result<(), Error> {
        if record.price.is_zero() {
            return Err(Error::invalid_input(format!(
                "content '{}' must have a non-zero price",
                record.id
            )));
        }
        if self.records.iter().any(|existing| existing.id == record.id) {
            return Err(Error::invalid_input(format!(
                "content id '{}' is already registered",
                record.id
            )));
        }
        self.records.push(record);
        Ok(())
    }
}

impl ContentDirectory for InMemoryCatalog {
    fn get(&self, content_id: &str) -> Option<&ContentRecord> {
        self.records.iter().find(|record| record.id == content_id)
    }

    fn list(&self) -> &[ContentRecord] {
        &self.records
    }
}

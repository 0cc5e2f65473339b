//! Ledger-native access receipts and the query service over them.
//!
//! A receipt is minted by the paying transaction itself and owned by the
//! requester's account; its existence on the ledger, not any off-chain
//! record, is what proves access.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mistgate_core::{
    errors::Error,
    types::{AccountAddress, MistAmount, ObjectId},
};

use crate::{
    challenge::ACCESS_MODULE,
    ledger::{LedgerClient, ObjectRecord, ShapeDescriptor},
};

/// Struct name of receipt objects under the deployed package.
pub const RECEIPT_STRUCT: &str = "AccessReceipt";

/// Shape of receipt objects minted by `package`.
pub fn receipt_shape(package: &ObjectId) -> ShapeDescriptor {
    ShapeDescriptor(format!("{package}::{ACCESS_MODULE}::{RECEIPT_STRUCT}"))
}

/// Decoded view of one receipt object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessReceipt {
    pub content_id: String,
    /// Denormalized for display; stored on the ledger as raw bytes.
    pub title: String,
    pub price: MistAmount,
    pub purchased_at_ms: u64,
}

/// Decode a receipt from an owned-object record.
///
/// The ledger reports the title field as a byte vector; plain text is
/// also accepted. Returns `None` when the record does not carry receipt
/// fields.
pub fn decode_receipt(record: &ObjectRecord) -> Option<AccessReceipt> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawReceipt {
        content_id: String,
        title: serde_json::Value,
        price: MistAmount,
        #[serde(default)]
        purchased_at_ms: u64,
    }

    let raw: RawReceipt = serde_json::from_value(record.fields.clone()).ok()?;

    let title = match raw.title {
        serde_json::Value::String(text) => text,
        serde_json::Value::Array(bytes) => {
            let bytes: Vec<u8> = bytes
                .into_iter()
                .filter_map(|value| value.as_u64().map(|byte| byte as u8))
                .collect();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => return None,
    };

    Some(AccessReceipt {
        content_id: raw.content_id,
        title,
        price: raw.price,
        purchased_at_ms: raw.purchased_at_ms,
    })
}

/// Lists all receipts owned by an address, for UI and audit use.
pub struct ReceiptQueryService<L> {
    ledger: Arc<L>,
    package: Option<ObjectId>,
}

impl<L> Clone for ReceiptQueryService<L> {
    fn clone(&self) -> Self {
        ReceiptQueryService {
            ledger: self.ledger.clone(),
            package: self.package,
        }
    }
}

impl<L: LedgerClient> ReceiptQueryService<L> {
    pub fn new(ledger: Arc<L>, package: Option<ObjectId>) -> Self {
        ReceiptQueryService { ledger, package }
    }

    /// All receipts owned by `owner`, in the order the ledger reports
    /// them. Unlike the access gate's 402 decision, a failed read here
    /// propagates.
    pub async fn list_receipts(&self, owner: AccountAddress) -> Result<Vec<AccessReceipt>, Error> {
        let package = self.package.ok_or(Error::Unavailable)?;
        let shape = receipt_shape(&package);

        let records = self
            .ledger
            .owned_objects(owner, &shape)
            .await
            .map_err(Error::upstream)?;

        Ok(records
            .iter()
            .filter_map(|record| {
                let receipt = decode_receipt(record);
                if receipt.is_none() {
                    debug!(
                        object = %record.object_id,
                        "skipping owned object without receipt fields"
                    );
                }
                receipt
            })
            .collect())
    }
}

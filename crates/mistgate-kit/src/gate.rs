//! Decides whether a requester already holds proof of access.

use std::sync::Arc;

use tracing::warn;

use mistgate_core::{
    errors::Error,
    types::{AccountAddress, ObjectId},
};

use crate::{
    ledger::LedgerClient,
    receipts::{decode_receipt, receipt_shape},
};

/// Read-only check over the requester's ledger-owned receipts.
pub struct AccessGate<L> {
    ledger: Arc<L>,
    package: Option<ObjectId>,
}

impl<L> Clone for AccessGate<L> {
    fn clone(&self) -> Self {
        AccessGate {
            ledger: self.ledger.clone(),
            package: self.package,
        }
    }
}

impl<L: LedgerClient> AccessGate<L> {
    pub fn new(ledger: Arc<L>, package: Option<ObjectId>) -> Self {
        AccessGate { ledger, package }
    }

    /// `Ok(true)` iff `requester` owns a receipt referencing `content_id`.
    ///
    /// Fails closed: a ledger read that errors is reported as no
    /// confirmed access, so the requester is asked to pay again rather
    /// than granted access on a guess. The underlying failure is logged
    /// with the request context.
    pub async fn check_access(
        &self,
        content_id: &str,
        requester: AccountAddress,
    ) -> Result<bool, Error> {
        let package = self.package.ok_or(Error::Unavailable)?;
        let shape = receipt_shape(&package);

        let records = match self.ledger.owned_objects(requester, &shape).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    content_id,
                    requester = %requester,
                    error = %err,
                    "access check query failed; treating as no confirmed access"
                );
                return Ok(false);
            }
        };

        Ok(records
            .iter()
            .filter_map(decode_receipt)
            .any(|receipt| receipt.content_id == content_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLedger, test_address, test_package};

    #[tokio::test]
    async fn no_receipt_means_no_access() {
        let ledger = Arc::new(MockLedger::new(test_package()));
        let gate = AccessGate::new(ledger, Some(test_package()));
        let has_access = gate
            .check_access("content_1", test_address(0xBB))
            .await
            .unwrap();
        assert!(!has_access);
    }

    #[tokio::test]
    async fn minted_receipt_grants_access() {
        let ledger = Arc::new(MockLedger::new(test_package()));
        let requester = test_address(0xBB);
        ledger.mint_receipt(requester, "content_1", "First clip", 100_000_000);

        let gate = AccessGate::new(ledger, Some(test_package()));
        assert!(gate.check_access("content_1", requester).await.unwrap());
        assert!(!gate.check_access("content_2", requester).await.unwrap());
    }

    #[tokio::test]
    async fn bootstrap_state_is_unavailable_without_ledger_calls() {
        let ledger = Arc::new(MockLedger::new(test_package()));
        let gate = AccessGate::new(ledger.clone(), None);
        let result = gate.check_access("content_1", test_address(0xBB)).await;
        assert!(matches!(result, Err(Error::Unavailable)));
        assert_eq!(ledger.total_calls(), 0);
    }

    #[tokio::test]
    async fn read_failures_fail_closed() {
        let ledger = Arc::new(MockLedger::new(test_package()));
        let requester = test_address(0xBB);
        ledger.mint_receipt(requester, "content_1", "First clip", 100_000_000);
        ledger.set_fail_reads(true);

        let gate = AccessGate::new(ledger, Some(test_package()));
        let has_access = gate.check_access("content_1", requester).await.unwrap();
        assert!(!has_access);
    }
}

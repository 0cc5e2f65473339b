//! In-memory ledger for exercising the kit without a node.
//!
//! The purchase payloads tests submit are a small JSON stand-in for the
//! chain's transaction encoding: `{"sender", "contentId", "title",
//! "price"}`. A successful execution consumes the current fee object
//! version and mints a receipt owned by the sender, which is exactly the
//! atomicity the real entry point provides.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use serde::Deserialize;
use serde_json::json;

use mistgate_core::{
    transaction::SignedTransactionRequest,
    types::{AccountAddress, Base64Bytes, MistAmount, ObjectId},
};

use crate::{
    ledger::{
        ExecutionReceipt, ExecutionStatus, GasObjectRef, LedgerClient, LedgerError, ObjectRecord,
        ShapeDescriptor, TransactionSubmission,
    },
    receipts::receipt_shape,
};

/// Package id shared by the mock and the tests driving it.
pub fn test_package() -> ObjectId {
    ObjectId::from_bytes([0x11; 32])
}

/// Deterministic account address filled with `byte`.
pub fn test_address(byte: u8) -> AccountAddress {
    AccountAddress::from_bytes([byte; 32])
}

/// A well-formed purchase submission for the mock's toy transaction
/// encoding, signed with placeholder bytes.
pub fn purchase_request(
    sender: AccountAddress,
    content_id: &str,
    title: &str,
    price: u64,
) -> SignedTransactionRequest {
    let payload = json!({
        "sender": sender,
        "contentId": content_id,
        "title": title,
        "price": MistAmount(price),
    });
    SignedTransactionRequest {
        transaction_bytes: Base64Bytes::from_bytes(payload.to_string().as_bytes()),
        signature: Base64Bytes::from_bytes(&[0xA5; 64]),
        public_key: Base64Bytes::from_bytes(&[0x5A; 32]),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToyTransaction {
    sender: AccountAddress,
    content_id: String,
    title: String,
    price: MistAmount,
}

struct MockState {
    gas_version: u64,
    receipts: HashMap<AccountAddress, Vec<ObjectRecord>>,
    minted: u64,
    fail_reads: bool,
    fail_next_executions: u32,
}

/// Programmable [`LedgerClient`] that enforces fee object versioning.
pub struct MockLedger {
    package: ObjectId,
    state: Mutex<MockState>,
    execute_delay_ms: AtomicU64,
    calls: AtomicUsize,
    gas_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    version_conflicts: AtomicUsize,
}

impl MockLedger {
    pub fn new(package: ObjectId) -> Self {
        MockLedger {
            package,
            state: Mutex::new(MockState {
                gas_version: 1,
                receipts: HashMap::new(),
                minted: 0,
                fail_reads: false,
                fail_next_executions: 0,
            }),
            execute_delay_ms: AtomicU64::new(2),
            calls: AtomicUsize::new(0),
            gas_fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            version_conflicts: AtomicUsize::new(0),
        }
    }

    /// Make owned-object reads fail with a transport error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock_state().fail_reads = fail;
    }

    /// Fail the next `n` executions with a transport error.
    pub fn fail_next_executions(&self, n: u32) {
        self.lock_state().fail_next_executions = n;
    }

    /// Simulated time-to-finality.
    pub fn set_execute_delay(&self, delay: Duration) {
        self.execute_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Mint a receipt directly, as if a purchase had finalized earlier.
    pub fn mint_receipt(&self, owner: AccountAddress, content_id: &str, title: &str, price: u64) {
        let mut state = self.lock_state();
        self.mint_locked(&mut state, owner, content_id, title, MistAmount(price));
    }

    /// Total calls made across all three contract methods.
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn gas_fetches(&self) -> usize {
        self.gas_fetches.load(Ordering::SeqCst)
    }

    /// How many submissions referenced an already-consumed fee version.
    pub fn version_conflicts(&self) -> usize {
        self.version_conflicts.load(Ordering::SeqCst)
    }

    /// Highest number of executions ever observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mint_locked(
        &self,
        state: &mut MockState,
        owner: AccountAddress,
        content_id: &str,
        title: &str,
        price: MistAmount,
    ) {
        state.minted += 1;
        let mut object_bytes = [0xEE; 32];
        object_bytes[24..].copy_from_slice(&state.minted.to_be_bytes());
        // Titles are reported the way the node would report raw bytes.
        let title_bytes: Vec<u8> = title.bytes().collect();
        let record = ObjectRecord {
            object_id: ObjectId::from_bytes(object_bytes),
            version: 1,
            digest: format!("obj-{}", state.minted),
            type_tag: receipt_shape(&self.package).0,
            fields: json!({
                "contentId": content_id,
                "title": title_bytes,
                "price": price,
                "purchasedAtMs": 1_700_000_000_000u64 + state.minted,
            }),
        };
        state.receipts.entry(owner).or_default().push(record);
    }

    fn gas_ref(version: u64) -> GasObjectRef {
        GasObjectRef {
            id: ObjectId::from_bytes([0xFE; 32]),
            version,
            digest: format!("gas-{version}"),
        }
    }
}

/// Decrements the in-flight counter even when the caller's future is
/// dropped at a timeout.
struct InFlightGuard<'a>(&'a MockLedger);

impl<'a> InFlightGuard<'a> {
    fn enter(ledger: &'a MockLedger) -> Self {
        let now = ledger.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        ledger.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(ledger)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LedgerClient for MockLedger {
    async fn gas_object(&self, _sponsor: AccountAddress) -> Result<GasObjectRef, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gas_fetches.fetch_add(1, Ordering::SeqCst);
        let version = self.lock_state().gas_version;
        Ok(Self::gas_ref(version))
    }

    async fn execute_transaction(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<ExecutionReceipt, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlightGuard::enter(self);

        let delay = self.execute_delay_ms.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let mut state = self.lock_state();

        if state.fail_next_executions > 0 {
            state.fail_next_executions -= 1;
            return Err(LedgerError::Transport("connection reset".to_string()));
        }

        if let Some(gas) = &submission.gas {
            if gas.version != state.gas_version {
                self.version_conflicts.fetch_add(1, Ordering::SeqCst);
                return Err(LedgerError::VersionConflict(format!(
                    "object {} version {} is not available for consumption (current {})",
                    gas.id, gas.version, state.gas_version
                )));
            }
        }

        let transaction: ToyTransaction =
            match serde_json::from_slice(&submission.transaction_bytes) {
                Ok(transaction) => transaction,
                Err(err) => {
                    // Still a terminal outcome: the transaction finalized
                    // as an abort.
                    let digest = format!("tx-{}", state.minted + 1);
                    state.minted += 1;
                    return Ok(ExecutionReceipt {
                        digest,
                        status: ExecutionStatus::Failure {
                            error: format!("call aborted: {err}"),
                        },
                    });
                }
            };

        if submission.gas.is_some() {
            state.gas_version += 1;
        }

        self.mint_locked(
            &mut state,
            transaction.sender,
            &transaction.content_id,
            &transaction.title,
            transaction.price,
        );
        let digest = format!("tx-{}", state.minted);

        Ok(ExecutionReceipt {
            digest,
            status: ExecutionStatus::Success,
        })
    }

    async fn owned_objects(
        &self,
        owner: AccountAddress,
        shape: &ShapeDescriptor,
    ) -> Result<Vec<ObjectRecord>, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock_state();
        if state.fail_reads {
            return Err(LedgerError::Transport("read timed out".to_string()));
        }
        Ok(state
            .receipts
            .get(&owner)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| record.type_tag == shape.0)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

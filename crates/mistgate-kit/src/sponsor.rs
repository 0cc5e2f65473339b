//! Sponsorship & execution coordinator.
//!
//! The sponsor's fee object is a versioned, shared resource: two
//! submissions built against the same version race, and the ledger
//! rejects whichever finalizes second. The coordinator therefore admits
//! sponsored submissions to a critical section one at a time, in arrival
//! order, and holds the section until the ledger reports a terminal
//! outcome. Requests that do not touch the sponsor resource never wait
//! on it.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    time::{sleep, timeout},
};
use tracing::{debug, error, info, warn};

use mistgate_core::{
    errors::Error,
    transaction::{SignedTransactionRequest, SponsoredExecutionResult},
    types::Base64Bytes,
};

use crate::{
    config::{GateConfig, SponsorKeypair},
    ledger::{ExecutionStatus, LedgerClient, LedgerError, TransactionSubmission},
};

/// Retry and finality bounds for one submission.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    /// Bound on waiting for a terminal outcome; on expiry the request
    /// fails and the transaction is not resubmitted.
    pub finality_timeout: Duration,
    /// Attempts allowed for transient transport failures.
    pub max_attempts: u32,
    /// Base delay of the exponential backoff between attempts.
    pub backoff: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            finality_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

struct SponsorContext {
    keypair: SponsorKeypair,
    /// Admission to the fee object. `tokio::sync::Mutex` queues waiters
    /// fairly, which is the arrival-order guarantee callers get.
    gas: Mutex<()>,
}

/// Accepts partially-signed transactions, co-signs them as fee sponsor,
/// and submits them serialized against the sponsor's fee object.
pub struct ExecutionCoordinator<L> {
    ledger: Arc<L>,
    sponsor: Option<SponsorContext>,
    limits: ExecutionLimits,
}

impl<L: LedgerClient> ExecutionCoordinator<L> {
    pub fn new(ledger: Arc<L>, sponsor: Option<SponsorKeypair>, limits: ExecutionLimits) -> Self {
        ExecutionCoordinator {
            ledger,
            sponsor: sponsor.map(|keypair| SponsorContext {
                keypair,
                gas: Mutex::new(()),
            }),
            limits,
        }
    }

    pub fn from_config(ledger: Arc<L>, config: &GateConfig) -> Self {
        ExecutionCoordinator::new(
            ledger,
            config.sponsor.clone(),
            ExecutionLimits {
                finality_timeout: config.finality_timeout,
                max_attempts: config.max_attempts,
                ..ExecutionLimits::default()
            },
        )
    }

    /// Whether submissions are co-signed and fee-sponsored.
    pub fn sponsoring_enabled(&self) -> bool {
        self.sponsor.is_some()
    }

    /// Validate, co-sign, submit, and classify one requester transaction.
    ///
    /// The requester's transaction content is never altered; the
    /// coordinator only appends its own signature and the refreshed fee
    /// object reference.
    pub async fn sponsor_and_execute(
        &self,
        request: &SignedTransactionRequest,
    ) -> Result<SponsoredExecutionResult, Error> {
        let transaction_bytes = decode_field(&request.transaction_bytes, "transactionBytes")?;
        decode_field(&request.signature, "signature")?;
        decode_field(&request.public_key, "publicKey")?;

        match &self.sponsor {
            Some(context) => {
                let _admission = context.gas.lock().await;

                // Critical section: refresh the fee object, co-sign,
                // submit, and hold the section until finality. Releasing
                // earlier would let the next submission read a version
                // this one is about to consume.
                let sponsor = context.keypair.address();
                let gas = self.ledger.gas_object(sponsor).await.map_err(|err| {
                    Error::execution(format!("fee object refresh failed: {err}"))
                })?;
                debug!(
                    fee_object = %gas.id,
                    version = gas.version,
                    "admitted sponsored submission"
                );

                let submission = TransactionSubmission {
                    signatures: vec![
                        request.signature.clone(),
                        context.keypair.sign(&transaction_bytes),
                    ],
                    transaction_bytes,
                    gas: Some(gas),
                };
                self.submit_bounded(&submission).await
            }
            None => {
                // Sponsorship disabled: the requester pays its own fees,
                // so there is no shared resource to serialize on.
                let submission = TransactionSubmission {
                    signatures: vec![request.signature.clone()],
                    transaction_bytes,
                    gas: None,
                };
                self.submit_bounded(&submission).await
            }
        }
    }

    async fn submit_bounded(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<SponsoredExecutionResult, Error> {
        match timeout(self.limits.finality_timeout, self.submit(submission)).await {
            Ok(result) => result,
            Err(_) => {
                // The transaction may or may not have finalized;
                // resubmitting the same bytes is the requester's call.
                warn!(
                    timeout = ?self.limits.finality_timeout,
                    "no terminal outcome within the finality bound; abandoning"
                );
                Err(Error::ExecutionFailed {
                    cause: "timeout".to_string(),
                })
            }
        }
    }

    async fn submit(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<SponsoredExecutionResult, Error> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.ledger.execute_transaction(submission).await {
                Ok(receipt) => {
                    return Ok(match receipt.status {
                        ExecutionStatus::Success => {
                            info!(digest = %receipt.digest, "sponsored transaction finalized");
                            SponsoredExecutionResult::success(receipt.digest)
                        }
                        ExecutionStatus::Failure { error: cause } => {
                            info!(
                                digest = %receipt.digest,
                                cause = %cause,
                                "transaction finalized with an execution failure"
                            );
                            SponsoredExecutionResult::failure(receipt.digest, cause)
                        }
                    });
                }
                Err(err @ LedgerError::VersionConflict(_)) => {
                    // The critical section makes this unreachable in
                    // correct operation; seeing it means two submissions
                    // consumed the same fee object version.
                    error!(
                        error = %err,
                        "fee object version conflict inside the critical section; \
                         serialization invariant violated"
                    );
                    return Ok(SponsoredExecutionResult::failure("", err.to_string()));
                }
                Err(err) if err.is_transient() && attempt < self.limits.max_attempts => {
                    let delay = self.limits.backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        attempt,
                        error = %err,
                        delay = ?delay,
                        "transient ledger error; retrying submission"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    return Err(Error::ExecutionFailed {
                        cause: err.to_string(),
                    });
                }
            }
        }
    }
}

fn decode_field(value: &Base64Bytes, name: &str) -> Result<Vec<u8>, Error> {
    let bytes = value
        .decode()
        .map_err(|err| Error::invalid_input(format!("{name} is not valid base64: {err}")))?;
    if bytes.is_empty() {
        return Err(Error::invalid_input(format!("{name} must not be empty")));
    }
    Ok(bytes)
}

//! Wire types for sponsored transaction submission.

use serde::{Deserialize, Serialize};

use crate::types::Base64Bytes;

/// A requester-supplied transaction awaiting sponsorship.
///
/// All three fields must decode to non-empty byte strings; signature
/// verification against the public key is the ledger's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransactionRequest {
    pub transaction_bytes: Base64Bytes,
    pub signature: Base64Bytes,
    pub public_key: Base64Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsoredExecutionStatus {
    Success,
    Failure,
}

/// Terminal outcome of one sponsored submission, surfaced to the caller
/// and then discarded; the ledger itself is the durable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredExecutionResult {
    pub status: SponsoredExecutionStatus,
    /// Content-addressed transaction digest; empty when the submission
    /// was rejected before one was assigned.
    #[serde(default)]
    pub transaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl SponsoredExecutionResult {
    pub fn success(transaction: impl Into<String>) -> Self {
        SponsoredExecutionResult {
            status: SponsoredExecutionStatus::Success,
            transaction: transaction.into(),
            cause: None,
        }
    }

    pub fn failure(transaction: impl Into<String>, cause: impl Into<String>) -> Self {
        SponsoredExecutionResult {
            status: SponsoredExecutionStatus::Failure,
            transaction: transaction.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, SponsoredExecutionStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_serializes_camel_case() {
        let result = SponsoredExecutionResult::success("9g2G...");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["transaction"], "9g2G...");
        assert!(json.get("cause").is_none());
    }

    #[test]
    fn failure_carries_cause() {
        let result = SponsoredExecutionResult::failure("", "call aborted");
        assert!(!result.is_success());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["cause"], "call aborted");
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let json = serde_json::json!({
            "transactionBytes": "AAEC",
            "signature": "AAEC",
            "publicKey": "AAEC",
        });
        let request: SignedTransactionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.transaction_bytes.decode().unwrap(), vec![0, 1, 2]);
    }
}

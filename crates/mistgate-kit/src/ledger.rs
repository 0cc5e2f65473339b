//! Ledger client contract consumed by the gate, the coordinator, and the
//! receipt query service, plus a JSON-RPC implementation of it.

use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use mistgate_core::types::{AccountAddress, Base64Bytes, ObjectId};

/// Errors surfaced by a [`LedgerClient`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Transport-level failure; the same call may succeed on retry.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The referenced fee object version was already consumed by another
    /// transaction. Distinguishable because the coordinator treats it as
    /// an invariant violation, not an ordinary rejection.
    #[error("fee object version conflict: {0}")]
    VersionConflict(String),

    /// The node rejected the request for a semantic reason; never retried.
    #[error("ledger rpc error: {0}")]
    Rpc(String),
}

impl LedgerError {
    /// Whether retrying the same call can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}

/// Reference to a specific version of a spendable fee object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasObjectRef {
    pub id: ObjectId,
    pub version: u64,
    pub digest: String,
}

/// A fully-assembled submission: the requester's transaction untouched,
/// the signature set, and (when sponsored) the fee object reference the
/// sponsor pays from.
#[derive(Debug, Clone)]
pub struct TransactionSubmission {
    pub transaction_bytes: Vec<u8>,
    pub signatures: Vec<Base64Bytes>,
    pub gas: Option<GasObjectRef>,
}

/// Terminal outcome the ledger reports at finality.
#[derive(Debug, Clone)]
pub struct ExecutionReceipt {
    pub digest: String,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// The transaction finalized but its effects were an abort.
    Failure { error: String },
}

/// Fully-qualified struct tag owned-object queries filter by, e.g.
/// `0x..::content_access::AccessReceipt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDescriptor(pub String);

impl Display for ShapeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned object as reported by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    pub version: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub fields: serde_json::Value,
}

/// Contract with the ledger node.
pub trait LedgerClient {
    /// Current version of the sponsor's spendable fee object.
    fn gas_object(
        &self,
        sponsor: AccountAddress,
    ) -> impl Future<Output = Result<GasObjectRef, LedgerError>> + Send;

    /// Submit a transaction and suspend until the ledger reports a
    /// terminal outcome.
    fn execute_transaction(
        &self,
        submission: &TransactionSubmission,
    ) -> impl Future<Output = Result<ExecutionReceipt, LedgerError>> + Send;

    /// All objects of `shape` owned by `owner`, in the order the node
    /// reports them.
    fn owned_objects(
        &self,
        owner: AccountAddress,
        shape: &ShapeDescriptor,
    ) -> impl Future<Output = Result<Vec<ObjectRecord>, LedgerError>> + Send;
}

/// Struct tag of spendable fee objects.
pub const GAS_COIN_SHAPE: &str = "0x2::coin::Coin<0x2::mist::MIST>";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`LedgerClient`] speaking JSON-RPC to a fullnode.
#[derive(Debug, Clone)]
pub struct JsonRpcLedgerClient {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcLedgerClient {
    pub fn new(endpoint: Url) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| {
                LedgerError::Transport(format!("failed to build http client: {err}"))
            })?;
        Ok(JsonRpcLedgerClient { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        debug!(method, endpoint = %self.endpoint, "ledger rpc call");

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!(
                "node returned {status}: {text}"
            )));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| LedgerError::Transport(format!("malformed rpc response: {err}")))?;

        if let Some(error) = envelope.error {
            return Err(LedgerError::Rpc(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }

        envelope
            .result
            .ok_or_else(|| LedgerError::Rpc("rpc response missing result".to_string()))
    }
}

impl LedgerClient for JsonRpcLedgerClient {
    async fn gas_object(&self, sponsor: AccountAddress) -> Result<GasObjectRef, LedgerError> {
        let result = self
            .call(
                "mist_getOwnedObjects",
                json!([sponsor, { "structType": GAS_COIN_SHAPE }]),
            )
            .await?;

        let objects: Vec<ObjectRecord> = serde_json::from_value(result)
            .map_err(|err| LedgerError::Rpc(format!("malformed owned-object list: {err}")))?;

        objects
            .into_iter()
            .next()
            .map(|object| GasObjectRef {
                id: object.object_id,
                version: object.version,
                digest: object.digest,
            })
            .ok_or_else(|| {
                LedgerError::Rpc(format!("sponsor {sponsor} owns no spendable fee object"))
            })
    }

    async fn execute_transaction(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<ExecutionReceipt, LedgerError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ExecuteResponse {
            digest: String,
            status: String,
            #[serde(default)]
            error: Option<String>,
        }

        let params = json!([
            Base64Bytes::from_bytes(&submission.transaction_bytes),
            submission.signatures,
            submission.gas,
            { "waitForFinality": true },
        ]);

        let result = match self.call("mist_executeTransaction", params).await {
            // The node reports a consumed fee object version as an rpc
            // error; surface it as the distinguishable conflict condition.
            Err(LedgerError::Rpc(message))
                if message.contains("not available for consumption") =>
            {
                return Err(LedgerError::VersionConflict(message));
            }
            other => other?,
        };

        let response: ExecuteResponse = serde_json::from_value(result)
            .map_err(|err| LedgerError::Rpc(format!("malformed execution response: {err}")))?;

        let status = match response.status.as_str() {
            "success" => ExecutionStatus::Success,
            "failure" => ExecutionStatus::Failure {
                error: response
                    .error
                    .unwrap_or_else(|| "unknown execution failure".to_string()),
            },
            other => {
                return Err(LedgerError::Rpc(format!(
                    "unknown execution status '{other}'"
                )));
            }
        };

        Ok(ExecutionReceipt {
            digest: response.digest,
            status,
        })
    }

    async fn owned_objects(
        &self,
        owner: AccountAddress,
        shape: &ShapeDescriptor,
    ) -> Result<Vec<ObjectRecord>, LedgerError> {
        let result = self
            .call(
                "mist_getOwnedObjects",
                json!([owner, { "structType": shape.0 }]),
            )
            .await?;

        serde_json::from_value(result)
            .map_err(|err| LedgerError::Rpc(format!("malformed owned-object list: {err}")))
    }
}

//! Payment challenge issued when access cannot be proven.

use std::{
    fmt::Display,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use mistgate_core::{
    errors::Error,
    types::{AccountAddress, MistAmount, ObjectId},
};

use crate::{catalog::ContentRecord, config::GateConfig};

/// Module under the deployed package that holds the access entry points.
pub const ACCESS_MODULE: &str = "content_access";

/// Entry function a paying transaction must invoke; it transfers the
/// price to the creator and mints the receipt in one transaction.
pub const PURCHASE_FUNCTION: &str = "purchase";

/// The on-ledger entry point a challenge directs the requester to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTarget {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
}

impl Display for CallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

/// Structured payment-required response. Constructed on demand, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessChallenge {
    pub content_id: String,
    pub price: MistAmount,
    /// Creator address the payment must reach.
    pub recipient: AccountAddress,
    pub target: CallTarget,
    pub nonce: String,
    pub expires_at_ms: u64,
}

/// Builds challenges from catalog records and the bound package.
#[derive(Debug, Clone)]
pub struct ChallengeGenerator {
    package: Option<ObjectId>,
    ttl: Duration,
}

impl ChallengeGenerator {
    pub fn new(package: Option<ObjectId>, ttl: Duration) -> Self {
        ChallengeGenerator { package, ttl }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        ChallengeGenerator::new(config.package, config.challenge_ttl)
    }

    /// Build the challenge for `content`.
    ///
    /// When a requester address is supplied it must be syntactically
    /// valid; price, recipient, and target depend only on the record and
    /// the bound package, so repeated calls agree on all of them.
    pub fn generate(
        &self,
        content: &ContentRecord,
        requester: Option<&str>,
    ) -> Result<AccessChallenge, Error> {
        let package = self.package.ok_or(Error::Unavailable)?;

        if let Some(requester) = requester {
            requester.parse::<AccountAddress>().map_err(|err| {
                Error::invalid_input(format!("requester address '{requester}': {err}"))
            })?;
        }

        Ok(AccessChallenge {
            content_id: content.id.clone(),
            price: content.price,
            recipient: content.creator,
            target: CallTarget {
                package,
                module: ACCESS_MODULE.to_string(),
                function: PURCHASE_FUNCTION.to_string(),
            },
            nonce: fresh_nonce(),
            expires_at_ms: now_ms() + self.ttl.as_millis() as u64,
        })
    }
}

fn fresh_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

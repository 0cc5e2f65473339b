//! Service configuration and the sponsor signing key.

use std::{fmt::Debug, time::Duration};

use bon::Builder;
use ed25519_dalek::{Signer, SigningKey};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use url::Url;

use mistgate_core::types::{AccountAddress, Base64Bytes, ObjectId};

/// Ledger network the service submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> Url {
        let raw = match self {
            Network::Mainnet => "https://fullnode.mainnet.mistnet.io",
            Network::Testnet => "https://fullnode.testnet.mistnet.io",
            Network::Devnet => "https://fullnode.devnet.mistnet.io",
            Network::Localnet => "http://127.0.0.1:9000",
        };
        Url::parse(raw).expect("default endpoint is a valid url")
    }
}

/// Recognized configuration for the gate, challenge, and coordinator
/// components.
#[derive(Builder, Debug, Clone)]
pub struct GateConfig {
    /// Network to submit against.
    pub network: Network,

    /// Override of the network's default fullnode endpoint.
    pub rpc_url: Option<Url>,

    /// Deployed package holding the access-control entry points.
    ///
    /// `None` is the explicit bootstrap state: ledger-dependent operations
    /// report unavailable instead of being attempted.
    pub package: Option<ObjectId>,

    /// Fee-sponsoring key. Absent means sponsorship is disabled and
    /// requesters pay their own fees.
    pub sponsor: Option<SponsorKeypair>,

    /// How long issued challenges stay valid.
    #[builder(default = Duration::from_secs(300))]
    pub challenge_ttl: Duration,

    /// Bound on waiting for a submitted transaction to reach finality.
    #[builder(default = Duration::from_secs(30))]
    pub finality_timeout: Duration,

    /// Submission attempts allowed for transient transport failures.
    #[builder(default = 3)]
    pub max_attempts: u32,
}

impl GateConfig {
    pub fn rpc_endpoint(&self) -> Url {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }
}

/// The sponsor's signing key.
///
/// The sponsor address is derived as SHA-256 of the public key, the
/// repo's stand-in for the ledger's account derivation.
#[derive(Clone)]
pub struct SponsorKeypair {
    signing_key: SigningKey,
}

impl SponsorKeypair {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        SponsorKeypair {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        SponsorKeypair {
            signing_key: SigningKey::generate(rng),
        }
    }

    pub fn address(&self) -> AccountAddress {
        let digest = Sha256::digest(self.signing_key.verifying_key().as_bytes());
        AccountAddress::from_bytes(digest.into())
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sponsor co-signature over the supplied transaction bytes.
    pub fn sign(&self, message: &[u8]) -> Base64Bytes {
        let signature = self.signing_key.sign(message);
        Base64Bytes::from_bytes(&signature.to_bytes())
    }
}

impl Debug for SponsorKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SponsorKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = GateConfig::builder().network(Network::Testnet).build();
        assert_eq!(config.challenge_ttl, Duration::from_secs(300));
        assert_eq!(config.finality_timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert!(config.package.is_none());
        assert!(config.sponsor.is_none());
    }

    #[test]
    fn rpc_endpoint_prefers_override() {
        let override_url = Url::parse("http://10.0.0.1:9000").unwrap();
        let config = GateConfig::builder()
            .network(Network::Mainnet)
            .rpc_url(override_url.clone())
            .build();
        assert_eq!(config.rpc_endpoint(), override_url);

        let config = GateConfig::builder().network(Network::Localnet).build();
        assert_eq!(config.rpc_endpoint().as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn sponsor_address_is_stable() {
        let keypair = SponsorKeypair::from_bytes(&[7u8; 32]);
        assert_eq!(keypair.address(), keypair.address());
        let other = SponsorKeypair::from_bytes(&[8u8; 32]);
        assert_ne!(keypair.address(), other.address());
    }

    #[test]
    fn debug_does_not_leak_the_key() {
        let keypair = SponsorKeypair::from_bytes(&[7u8; 32]);
        let printed = format!("{keypair:?}");
        assert!(printed.contains("address"));
        assert!(!printed.contains("signing_key"));
    }
}

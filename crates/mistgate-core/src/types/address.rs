use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Parse failure for 32-byte ledger identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ledger identifier: {0}")]
pub struct ParseIdentifierError(String);

fn parse_hex32(s: &str) -> Result<[u8; 32], ParseIdentifierError> {
    let hex_part = s
        .strip_prefix("0x")
        .ok_or_else(|| ParseIdentifierError(format!("missing 0x prefix: '{s}'")))?;
    if hex_part.len() != 64 {
        return Err(ParseIdentifierError(format!(
            "expected 64 hex characters, got {}",
            hex_part.len()
        )));
    }
    let bytes = hex::decode(hex_part).map_err(|err| ParseIdentifierError(err.to_string()))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// A ledger account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for AccountAddress {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(AccountAddress)
    }
}

impl Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountAddress({self})")
    }
}

impl Serialize for AccountAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of an on-ledger object, including deployed packages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(ObjectId)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x2a0f8ce012afb9906bd7535b72bc38a73a2d07a1ec4f2c2a91b17f1b6bc1e401";

    #[test]
    fn parse_and_display_round_trip() {
        let address: AccountAddress = ADDR.parse().unwrap();
        assert_eq!(address.to_string(), ADDR);
    }

    #[test]
    fn rejects_missing_prefix() {
        let result = ADDR.trim_start_matches("0x").parse::<AccountAddress>();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_short_input() {
        assert!("0x2a0f".parse::<AccountAddress>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = format!("0x{}", "zz".repeat(32));
        assert!(bad.parse::<ObjectId>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let address: AccountAddress = ADDR.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{ADDR}\""));
        let back: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}

use std::fmt::Display;

use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};

/// A base64-encoded byte payload carried over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub String);

impl Base64Bytes {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Base64Bytes(BASE64_STANDARD.encode(bytes))
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Base64Bytes(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let encoded = Base64Bytes::from_bytes(b"gated payload");
        assert_eq!(encoded.decode().unwrap(), b"gated payload");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(Base64Bytes("not base64!!".to_string()).decode().is_err());
    }
}

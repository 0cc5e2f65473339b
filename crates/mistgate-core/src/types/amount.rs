use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

/// An amount in the ledger's smallest fee-denominated unit.
///
/// Serialized as a decimal string so wire payloads survive JSON number
/// precision limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MistAmount(pub u64);

impl MistAmount {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for MistAmount {
    fn from(value: u8) -> Self {
        MistAmount(value as u64)
    }
}

impl From<u16> for MistAmount {
    fn from(value: u16) -> Self {
        MistAmount(value as u64)
    }
}

impl From<u32> for MistAmount {
    fn from(value: u32) -> Self {
        MistAmount(value as u64)
    }
}

impl From<u64> for MistAmount {
    fn from(value: u64) -> Self {
        MistAmount(value)
    }
}

impl FromStr for MistAmount {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(MistAmount)
    }
}

impl Display for MistAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MistAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MistAmount {
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

    #[test]
    fn serializes_as_decimal_string() {
        let amount = MistAmount::from(100_000_000u64);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"100000000\"");
    }

    #[test]
    fn deserializes_from_decimal_string() {
        let amount: MistAmount = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(amount, MistAmount(42));
    }

    #[test]
    fn rejects_json_numbers() {
        assert!(serde_json::from_str::<MistAmount>("42").is_err());
    }
}

//! Building blocks for selling gated content against a ledger: an access
//! gate over ledger-native receipts, a payment challenge generator, and a
//! coordinator that co-signs requester transactions as fee sponsor and
//! submits them one at a time against the sponsor's versioned fee object.

pub mod catalog;
pub mod challenge;
pub mod config;
pub mod gate;
pub mod ledger;
pub mod receipts;
pub mod sponsor;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

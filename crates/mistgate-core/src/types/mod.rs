//! Core types used across the mistgate crates.

mod address;
mod amount;
mod encoding;

pub use address::*;
pub use amount::*;
pub use encoding::*;

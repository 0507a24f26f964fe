//! # bind-primitives
//!
//! Fixed-size chain types shared by the binding crates: 20-byte addresses,
//! 32-byte words and hashes, and JSON-RPC quantity helpers.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod quantity;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};
pub use quantity::{format_quantity, format_quantity_u256, parse_quantity_u256, parse_quantity_u64};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block number type
pub type BlockNumber = u64;

//! # bind-crypto
//!
//! Hashing and signing used by the binding layer.
//!
//! - Keccak-256, function selectors and event topics
//! - secp256k1 recoverable signatures (low-s)
//! - Address derivation from public keys

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::{event_topic, keccak256, selector};
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, verify, PrivateKey,
    PublicKey, Signature,
};

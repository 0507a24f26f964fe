//! SDK error types

use serde_json::Value;
use thiserror::Error;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Binding could not be built (malformed ABI, bytecode or address)
    #[error("Construction error: {0}")]
    Construction(String),

    /// Unknown function, event or error name/selector
    #[error("Unknown {kind}: {name}")]
    UnknownSelector {
        /// "function", "event" or "error"
        kind: &'static str,
        /// Name, selector or topic that failed to resolve
        name: String,
    },

    /// ABI encoding error
    #[error("ABI encoding error: {0}")]
    AbiEncode(String),

    /// ABI decoding error
    #[error("ABI decoding error: {0}")]
    AbiDecode(String),

    /// Transport/network error
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC error from node
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
        /// Optional error payload, usually revert data
        data: Option<Value>,
    },

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Transaction build error
    #[error("Transaction build error: {0}")]
    TxBuild(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid chain ID
    #[error("Invalid chain ID: {0}")]
    InvalidChainId(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Operation did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Subscription was released or its feed is gone
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// The background task polling a node filter died
    #[error("Log feed aborted: {0}")]
    FeedAborted(String),
}

impl SdkError {
    pub(crate) fn unknown_function(name: impl Into<String>) -> Self {
        SdkError::UnknownSelector {
            kind: "function",
            name: name.into(),
        }
    }

    pub(crate) fn unknown_event(name: impl Into<String>) -> Self {
        SdkError::UnknownSelector {
            kind: "event",
            name: name.into(),
        }
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<bind_crypto::CryptoError> for SdkError {
    fn from(e: bind_crypto::CryptoError) -> Self {
        SdkError::SigningFailed(e.to_string())
    }
}

impl From<bind_primitives::PrimitiveError> for SdkError {
    fn from(e: bind_primitives::PrimitiveError) -> Self {
        match e {
            bind_primitives::PrimitiveError::Address(inner) => {
                SdkError::InvalidAddress(inner.to_string())
            }
            other => SdkError::InvalidHex(other.to_string()),
        }
    }
}

impl From<bind_primitives::AddressError> for SdkError {
    fn from(e: bind_primitives::AddressError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<bind_primitives::HashError> for SdkError {
    fn from(e: bind_primitives::HashError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

//! Revert payload decoding

use std::fmt;

use bind_primitives::U256;

use super::decode::decode;
use super::registry::Abi;
use super::types::{ParamType, Token};

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// A decoded contract revert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRevert {
    /// `require`/`revert` with a reason string
    Message(String),
    /// Compiler-inserted panic with its code
    Panic(U256),
    /// Custom error declared in the ABI
    Custom {
        /// Error name
        name: String,
        /// Decoded arguments
        args: Vec<Token>,
    },
}

impl fmt::Display for ContractRevert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractRevert::Message(msg) => write!(f, "reverted: {}", msg),
            ContractRevert::Panic(code) => write!(f, "panic: 0x{:x}", code),
            ContractRevert::Custom { name, args } => write!(f, "{}({} args)", name, args.len()),
        }
    }
}

impl Abi {
    /// Decode revert data against `Error(string)`, `Panic(uint256)` and the
    /// ABI's custom errors. Unknown selectors or malformed payloads give `None`.
    pub fn decode_revert(&self, data: &[u8]) -> Option<ContractRevert> {
        if data.len() < 4 {
            return None;
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        let body = &data[4..];

        if selector == ERROR_STRING_SELECTOR {
            return match decode(&[ParamType::String], body).ok()?.pop()? {
                Token::String(s) => Some(ContractRevert::Message(s)),
                _ => None,
            };
        }
        if selector == PANIC_SELECTOR {
            return decode(&[ParamType::Uint(256)], body)
                .ok()?
                .pop()?
                .into_uint()
                .map(ContractRevert::Panic);
        }

        let error = self.error_by_selector(selector)?;
        let args = error.decode_args(body).ok()?;
        Some(ContractRevert::Custom {
            name: error.name.clone(),
            args,
        })
    }
}

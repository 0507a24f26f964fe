//! Solidity ABI: type model, JSON registry, codec and typed conversions
//!
//! # Example
//!
//! ```rust
//! use bind_sdk::abi::{decode, encode, Abi, ParamType, Token};
//! use bind_sdk::{Address, U256};
//!
//! let abi = Abi::parse(r#"[{"type":"function","name":"getLinkAddress",
//!     "inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"}]"#)
//!     .unwrap();
//! let function = abi.resolve_method("getLinkAddress").unwrap();
//! let tokens = function.decode_output(&[0u8; 32]).unwrap();
//! assert_eq!(tokens, vec![Token::Address(Address::ZERO)]);
//!
//! let data = encode(&[ParamType::Uint(96)], &[Token::Uint(U256::from(1000))]).unwrap();
//! assert_eq!(decode(&[ParamType::Uint(96)], &data).unwrap(), vec![Token::Uint(U256::from(1000))]);
//! ```

mod decode;
mod encode;
mod param;
mod registry;
mod revert;
mod tokens;
mod types;

pub use decode::decode;
pub use encode::{encode, encode_function_call, encode_topic};
pub use param::{parse_type, EventParam, Param};
pub use registry::{Abi, Constructor, ContractMetadata, ErrorDef, Event, Function, StateMutability};
pub use revert::ContractRevert;
pub use tokens::{Detokenize, Tokenizable, Tokenize, TupleFields};
pub use types::{ParamType, Token, I256};

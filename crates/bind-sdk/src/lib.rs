//! # bind-sdk
//!
//! Typed contract bindings over Ethereum JSON-RPC.
//!
//! ## Features
//!
//! - **ABI**: Solidity ABI registry, strict encoding and decoding, typed conversions
//! - **BoundContract**: typed calls and transactions against one contract
//! - **Events**: historical queries, live subscriptions and a pull-based iterator
//! - **ChainClient**: RPC client over a pluggable transport
//! - **Wallet** / **TxBuilder**: local signing of legacy and EIP-1559 transactions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bind_sdk::abi::ContractMetadata;
//! use bind_sdk::{Address, BoundContract, ChainClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChainClient::connect("http://localhost:8545").await?;
//!     let metadata = ContractMetadata::from_abi(
//!         r#"[{"type":"function","name":"getLinkAddress","inputs":[],
//!              "outputs":[{"name":"","type":"address"}],"stateMutability":"view"}]"#,
//!     )?;
//!
//!     let registry = Address::from_hex("0x02777053d6764996e594c3E88AF1D58D5363a2e6")?;
//!     let contract = BoundContract::new(registry, &metadata, client);
//!
//!     let link: Address = contract.method("getLinkAddress", ())?.call().await?;
//!     println!("LINK: {}", link);
//!     Ok(())
//! }
//! ```
//!
//! ## Events
//!
//! ```rust,no_run
//! use bind_sdk::abi::{ContractMetadata, Token, TupleFields};
//! use bind_sdk::{Address, BoundContract, ChainClient, EthEvent, SdkError, U256};
//!
//! struct FundsAdded {
//!     id: U256,
//!     from: Address,
//!     amount: u128,
//! }
//!
//! impl EthEvent for FundsAdded {
//!     const NAME: &'static str = "FundsAdded";
//!
//!     fn from_tokens(tokens: Vec<Token>) -> Result<Self, SdkError> {
//!         let mut fields = TupleFields::from_vec(tokens, 3)?;
//!         Ok(Self { id: fields.next()?, from: fields.next()?, amount: fields.next()? })
//!     }
//! }
//!
//! # async fn run(contract: BoundContract) -> Result<(), SdkError> {
//! let mut logs = contract
//!     .events::<FundsAdded>()?
//!     .topic_values(0, vec![U256::from(42)])
//!     .from_block(0u64)
//!     .query()
//!     .await?;
//! while logs.advance().await {
//!     if let Some(record) = logs.current() {
//!         println!("{} added {} to {}", record.event.from, record.event.amount, record.event.id);
//!     }
//! }
//! if let Some(err) = logs.error() {
//!     eprintln!("stopped early: {}", err);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
mod config;
mod contract;
mod error;
mod event;
mod filter;
mod iterator;
mod submitter;
mod subscription;
mod transport;
mod tx_builder;
pub mod types;
mod wallet;

// Re-export main types
pub use client::{ChainClient, FilterId, MIN_POLL_INTERVAL};
pub use config::ClientConfig;
pub use contract::{BoundContract, CallOpts, DecodedLog, MethodCall};
pub use error::SdkError;
pub use event::{EthEvent, EventQuery, EventRecord};
pub use filter::Filter;
pub use iterator::LogIterator;
pub use submitter::{NodeSubmitter, TransactOpts, TxSubmitter, WalletSubmitter};
pub use subscription::{EventSubscription, SubscriptionItem};
pub use transport::{MockTransport, RecordedRequest};

/// Re-export Transport trait for custom implementations
pub use transport::{deserialize_response, Transport};
pub use tx_builder::{Eip1559Tx, LegacyTx, SignedTx, TxBuilder};
pub use wallet::{TxType, Wallet};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export primitives for convenience
pub use bind_primitives::{Address, BlockNumber, H256, U256};

//! # bind-keeper
//!
//! Typed binding for the Keeper Registry 2.0 contract, built on `bind-sdk`.
//!
//! ```rust,no_run
//! use bind_keeper::{FilterOpts, KeeperRegistry};
//! use bind_sdk::{Address, ChainClient, U256};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChainClient::connect("http://localhost:8545").await?;
//!     let metadata = KeeperRegistry::metadata()?;
//!     let registry = KeeperRegistry::new(
//!         Address::from_hex("0x02777053d6764996e594c3E88AF1D58D5363a2e6")?,
//!         &metadata,
//!         client,
//!     );
//!
//!     let upkeep = registry.get_upkeep(U256::from(42)).await?;
//!     println!("target {} balance {}", upkeep.target, upkeep.balance);
//!
//!     let opts = FilterOpts::new().from_block(17_000_000u64);
//!     let mut performed = registry
//!         .filter_upkeep_performed(&opts, vec![U256::from(42)], vec![])
//!         .await?;
//!     while performed.advance().await {
//!         if let Some(record) = performed.current() {
//!             println!("performed at {:?}: {}", record.block_number(), record.event.success);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod events;
mod registry;
mod types;

pub use events::*;
pub use registry::{FilterOpts, KeeperRegistry, ABI, BYTECODE};
pub use types::{
    CheckUpkeepResult, ConfigDetails, ConfigDigestAndEpoch, OnchainConfig, RegistryState,
    SignerInfo, SimulatePerformResult, State, TransmitterInfo, UpkeepInfo,
};

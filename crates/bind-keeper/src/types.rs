//! Typed outputs of the registry's read calls

use bind_primitives::{Address, H256, U256};
use bind_sdk::abi::{encode, ParamType, Token, Tokenizable, TupleFields};
use bind_sdk::SdkError;
use bytes::Bytes;

/// Declares a struct that converts to and from an ABI tuple, one field per
/// member in declaration order.
macro_rules! abi_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident: $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl Tokenizable for $name {
            fn from_token(token: Token) -> Result<Self, SdkError> {
                let len = <[&str]>::len(&[$(stringify!($field)),*]);
                let mut fields = TupleFields::new(token, len)?;
                Ok(Self {
                    $($field: fields.next()?,)*
                })
            }

            fn into_token(self) -> Token {
                Token::Tuple(vec![$(self.$field.into_token()),*])
            }
        }
    };
}

abi_struct! {
    /// Registry parameters set through `setConfig`
    pub struct OnchainConfig {
        /// Premium over gas cost, in parts per billion
        pub payment_premium_ppb: u32,
        /// Flat fee per perform, in micro-LINK
        pub flat_fee_micro_link: u32,
        /// Gas available to `checkUpkeep`
        pub check_gas_limit: u32,
        /// Age after which the gas feed is considered stale (uint24)
        pub staleness_seconds: u32,
        /// Multiplier applied to the gas price ceiling
        pub gas_ceiling_multiplier: u16,
        /// Minimum spend before an upkeep can be cancelled without penalty
        pub min_upkeep_spend: u128,
        /// Upper bound for an upkeep's gas limit
        pub max_perform_gas: u32,
        /// Upper bound for `checkData` length
        pub max_check_data_size: u32,
        /// Upper bound for `performData` length
        pub max_perform_data_size: u32,
        /// Gas price used when the feed is stale
        pub fallback_gas_price: U256,
        /// LINK/native price used when the feed is stale
        pub fallback_link_price: U256,
        /// Upkeep transcoder used for migrations
        pub transcoder: Address,
        /// Registrar allowed to register upkeeps
        pub registrar: Address,
    }
}

impl OnchainConfig {
    fn param_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Uint(32),
            ParamType::Uint(32),
            ParamType::Uint(32),
            ParamType::Uint(24),
            ParamType::Uint(16),
            ParamType::Uint(96),
            ParamType::Uint(32),
            ParamType::Uint(32),
            ParamType::Uint(32),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Address,
            ParamType::Address,
        ])
    }

    /// The `onchainConfig` bytes `setConfig` expects
    pub fn abi_encode(&self) -> Result<Bytes, SdkError> {
        let data = encode(&[Self::param_type()], &[self.clone().into_token()])?;
        Ok(Bytes::from(data))
    }

    /// Read back the `onchainConfig` bytes of a `ConfigSet` event
    pub fn abi_decode(data: &[u8]) -> Result<Self, SdkError> {
        let mut tokens = bind_sdk::abi::decode(&[Self::param_type()], data)?;
        match tokens.pop() {
            Some(token) => Self::from_token(token),
            None => Err(SdkError::AbiDecode("empty onchain config".to_string())),
        }
    }
}

abi_struct! {
    /// Registry-wide counters and the current config
    pub struct State {
        /// Registry nonce
        pub nonce: u32,
        /// LINK owned by the registry owner
        pub owner_link_balance: u128,
        /// LINK the registry should hold
        pub expected_link_balance: U256,
        /// Premium accumulated for transmitters
        pub total_premium: u128,
        /// Registered upkeeps
        pub num_upkeeps: U256,
        /// Number of `setConfig` calls
        pub config_count: u32,
        /// Block of the latest `setConfig`
        pub latest_config_block_number: u32,
        /// Digest of the latest config
        pub latest_config_digest: H256,
        /// Latest transmitted epoch
        pub latest_epoch: u32,
        /// Registry paused
        pub paused: bool,
    }
}

abi_struct! {
    /// One registered upkeep
    pub struct UpkeepInfo {
        /// Contract performed on
        pub target: Address,
        /// Gas limit for `performUpkeep`
        pub execute_gas: u32,
        /// Data passed to `checkUpkeep`
        pub check_data: Bytes,
        /// LINK balance
        pub balance: u128,
        /// Upkeep admin
        pub admin: Address,
        /// Block after which the upkeep is cancelled
        pub max_valid_blocknumber: u64,
        /// Block of the last perform
        pub last_perform_block_number: u32,
        /// LINK spent so far
        pub amount_spent: u128,
        /// Upkeep paused
        pub paused: bool,
        /// Opaque offchain config
        pub offchain_config: Bytes,
    }
}

abi_struct! {
    /// `getSignerInfo` outputs
    pub struct SignerInfo {
        /// Currently a signer
        pub active: bool,
        /// Position in the signer list
        pub index: u8,
    }
}

abi_struct! {
    /// `getTransmitterInfo` outputs
    pub struct TransmitterInfo {
        /// Currently a transmitter
        pub active: bool,
        /// Position in the transmitter list
        pub index: u8,
        /// Uncollected LINK
        pub balance: u128,
        /// Premium level at the last collection
        pub last_collected: u128,
        /// Account paid on withdrawal
        pub payee: Address,
    }
}

abi_struct! {
    /// `latestConfigDetails` outputs
    pub struct ConfigDetails {
        /// Number of `setConfig` calls
        pub config_count: u32,
        /// Block of the latest `setConfig`
        pub block_number: u32,
        /// Digest of the latest config
        pub config_digest: H256,
    }
}

abi_struct! {
    /// `latestConfigDigestAndEpoch` outputs
    pub struct ConfigDigestAndEpoch {
        /// Whether offchain nodes should scan logs instead
        pub scan_logs: bool,
        /// Digest of the latest config
        pub config_digest: H256,
        /// Latest transmitted epoch
        pub epoch: u32,
    }
}

abi_struct! {
    /// `getState` outputs
    pub struct RegistryState {
        /// Counters
        pub state: State,
        /// Current parameters
        pub config: OnchainConfig,
        /// Active signers
        pub signers: Vec<Address>,
        /// Active transmitters
        pub transmitters: Vec<Address>,
        /// Tolerated faulty oracles
        pub f: u8,
    }
}

abi_struct! {
    /// `checkUpkeep` outputs, from a simulated call
    pub struct CheckUpkeepResult {
        /// Whether the upkeep wants to perform
        pub upkeep_needed: bool,
        /// Data to pass to `performUpkeep`
        pub perform_data: Bytes,
        /// Why the check failed, 0 when it did not
        pub upkeep_failure_reason: u8,
        /// Gas used by the check
        pub gas_used: U256,
        /// Gas price from the feed
        pub fast_gas_wei: U256,
        /// LINK/native price from the feed
        pub link_native: U256,
    }
}

abi_struct! {
    /// `simulatePerformUpkeep` outputs
    pub struct SimulatePerformResult {
        /// Perform succeeded
        pub success: bool,
        /// Gas used by the perform
        pub gas_used: U256,
    }
}

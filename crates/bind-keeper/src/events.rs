//! Registry events
//!
//! Every event gets a struct, a `filter_*` query over past logs, a `watch_*`
//! live subscription and a `parse_*` decoder on [`KeeperRegistry`]. The
//! `filter_*`/`watch_*` arguments are the allowed values of each indexed
//! argument, in order; an empty list matches anything.

use bind_primitives::{Address, H256, U256};
use bind_sdk::abi::{Token, Tokenizable, TupleFields};
use bind_sdk::types::Log;
use bind_sdk::{EthEvent, EventRecord, EventSubscription, LogIterator, SdkError};
use bytes::Bytes;

use crate::registry::{FilterOpts, KeeperRegistry};

fn rule<T: Tokenizable>(values: Vec<T>) -> Vec<Token> {
    values.into_iter().map(Tokenizable::into_token).collect()
}

macro_rules! keeper_events {
    ($(
        $(#[$meta:meta])*
        $name:ident => $filter:ident, $watch:ident, $parse:ident {
            indexed { $($(#[$imeta:meta])* $ifield:ident: $ity:ty),* $(,)? }
            data { $($(#[$dmeta:meta])* $dfield:ident: $dty:ty),* $(,)? }
        }
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct $name {
                $($(#[$imeta])* pub $ifield: $ity,)*
                $($(#[$dmeta])* pub $dfield: $dty,)*
            }

            impl EthEvent for $name {
                const NAME: &'static str = stringify!($name);

                fn from_tokens(tokens: Vec<Token>) -> Result<Self, SdkError> {
                    let len = <[&str]>::len(&[$(stringify!($ifield),)* $(stringify!($dfield),)*]);
                    let mut fields = TupleFields::from_vec(tokens, len)?;
                    Ok(Self {
                        $($ifield: fields.next()?,)*
                        $($dfield: fields.next()?,)*
                    })
                }
            }
        )*

        /// Any registry event, as dispatched by [`KeeperRegistry::parse_log`]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum KeeperRegistryEvent {
            $(
                $name($name),
            )*
        }

        impl KeeperRegistryEvent {
            /// Event name as declared in the ABI
            pub fn name(&self) -> &'static str {
                match self {
                    $(KeeperRegistryEvent::$name(_) => stringify!($name),)*
                }
            }
        }

        impl KeeperRegistry {
            $(
                #[doc = concat!("Past `", stringify!($name), "` logs")]
                pub async fn $filter(
                    &self,
                    opts: &FilterOpts,
                    $($ifield: Vec<$ity>,)*
                ) -> Result<LogIterator<$name>, SdkError> {
                    let rules: Vec<Vec<Token>> = vec![$(rule($ifield)),*];
                    self.event_query::<$name>(opts, rules)?.query().await
                }

                #[doc = concat!("Live `", stringify!($name), "` logs")]
                pub async fn $watch(
                    &self,
                    opts: &FilterOpts,
                    $($ifield: Vec<$ity>,)*
                ) -> Result<EventSubscription<$name>, SdkError> {
                    let rules: Vec<Vec<Token>> = vec![$(rule($ifield)),*];
                    self.event_query::<$name>(opts, rules)?.subscribe().await
                }

                #[doc = concat!("Decode a `", stringify!($name), "` log")]
                pub fn $parse(&self, log: &Log) -> Result<EventRecord<$name>, SdkError> {
                    self.contract().parse_log::<$name>(log)
                }
            )*

            /// Decode any registry log, picking the event by its topic0
            pub fn parse_log(&self, log: &Log) -> Result<KeeperRegistryEvent, SdkError> {
                let decoded = self.contract().parse_any_log(log)?;
                match decoded.event.as_str() {
                    $(stringify!($name) => Ok(KeeperRegistryEvent::$name(
                        $name::from_tokens(decoded.tokens)?,
                    )),)*
                    other => Err(SdkError::UnknownSelector {
                        kind: "event",
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

keeper_events! {
    /// A report for a cancelled upkeep was dropped
    CancelledUpkeepReport =>
        filter_cancelled_upkeep_report,
        watch_cancelled_upkeep_report,
        parse_cancelled_upkeep_report
    {
        indexed { id: U256 }
        data {}
    }

    /// New offchain reporting config
    ConfigSet => filter_config_set, watch_config_set, parse_config_set {
        indexed {}
        data {
            previous_config_block_number: u32,
            config_digest: H256,
            config_count: u64,
            signers: Vec<Address>,
            transmitters: Vec<Address>,
            f: u8,
            /// ABI-encoded [`OnchainConfig`](crate::OnchainConfig)
            onchain_config: Bytes,
            offchain_config_version: u64,
            offchain_config: Bytes,
        }
    }

    FundsAdded => filter_funds_added, watch_funds_added, parse_funds_added {
        indexed { id: U256, from: Address }
        data { amount: u128 }
    }

    FundsWithdrawn => filter_funds_withdrawn, watch_funds_withdrawn, parse_funds_withdrawn {
        indexed { id: U256 }
        data { amount: U256, to: Address }
    }

    /// A report was dropped because the upkeep could not pay
    InsufficientFundsUpkeepReport =>
        filter_insufficient_funds_upkeep_report,
        watch_insufficient_funds_upkeep_report,
        parse_insufficient_funds_upkeep_report
    {
        indexed { id: U256 }
        data {}
    }

    OwnerFundsWithdrawn =>
        filter_owner_funds_withdrawn,
        watch_owner_funds_withdrawn,
        parse_owner_funds_withdrawn
    {
        indexed {}
        data { amount: u128 }
    }

    OwnershipTransferRequested =>
        filter_ownership_transfer_requested,
        watch_ownership_transfer_requested,
        parse_ownership_transfer_requested
    {
        indexed { from: Address, to: Address }
        data {}
    }

    OwnershipTransferred =>
        filter_ownership_transferred,
        watch_ownership_transferred,
        parse_ownership_transferred
    {
        indexed { from: Address, to: Address }
        data {}
    }

    Paused => filter_paused, watch_paused, parse_paused {
        indexed {}
        data { account: Address }
    }

    PayeesUpdated => filter_payees_updated, watch_payees_updated, parse_payees_updated {
        indexed {}
        data { transmitters: Vec<Address>, payees: Vec<Address> }
    }

    PayeeshipTransferRequested =>
        filter_payeeship_transfer_requested,
        watch_payeeship_transfer_requested,
        parse_payeeship_transfer_requested
    {
        indexed { transmitter: Address, from: Address, to: Address }
        data {}
    }

    PayeeshipTransferred =>
        filter_payeeship_transferred,
        watch_payeeship_transferred,
        parse_payeeship_transferred
    {
        indexed { transmitter: Address, from: Address, to: Address }
        data {}
    }

    PaymentWithdrawn => filter_payment_withdrawn, watch_payment_withdrawn, parse_payment_withdrawn {
        indexed { transmitter: Address, amount: U256, to: Address }
        data { payee: Address }
    }

    /// A report was dropped because its block was reorged out
    ReorgedUpkeepReport =>
        filter_reorged_upkeep_report,
        watch_reorged_upkeep_report,
        parse_reorged_upkeep_report
    {
        indexed { id: U256 }
        data {}
    }

    /// A report was dropped because a newer perform already landed
    StaleUpkeepReport =>
        filter_stale_upkeep_report,
        watch_stale_upkeep_report,
        parse_stale_upkeep_report
    {
        indexed { id: U256 }
        data {}
    }

    Transmitted => filter_transmitted, watch_transmitted, parse_transmitted {
        indexed {}
        data { config_digest: H256, epoch: u32 }
    }

    Unpaused => filter_unpaused, watch_unpaused, parse_unpaused {
        indexed {}
        data { account: Address }
    }

    UpkeepAdminTransferRequested =>
        filter_upkeep_admin_transfer_requested,
        watch_upkeep_admin_transfer_requested,
        parse_upkeep_admin_transfer_requested
    {
        indexed { id: U256, from: Address, to: Address }
        data {}
    }

    UpkeepAdminTransferred =>
        filter_upkeep_admin_transferred,
        watch_upkeep_admin_transferred,
        parse_upkeep_admin_transferred
    {
        indexed { id: U256, from: Address, to: Address }
        data {}
    }

    UpkeepCanceled => filter_upkeep_canceled, watch_upkeep_canceled, parse_upkeep_canceled {
        indexed { id: U256, at_block_height: u64 }
        data {}
    }

    UpkeepCheckDataUpdated =>
        filter_upkeep_check_data_updated,
        watch_upkeep_check_data_updated,
        parse_upkeep_check_data_updated
    {
        indexed { id: U256 }
        data { new_check_data: Bytes }
    }

    UpkeepGasLimitSet =>
        filter_upkeep_gas_limit_set,
        watch_upkeep_gas_limit_set,
        parse_upkeep_gas_limit_set
    {
        indexed { id: U256 }
        data { gas_limit: u128 }
    }

    UpkeepMigrated => filter_upkeep_migrated, watch_upkeep_migrated, parse_upkeep_migrated {
        indexed { id: U256 }
        data { remaining_balance: U256, destination: Address }
    }

    UpkeepOffchainConfigSet =>
        filter_upkeep_offchain_config_set,
        watch_upkeep_offchain_config_set,
        parse_upkeep_offchain_config_set
    {
        indexed { id: U256 }
        data { offchain_config: Bytes }
    }

    UpkeepPaused => filter_upkeep_paused, watch_upkeep_paused, parse_upkeep_paused {
        indexed { id: U256 }
        data {}
    }

    UpkeepPerformed => filter_upkeep_performed, watch_upkeep_performed, parse_upkeep_performed {
        indexed { id: U256, success: bool }
        data {
            check_block_number: u32,
            gas_used: U256,
            gas_overhead: U256,
            total_payment: u128,
        }
    }

    UpkeepReceived => filter_upkeep_received, watch_upkeep_received, parse_upkeep_received {
        indexed { id: U256 }
        data { starting_balance: U256, imported_from: Address }
    }

    UpkeepRegistered => filter_upkeep_registered, watch_upkeep_registered, parse_upkeep_registered {
        indexed { id: U256 }
        data { execute_gas: u32, admin: Address }
    }

    UpkeepUnpaused => filter_upkeep_unpaused, watch_upkeep_unpaused, parse_upkeep_unpaused {
        indexed { id: U256 }
        data {}
    }
}

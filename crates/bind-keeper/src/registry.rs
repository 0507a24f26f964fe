//! Keeper Registry 2.0 binding

use bind_primitives::{Address, H256, U256};
use bind_sdk::abi::{ContractMetadata, ContractRevert, Detokenize, Token, Tokenize};
use bind_sdk::types::{BlockId, PendingTransaction};
use bind_sdk::{
    BoundContract, CallOpts, ChainClient, EthEvent, EventQuery, SdkError, TransactOpts, TxSubmitter,
};
use bytes::Bytes;
use tracing::debug;

use crate::types::{
    CheckUpkeepResult, ConfigDetails, ConfigDigestAndEpoch, RegistryState, SignerInfo,
    SimulatePerformResult, TransmitterInfo, UpkeepInfo,
};

/// Registry ABI as emitted by the compiler
pub const ABI: &str = include_str!("../contracts/KeeperRegistry2_0.abi.json");

/// Registry creation bytecode
pub const BYTECODE: &str = include_str!("../contracts/KeeperRegistry2_0.bin");

/// Block range for `filter_*` queries. Unset bounds are left to the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOpts {
    /// First block, inclusive
    pub from_block: Option<BlockId>,
    /// Last block, inclusive
    pub to_block: Option<BlockId>,
}

impl FilterOpts {
    /// Whole chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first block
    pub fn from_block(mut self, block: impl Into<BlockId>) -> Self {
        self.from_block = Some(block.into());
        self
    }

    /// Set the last block
    pub fn to_block(mut self, block: impl Into<BlockId>) -> Self {
        self.to_block = Some(block.into());
        self
    }
}

/// Typed handle on a deployed Keeper Registry 2.0.
///
/// Reads use the binding's [`CallOpts`], writes its [`TransactOpts`] and
/// submitter; `with_*` returns a reconfigured copy. Writes return as soon
/// as the node accepts the transaction.
#[derive(Debug, Clone)]
pub struct KeeperRegistry {
    contract: BoundContract,
}

impl KeeperRegistry {
    /// Parse the embedded ABI and bytecode. Parse once and share the result.
    pub fn metadata() -> Result<ContractMetadata, SdkError> {
        ContractMetadata::new(ABI, BYTECODE)
    }

    /// Bind the registry at `address`
    pub fn new(address: Address, metadata: &ContractMetadata, client: ChainClient) -> Self {
        Self {
            contract: BoundContract::new(address, metadata, client),
        }
    }

    /// Wrap an existing binding
    pub fn from_contract(contract: BoundContract) -> Self {
        Self { contract }
    }

    /// Deploy a registry backed by `keeper_registry_logic`. The new address
    /// is in the receipt's `contract_address`.
    pub async fn deploy(
        client: &ChainClient,
        submitter: &dyn TxSubmitter,
        opts: &TransactOpts,
        metadata: &ContractMetadata,
        keeper_registry_logic: Address,
    ) -> Result<PendingTransaction, SdkError> {
        let pending = BoundContract::deploy(
            client,
            submitter,
            opts,
            metadata,
            &[Token::Address(keeper_registry_logic)],
        )
        .await?;
        debug!(hash = %pending.hash, logic = %keeper_registry_logic, "registry deployment sent");
        Ok(pending)
    }

    /// The generic binding underneath
    pub fn contract(&self) -> &BoundContract {
        &self.contract
    }

    /// Registry address
    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Copy with different read options
    pub fn with_call_opts(&self, opts: CallOpts) -> Self {
        Self::from_contract(self.contract.with_call_opts(opts))
    }

    /// Copy with different transaction options
    pub fn with_transact_opts(&self, opts: TransactOpts) -> Self {
        Self::from_contract(self.contract.with_transact_opts(opts))
    }

    /// Copy that submits through `submitter`
    pub fn with_submitter(&self, submitter: impl TxSubmitter + 'static) -> Self {
        Self::from_contract(self.contract.with_submitter(submitter))
    }

    /// Name the registry's custom error behind a failed call, if any
    pub fn decode_revert(&self, error: &SdkError) -> Option<ContractRevert> {
        self.contract.decode_revert(error)
    }

    async fn read<A: Tokenize, R: Detokenize>(&self, name: &str, args: A) -> Result<R, SdkError> {
        self.contract.method::<A, R>(name, args)?.call().await
    }

    async fn write<A: Tokenize>(
        &self,
        name: &str,
        args: A,
    ) -> Result<PendingTransaction, SdkError> {
        self.contract.method::<A, ()>(name, args)?.send().await
    }

    pub(crate) fn event_query<E: EthEvent>(
        &self,
        opts: &FilterOpts,
        rules: Vec<Vec<Token>>,
    ) -> Result<EventQuery<E>, SdkError> {
        let mut query = self.contract.events::<E>()?;
        for (index, values) in rules.into_iter().enumerate() {
            query = query.topic(index, values);
        }
        if let Some(block) = opts.from_block {
            query = query.from_block(block);
        }
        if let Some(block) = opts.to_block {
            query = query.to_block(block);
        }
        Ok(query)
    }

    // ==================== Reads ====================

    /// Up to `max_count` active upkeep ids from `start_index`; 0 means all
    pub async fn get_active_upkeep_ids(
        &self,
        start_index: U256,
        max_count: U256,
    ) -> Result<Vec<U256>, SdkError> {
        self.read("getActiveUpkeepIDs", (start_index, max_count)).await
    }

    /// Gas price feed
    pub async fn get_fast_gas_feed_address(&self) -> Result<Address, SdkError> {
        self.read("getFastGasFeedAddress", ()).await
    }

    /// Logic contract the registry delegates to
    pub async fn get_keeper_registry_logic_address(&self) -> Result<Address, SdkError> {
        self.read("getKeeperRegistryLogicAddress", ()).await
    }

    /// LINK token
    pub async fn get_link_address(&self) -> Result<Address, SdkError> {
        self.read("getLinkAddress", ()).await
    }

    /// LINK/native price feed
    pub async fn get_link_native_feed_address(&self) -> Result<Address, SdkError> {
        self.read("getLinkNativeFeedAddress", ()).await
    }

    /// Worst-case payment for a perform using `gas_limit`
    pub async fn get_max_payment_for_gas(&self, gas_limit: u32) -> Result<u128, SdkError> {
        self.read("getMaxPaymentForGas", (gas_limit,)).await
    }

    /// Balance an upkeep needs to be performed
    pub async fn get_min_balance_for_upkeep(&self, id: U256) -> Result<u128, SdkError> {
        self.read("getMinBalanceForUpkeep", (id,)).await
    }

    /// Chain mode (0 default, 1 Arbitrum, 2 Optimism)
    pub async fn get_mode(&self) -> Result<u8, SdkError> {
        self.read("getMode", ()).await
    }

    /// Migration permission granted to `peer`
    pub async fn get_peer_registry_migration_permission(
        &self,
        peer: Address,
    ) -> Result<u8, SdkError> {
        self.read("getPeerRegistryMigrationPermission", (peer,)).await
    }

    pub async fn get_signer_info(&self, query: Address) -> Result<SignerInfo, SdkError> {
        self.read("getSignerInfo", (query,)).await
    }

    /// Counters, config and the oracle set
    pub async fn get_state(&self) -> Result<RegistryState, SdkError> {
        self.read("getState", ()).await
    }

    pub async fn get_transmitter_info(&self, query: Address) -> Result<TransmitterInfo, SdkError> {
        self.read("getTransmitterInfo", (query,)).await
    }

    pub async fn get_upkeep(&self, id: U256) -> Result<UpkeepInfo, SdkError> {
        self.read("getUpkeep", (id,)).await
    }

    pub async fn latest_config_details(&self) -> Result<ConfigDetails, SdkError> {
        self.read("latestConfigDetails", ()).await
    }

    pub async fn latest_config_digest_and_epoch(&self) -> Result<ConfigDigestAndEpoch, SdkError> {
        self.read("latestConfigDigestAndEpoch", ()).await
    }

    pub async fn owner(&self) -> Result<Address, SdkError> {
        self.read("owner", ()).await
    }

    /// For example `"KeeperRegistry 2.0.0"`
    pub async fn type_and_version(&self) -> Result<String, SdkError> {
        self.read("typeAndVersion", ()).await
    }

    pub async fn upkeep_transcoder_version(&self) -> Result<u8, SdkError> {
        self.read("upkeepTranscoderVersion", ()).await
    }

    pub async fn upkeep_version(&self) -> Result<u8, SdkError> {
        self.read("upkeepVersion", ()).await
    }

    // ==================== Simulated reads ====================

    /// Run `checkUpkeep` without sending a transaction. Only useful from
    /// an address the registry lets simulate, usually the zero address.
    pub async fn call_check_upkeep(&self, id: U256) -> Result<CheckUpkeepResult, SdkError> {
        self.read("checkUpkeep", (id,)).await
    }

    /// Run `simulatePerformUpkeep` without sending a transaction
    pub async fn call_simulate_perform_upkeep(
        &self,
        id: U256,
        perform_data: Bytes,
    ) -> Result<SimulatePerformResult, SdkError> {
        self.read("simulatePerformUpkeep", (id, perform_data)).await
    }

    // ==================== Writes ====================

    pub async fn accept_ownership(&self) -> Result<PendingTransaction, SdkError> {
        self.write("acceptOwnership", ()).await
    }

    pub async fn accept_payeeship(
        &self,
        transmitter: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("acceptPayeeship", (transmitter,)).await
    }

    pub async fn accept_upkeep_admin(&self, id: U256) -> Result<PendingTransaction, SdkError> {
        self.write("acceptUpkeepAdmin", (id,)).await
    }

    /// Top up an upkeep; `amount` must fit in 96 bits
    pub async fn add_funds(&self, id: U256, amount: u128) -> Result<PendingTransaction, SdkError> {
        self.write("addFunds", (id, amount)).await
    }

    pub async fn cancel_upkeep(&self, id: U256) -> Result<PendingTransaction, SdkError> {
        self.write("cancelUpkeep", (id,)).await
    }

    /// `checkUpkeep` as a transaction. See [`call_check_upkeep`](Self::call_check_upkeep)
    /// for the read.
    pub async fn check_upkeep(&self, id: U256) -> Result<PendingTransaction, SdkError> {
        self.write("checkUpkeep", (id,)).await
    }

    pub async fn migrate_upkeeps(
        &self,
        ids: Vec<U256>,
        destination: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("migrateUpkeeps", (ids, destination)).await
    }

    /// ERC-677 callback used by the LINK token
    pub async fn on_token_transfer(
        &self,
        sender: Address,
        amount: U256,
        data: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("onTokenTransfer", (sender, amount, data)).await
    }

    pub async fn pause(&self) -> Result<PendingTransaction, SdkError> {
        self.write("pause", ()).await
    }

    pub async fn pause_upkeep(&self, id: U256) -> Result<PendingTransaction, SdkError> {
        self.write("pauseUpkeep", (id,)).await
    }

    pub async fn receive_upkeeps(
        &self,
        encoded_upkeeps: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("receiveUpkeeps", (encoded_upkeeps,)).await
    }

    pub async fn recover_funds(&self) -> Result<PendingTransaction, SdkError> {
        self.write("recoverFunds", ()).await
    }

    pub async fn register_upkeep(
        &self,
        target: Address,
        gas_limit: u32,
        admin: Address,
        check_data: Bytes,
        offchain_config: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("registerUpkeep", (target, gas_limit, admin, check_data, offchain_config))
            .await
    }

    /// `onchain_config` is usually [`OnchainConfig::abi_encode`](crate::OnchainConfig::abi_encode)
    pub async fn set_config(
        &self,
        signers: Vec<Address>,
        transmitters: Vec<Address>,
        f: u8,
        onchain_config: Bytes,
        offchain_config_version: u64,
        offchain_config: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write(
            "setConfig",
            (signers, transmitters, f, onchain_config, offchain_config_version, offchain_config),
        )
        .await
    }

    pub async fn set_payees(&self, payees: Vec<Address>) -> Result<PendingTransaction, SdkError> {
        self.write("setPayees", (payees,)).await
    }

    pub async fn set_peer_registry_migration_permission(
        &self,
        peer: Address,
        permission: u8,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("setPeerRegistryMigrationPermission", (peer, permission)).await
    }

    pub async fn set_upkeep_gas_limit(
        &self,
        id: U256,
        gas_limit: u32,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("setUpkeepGasLimit", (id, gas_limit)).await
    }

    pub async fn set_upkeep_offchain_config(
        &self,
        id: U256,
        config: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("setUpkeepOffchainConfig", (id, config)).await
    }

    /// `simulatePerformUpkeep` as a transaction
    pub async fn simulate_perform_upkeep(
        &self,
        id: U256,
        perform_data: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("simulatePerformUpkeep", (id, perform_data)).await
    }

    pub async fn transfer_ownership(&self, to: Address) -> Result<PendingTransaction, SdkError> {
        self.write("transferOwnership", (to,)).await
    }

    pub async fn transfer_payeeship(
        &self,
        transmitter: Address,
        proposed: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("transferPayeeship", (transmitter, proposed)).await
    }

    pub async fn transfer_upkeep_admin(
        &self,
        id: U256,
        proposed: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("transferUpkeepAdmin", (id, proposed)).await
    }

    /// Submit a signed OCR report
    pub async fn transmit(
        &self,
        report_context: [H256; 3],
        raw_report: Bytes,
        rs: Vec<H256>,
        ss: Vec<H256>,
        raw_vs: H256,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("transmit", (report_context, raw_report, rs, ss, raw_vs)).await
    }

    pub async fn unpause(&self) -> Result<PendingTransaction, SdkError> {
        self.write("unpause", ()).await
    }

    pub async fn unpause_upkeep(&self, id: U256) -> Result<PendingTransaction, SdkError> {
        self.write("unpauseUpkeep", (id,)).await
    }

    pub async fn update_check_data(
        &self,
        id: U256,
        new_check_data: Bytes,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("updateCheckData", (id, new_check_data)).await
    }

    pub async fn withdraw_funds(
        &self,
        id: U256,
        to: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("withdrawFunds", (id, to)).await
    }

    pub async fn withdraw_owner_funds(&self) -> Result<PendingTransaction, SdkError> {
        self.write("withdrawOwnerFunds", ()).await
    }

    pub async fn withdraw_payment(
        &self,
        from: Address,
        to: Address,
    ) -> Result<PendingTransaction, SdkError> {
        self.write("withdrawPayment", (from, to)).await
    }

    /// Plain value transfer, reaching the registry's `receive`
    pub async fn transfer(&self) -> Result<PendingTransaction, SdkError> {
        self.contract.transfer(self.contract.transact_opts()).await
    }

    /// Send raw calldata to the registry's `fallback`, which delegates to
    /// the registry logic contract. This is how logic-only functions are
    /// reached.
    pub async fn fallback(&self, calldata: Bytes) -> Result<PendingTransaction, SdkError> {
        self.contract.fallback(calldata, self.contract.transact_opts()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_metadata_parses() {
        let metadata = KeeperRegistry::metadata().unwrap();
        assert!(!metadata.bytecode.is_empty());
        assert_eq!(metadata.abi.functions().count(), 48);
        assert_eq!(metadata.abi.events().count(), 29);
        assert!(metadata.abi.constructor().is_some());
        assert!(metadata.abi.has_receive());
        assert!(metadata.abi.has_fallback());
    }

    #[test]
    fn test_filter_opts_builder() {
        let opts = FilterOpts::new().from_block(10u64).to_block(BlockId::Latest);
        assert_eq!(opts.from_block, Some(BlockId::Number(10)));
        assert_eq!(opts.to_block, Some(BlockId::Latest));
    }
}

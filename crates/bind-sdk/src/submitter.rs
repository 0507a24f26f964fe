//! Transaction options and submission collaborators

use std::sync::Arc;

use async_trait::async_trait;
use bind_primitives::{Address, U256};
use bytes::Bytes;
use tracing::debug;

use crate::client::ChainClient;
use crate::types::{BlockId, PendingTransaction, TransactionRequest};
use crate::wallet::TxType;
use crate::{SdkError, Wallet};

/// Sender and gas options for a mutating call.
///
/// Unset values are left to the submitter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactOpts {
    /// Sender account
    pub from: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Gas limit
    pub gas_limit: Option<u64>,
    /// Gas price (legacy)
    pub gas_price: Option<U256>,
    /// Max fee per gas (EIP-1559)
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas (EIP-1559)
    pub max_priority_fee_per_gas: Option<U256>,
    /// Sender nonce
    pub nonce: Option<u64>,
}

impl TransactOpts {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the value
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Set the legacy gas price
    pub fn gas_price(mut self, gas_price: impl Into<U256>) -> Self {
        self.gas_price = Some(gas_price.into());
        self
    }

    /// Set the EIP-1559 max fee
    pub fn max_fee_per_gas(mut self, fee: impl Into<U256>) -> Self {
        self.max_fee_per_gas = Some(fee.into());
        self
    }

    /// Set the EIP-1559 priority fee
    pub fn max_priority_fee_per_gas(mut self, fee: impl Into<U256>) -> Self {
        self.max_priority_fee_per_gas = Some(fee.into());
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Request carrying these options
    pub fn request(&self, to: Option<Address>, data: Bytes) -> TransactionRequest {
        TransactionRequest {
            from: self.from,
            to,
            nonce: self.nonce,
            gas: self.gas_limit,
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            value: self.value,
            data,
        }
    }
}

/// Hands an encoded transaction to whatever authorizes and broadcasts it.
///
/// Returns as soon as the node accepts the transaction.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    /// Authorize and broadcast `tx`
    async fn submit(
        &self,
        client: &ChainClient,
        tx: TransactionRequest,
    ) -> Result<PendingTransaction, SdkError>;

    /// Account transactions are sent from, when known locally
    fn sender(&self) -> Option<Address> {
        None
    }
}

/// Lets the node sign with one of its own accounts (`eth_sendTransaction`)
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeSubmitter;

#[async_trait]
impl TxSubmitter for NodeSubmitter {
    async fn submit(
        &self,
        client: &ChainClient,
        tx: TransactionRequest,
    ) -> Result<PendingTransaction, SdkError> {
        client.send_transaction(&tx).await
    }
}

/// Signs locally with a [`Wallet`] and sends the raw transaction.
///
/// Missing nonce, gas limit and fees are asked from the node; no pricing
/// policy is applied on top.
#[derive(Debug, Clone)]
pub struct WalletSubmitter {
    wallet: Arc<Wallet>,
    tx_type: TxType,
}

impl WalletSubmitter {
    /// Legacy (EIP-155) transactions
    pub fn new(wallet: Wallet) -> Self {
        Self {
            wallet: Arc::new(wallet),
            tx_type: TxType::Legacy,
        }
    }

    /// Send EIP-1559 transactions instead
    pub fn eip1559(mut self) -> Self {
        self.tx_type = TxType::Eip1559;
        self
    }

    /// The signing wallet
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    async fn fill(
        &self,
        client: &ChainClient,
        mut tx: TransactionRequest,
    ) -> Result<TransactionRequest, SdkError> {
        let sender = self.wallet.check_sender(tx.from)?;
        tx.from = Some(sender);

        if tx.nonce.is_none() {
            tx.nonce = Some(client.get_nonce(&sender, BlockId::Pending).await?);
        }
        if tx.gas.is_none() {
            tx.gas = Some(client.estimate_gas(&tx.to_call_request()).await?);
        }

        if self.tx_type == TxType::Eip1559 {
            if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
                let price = client.gas_price().await?;
                let max_fee = *tx.max_fee_per_gas.get_or_insert(price);
                tx.max_priority_fee_per_gas.get_or_insert(price.min(max_fee));
            }
        } else if tx.gas_price.is_none() {
            tx.gas_price = Some(client.gas_price().await?);
        }
        Ok(tx)
    }
}

#[async_trait]
impl TxSubmitter for WalletSubmitter {
    async fn submit(
        &self,
        client: &ChainClient,
        tx: TransactionRequest,
    ) -> Result<PendingTransaction, SdkError> {
        let tx = self.fill(client, tx).await?;
        let chain_id = client.chain_id().await?;
        let signed = self.wallet.sign_request(chain_id, &tx, self.tx_type)?;
        debug!(hash = %signed.hash, nonce = ?tx.nonce, "signed transaction");
        client.send_raw_transaction(&signed.raw).await
    }

    fn sender(&self) -> Option<Address> {
        Some(self.wallet.address())
    }
}

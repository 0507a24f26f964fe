//! SDK types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bind_primitives::{
    format_quantity, format_quantity_u256, parse_quantity_u64, Address, H256, U256,
};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::{ChainClient, SdkError};

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
    /// Safe block
    Safe,
    /// Finalized block
    Finalized,
}

impl BlockId {
    /// Block number, if this is a numbered id
    pub fn as_number(&self) -> Option<u64> {
        match self {
            BlockId::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        BlockId::Number(n)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(n) => f.write_str(&format_quantity(*n)),
            BlockId::Latest => f.write_str("latest"),
            BlockId::Pending => f.write_str("pending"),
            BlockId::Earliest => f.write_str("earliest"),
            BlockId::Safe => f.write_str("safe"),
            BlockId::Finalized => f.write_str("finalized"),
        }
    }
}

impl FromStr for BlockId {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(BlockId::Latest),
            "pending" => Ok(BlockId::Pending),
            "earliest" => Ok(BlockId::Earliest),
            "safe" => Ok(BlockId::Safe),
            "finalized" => Ok(BlockId::Finalized),
            other => Ok(BlockId::Number(parse_quantity_u64(other)?)),
        }
    }
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Call request for eth_call and eth_estimateGas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price (legacy)
    pub gas_price: Option<U256>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        if let Some(from) = &self.from {
            map.serialize_entry("from", from)?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", to)?;
        }
        if let Some(gas) = self.gas {
            map.serialize_entry("gas", &format_quantity(gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format_quantity_u256(gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &format_quantity_u256(value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }
        map.end()
    }
}

/// A transaction to submit, before signing.
///
/// Unset fields are left to the submitter (node or wallet) to fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sender
    pub from: Option<Address>,
    /// Recipient (None for contract creation)
    pub to: Option<Address>,
    /// Sender nonce
    pub nonce: Option<u64>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price (legacy transactions)
    pub gas_price: Option<U256>,
    /// Max fee per gas (EIP-1559)
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas (EIP-1559)
    pub max_priority_fee_per_gas: Option<U256>,
    /// Value to transfer
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl TransactionRequest {
    /// The matching call request, used for gas estimation
    pub fn to_call_request(&self) -> CallRequest {
        CallRequest {
            from: self.from,
            to: self.to,
            gas: self.gas,
            gas_price: self.gas_price,
            value: Some(self.value),
            data: Some(self.data.clone()),
        }
    }
}

impl Serialize for TransactionRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        if let Some(from) = &self.from {
            map.serialize_entry("from", from)?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", to)?;
        }
        if let Some(nonce) = self.nonce {
            map.serialize_entry("nonce", &format_quantity(nonce))?;
        }
        if let Some(gas) = self.gas {
            map.serialize_entry("gas", &format_quantity(gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format_quantity_u256(gas_price))?;
        }
        if let Some(max_fee) = &self.max_fee_per_gas {
            map.serialize_entry("maxFeePerGas", &format_quantity_u256(max_fee))?;
        }
        if let Some(max_priority) = &self.max_priority_fee_per_gas {
            map.serialize_entry("maxPriorityFeePerGas", &format_quantity_u256(max_priority))?;
        }
        map.serialize_entry("value", &format_quantity_u256(&self.value))?;
        map.serialize_entry("data", &format!("0x{}", hex::encode(&self.data)))?;
        map.end()
    }
}

/// Event log as returned by eth_getLogs and filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Topics, topic0 first
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(with = "hex_bytes")]
    pub data: Bytes,
    /// Block number
    #[serde(default, with = "opt_quantity", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Block hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<H256>,
    /// Transaction hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<H256>,
    /// Transaction index in block
    #[serde(default, with = "opt_quantity", skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    /// Log index in block
    #[serde(default, with = "opt_quantity", skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Removed by a reorg
    #[serde(default)]
    pub removed: bool,
}

/// Transaction receipt
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: H256,
    /// Block number
    #[serde(default, with = "opt_quantity")]
    pub block_number: Option<u64>,
    /// Block hash
    #[serde(default)]
    pub block_hash: Option<H256>,
    /// Sender
    #[serde(default)]
    pub from: Option<Address>,
    /// Recipient
    #[serde(default)]
    pub to: Option<Address>,
    /// Gas used by this transaction
    #[serde(default, with = "opt_quantity")]
    pub gas_used: Option<u64>,
    /// Created contract, for deployments
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// 1 for success, 0 for failure
    #[serde(default, with = "opt_quantity")]
    pub status: Option<u64>,
    /// Emitted logs
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Executed without reverting
    pub fn is_success(&self) -> bool {
        self.status == Some(1)
    }
}

/// Pending transaction handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Transaction hash
    pub hash: H256,
}

impl PendingTransaction {
    /// Create a new pending transaction
    pub fn new(hash: H256) -> Self {
        Self { hash }
    }

    /// Get the transaction hash
    pub fn hash(&self) -> &H256 {
        &self.hash
    }

    /// Fetch the receipt once; `None` while unmined
    pub async fn receipt(
        &self,
        client: &ChainClient,
    ) -> Result<Option<TransactionReceipt>, SdkError> {
        client.get_transaction_receipt(&self.hash).await
    }

    /// Poll until the receipt exists or `timeout` passes
    pub async fn confirm(
        &self,
        client: &ChainClient,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TransactionReceipt, SdkError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.receipt(client).await? {
                    return Ok(receipt);
                }
                debug!(hash = %self.hash, "receipt not yet available");
                tokio::time::sleep(poll_interval).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            SdkError::Timeout(format!("no receipt for {} after {:?}", self.hash, timeout))
        })?
    }
}

/// `0x` hex (de)serialization for byte payloads
pub(crate) mod hex_bytes {
    use bytes::Bytes;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(data)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hex_bytes(&s).map_err(de::Error::custom)
    }
}

/// Optional quantity (de)serialization
pub(crate) mod opt_quantity {
    use bind_primitives::{format_quantity, parse_quantity_u64};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format_quantity(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| parse_quantity_u64(&s).map_err(de::Error::custom))
            .transpose()
    }
}

pub(crate) fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    Ok(Bytes::from(hex::decode(s)?))
}

//! Transaction builder

use bind_crypto::keccak256;
use bind_primitives::{Address, H256, U256};
use bytes::Bytes;
use rlp::RlpStream;

use crate::types::TransactionRequest;
use crate::{SdkError, Wallet};

/// EIP-2718 type byte of dynamic-fee transactions
const EIP1559_TX_TYPE: u8 = 0x02;

/// Unsigned legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    /// Sender nonce
    pub nonce: u64,
    /// Gas price
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl LegacyTx {
    fn append_body(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas_limit);
        append_to(s, &self.to);
        s.append(&self.value);
        s.append(&self.data.to_vec());
    }

    /// EIP-155 signing hash
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut s = RlpStream::new_list(9);
        self.append_body(&mut s);
        s.append(&chain_id);
        s.append(&0u8);
        s.append(&0u8);
        keccak256(&s.out())
    }
}

/// Unsigned EIP-1559 transaction (empty access list)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559Tx {
    /// Chain ID
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: u64,
    /// Max priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Max fee per gas
    pub max_fee_per_gas: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl Eip1559Tx {
    fn append_body(&self, s: &mut RlpStream) {
        s.append(&self.chain_id);
        s.append(&self.nonce);
        s.append(&self.max_priority_fee_per_gas);
        s.append(&self.max_fee_per_gas);
        s.append(&self.gas_limit);
        append_to(s, &self.to);
        s.append(&self.value);
        s.append(&self.data.to_vec());
        s.begin_list(0);
    }

    /// Signing hash: keccak of the type byte followed by the RLP payload
    pub fn signing_hash(&self) -> H256 {
        let mut s = RlpStream::new_list(9);
        self.append_body(&mut s);
        keccak256(&typed_envelope(&s.out()))
    }
}

/// A signed, broadcast-ready transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    /// Network encoding, as sent with `eth_sendRawTransaction`
    pub raw: Bytes,
    /// Transaction hash
    pub hash: H256,
    /// Signature `v` as encoded (EIP-155 value or y-parity)
    pub v: u64,
    /// Signature `r`
    pub r: H256,
    /// Signature `s`
    pub s: H256,
}

impl SignedTx {
    fn new(raw: Vec<u8>, v: u64, r: [u8; 32], s: [u8; 32]) -> Self {
        Self {
            hash: keccak256(&raw),
            raw: Bytes::from(raw),
            v,
            r: H256::from_bytes(r),
            s: H256::from_bytes(s),
        }
    }
}

fn append_to(s: &mut RlpStream, to: &Option<Address>) {
    match to {
        Some(address) => {
            s.append(address);
        }
        None => {
            s.append_empty_data();
        }
    }
}

fn typed_envelope(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(payload);
    out
}

/// Signature scalars are RLP integers, so leading zeros are dropped
fn scalar(bytes: &[u8; 32]) -> U256 {
    U256::from_big_endian(bytes)
}

/// Transaction builder with fluent API
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    chain_id: u64,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<U256>,
    max_fee_per_gas: Option<U256>,
    max_priority_fee_per_gas: Option<U256>,
    to: Option<Address>,
    value: U256,
    data: Bytes,
}

impl TxBuilder {
    /// Create a new transaction builder
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Start from a transaction request's filled fields
    pub fn from_request(chain_id: u64, request: &TransactionRequest) -> Self {
        Self {
            chain_id,
            nonce: request.nonce,
            gas_limit: request.gas,
            gas_price: request.gas_price,
            max_fee_per_gas: request.max_fee_per_gas,
            max_priority_fee_per_gas: request.max_priority_fee_per_gas,
            to: request.to,
            value: request.value,
            data: request.data.clone(),
        }
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Set the gas price (for legacy transactions)
    pub fn gas_price(mut self, price: impl Into<U256>) -> Self {
        self.gas_price = Some(price.into());
        self
    }

    /// Set max fee per gas (for EIP-1559 transactions)
    pub fn max_fee_per_gas(mut self, fee: impl Into<U256>) -> Self {
        self.max_fee_per_gas = Some(fee.into());
        self
    }

    /// Set max priority fee per gas (for EIP-1559 transactions)
    pub fn max_priority_fee_per_gas(mut self, fee: impl Into<U256>) -> Self {
        self.max_priority_fee_per_gas = Some(fee.into());
        self
    }

    /// Set the recipient address
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the value to transfer (in wei)
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the input data
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Build a legacy transaction (unsigned)
    pub fn build_legacy(&self) -> Result<LegacyTx, SdkError> {
        let nonce = self.nonce.ok_or(SdkError::MissingField("nonce".to_string()))?;
        let gas_limit = self.gas_limit.ok_or(SdkError::MissingField("gas_limit".to_string()))?;
        let gas_price = self.gas_price.ok_or(SdkError::MissingField("gas_price".to_string()))?;

        Ok(LegacyTx {
            nonce,
            gas_price,
            gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
        })
    }

    /// Build an EIP-1559 transaction (unsigned)
    pub fn build_eip1559(&self) -> Result<Eip1559Tx, SdkError> {
        let nonce = self.nonce.ok_or(SdkError::MissingField("nonce".to_string()))?;
        let gas_limit = self.gas_limit.ok_or(SdkError::MissingField("gas_limit".to_string()))?;
        let max_fee = self
            .max_fee_per_gas
            .ok_or(SdkError::MissingField("max_fee_per_gas".to_string()))?;
        let max_priority = self
            .max_priority_fee_per_gas
            .ok_or(SdkError::MissingField("max_priority_fee_per_gas".to_string()))?;
        if max_priority > max_fee {
            return Err(SdkError::TxBuild(
                "max_priority_fee_per_gas exceeds max_fee_per_gas".to_string(),
            ));
        }

        Ok(Eip1559Tx {
            chain_id: self.chain_id,
            nonce,
            max_priority_fee_per_gas: max_priority,
            max_fee_per_gas: max_fee,
            gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
        })
    }

    fn check_chain_id(&self) -> Result<(), SdkError> {
        if self.chain_id == 0 {
            return Err(SdkError::InvalidChainId(
                "Chain ID cannot be 0 - replay protection requires a valid chain ID".to_string(),
            ));
        }
        Ok(())
    }

    /// Sign and encode a legacy (EIP-155) transaction
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (nonce, gas_limit, gas_price)
    /// - Chain ID is 0
    pub fn sign_legacy(&self, wallet: &Wallet) -> Result<SignedTx, SdkError> {
        self.check_chain_id()?;
        let tx = self.build_legacy()?;
        let signature = wallet.sign_hash(&tx.signing_hash(self.chain_id))?;
        let v = u64::from(signature.recovery_id()) + self.chain_id * 2 + 35;

        let mut s = RlpStream::new_list(9);
        tx.append_body(&mut s);
        s.append(&v);
        s.append(&scalar(&signature.r));
        s.append(&scalar(&signature.s));

        Ok(SignedTx::new(s.out().to_vec(), v, signature.r, signature.s))
    }

    /// Sign and encode an EIP-1559 transaction
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (nonce, gas_limit, max fees)
    /// - Chain ID is 0
    pub fn sign_eip1559(&self, wallet: &Wallet) -> Result<SignedTx, SdkError> {
        self.check_chain_id()?;
        let tx = self.build_eip1559()?;
        let signature = wallet.sign_hash(&tx.signing_hash())?;
        let parity = signature.recovery_id();

        let mut s = RlpStream::new_list(12);
        tx.append_body(&mut s);
        s.append(&parity);
        s.append(&scalar(&signature.r));
        s.append(&scalar(&signature.s));

        Ok(SignedTx::new(
            typed_envelope(&s.out()),
            u64::from(parity),
            signature.r,
            signature.s,
        ))
    }
}

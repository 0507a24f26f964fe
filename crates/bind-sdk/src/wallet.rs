//! Local signing identity used by [`WalletSubmitter`](crate::WalletSubmitter)

use std::str::FromStr;

use bind_crypto::{public_key_to_address, sign, PrivateKey, PublicKey, Signature};
use bind_primitives::{Address, H256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::tx_builder::{SignedTx, TxBuilder};
use crate::types::TransactionRequest;
use crate::SdkError;

/// Transaction envelope a [`Wallet`] signs into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxType {
    /// EIP-155 replay-protected legacy transaction
    #[default]
    Legacy,
    /// EIP-1559 dynamic fee transaction (type 2)
    Eip1559,
}

/// A secp256k1 key and the account it controls.
///
/// Not `Clone`: share it behind an `Arc`, as `WalletSubmitter` does.
pub struct Wallet {
    key: PrivateKey,
    address: Address,
}

impl Wallet {
    fn from_key(key: PrivateKey) -> Self {
        let address = public_key_to_address(key.verifying_key());
        Self { key, address }
    }

    /// Fresh key from the OS random source
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut OsRng))
    }

    /// Key from its 32 raw bytes. Zero and out-of-range scalars are rejected.
    pub fn from_secret(secret: &[u8]) -> Result<Self, SdkError> {
        if secret.len() != 32 {
            return Err(SdkError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                secret.len()
            )));
        }
        let key = SigningKey::from_slice(secret)
            .map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    /// Key from hex, `0x` prefix optional
    pub fn from_hex(hex: &str) -> Result<Self, SdkError> {
        let digits = hex.strip_prefix("0x").unwrap_or(hex);
        let secret = Zeroizing::new(hex::decode(digits)?);
        Self::from_secret(&secret)
    }

    /// Account the key controls
    pub fn address(&self) -> Address {
        self.address
    }

    /// Verifying half of the key
    pub fn public_key(&self) -> &PublicKey {
        self.key.verifying_key()
    }

    /// Sign a 32-byte digest. `v` is the recovery parity (0 or 1).
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, SdkError> {
        sign(hash, &self.key).map_err(|e| SdkError::SigningFailed(e.to_string()))
    }

    /// Sign a fully populated request for `chain_id`.
    ///
    /// The request's `from`, when set, must be this wallet.
    pub fn sign_request(
        &self,
        chain_id: u64,
        request: &TransactionRequest,
        tx_type: TxType,
    ) -> Result<SignedTx, SdkError> {
        self.check_sender(request.from)?;
        let builder = TxBuilder::from_request(chain_id, request);
        match tx_type {
            TxType::Legacy => builder.sign_legacy(self),
            TxType::Eip1559 => builder.sign_eip1559(self),
        }
    }

    /// The sender a request signed by this wallet will have
    pub(crate) fn check_sender(&self, from: Option<Address>) -> Result<Address, SdkError> {
        match from {
            Some(from) if from != self.address => Err(SdkError::TxBuild(format!(
                "transaction is from {} but the wallet is {}",
                from, self.address
            ))),
            _ => Ok(self.address),
        }
    }
}

impl FromStr for Wallet {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bind_primitives::U256;

    const DEV_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn request(from: Option<Address>) -> TransactionRequest {
        TransactionRequest {
            from,
            to: Some(Address::from_bytes([0x02; 20])),
            gas: Some(100_000),
            gas_price: Some(U256::from(1_000_000_000u64)),
            max_fee_per_gas: Some(U256::from(2_000_000_000u64)),
            max_priority_fee_per_gas: Some(U256::from(1_000_000_000u64)),
            nonce: Some(4),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_secret_length() {
        assert!(matches!(
            Wallet::from_secret(&[0x11; 31]),
            Err(SdkError::InvalidPrivateKey(msg)) if msg.contains("31")
        ));
        assert!(Wallet::from_secret(&[0x11; 32]).is_ok());
    }

    #[test]
    fn test_parse_matches_from_hex() {
        let parsed: Wallet = DEV_KEY.parse().unwrap();
        assert_eq!(parsed.address(), Wallet::from_hex(DEV_KEY).unwrap().address());
        assert_eq!(parsed.address().to_hex(), "0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
    }

    #[test]
    fn test_sign_request_picks_envelope() {
        let wallet = Wallet::from_hex(DEV_KEY).unwrap();
        let legacy = wallet.sign_request(5, &request(None), TxType::Legacy).unwrap();
        let typed = wallet.sign_request(5, &request(None), TxType::Eip1559).unwrap();

        assert!(legacy.raw[0] >= 0xc0);
        assert_eq!(typed.raw[0], 0x02);
        assert!(legacy.v == 45 || legacy.v == 46);
        assert!(typed.v <= 1);
    }

    #[test]
    fn test_sign_request_rejects_foreign_sender() {
        let wallet = Wallet::from_hex(DEV_KEY).unwrap();
        let own = wallet.sign_request(1, &request(Some(wallet.address())), TxType::Legacy);
        assert!(own.is_ok());

        let other = request(Some(Address::from_bytes([0x99; 20])));
        assert!(matches!(
            wallet.sign_request(1, &other, TxType::Legacy),
            Err(SdkError::TxBuild(_))
        ));
    }
}

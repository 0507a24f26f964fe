//! Bound contract: typed calls, transactions and events against one address

use std::marker::PhantomData;
use std::sync::Arc;

use bind_primitives::{Address, U256};
use bytes::Bytes;
use serde_json::Value;
use tracing::trace;

use crate::abi::{Abi, ContractMetadata, ContractRevert, Detokenize, Function, Token, Tokenize};
use crate::client::ChainClient;
use crate::event::{decode_record, EthEvent, EventQuery, EventRecord};
use crate::submitter::{NodeSubmitter, TransactOpts, TxSubmitter};
use crate::types::{parse_hex_bytes, BlockId, CallRequest, Log, PendingTransaction};
use crate::SdkError;

/// Options for read-only calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOpts {
    /// Caller address seen by the contract
    pub from: Option<Address>,
    /// Block to execute against
    pub block: BlockId,
}

impl CallOpts {
    /// Latest block, no sender
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the caller
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the block
    pub fn block(mut self, block: impl Into<BlockId>) -> Self {
        self.block = block.into();
        self
    }
}

/// A log decoded against whichever ABI event matches its topic0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// Event name
    pub event: String,
    /// Arguments in declaration order
    pub tokens: Vec<Token>,
    /// Source log
    pub raw: Log,
}

/// A contract at a known address, bound to a client.
///
/// Call and transact defaults live on the binding; `with_*` returns a
/// reconfigured copy, so one binding can serve several senders.
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    abi: Arc<Abi>,
    client: ChainClient,
    call_opts: CallOpts,
    transact_opts: TransactOpts,
    submitter: Arc<dyn TxSubmitter>,
}

impl BoundContract {
    /// Bind `metadata` at `address`
    pub fn new(address: Address, metadata: &ContractMetadata, client: ChainClient) -> Self {
        Self::from_abi(address, metadata.abi.clone(), client)
    }

    /// Bind a bare ABI at `address`
    pub fn from_abi(address: Address, abi: Arc<Abi>, client: ChainClient) -> Self {
        Self {
            address,
            abi,
            client,
            call_opts: CallOpts::default(),
            transact_opts: TransactOpts::default(),
            submitter: Arc::new(NodeSubmitter),
        }
    }

    /// Contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Parsed ABI
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Underlying client
    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    /// Default call options
    pub fn call_opts(&self) -> &CallOpts {
        &self.call_opts
    }

    /// Default transaction options
    pub fn transact_opts(&self) -> &TransactOpts {
        &self.transact_opts
    }

    /// Copy with different call defaults
    pub fn with_call_opts(&self, opts: CallOpts) -> Self {
        Self {
            call_opts: opts,
            ..self.clone()
        }
    }

    /// Copy with different transaction defaults
    pub fn with_transact_opts(&self, opts: TransactOpts) -> Self {
        Self {
            transact_opts: opts,
            ..self.clone()
        }
    }

    /// Copy that submits through `submitter`
    pub fn with_submitter(&self, submitter: impl TxSubmitter + 'static) -> Self {
        Self {
            submitter: Arc::new(submitter),
            ..self.clone()
        }
    }

    // ==================== Calls ====================

    /// Prepare a call to `name`. Arguments are encoded here, so arity and
    /// type errors surface before any request is made.
    pub fn method<A: Tokenize, R: Detokenize>(
        &self,
        name: &str,
        args: A,
    ) -> Result<MethodCall<R>, SdkError> {
        let function = self.abi.resolve_method(name)?.clone();
        self.prepare(function, args)
    }

    /// Like [`method`](Self::method) for one overload, picked by its
    /// canonical signature
    pub fn method_with_signature<A: Tokenize, R: Detokenize>(
        &self,
        name: &str,
        signature: &str,
        args: A,
    ) -> Result<MethodCall<R>, SdkError> {
        let function = self.abi.resolve_overload(name, signature)?.clone();
        self.prepare(function, args)
    }

    fn prepare<A: Tokenize, R: Detokenize>(
        &self,
        function: Function,
        args: A,
    ) -> Result<MethodCall<R>, SdkError> {
        let data = function.encode_input(&args.into_tokens())?;
        Ok(MethodCall {
            contract: self.clone(),
            function,
            data,
            call_opts: self.call_opts,
            transact_opts: self.transact_opts.clone(),
            _marker: PhantomData,
        })
    }

    /// Untyped read-only call
    pub async fn call_raw(
        &self,
        name: &str,
        args: &[Token],
        opts: &CallOpts,
    ) -> Result<Vec<Token>, SdkError> {
        let function = self.abi.resolve_method(name)?;
        let data = function.encode_input(args)?;
        let output = self.call_bytes(data, opts, None).await?;
        function.decode_output(&output)
    }

    /// Untyped mutating call
    pub async fn transact_raw(
        &self,
        name: &str,
        args: &[Token],
        opts: &TransactOpts,
    ) -> Result<PendingTransaction, SdkError> {
        let data = self.abi.resolve_method(name)?.encode_input(args)?;
        self.submit(Some(self.address), data, opts).await
    }

    /// Send value with empty calldata, reaching `receive` or `fallback`
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTransaction, SdkError> {
        self.submit(Some(self.address), Bytes::new(), opts).await
    }

    /// Send raw `calldata` as-is, reaching `fallback` when no function
    /// matches its selector
    pub async fn fallback(
        &self,
        calldata: impl Into<Bytes>,
        opts: &TransactOpts,
    ) -> Result<PendingTransaction, SdkError> {
        self.submit(Some(self.address), calldata.into(), opts).await
    }

    /// Submit a contract creation with `metadata`'s bytecode and the
    /// encoded constructor arguments. The deployed address is in the
    /// receipt's `contract_address`.
    pub async fn deploy(
        client: &ChainClient,
        submitter: &dyn TxSubmitter,
        opts: &TransactOpts,
        metadata: &ContractMetadata,
        args: &[Token],
    ) -> Result<PendingTransaction, SdkError> {
        let data = match metadata.abi.constructor() {
            Some(constructor) => constructor.encode(&metadata.bytecode, args)?,
            None if args.is_empty() && !metadata.bytecode.is_empty() => metadata.bytecode.clone(),
            None if args.is_empty() => {
                return Err(SdkError::Construction("No bytecode to deploy".to_string()))
            }
            None => {
                return Err(SdkError::AbiEncode(format!(
                    "No constructor, got {} arguments",
                    args.len()
                )))
            }
        };
        submitter.submit(client, opts.request(None, data)).await
    }

    async fn call_bytes(
        &self,
        data: Bytes,
        opts: &CallOpts,
        value: Option<U256>,
    ) -> Result<Bytes, SdkError> {
        let request = CallRequest {
            from: opts.from,
            to: Some(self.address),
            value,
            data: Some(data),
            ..Default::default()
        };
        trace!(to = %self.address, block = %opts.block, "eth_call");
        self.client.call(&request, opts.block).await
    }

    async fn submit(
        &self,
        to: Option<Address>,
        data: Bytes,
        opts: &TransactOpts,
    ) -> Result<PendingTransaction, SdkError> {
        let mut tx = opts.request(to, data);
        if tx.from.is_none() {
            tx.from = self.submitter.sender();
        }
        self.submitter.submit(&self.client, tx).await
    }

    // ==================== Events ====================

    /// Query builder for event `E`
    pub fn events<E: EthEvent>(&self) -> Result<EventQuery<E>, SdkError> {
        let event = self.abi.resolve_event(E::NAME)?.clone();
        Ok(EventQuery::new(self.client.clone(), self.address, Arc::new(event)))
    }

    /// Decode `log` as event `E`
    pub fn parse_log<E: EthEvent>(&self, log: &Log) -> Result<EventRecord<E>, SdkError> {
        let event = self.abi.resolve_event(E::NAME)?;
        decode_record(event, log.clone())
    }

    /// Decode `log` against the event its topic0 names
    pub fn parse_any_log(&self, log: &Log) -> Result<DecodedLog, SdkError> {
        let topic = log
            .topics
            .first()
            .ok_or_else(|| SdkError::AbiDecode("Log has no topics".to_string()))?;
        let event = self
            .abi
            .event_by_topic(topic)
            .ok_or_else(|| SdkError::unknown_event(topic.to_hex()))?;
        Ok(DecodedLog {
            event: event.name.clone(),
            tokens: event.decode_log(log)?,
            raw: log.clone(),
        })
    }

    // ==================== Reverts ====================

    /// Decode the revert carried by an RPC error, if any. The error itself
    /// is left untouched for the caller to propagate.
    pub fn decode_revert(&self, error: &SdkError) -> Option<ContractRevert> {
        let SdkError::Rpc { data: Some(data), .. } = error else {
            return None;
        };
        let bytes = revert_bytes(data)?;
        self.abi.decode_revert(&bytes)
    }
}

/// Nodes put revert data either directly in `data` or one level down
fn revert_bytes(data: &Value) -> Option<Bytes> {
    match data {
        Value::String(s) => parse_hex_bytes(s).ok(),
        Value::Object(map) => map.get("data").and_then(revert_bytes),
        _ => None,
    }
}

impl std::fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("call_opts", &self.call_opts)
            .field("transact_opts", &self.transact_opts)
            .finish_non_exhaustive()
    }
}

/// A prepared, already-encoded call.
///
/// Starts from the binding's defaults; the setters override them for this
/// call only.
pub struct MethodCall<R> {
    contract: BoundContract,
    function: Function,
    data: Bytes,
    call_opts: CallOpts,
    transact_opts: TransactOpts,
    _marker: PhantomData<fn() -> R>,
}

impl<R> MethodCall<R> {
    /// Block to call against
    pub fn block(mut self, block: impl Into<BlockId>) -> Self {
        self.call_opts.block = block.into();
        self
    }

    /// Sender, for both calls and transactions
    pub fn from(mut self, from: Address) -> Self {
        self.call_opts.from = Some(from);
        self.transact_opts.from = Some(from);
        self
    }

    /// Value to send
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.transact_opts.value = value.into();
        self
    }

    /// Gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.transact_opts.gas_limit = Some(gas_limit);
        self
    }

    /// Legacy gas price
    pub fn gas_price(mut self, gas_price: impl Into<U256>) -> Self {
        self.transact_opts.gas_price = Some(gas_price.into());
        self
    }

    /// Nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.transact_opts.nonce = Some(nonce);
        self
    }

    /// Encoded calldata
    pub fn calldata(&self) -> &Bytes {
        &self.data
    }

    /// Resolved function
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Estimate the gas a transaction would use
    pub async fn estimate_gas(&self) -> Result<u64, SdkError> {
        let request = self
            .transact_opts
            .request(Some(self.contract.address), self.data.clone())
            .to_call_request();
        self.contract.client.estimate_gas(&request).await
    }

    /// Send as a transaction. Returns once the node accepts it.
    pub async fn send(&self) -> Result<PendingTransaction, SdkError> {
        self.contract
            .submit(Some(self.contract.address), self.data.clone(), &self.transact_opts)
            .await
    }
}

impl<R: Detokenize> MethodCall<R> {
    /// Execute read-only and decode the outputs into `R`
    pub async fn call(&self) -> Result<R, SdkError> {
        let value = (!self.transact_opts.value.is_zero()).then_some(self.transact_opts.value);
        let output = self
            .contract
            .call_bytes(self.data.clone(), &self.call_opts, value)
            .await?;
        R::from_tokens(self.function.decode_output(&output)?)
    }
}

impl<R> std::fmt::Debug for MethodCall<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodCall")
            .field("function", &self.function.signature())
            .field("data", &self.data)
            .field("call_opts", &self.call_opts)
            .field("transact_opts", &self.transact_opts)
            .finish()
    }
}

//! Typed events and event queries

use std::marker::PhantomData;
use std::sync::Arc;

use bind_primitives::{Address, H256};

use crate::abi::{Event, Token, Tokenizable};
use crate::client::ChainClient;
use crate::filter::{Filter, TOPIC_SLOTS};
use crate::iterator::LogIterator;
use crate::subscription::{EventSubscription, LogFeed};
use crate::types::{BlockId, Log};
use crate::SdkError;

/// A Rust type for one ABI event.
///
/// `from_tokens` receives every argument in declaration order, indexed or
/// not.
pub trait EthEvent: Sized + Send + 'static {
    /// Event name as declared in the ABI
    const NAME: &'static str;

    /// Build from decoded arguments
    fn from_tokens(tokens: Vec<Token>) -> Result<Self, SdkError>;
}

/// A decoded event with the log it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord<E> {
    /// Decoded event
    pub event: E,
    /// Source log
    pub raw: Log,
}

impl<E> EventRecord<E> {
    /// Block the log was emitted in
    pub fn block_number(&self) -> Option<u64> {
        self.raw.block_number
    }

    /// Emitting transaction
    pub fn transaction_hash(&self) -> Option<H256> {
        self.raw.transaction_hash
    }

    /// Position of the log in its block
    pub fn log_index(&self) -> Option<u64> {
        self.raw.log_index
    }
}

pub(crate) fn decode_record<E: EthEvent>(
    event: &Event,
    log: Log,
) -> Result<EventRecord<E>, SdkError> {
    let tokens = event.decode_log(&log)?;
    Ok(EventRecord {
        event: E::from_tokens(tokens)?,
        raw: log,
    })
}

/// Builder for historical and live queries over one event.
///
/// Indexed arguments are addressed by their position among the indexed
/// arguments. Values for one argument are ORed; arguments left unset match
/// anything.
pub struct EventQuery<E> {
    client: ChainClient,
    address: Address,
    event: Arc<Event>,
    rules: Vec<Vec<Token>>,
    from_block: Option<BlockId>,
    to_block: Option<BlockId>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for EventQuery<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            address: self.address,
            event: self.event.clone(),
            rules: self.rules.clone(),
            from_block: self.from_block,
            to_block: self.to_block,
            _marker: PhantomData,
        }
    }
}

impl<E: EthEvent> EventQuery<E> {
    pub(crate) fn new(client: ChainClient, address: Address, event: Arc<Event>) -> Self {
        Self {
            client,
            address,
            event,
            rules: Vec::new(),
            from_block: None,
            to_block: None,
            _marker: PhantomData,
        }
    }

    /// Allowed values for the `index`-th indexed argument
    pub fn topic(mut self, index: usize, values: Vec<Token>) -> Self {
        if self.rules.len() <= index {
            self.rules.resize(index + 1, Vec::new());
        }
        self.rules[index] = values;
        self
    }

    /// Typed form of [`topic`](Self::topic)
    pub fn topic_values<T: Tokenizable>(self, index: usize, values: Vec<T>) -> Self {
        self.topic(index, values.into_iter().map(Tokenizable::into_token).collect())
    }

    /// First block, inclusive
    pub fn from_block(mut self, block: impl Into<BlockId>) -> Self {
        self.from_block = Some(block.into());
        self
    }

    /// Last block, inclusive
    pub fn to_block(mut self, block: impl Into<BlockId>) -> Self {
        self.to_block = Some(block.into());
        self
    }

    /// The event being queried
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The node filter this query sends. Fails with `AbiEncode` when a
    /// topic value does not fit its argument type.
    pub fn filter(&self) -> Result<Filter, SdkError> {
        let rules = self.event.encode_topic_rules(&self.rules)?;
        let offset = usize::from(!self.event.anonymous);
        if rules.len() + offset > TOPIC_SLOTS {
            return Err(SdkError::AbiEncode(format!(
                "{} uses more than {} topics",
                self.event.signature(),
                TOPIC_SLOTS
            )));
        }

        let mut filter = Filter::new().address(self.address);
        if !self.event.anonymous {
            filter.topics[0] = Some(vec![self.event.topic()]);
        }
        for (i, rule) in rules.into_iter().enumerate() {
            filter.topics[i + offset] = rule;
        }
        filter.from_block = self.from_block;
        filter.to_block = self.to_block;
        Ok(filter)
    }

    /// Fetch matching past logs. Each call queries the node again.
    pub async fn query(&self) -> Result<LogIterator<E>, SdkError> {
        let filter = self.filter()?;
        let logs = self.client.get_logs(&filter).await?;
        Ok(LogIterator::new(self.event.clone(), logs, None))
    }

    /// Stream matching logs as they arrive
    pub async fn subscribe(&self) -> Result<EventSubscription<E>, SdkError> {
        let filter = self.filter()?;
        EventSubscription::open(self.client.clone(), self.event.clone(), filter).await
    }

    /// Past logs first, then the live feed. The feed is installed before
    /// the historical fetch, so a log landing in between may appear twice;
    /// no deduplication is done.
    pub async fn query_then_subscribe(&self) -> Result<LogIterator<E>, SdkError> {
        let filter = self.filter()?;
        let live = Filter {
            from_block: None,
            to_block: None,
            ..filter.clone()
        };
        let feed = LogFeed::open(self.client.clone(), live).await?;
        let logs = self.client.get_logs(&filter).await?;
        Ok(LogIterator::new(self.event.clone(), logs, Some(feed)))
    }
}

impl<E> std::fmt::Debug for EventQuery<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQuery")
            .field("address", &self.address)
            .field("event", &self.event.name)
            .field("rules", &self.rules)
            .field("from_block", &self.from_block)
            .field("to_block", &self.to_block)
            .finish()
    }
}

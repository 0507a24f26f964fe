//! Pull-based cursor over decoded events

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::abi::Event;
use crate::event::{decode_record, EthEvent, EventRecord};
use crate::subscription::{FeedItem, LogFeed};
use crate::types::Log;
use crate::SdkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Draining logs fetched up front
    Active,
    /// Reading from an open live feed
    Live,
    /// Terminal
    Closed,
}

/// Cursor over the logs of one event.
///
/// ```text
/// Active --buffer empty, feed open--> Live
/// Active --buffer empty, no feed----> Closed
/// Live ----feed ended---------------> Closed
/// any -----decode error / feed error / release--> Closed
/// ```
///
/// Once closed, [`advance`](Self::advance) returns `false` forever and
/// [`error`](Self::error) keeps the cause, if any. The last successfully
/// decoded record stays readable through [`current`](Self::current).
pub struct LogIterator<E> {
    event: Arc<Event>,
    buffered: VecDeque<Log>,
    feed: Option<LogFeed>,
    state: State,
    current: Option<EventRecord<E>>,
    error: Option<SdkError>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EthEvent> LogIterator<E> {
    pub(crate) fn new(event: Arc<Event>, logs: Vec<Log>, feed: Option<LogFeed>) -> Self {
        Self {
            event,
            buffered: logs.into(),
            feed,
            state: State::Active,
            current: None,
            error: None,
            _marker: PhantomData,
        }
    }

    /// Move to the next record. Returns `false` once the iterator is
    /// exhausted, failed or released.
    pub async fn advance(&mut self) -> bool {
        loop {
            match self.state {
                State::Closed => return false,
                State::Active => match self.buffered.pop_front() {
                    Some(log) => return self.accept(log),
                    None if self.feed.is_some() => self.state = State::Live,
                    None => self.close(),
                },
                State::Live => {
                    let item = match self.feed.as_mut() {
                        Some(feed) => feed.recv().await,
                        None => None,
                    };
                    match item {
                        Some(FeedItem::Log(log)) => return self.accept(log),
                        Some(FeedItem::Error(e)) => {
                            self.fail(e);
                            return false;
                        }
                        None => self.close(),
                    }
                }
            }
        }
    }

    fn accept(&mut self, log: Log) -> bool {
        match decode_record(&self.event, log) {
            Ok(record) => {
                self.current = Some(record);
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn fail(&mut self, error: SdkError) {
        debug!(event = %self.event.name, error = %error, "log iterator failed");
        self.error = Some(error);
        self.close();
    }

    fn close(&mut self) {
        self.state = State::Closed;
        self.buffered.clear();
        if let Some(mut feed) = self.feed.take() {
            feed.close();
        }
    }

    /// The record produced by the last successful `advance`
    pub fn current(&self) -> Option<&EventRecord<E>> {
        self.current.as_ref()
    }

    /// Take ownership of the current record
    pub fn take_current(&mut self) -> Option<EventRecord<E>> {
        self.current.take()
    }

    /// Why the iterator closed, if it closed on an error
    pub fn error(&self) -> Option<&SdkError> {
        self.error.as_ref()
    }

    /// Whether the iterator has reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Stop iterating. Releases the live feed and discards anything not
    /// yet delivered.
    pub fn release(&mut self) {
        self.close();
    }

    /// Drain every remaining record, or the error that closed the iterator
    pub async fn collect_all(mut self) -> Result<Vec<EventRecord<E>>, SdkError> {
        let mut records = Vec::new();
        while self.advance().await {
            if let Some(record) = self.current.take() {
                records.push(record);
            }
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }
}

impl<E> std::fmt::Debug for LogIterator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogIterator")
            .field("event", &self.event.name)
            .field("state", &self.state)
            .field("buffered", &self.buffered.len())
            .field("error", &self.error)
            .finish()
    }
}

//! Live log feed and typed event subscriptions

use std::future::poll_fn;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::abi::Event;
use crate::client::{ChainClient, FilterId};
use crate::event::{decode_record, EthEvent, EventRecord};
use crate::filter::Filter;
use crate::types::Log;
use crate::SdkError;

/// What the poller hands to the consumer
#[derive(Debug)]
pub(crate) enum FeedItem {
    Log(Log),
    Error(SdkError),
}

/// Consumer end of a node filter polled by a background task.
///
/// The task owns the node filter and uninstalls it when it exits: on
/// [`LogFeed::close`], when this handle is dropped, or after forwarding an
/// upstream error. Items sent before the task exits stay readable in order.
/// If the task dies instead, the consumer gets [`SdkError::FeedAborted`].
pub(crate) struct LogFeed {
    rx: mpsc::Receiver<FeedItem>,
    stop: Option<oneshot::Sender<()>>,
}

impl LogFeed {
    /// Install the node filter, then start polling it
    pub(crate) async fn open(client: ChainClient, filter: Filter) -> Result<Self, SdkError> {
        let id = client.new_filter(&filter).await?;
        let (tx, rx) = mpsc::channel(client.subscription_buffer());
        let (stop_tx, stop_rx) = oneshot::channel();
        let poller = tokio::spawn(poll_filter(client.clone(), id.clone(), tx.clone(), stop_rx));
        tokio::spawn(supervise(client, id, tx, poller));
        Ok(Self {
            rx,
            stop: Some(stop_tx),
        })
    }

    pub(crate) async fn recv(&mut self) -> Option<FeedItem> {
        self.rx.recv().await
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<FeedItem>> {
        self.rx.poll_recv(cx)
    }

    /// Stop the poller; undelivered items are abandoned
    pub(crate) fn close(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.rx.close();
    }
}

impl Drop for LogFeed {
    fn drop(&mut self) {
        self.close();
    }
}

async fn poll_filter(
    client: ChainClient,
    id: FilterId,
    tx: mpsc::Sender<FeedItem>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(client.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = 'poll: loop {
        tokio::select! {
            _ = &mut stop => break 'poll "released",
            _ = ticker.tick() => {
                match client.get_filter_changes(&id).await {
                    Ok(logs) => {
                        for log in logs {
                            if tx.send(FeedItem::Log(log)).await.is_err() {
                                break 'poll "receiver closed";
                            }
                        }
                    }
                    Err(e) => {
                        warn!(filter_id = %id.0, error = %e, "log feed failed");
                        let _ = tx.send(FeedItem::Error(e)).await;
                        break 'poll "upstream error";
                    }
                }
            }
        }
    };

    debug!(filter_id = %id.0, reason, "log feed stopped");
    if let Err(e) = client.uninstall_filter(&id).await {
        warn!(filter_id = %id.0, error = %e, "failed to uninstall filter");
    }
}

/// Forward a poller failure and clean up after it
async fn supervise(
    client: ChainClient,
    id: FilterId,
    tx: mpsc::Sender<FeedItem>,
    poller: JoinHandle<()>,
) {
    let Err(e) = poller.await else {
        return;
    };

    warn!(filter_id = %id.0, error = %e, "log feed task aborted");
    let _ = tx.send(FeedItem::Error(SdkError::FeedAborted(e.to_string()))).await;
    drop(tx);
    if let Err(e) = client.uninstall_filter(&id).await {
        warn!(filter_id = %id.0, error = %e, "failed to uninstall filter");
    }
}

/// One step of a live subscription
#[derive(Debug)]
pub enum SubscriptionItem<E> {
    /// A decoded event
    Record(EventRecord<E>),
    /// The feed or a record failed; the subscription is now closed
    Error(SdkError),
    /// No further items
    Done,
}

/// Live stream of typed events.
///
/// Yields records until [`unsubscribe`](Self::unsubscribe) is called, the
/// value is dropped, or an error occurs. An error is delivered once and is
/// followed by [`SubscriptionItem::Done`].
pub struct EventSubscription<E> {
    event: Arc<Event>,
    feed: Option<LogFeed>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EthEvent> EventSubscription<E> {
    pub(crate) async fn open(
        client: ChainClient,
        event: Arc<Event>,
        filter: Filter,
    ) -> Result<Self, SdkError> {
        let feed = LogFeed::open(client, filter).await?;
        Ok(Self {
            event,
            feed: Some(feed),
            _marker: PhantomData,
        })
    }

    /// Wait for the next item
    pub async fn recv(&mut self) -> SubscriptionItem<E> {
        poll_fn(|cx| self.poll_item(cx)).await
    }

    /// Stop delivery and release the node filter. Buffered records are
    /// discarded.
    pub fn unsubscribe(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.close();
        }
    }

    /// Still delivering
    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<SubscriptionItem<E>> {
        let Some(feed) = self.feed.as_mut() else {
            return Poll::Ready(SubscriptionItem::Done);
        };

        let item = match feed.poll_recv(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => {
                self.unsubscribe();
                return Poll::Ready(SubscriptionItem::Done);
            }
            Poll::Ready(Some(FeedItem::Log(log))) => match decode_record(&self.event, log) {
                Ok(record) => return Poll::Ready(SubscriptionItem::Record(record)),
                Err(e) => SubscriptionItem::Error(e),
            },
            Poll::Ready(Some(FeedItem::Error(e))) => SubscriptionItem::Error(e),
        };

        self.unsubscribe();
        Poll::Ready(item)
    }
}

impl<E: EthEvent> Stream for EventSubscription<E> {
    type Item = Result<EventRecord<E>, SdkError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Every field is Unpin
        let this = self.get_mut();
        this.poll_item(cx).map(|item| match item {
            SubscriptionItem::Record(record) => Some(Ok(record)),
            SubscriptionItem::Error(e) => Some(Err(e)),
            SubscriptionItem::Done => None,
        })
    }
}

impl<E> std::fmt::Debug for EventSubscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("event", &self.event.name)
            .field("active", &self.feed.is_some())
            .finish()
    }
}

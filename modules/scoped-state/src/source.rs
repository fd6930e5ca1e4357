//! Event sources the watcher consumes from.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::SendError;
use crate::event::ScopedEvent;
use crate::family::Family;

/// An ordered sequence of events, consumed by a single subscriber.
///
/// `next_event` is awaited inside a cancellable region, so implementations must
/// not lose an event when the returned future is dropped before completion.
#[async_trait]
pub trait EventSource<SC: ?Sized + Family, ST: ?Sized + Family>: Send {
    /// The next event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Option<ScopedEvent<SC, ST>>;
}

/// Bounded channel pair. Events sent while the watcher is paused wait in the
/// buffer until it resumes.
pub fn event_channel<SC, ST>(capacity: usize) -> (EventSender<SC, ST>, ChannelSource<SC, ST>)
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, ChannelSource { rx })
}

/// Producer half of [`event_channel`].
pub struct EventSender<SC: ?Sized, ST: ?Sized> {
    tx: mpsc::Sender<ScopedEvent<SC, ST>>,
}

impl<SC, ST> EventSender<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    /// Wait for buffer space, then enqueue `event`.
    pub async fn send(&self, event: ScopedEvent<SC, ST>) -> Result<(), SendError> {
        self.tx.send(event).await.map_err(|_| SendError::Closed)
    }

    pub fn try_send(&self, event: ScopedEvent<SC, ST>) -> Result<(), SendError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<SC: ?Sized, ST: ?Sized> Clone for EventSender<SC, ST> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer half of [`event_channel`]. Exhausted once every sender is dropped.
pub struct ChannelSource<SC: ?Sized, ST: ?Sized> {
    rx: mpsc::Receiver<ScopedEvent<SC, ST>>,
}

#[async_trait]
impl<SC, ST> EventSource<SC, ST> for ChannelSource<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    async fn next_event(&mut self) -> Option<ScopedEvent<SC, ST>> {
        self.rx.recv().await
    }
}

/// Adapts any [`Stream`] of events into an [`EventSource`].
pub struct StreamSource<S> {
    stream: S,
}

impl<S> StreamSource<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<SC, ST, S> EventSource<SC, ST> for StreamSource<S>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
    S: Stream<Item = ScopedEvent<SC, ST>> + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<ScopedEvent<SC, ST>> {
        self.stream.next().await
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::family::BaseState;

    trait Room: Any + Send {}
    struct Lobby;
    impl Room for Lobby {}
    crate::family!(dyn Room { Lobby });

    struct Joined;
    impl BaseState for Joined {}

    type Event = ScopedEvent<dyn Room>;

    #[tokio::test]
    async fn channel_delivers_in_order_then_closes() {
        let (tx, mut source) = event_channel::<dyn Room, dyn BaseState>(4);
        tx.send(Event::enter::<Lobby>()).await.unwrap();
        tx.try_send(Event::state(Joined)).unwrap();
        drop(tx);

        assert_eq!(source.next_event().await.map(|e| e.kind()), Some("scope"));
        assert_eq!(source.next_event().await.map(|e| e.kind()), Some("state"));
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn try_send_reports_full_and_closed() {
        let (tx, source) = event_channel::<dyn Room, dyn BaseState>(1);
        tx.try_send(Event::enter::<Lobby>()).unwrap();
        assert_eq!(tx.try_send(Event::enter::<Lobby>()), Err(SendError::Full));

        drop(source);
        assert!(tx.is_closed());
        assert_eq!(tx.try_send(Event::enter::<Lobby>()), Err(SendError::Closed));
    }

    #[tokio::test]
    async fn stream_source_forwards_items() {
        let events = futures::stream::iter(vec![Event::enter::<Lobby>(), Event::state(Joined)]);
        let mut source = StreamSource::new(events);

        assert_eq!(source.next_event().await.map(|e| e.kind()), Some("scope"));
        assert_eq!(source.next_event().await.map(|e| e.kind()), Some("state"));
        assert!(source.next_event().await.is_none());
    }
}

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use synapse_store::{ListenerRegistration, SnapshotResult, SnapshotSink};
use synapse_types::error::RemoteError;
use synapse_types::events::ListenerScope;

use crate::registry::{ListenerRegistry, ListenerSlot};

/// Registers a store listener that pushes into the given sink.
pub type RegisterFn<T> = Box<
    dyn FnOnce(SnapshotSink<T>) -> Result<Box<dyn ListenerRegistration>, RemoteError> + Send,
>;

enum Phase<T> {
    /// Nothing registered yet; happens on first poll.
    Idle(RegisterFn<T>),
    Active(mpsc::UnboundedReceiver<SnapshotResult<T>>),
    Done,
}

/// Stream of full snapshots from one store listener.
///
/// The listener is registered on first poll and released exactly once: on
/// [`Subscription::cancel`], on drop, or when the store ends the feed. An
/// `Err` item does not end the stream, since the store may recover and push
/// a good snapshot later.
pub struct Subscription<T> {
    scope: ListenerScope,
    registry: ListenerRegistry,
    normalize: fn(Vec<T>) -> Vec<T>,
    phase: Phase<T>,
    slot: Option<Arc<ListenerSlot>>,
}

impl<T> Subscription<T> {
    pub fn new(
        scope: ListenerScope,
        registry: ListenerRegistry,
        normalize: fn(Vec<T>) -> Vec<T>,
        register: RegisterFn<T>,
    ) -> Self {
        Self {
            scope,
            registry,
            normalize,
            phase: Phase::Idle(register),
            slot: None,
        }
    }

    pub fn scope(&self) -> &ListenerScope {
        &self.scope
    }

    /// Whether a store listener is currently held.
    pub fn is_listening(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| !slot.is_released())
    }

    /// Stop the stream and release the listener. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.phase = Phase::Done;
        self.release();
    }

    fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            if self.registry.release(&slot) {
                debug!("subscription for {:?} cancelled", self.scope);
            }
        }
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = SnapshotResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.phase, Phase::Done) {
                Phase::Idle(register) => {
                    let (sink, rx) = SnapshotSink::channel();
                    match register(sink) {
                        Ok(registration) => {
                            this.slot = Some(this.registry.install(this.scope.clone(), registration));
                            this.phase = Phase::Active(rx);
                        }
                        Err(e) => {
                            warn!("failed to listen on {:?}: {}", this.scope, e);
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Phase::Active(mut rx) => {
                    let polled = rx.poll_recv(cx);
                    this.phase = Phase::Active(rx);
                    return match polled {
                        Poll::Ready(Some(Ok(items))) => Poll::Ready(Some(Ok((this.normalize)(items)))),
                        Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                        Poll::Ready(None) => {
                            debug!("store ended the feed for {:?}", this.scope);
                            this.cancel();
                            Poll::Ready(None)
                        }
                        Poll::Pending => Poll::Pending,
                    };
                }
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{channel, FakeChatStore};
    use futures_util::StreamExt;
    use synapse_store::ChatStore;
    use synapse_types::api::OrderBy;
    use synapse_types::models::Channel;

    fn channels_subscription(store: &Arc<FakeChatStore>, registry: &ListenerRegistry) -> Subscription<Channel> {
        let store = store.clone();
        Subscription::new(
            ListenerScope::Channels,
            registry.clone(),
            |items| items,
            Box::new(move |sink| store.listen_channels(OrderBy::CHANNELS, sink)),
        )
    }

    #[tokio::test]
    async fn registers_lazily_on_first_poll() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();
        let mut sub = channels_subscription(&store, &registry);
        assert_eq!(store.listen_calls(), 0);
        assert!(!sub.is_listening());

        assert_eq!(sub.next().await.unwrap().unwrap(), vec![]);
        assert_eq!(store.listen_calls(), 1);
        assert!(sub.is_listening());
    }

    #[tokio::test]
    async fn double_cancel_unsubscribes_once() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();
        let mut sub = channels_subscription(&store, &registry);
        sub.next().await;

        sub.cancel();
        sub.cancel();
        drop(sub);

        assert_eq!(store.unsubscribe_calls(), 1);
        assert_eq!(store.live_listeners(), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn drop_releases_listener() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();
        {
            let mut sub = channels_subscription(&store, &registry);
            sub.next().await;
            assert_eq!(store.live_listeners(), 1);
        }
        assert_eq!(store.unsubscribe_calls(), 1);
        assert_eq!(store.live_listeners(), 0);
    }

    #[tokio::test]
    async fn cancel_before_first_poll_never_registers() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();
        let mut sub = channels_subscription(&store, &registry);
        sub.cancel();

        assert!(sub.next().await.is_none());
        assert_eq!(store.listen_calls(), 0);
        assert_eq!(store.unsubscribe_calls(), 0);
    }

    #[tokio::test]
    async fn errors_do_not_end_the_stream() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();
        let mut sub = channels_subscription(&store, &registry);
        sub.next().await;

        store.push_channel_error(RemoteError::PermissionDenied("rules".into()));
        assert!(sub.next().await.unwrap().is_err());

        store.push_channels(vec![channel("c1", None)]);
        let recovered = sub.next().await.unwrap().unwrap();
        assert_eq!(recovered[0].id, "c1");
    }

    #[tokio::test]
    async fn failed_registration_yields_error_then_ends() {
        let store = FakeChatStore::new();
        store.fail_listen(true);
        let registry = ListenerRegistry::new();
        let mut sub = channels_subscription(&store, &registry);

        assert!(sub.next().await.unwrap().is_err());
        assert!(sub.next().await.is_none());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn resubscribing_same_scope_does_not_leak() {
        let store = FakeChatStore::new();
        let registry = ListenerRegistry::new();

        let mut first = channels_subscription(&store, &registry);
        first.next().await;
        let mut second = channels_subscription(&store, &registry);
        second.next().await;

        // The first listener was superseded, not duplicated.
        assert_eq!(store.live_listeners(), 1);
        assert!(!first.is_listening());

        first.cancel();
        assert_eq!(store.unsubscribe_calls(), 1);
        assert!(second.is_listening());

        drop(second);
        assert_eq!(store.unsubscribe_calls(), 2);
        assert_eq!(store.live_listeners(), 0);
    }
}

//! Two-phase watcher: declare the scope table, then attach it to a source.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::WatcherConfig;
use crate::dispatch::Resolution;
use crate::error::{DispatchError, WatchError};
use crate::event::ScopedEvent;
use crate::family::{BaseState, Family};
use crate::lifecycle::{Lifecycle, LifecycleObserver, LifecycleState};
use crate::scope::ScopeRegistry;
use crate::source::{event_channel, ChannelSource, EventSender, EventSource};

/// A built scope table waiting to be attached.
///
/// ```ignore
/// let watcher = StateWatcher::<dyn Screen>::watch(|scopes| {
///     scopes.scope::<Home, _>(|states| {
///         states.on(|loaded: Loaded| render(loaded));
///     });
/// });
/// let handle = watcher.attach(source, &lifecycle);
/// ```
pub struct StateWatcher<SC: ?Sized, ST: ?Sized = dyn BaseState> {
    registry: ScopeRegistry<SC, ST>,
    config: WatcherConfig,
}

impl<SC, ST> StateWatcher<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    pub fn watch<B>(build: B) -> Self
    where
        B: FnOnce(&mut ScopeRegistry<SC, ST>),
    {
        let mut registry = ScopeRegistry::new();
        build(&mut registry);
        Self {
            registry,
            config: WatcherConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &ScopeRegistry<SC, ST> {
        &self.registry
    }

    /// Resolve one event directly, without a source.
    pub fn dispatch_event(
        &mut self,
        event: ScopedEvent<SC, ST>,
    ) -> Result<Resolution, DispatchError> {
        self.registry.dispatch_event(event)
    }

    /// Bounded channel sized by [`WatcherConfig::buffer_capacity`].
    pub fn channel(&self) -> (EventSender<SC, ST>, ChannelSource<SC, ST>) {
        event_channel(self.config.buffer_capacity)
    }

    /// Consume `source` on a background task while `lifecycle` is active.
    ///
    /// Consumption pauses when the lifecycle drops below
    /// [`WatcherConfig::active_state`] and resumes when it comes back; pending
    /// events stay in the source meanwhile. The gate is checked before every
    /// dispatch, so no handler runs once the lifecycle is inactive or
    /// destroyed. Destroying the lifecycle tears the registry down and ends the
    /// task. The first dispatch error also ends it.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, since the task is started
    /// with [`tokio::spawn`].
    pub fn attach<Src>(self, source: Src, lifecycle: &Lifecycle) -> WatchHandle
    where
        Src: EventSource<SC, ST> + 'static,
    {
        let lifecycle = lifecycle.clone();
        let active_state = self.config.active_state;
        let destroyed = Arc::new(AtomicBool::new(false));
        lifecycle.add_observer(Arc::new(DestroySignal(destroyed.clone())));

        let mut attached = Attached {
            registry: self.registry,
            source,
            pending: None,
            gate: lifecycle.subscribe(),
            active_state,
            destroyed,
            resolved: 0,
        };

        debug!(%active_state, "Watcher attached");
        let task = tokio::spawn(async move {
            let finished = lifecycle
                .repeat_while(active_state, &mut attached, |attached| {
                    attached.consume().boxed()
                })
                .await;

            match finished {
                Some(result) => result,
                None => Ok(attached.detach()),
            }
        });

        WatchHandle { task }
    }
}

/// Raised synchronously from `Lifecycle::destroy`.
struct DestroySignal(Arc<AtomicBool>);

impl LifecycleObserver for DestroySignal {
    fn on_destroy(&self) {
        self.0.store(true, Ordering::Release);
    }
}

struct Attached<SC: ?Sized, ST: ?Sized, Src> {
    registry: ScopeRegistry<SC, ST>,
    source: Src,
    /// Taken from the source but not yet dispatched when the gate closed.
    pending: Option<ScopedEvent<SC, ST>>,
    gate: watch::Receiver<LifecycleState>,
    active_state: LifecycleState,
    destroyed: Arc<AtomicBool>,
    resolved: u64,
}

impl<SC, ST, Src> Attached<SC, ST, Src>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
    Src: EventSource<SC, ST>,
{
    async fn consume(&mut self) -> ControlFlow<Result<WatchOutcome, DispatchError>> {
        debug!(resolved = self.resolved, "Consuming events");
        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                None => match self.source.next_event().await {
                    Some(event) => event,
                    None => break,
                },
            };

            if self.is_destroyed() {
                return ControlFlow::Break(Ok(self.detach()));
            }

            let state = *self.gate.borrow();
            if !state.is_at_least(self.active_state) {
                debug!(%state, "Lifecycle inactive, holding event");
                self.pending = Some(event);
                let active_state = self.active_state;
                let reopened = self
                    .gate
                    .wait_for(|state| {
                        *state == LifecycleState::Destroyed || state.is_at_least(active_state)
                    })
                    .await
                    .is_ok();
                if !reopened {
                    return ControlFlow::Break(Ok(self.detach()));
                }
                continue;
            }

            if let Err(e) = self.registry.dispatch_event(event) {
                error!(error = %e, resolved = self.resolved, "Dispatch failed, watcher stopped");
                return ControlFlow::Break(Err(e));
            }
            self.resolved += 1;
        }

        debug!(resolved = self.resolved, "Event source closed");
        ControlFlow::Break(Ok(WatchOutcome {
            reason: StopReason::SourceClosed,
            resolved: self.resolved,
        }))
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire) || *self.gate.borrow() == LifecycleState::Destroyed
    }

    fn detach(&mut self) -> WatchOutcome {
        self.pending = None;
        self.registry.teardown();
        debug!(resolved = self.resolved, "Watcher detached on destroy");
        WatchOutcome {
            reason: StopReason::Destroyed,
            resolved: self.resolved,
        }
    }
}

/// Why an attached watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceClosed,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOutcome {
    pub reason: StopReason,
    /// Events resolved without error.
    pub resolved: u64,
}

/// Handle to an attached watcher task.
#[derive(Debug)]
pub struct WatchHandle {
    task: JoinHandle<Result<WatchOutcome, DispatchError>>,
}

impl WatchHandle {
    pub async fn join(self) -> Result<WatchOutcome, WatchError> {
        Ok(self.task.await??)
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Mutex;

    use super::*;
    use crate::error::{SendError, UnknownScope};

    trait Panel: Any + Send {}
    struct Inbox;
    impl Panel for Inbox {}
    crate::family!(dyn Panel { Inbox });

    struct Arrived(&'static str);
    impl BaseState for Arrived {}

    #[test]
    fn watch_builds_registry_before_any_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut watcher = StateWatcher::<dyn Panel>::watch(move |scopes| {
            scopes.scope::<Inbox, _>(move |states| {
                states.on(move |Arrived(subject): Arrived| {
                    sink.lock().unwrap().push(subject);
                    Ok(())
                });
            });
        });

        assert_eq!(watcher.registry().scope_count(), 1);
        assert_eq!(watcher.config(), &WatcherConfig::default());

        let err = watcher
            .dispatch_event(ScopedEvent::state(Arrived("early")))
            .unwrap_err();
        assert_eq!(err.unknown_scope(), Some(UnknownScope::Unset));

        watcher
            .dispatch_event(ScopedEvent::enter_with::<Inbox, _>(Arrived("hello")))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
    }

    #[test]
    fn with_config_replaces_defaults() {
        let config = WatcherConfig::default().with_active_state(LifecycleState::Resumed);
        let watcher = StateWatcher::<dyn Panel>::watch(|_| {}).with_config(config);
        assert_eq!(watcher.config().active_state, LifecycleState::Resumed);
    }

    #[test]
    fn channel_is_sized_by_config() {
        let config = WatcherConfig::default().with_buffer_capacity(1);
        let watcher = StateWatcher::<dyn Panel>::watch(|_| {}).with_config(config);
        let (tx, _source) = watcher.channel();

        tx.try_send(ScopedEvent::enter::<Inbox>()).unwrap();
        assert_eq!(
            tx.try_send(ScopedEvent::enter::<Inbox>()).err(),
            Some(SendError::Full)
        );
    }

    #[tokio::test]
    async fn destroyed_flag_stops_a_draining_task() {
        let lifecycle = Lifecycle::new();
        lifecycle.set_state(LifecycleState::Started);
        let watcher = StateWatcher::<dyn Panel>::watch(|scopes| {
            scopes.scope::<Inbox, _>(|states| {
                states.on(|_: Arrived| Ok(()));
            });
        });
        let (tx, source) = watcher.channel();
        tx.try_send(ScopedEvent::enter_with::<Inbox, _>(Arrived("a"))).unwrap();
        tx.try_send(ScopedEvent::state(Arrived("b"))).unwrap();

        let handle = watcher.attach(source, &lifecycle);
        lifecycle.destroy();

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Destroyed);
        assert_eq!(outcome.resolved, 0);
    }
}

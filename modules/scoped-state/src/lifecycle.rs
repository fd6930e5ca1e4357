//! Start/stop authority that gates event consumption.
//!
//! A [`Lifecycle`] moves through `Initialized → Created → Started → Resumed` and
//! back down, until it is destroyed. Consumers either observe transitions with a
//! [`LifecycleObserver`] or run a body only while the lifecycle is active with
//! [`Lifecycle::repeat_while`].

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::debug;

use crate::error::ConfigError;

/// Ordered lifecycle states. `Destroyed` is below every other state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Destroyed,
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Destroyed => "destroyed",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Resumed => "resumed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the states a watcher can be gated on: `created`, `started`, `resumed`.
impl FromStr for LifecycleState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(LifecycleState::Created),
            "started" => Ok(LifecycleState::Started),
            "resumed" => Ok(LifecycleState::Resumed),
            _ => Err(ConfigError::Invalid {
                key: "lifecycle_state",
                value: s.to_string(),
            }),
        }
    }
}

/// Notified synchronously on every applied transition.
pub trait LifecycleObserver: Send + Sync {
    fn on_state_changed(&self, _from: LifecycleState, _to: LifecycleState) {}

    /// Called once, when the lifecycle is destroyed.
    fn on_destroy(&self) {}
}

struct Inner {
    state: watch::Sender<LifecycleState>,
    observers: Mutex<Vec<Arc<dyn LifecycleObserver>>>,
}

/// Shared handle to a lifecycle. Clones refer to the same lifecycle.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Initialized);
        Self {
            inner: Arc::new(Inner {
                state,
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Move to `next`. Ignored once destroyed; returns whether the state changed.
    ///
    /// Observers are notified after the observer list lock is released, so they
    /// may call back into the lifecycle.
    pub fn set_state(&self, next: LifecycleState) -> bool {
        let mut previous = next;
        let observers = {
            let observers = self.lock_observers();
            let changed = self.inner.state.send_if_modified(|state| {
                if *state == LifecycleState::Destroyed || *state == next {
                    return false;
                }
                previous = *state;
                *state = next;
                true
            });
            if !changed {
                return false;
            }
            observers.clone()
        };

        debug!(from = %previous, to = %next, "Lifecycle transition");
        for observer in observers {
            observer.on_state_changed(previous, next);
            if next == LifecycleState::Destroyed {
                observer.on_destroy();
            }
        }
        true
    }

    pub fn destroy(&self) -> bool {
        self.set_state(LifecycleState::Destroyed)
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Register an observer. One added after destruction gets `on_destroy` at once.
    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        let mut observers = self.lock_observers();
        if self.is_destroyed() {
            drop(observers);
            observer.on_destroy();
            return;
        }
        observers.push(observer);
    }

    // Held across every state write, so registration and destruction are
    // ordered against each other.
    fn lock_observers(&self) -> MutexGuard<'_, Vec<Arc<dyn LifecycleObserver>>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `body` whenever the state is at least `min`.
    ///
    /// The running body is cancelled when the state drops below `min` and
    /// started again when it comes back. A state change is always observed
    /// before the body is polled again. A body returning `Continue` waits for
    /// the next activation; `Break(r)` ends the loop with `Some(r)`. Returns
    /// `None` once the lifecycle is destroyed.
    pub async fn repeat_while<T, R, F>(
        &self,
        min: LifecycleState,
        ctx: &mut T,
        mut body: F,
    ) -> Option<R>
    where
        T: Send,
        F: for<'a> FnMut(&'a mut T) -> BoxFuture<'a, ControlFlow<R>>,
    {
        let mut rx = self.subscribe();
        loop {
            let state = rx
                .wait_for(|state| *state == LifecycleState::Destroyed || state.is_at_least(min))
                .await
                .map(|state| *state)
                .unwrap_or(LifecycleState::Destroyed);
            if state == LifecycleState::Destroyed {
                return None;
            }

            debug!(%state, %min, "Lifecycle active");
            let flow = tokio::select! {
                biased;
                _ = rx.wait_for(|state| !state.is_at_least(min)) => None,
                flow = body(&mut *ctx) => Some(flow),
            };

            match flow {
                Some(ControlFlow::Break(result)) => return Some(result),
                Some(ControlFlow::Continue(())) => {
                    if rx.wait_for(|state| !state.is_at_least(min)).await.is_err() {
                        return None;
                    }
                }
                None => debug!(%min, "Lifecycle inactive, body cancelled"),
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .finish()
    }
}

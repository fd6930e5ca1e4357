//! Type-directed routing of scoped state events.
//!
//! Consumers declare ahead of time which state handlers belong to which scope,
//! keyed by concrete runtime type. Each incoming [`ScopedEvent`] either switches
//! the active scope, dispatches a state value within it, or does both at once.
//! State values matching no handler in the active scope are dropped.
//!
//! The [`StateWatcher`] attaches a built table to an [`EventSource`] and only
//! consumes events while a [`Lifecycle`] is active.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod family;
pub mod lifecycle;
pub mod matcher;
pub mod scope;
pub mod source;
pub mod state;
pub mod watcher;

pub use config::WatcherConfig;
pub use dispatch::Resolution;
pub use error::{ConfigError, DispatchError, SendError, UnknownScope, WatchError};
pub use event::ScopedEvent;
pub use family::{BaseState, Family, Member};
pub use lifecycle::{Lifecycle, LifecycleObserver, LifecycleState};
pub use matcher::{Erased, TypeKey, TypeMatcher};
pub use scope::{CurrentScope, ScopeRegistry};
pub use source::{event_channel, ChannelSource, EventSender, EventSource, StreamSource};
pub use state::StateRegistry;
pub use watcher::{StateWatcher, StopReason, WatchHandle, WatchOutcome};

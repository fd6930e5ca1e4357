//! Per-scope state handler table.

use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::DispatchError;
use crate::family::{BaseState, Family, Member};
use crate::matcher::{TypeKey, TypeMatcher};

type Handler<ST> = Box<dyn Fn(Box<ST>) -> Result<(), DispatchError> + Send + Sync>;

/// State handlers registered for one concrete scope type.
///
/// Handlers are kept in registration order. Registering the same state type
/// again replaces the handler but keeps its original position.
pub struct StateRegistry<ST: ?Sized = dyn BaseState> {
    scope: TypeKey,
    handlers: IndexMap<TypeKey, Handler<ST>>,
}

impl<ST: ?Sized + Family> StateRegistry<ST> {
    pub(crate) fn new(scope: TypeKey) -> Self {
        Self {
            scope,
            handlers: IndexMap::new(),
        }
    }

    /// Register `handler` for values whose concrete type is `E`.
    pub fn register<E, H>(&mut self, matcher: TypeMatcher<ST, E>, handler: H) -> &mut Self
    where
        E: Member<ST>,
        H: Fn(E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = matcher.key();
        let narrowed: Handler<ST> = Box::new(move |value: Box<ST>| {
            let value = value
                .into_any()
                .downcast::<E>()
                .map_err(|_| DispatchError::Narrowing {
                    expected: key.name(),
                })?;
            handler(*value).map_err(DispatchError::Handler)
        });

        if self.handlers.insert(key, narrowed).is_some() {
            trace!(scope = self.scope.name(), state = key.name(), "Replaced state handler");
        }
        self
    }

    /// Shorthand for [`register`](Self::register) with a freshly built matcher.
    pub fn on<E, H>(&mut self, handler: H) -> &mut Self
    where
        E: Member<ST>,
        H: Fn(E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(TypeMatcher::<ST, E>::new(), handler)
    }

    /// Invoke the first handler whose type matches `value`.
    ///
    /// Returns `Ok(false)` when nothing matches; the value is dropped.
    pub fn dispatch(&self, value: Box<ST>) -> Result<bool, DispatchError> {
        let runtime_type = value.runtime_type();
        let Some((key, handler)) = self
            .handlers
            .iter()
            .find(|(key, _)| key.id() == runtime_type)
        else {
            trace!(scope = self.scope.name(), "No handler for state, dropped");
            return Ok(false);
        };

        trace!(scope = self.scope.name(), state = key.name(), "Dispatching state");
        handler(value)?;
        Ok(true)
    }

    /// The scope type this registry was built for.
    pub fn scope(&self) -> TypeKey {
        self.scope
    }

    pub fn handles<E: Member<ST>>(&self) -> bool {
        self.handlers.contains_key(&TypeKey::of::<E>())
    }

    /// Registered state types, in matching order.
    pub fn registered(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<ST: ?Sized> fmt::Debug for StateRegistry<ST> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("scope", &self.scope)
            .field("states", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

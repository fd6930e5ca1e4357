//! Scope table and the current-scope cell.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::UnknownScope;
use crate::family::{BaseState, Family, Member};
use crate::matcher::{TypeKey, TypeMatcher};
use crate::state::StateRegistry;

/// Which scope is active. `TornDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentScope {
    Unset,
    Active(TypeKey),
    TornDown,
}

/// Maps scope types to their [`StateRegistry`] and tracks the active scope.
///
/// Populate it with [`register_scope`](Self::register_scope) before any event
/// is dispatched. Registering a scope type twice keeps the last registration.
pub struct ScopeRegistry<SC: ?Sized, ST: ?Sized = dyn BaseState> {
    scopes: HashMap<TypeKey, StateRegistry<ST>>,
    pub(crate) current: CurrentScope,
    _family: PhantomData<fn() -> PhantomData<SC>>,
}

impl<SC, ST> ScopeRegistry<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    pub fn new() -> Self {
        Self {
            scopes: HashMap::new(),
            current: CurrentScope::Unset,
            _family: PhantomData,
        }
    }

    /// Build a fresh [`StateRegistry`] with `build` and store it under `matcher`.
    pub fn register_scope<S, B>(&mut self, matcher: TypeMatcher<SC, S>, build: B) -> &mut Self
    where
        S: Member<SC>,
        B: FnOnce(&mut StateRegistry<ST>),
    {
        let key = matcher.key();
        let mut states = StateRegistry::new(key);
        build(&mut states);

        debug!(scope = key.name(), states = states.len(), "Registered scope");
        if self.scopes.insert(key, states).is_some() {
            debug!(scope = key.name(), "Scope registered again, previous states replaced");
        }
        self
    }

    /// Shorthand for [`register_scope`](Self::register_scope) with a freshly built matcher.
    pub fn scope<S, B>(&mut self, build: B) -> &mut Self
    where
        S: Member<SC>,
        B: FnOnce(&mut StateRegistry<ST>),
    {
        self.register_scope(TypeMatcher::<SC, S>::new(), build)
    }

    /// States of the active scope.
    ///
    /// Fails when no scope was entered, when the active scope was never
    /// registered, and after [`teardown`](Self::teardown).
    pub fn current_scope_state(&self) -> Result<&StateRegistry<ST>, UnknownScope> {
        match self.current {
            CurrentScope::Unset => Err(UnknownScope::Unset),
            CurrentScope::TornDown => Err(UnknownScope::TornDown),
            CurrentScope::Active(key) => self
                .scopes
                .get(&key)
                .ok_or(UnknownScope::Unregistered(key.name())),
        }
    }

    pub fn current_scope(&self) -> Option<TypeMatcher<SC>> {
        match self.current {
            CurrentScope::Active(key) => Some(TypeMatcher::from_key(key)),
            CurrentScope::Unset | CurrentScope::TornDown => None,
        }
    }

    pub fn current(&self) -> CurrentScope {
        self.current
    }

    /// Clear the current scope for good. Later reads fail with
    /// [`UnknownScope::TornDown`] and later scope changes are rejected.
    pub fn teardown(&mut self) {
        if self.current != CurrentScope::TornDown {
            debug!(previous = ?self.current, "Scope registry torn down");
        }
        self.current = CurrentScope::TornDown;
    }

    pub fn is_torn_down(&self) -> bool {
        self.current == CurrentScope::TornDown
    }

    pub fn contains_scope<S>(&self, matcher: TypeMatcher<SC, S>) -> bool {
        self.scopes.contains_key(&matcher.key())
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl<SC, ST> Default for ScopeRegistry<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<SC: ?Sized, ST: ?Sized> fmt::Debug for ScopeRegistry<SC, ST> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish()
    }
}

//! Event resolution: one [`ScopedEvent`] at a time against a [`ScopeRegistry`].

use tracing::{debug, trace, warn};

use crate::error::{DispatchError, UnknownScope};
use crate::event::ScopedEvent;
use crate::family::Family;
use crate::matcher::TypeMatcher;
use crate::scope::{CurrentScope, ScopeRegistry};

/// What resolving one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Only the active scope changed.
    ScopeChanged,
    /// A state handler ran.
    Handled,
    /// No handler in the active scope accepts the state.
    Dropped,
}

impl<SC, ST> ScopeRegistry<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    /// Make `matcher` the active scope.
    ///
    /// Whether the scope was registered is not checked here; an unregistered
    /// scope surfaces on the next [`current_scope_state`](Self::current_scope_state).
    pub fn set_scope<S>(&mut self, matcher: TypeMatcher<SC, S>) -> Result<(), UnknownScope> {
        if self.current == CurrentScope::TornDown {
            warn!(scope = matcher.name(), "Scope change after teardown rejected");
            return Err(UnknownScope::TornDown);
        }

        debug!(scope = matcher.name(), "Entered scope");
        self.current = CurrentScope::Active(matcher.key());
        Ok(())
    }

    /// Resolve one event.
    ///
    /// A `Combined` event sets the scope and dispatches its state within the
    /// same call, so no other event can observe the scope in between.
    pub fn dispatch_event(
        &mut self,
        event: ScopedEvent<SC, ST>,
    ) -> Result<Resolution, DispatchError> {
        trace!(kind = event.kind(), "Resolving event");
        match event {
            ScopedEvent::ScopeOnly(tag) => {
                self.set_scope(tag)?;
                Ok(Resolution::ScopeChanged)
            }
            ScopedEvent::StateOnly(value) => self.dispatch_state(value),
            ScopedEvent::Combined(tag, value) => {
                self.set_scope(tag)?;
                self.dispatch_state(value)
            }
        }
    }

    fn dispatch_state(&self, value: Box<ST>) -> Result<Resolution, DispatchError> {
        let handled = self.current_scope_state()?.dispatch(value)?;
        Ok(if handled {
            Resolution::Handled
        } else {
            Resolution::Dropped
        })
    }
}

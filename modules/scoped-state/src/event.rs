//! The element type of the event stream.

use std::fmt;

use crate::family::{BaseState, Family, Member};
use crate::matcher::TypeMatcher;

/// One scope and/or state transition.
///
/// `SC` is the scope family, `ST` the state family. A `Combined` event changes
/// the scope and dispatches the state in a single resolution step.
pub enum ScopedEvent<SC: ?Sized, ST: ?Sized = dyn BaseState> {
    ScopeOnly(TypeMatcher<SC>),
    StateOnly(Box<ST>),
    Combined(TypeMatcher<SC>, Box<ST>),
}

impl<SC, ST> ScopedEvent<SC, ST>
where
    SC: ?Sized + Family,
    ST: ?Sized + Family,
{
    /// Switch to scope `S`.
    pub fn enter<S: Member<SC>>() -> Self {
        ScopedEvent::ScopeOnly(TypeMatcher::<SC, S>::new().erase())
    }

    /// Dispatch `value` within the current scope.
    pub fn state<E: Member<ST>>(value: E) -> Self {
        ScopedEvent::StateOnly(value.into_family())
    }

    /// Switch to scope `S` and dispatch `value` within it.
    pub fn enter_with<S: Member<SC>, E: Member<ST>>(value: E) -> Self {
        ScopedEvent::Combined(TypeMatcher::<SC, S>::new().erase(), value.into_family())
    }

    pub fn scope_tag(&self) -> Option<TypeMatcher<SC>> {
        match self {
            ScopedEvent::ScopeOnly(tag) | ScopedEvent::Combined(tag, _) => Some(*tag),
            ScopedEvent::StateOnly(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScopedEvent::ScopeOnly(_) => "scope",
            ScopedEvent::StateOnly(_) => "state",
            ScopedEvent::Combined(..) => "combined",
        }
    }
}

impl<SC: ?Sized, ST: ?Sized> fmt::Debug for ScopedEvent<SC, ST> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopedEvent::ScopeOnly(tag) => f.debug_tuple("ScopeOnly").field(tag).finish(),
            ScopedEvent::StateOnly(_) => f.debug_tuple("StateOnly").field(&"..").finish(),
            ScopedEvent::Combined(tag, _) => {
                f.debug_tuple("Combined").field(tag).field(&"..").finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::{Any, TypeId};

    use super::*;

    trait Mode: Any + Send {}
    struct Browsing;
    impl Mode for Browsing {}
    crate::family!(dyn Mode { Browsing });

    struct Clicked;
    impl BaseState for Clicked {}

    type Event = ScopedEvent<dyn Mode>;

    #[test]
    fn constructors_pick_the_matching_variant() {
        let enter = Event::enter::<Browsing>();
        assert_eq!(enter.kind(), "scope");
        assert_eq!(
            enter.scope_tag(),
            Some(TypeMatcher::<dyn Mode, Browsing>::new().erase())
        );

        let state = Event::state(Clicked);
        assert_eq!(state.kind(), "state");
        assert!(state.scope_tag().is_none());

        match Event::enter_with::<Browsing, _>(Clicked) {
            ScopedEvent::Combined(tag, value) => {
                assert!(tag.name().ends_with("Browsing"));
                assert_eq!(value.runtime_type(), TypeId::of::<Clicked>());
            }
            other => panic!("expected combined event, got {other:?}"),
        }
    }
}

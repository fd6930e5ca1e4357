//! Type families: the bounded sets of runtime types scopes and states are drawn from.
//!
//! A family is a trait object (`dyn BaseState`, `dyn AppScope`, ...). Values travel
//! through the router boxed as the family type and are narrowed back to their
//! concrete type only after a [`TypeMatcher`](crate::TypeMatcher) confirms it.

use std::any::{Any, TypeId};

/// A trait-object type whose values can report and surrender their concrete type.
///
/// Implement it with [`family!`](crate::family). The family trait must have
/// `Any + Send` as supertraits.
pub trait Family: Send + 'static {
    /// `TypeId` of the concrete type behind this value.
    fn runtime_type(&self) -> TypeId;

    /// Give up the family view so the value can be downcast.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A concrete type that belongs to family `F`.
///
/// Only members can be named by a `TypeMatcher<F, _>` or boxed into an event.
pub trait Member<F: ?Sized + Family>: Any + Send + Sized {
    fn into_family(self) -> Box<F>;
}

/// The default state family. Any `'static + Send` type can opt in with an empty impl.
pub trait BaseState: Any + Send {}

crate::family!(dyn BaseState);

impl<T: BaseState> Member<dyn BaseState> for T {
    fn into_family(self) -> Box<dyn BaseState> {
        Box::new(self)
    }
}

/// Declare a trait object as a [`Family`], optionally listing its members.
///
/// ```ignore
/// trait AppScope: Any + Send {}
/// struct Idle;
/// struct Busy;
/// impl AppScope for Idle {}
/// impl AppScope for Busy {}
///
/// scoped_state::family!(dyn AppScope { Idle, Busy });
/// ```
#[macro_export]
macro_rules! family {
    (dyn $family:path) => {
        impl $crate::Family for dyn $family {
            fn runtime_type(&self) -> ::std::any::TypeId {
                let any: &dyn ::std::any::Any = self;
                any.type_id()
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
    (dyn $family:path { $($member:ty),* $(,)? }) => {
        $crate::family!(dyn $family);

        $(
            impl $crate::Member<dyn $family> for $member {
                fn into_family(self) -> ::std::boxed::Box<dyn $family> {
                    ::std::boxed::Box::new(self)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Loading;
    #[derive(Debug, PartialEq)]
    struct Loaded(u32);

    impl BaseState for Loading {}
    impl BaseState for Loaded {}

    trait Screen: Any + Send {}
    struct Home;
    struct Settings;
    impl Screen for Home {}
    impl Screen for Settings {}

    crate::family!(dyn Screen { Home, Settings });

    #[test]
    fn runtime_type_sees_through_the_box() {
        let state: Box<dyn BaseState> = Loaded(3).into_family();
        assert_eq!(state.runtime_type(), TypeId::of::<Loaded>());
        assert_ne!(state.runtime_type(), TypeId::of::<Loading>());
        assert_ne!(state.runtime_type(), TypeId::of::<dyn BaseState>());
    }

    #[test]
    fn into_any_downcasts_to_the_concrete_value() {
        let state: Box<dyn BaseState> = Loaded(7).into_family();
        let loaded = state.into_any().downcast::<Loaded>().unwrap();
        assert_eq!(*loaded, Loaded(7));
    }

    #[test]
    fn declared_family_reports_member_types() {
        let screen: Box<dyn Screen> = Settings.into_family();
        assert_eq!(screen.runtime_type(), TypeId::of::<Settings>());
        assert!(screen.into_any().downcast::<Home>().is_err());
    }
}

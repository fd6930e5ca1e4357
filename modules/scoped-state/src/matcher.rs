//! Runtime type identity used as the dispatch key in both registries.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::family::{Family, Member};

/// Descriptor of one concrete type. Equality is `TypeId` equality; the name is
/// carried for logs and errors only.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Placeholder for a matcher whose concrete type has been forgotten.
#[derive(Debug)]
pub enum Erased {}

/// Identifies the concrete type `D` inside family `F` and tests values against it.
///
/// `TypeMatcher<F>` (with `D` left as [`Erased`]) is the family-level token used
/// as a scope tag and as the current-scope value.
pub struct TypeMatcher<F: ?Sized, D = Erased> {
    key: TypeKey,
    _marker: PhantomData<fn() -> (PhantomData<F>, D)>,
}

impl<F, D> TypeMatcher<F, D>
where
    F: ?Sized + Family,
    D: Member<F>,
{
    pub fn new() -> Self {
        Self::from_key(TypeKey::of::<D>())
    }
}

impl<F, D> Default for TypeMatcher<F, D>
where
    F: ?Sized + Family,
    D: Member<F>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized, D> TypeMatcher<F, D> {
    pub(crate) fn from_key(key: TypeKey) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    /// Forget `D`, keeping only the type identity.
    pub fn erase(self) -> TypeMatcher<F> {
        TypeMatcher::from_key(self.key)
    }
}

impl<F: ?Sized + Family, D> TypeMatcher<F, D> {
    /// True iff the value's concrete runtime type is exactly the matched type.
    pub fn matches(&self, value: &F) -> bool {
        value.runtime_type() == self.key.id
    }

    /// Like [`matches`](Self::matches); an absent value never matches.
    pub fn matches_opt(&self, value: Option<&F>) -> bool {
        value.is_some_and(|value| self.matches(value))
    }
}

impl<F: ?Sized, D> Clone for TypeMatcher<F, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ?Sized, D> Copy for TypeMatcher<F, D> {}

impl<F: ?Sized, D> PartialEq for TypeMatcher<F, D> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<F: ?Sized, D> Eq for TypeMatcher<F, D> {}

impl<F: ?Sized, D> Hash for TypeMatcher<F, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<F: ?Sized, D> fmt::Debug for TypeMatcher<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeMatcher").field(&self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::family::BaseState;

    struct Idle;
    struct Running {
        _pid: u32,
    }

    impl BaseState for Idle {}
    impl BaseState for Running {}

    type StateMatcher<D> = TypeMatcher<dyn BaseState, D>;

    #[test]
    fn matches_exact_runtime_type_only() {
        let idle = StateMatcher::<Idle>::new();
        let running: Box<dyn BaseState> = Box::new(Running { _pid: 1 });

        assert!(idle.matches(&Idle));
        assert!(!idle.matches(running.as_ref()));
        assert!(StateMatcher::<Running>::new().matches(running.as_ref()));
    }

    #[test]
    fn absent_value_never_matches() {
        let idle = StateMatcher::<Idle>::new();
        assert!(!idle.matches_opt(None));
        assert!(idle.matches_opt(Some(&Idle)));
    }

    #[test]
    fn matchers_built_separately_are_interchangeable_keys() {
        let mut keys = HashSet::new();
        keys.insert(StateMatcher::<Idle>::new().erase());
        keys.insert(StateMatcher::<Idle>::default().erase());
        keys.insert(StateMatcher::<Running>::new().erase());

        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&StateMatcher::<Idle>::new().erase()));
    }

    #[test]
    fn equality_ignores_everything_but_type_identity() {
        let a = StateMatcher::<Idle>::new();
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a.erase(), StateMatcher::<Running>::new().erase());
        assert!(a.name().ends_with("Idle"));
    }
}

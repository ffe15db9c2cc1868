use crate::error::Result;
use crate::unification::State;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use super::identity::Identity;
use super::identity::Value;

/// A propagation closure.  It reads whatever group values it needs
/// from a state and returns the state with the propagated binding
/// applied; if its inputs are not all bound yet it returns the state
/// unchanged.  Both ends of a derivation share the same closures, so
/// they are reference-counted rather than owned.
pub(crate) type Bijection = Arc<dyn Fn(&State) -> Result<State>>;

/// Builds the bijection that reads `from`'s group and binds `to` with
/// the transformed value.  Inert while `from` is unbound.
fn biject<A, B>(from: &Identity, to: &Identity, transform: impl Fn(&A) -> B + 'static) -> Bijection
where
    A: 'static,
    B: 'static,
{
    let from = from.clone();
    let to = to.clone();
    Arc::new(move |state: &State| {
        let payload = match state.raw_value(&from) {
            Some(payload) => payload,
            None => return Ok(state.clone()),
        };
        let whole = payload
            .downcast_ref::<A>()
            .expect("group payload must match its declared value type");
        state.bind_erased(&to, Arc::new(transform(whole)) as Value)
    })
}

/// A typed handle on one logical variable.
///
/// The handle itself is inert data: an identity plus the table of
/// propagation closures its derivation declared (empty for a plain
/// variable).  Nothing is wired into any state until the variable
/// first participates in a unification there.
///
/// Handles compare by identity, so a clone is the *same* variable and
/// two separately constructed variables are always distinct, except
/// that keyed derivations of the same source converge (see `bimap2`
/// and friends).
pub struct Variable<V> {
    identity: Identity,
    bijections: Arc<HashMap<Identity, Bijection>>,
    _value: PhantomData<fn() -> V>,
}

macro_rules! bimap_n {
    ($(#[$docs:meta])* $name:ident => $(($part:ident, $ty:ident, $index:tt)),+) => {
        $(#[$docs])*
        #[must_use]
        pub fn $name<$($ty),+>(
            &self,
            identity: &str,
            forward: impl Fn(V) -> ($($ty,)+) + 'static,
            backward: impl Fn(($($ty,)+)) -> V + 'static,
        ) -> ($(Variable<$ty>,)+)
        where
            $($ty: PartialEq + Clone + 'static,)+
        {
            let source = self.identity.clone();
            $(
                let $part = Identity::derived::<$ty>(&source, format!("{}.{}", identity, $index));
            )+

            // The source-direction closure reconstructs the whole from
            // the parts, and stays inert until every part is bound.
            let reassemble: Bijection = {
                let source = source.clone();
                $(let $part = $part.clone();)+
                Arc::new(move |state: &State| {
                    $(
                        let $part = match state.raw_value(&$part) {
                            Some(payload) => payload,
                            None => return Ok(state.clone()),
                        };
                    )+
                    $(
                        let $part = $part
                            .downcast_ref::<$ty>()
                            .expect("group payload must match its declared value type")
                            .clone();
                    )+
                    state.bind_erased(&source, Arc::new(backward(($($part,)+))) as Value)
                })
            };

            let forward = Arc::new(forward);
            let mut bijections: HashMap<Identity, Bijection> = HashMap::new();
            $(
                {
                    let forward = forward.clone();
                    bijections.insert(
                        $part.clone(),
                        biject(&source, &$part, move |whole: &V| {
                            (*forward)(whole.clone()).$index
                        }),
                    );
                }
            )+
            bijections.insert(source, reassemble);

            let bijections = Arc::new(bijections);
            ($(Variable::with_bijections($part, bijections.clone()),)+)
        }
    };
}

impl<V: PartialEq + Clone + 'static> Variable<V> {
    /// Returns a fresh, unbound logical variable.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bijections(Identity::fresh::<V>(), Arc::new(HashMap::new()))
    }

    pub(crate) fn with_bijections(
        identity: Identity,
        bijections: Arc<HashMap<Identity, Bijection>>,
    ) -> Self {
        Self {
            identity,
            bijections,
            _value: PhantomData,
        }
    }

    pub(crate) fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn bijections(&self) -> &HashMap<Identity, Bijection> {
        &self.bijections
    }

    /// Returns a variable related to this one by a one-to-one
    /// transformation: binding either side propagates to the other.
    ///
    /// The derived variable has a fresh identity, so repeated calls
    /// produce *distinct* variables (which unify with each other only
    /// through their common source).  Use the keyed decompositions when
    /// separate call sites must converge on the same derived variable.
    #[must_use]
    pub fn bimap<A>(
        &self,
        forward: impl Fn(V) -> A + 'static,
        backward: impl Fn(A) -> V + 'static,
    ) -> Variable<A>
    where
        A: PartialEq + Clone + 'static,
    {
        let source = self.identity.clone();
        let derived = Identity::fresh::<A>();

        let mut bijections: HashMap<Identity, Bijection> = HashMap::new();
        bijections.insert(
            derived.clone(),
            biject(&source, &derived, move |whole: &V| forward(whole.clone())),
        );
        bijections.insert(
            source.clone(),
            biject(&derived, &source, move |part: &A| backward(part.clone())),
        );

        Variable::with_bijections(derived, Arc::new(bijections))
    }

    bimap_n! {
        /// Splits this variable into two derived variables, one per
        /// component of `forward`'s result.
        ///
        /// `identity` must uniquely name this decomposition: derived
        /// variables are keyed by `(source, identity)`, so separate
        /// call sites using the same string converge on the same
        /// derived variables.  Binding the source propagates to every
        /// part; the source is reconstructed via `backward` once all
        /// parts are bound.
        bimap2 => (a, A, 0), (b, B, 1)
    }

    bimap_n! {
        /// Like [`Variable::bimap2`], with three parts.
        bimap3 => (a, A, 0), (b, B, 1), (c, C, 2)
    }

    bimap_n! {
        /// Like [`Variable::bimap2`], with four parts.
        bimap4 => (a, A, 0), (b, B, 1), (c, C, 2), (d, D, 3)
    }

    bimap_n! {
        /// Like [`Variable::bimap2`], with five parts.
        bimap5 => (a, A, 0), (b, B, 1), (c, C, 2), (d, D, 3), (e, E, 4)
    }

    bimap_n! {
        /// Like [`Variable::bimap2`], with six parts.
        bimap6 => (a, A, 0), (b, B, 1), (c, C, 2), (d, D, 3), (e, E, 4), (f, F, 5)
    }
}

impl<V: PartialEq + Clone + 'static> Default for Variable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Variable<V> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            bijections: self.bijections.clone(),
            _value: PhantomData,
        }
    }
}

/// Handles are the same variable iff they share an identity, whatever
/// their value types claim.
impl<V, U> PartialEq<Variable<U>> for Variable<V> {
    fn eq(&self, other: &Variable<U>) -> bool {
        self.identity == other.identity
    }
}

impl<V> std::fmt::Debug for Variable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Variable({:?})", self.identity)
    }
}

#[test]
fn test_identity() {
    let var1 = Variable::<i32>::new();
    let var2 = var1.clone();
    let var3 = Variable::<i32>::new();

    assert_eq!(var1, var2);
    assert_ne!(var1, var3);
    assert_ne!(var2, var3);
}

#[test]
fn test_keyed_decompositions_converge() {
    use super::fixtures::Point;

    let point = Variable::<Point>::new();
    let (x1, y1) = point.bimap2("parts", |p| (p.x, p.y), |(x, y)| Point { x, y });
    let (x2, y2) = point.bimap2("parts", |p| (p.x, p.y), |(x, y)| Point { x, y });

    // Same source, same key: the same derived variables.
    assert_eq!(x1, x2);
    assert_eq!(y1, y2);
    assert_ne!(x1, y1);

    // A different key names a different decomposition.
    let (x3, _) = point.bimap2("mirrored", |p| (p.y, p.x), |(y, x)| Point { x, y });
    assert_ne!(x1, x3);

    // A different source variable never converges.
    let other = Variable::<Point>::new();
    let (x4, _) = other.bimap2("parts", |p| (p.x, p.y), |(x, y)| Point { x, y });
    assert_ne!(x1, x4);
}

#[test]
fn test_unkeyed_bimap_is_fresh_every_time() {
    let celsius = Variable::<i32>::new();
    let fahrenheit1 = celsius.bimap(|c| c * 9 / 5 + 32, |f: i32| (f - 32) * 5 / 9);
    let fahrenheit2 = celsius.bimap(|c| c * 9 / 5 + 32, |f: i32| (f - 32) * 5 / 9);

    assert_ne!(fahrenheit1, fahrenheit2);
}

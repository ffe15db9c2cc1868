use std::marker::PhantomData;
use std::sync::Arc;
use super::identity::Identity;
use super::identity::Value;
use super::typed::Variable;

/// A pure view transform over an erased group payload.
pub(crate) type Transform = Arc<dyn Fn(&Value) -> Value>;

/// A read-only view of a logical variable through a pure transform,
/// e.g. one field of a struct-valued variable.
///
/// Properties carry no bijections and never propagate anything; they
/// exist so constraints can be keyed on *what was read* rather than on
/// whole variables.  Two properties are the same exactly when they view
/// the same underlying variable, whatever their transforms.
pub struct Property<V> {
    identity: Identity,
    transform: Transform,
    _value: PhantomData<fn() -> V>,
}

impl<V: PartialEq + Clone + 'static> Property<V> {
    pub(crate) fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Applies the view transform to a group payload.
    pub(crate) fn project(&self, payload: &Value) -> V {
        (*self.transform)(payload)
            .downcast_ref::<V>()
            .expect("property transform must produce its declared value type")
            .clone()
    }
}

/// Anything that can stand in for a property: variables (viewed
/// through the identity transform) and properties themselves.  The
/// constraint constructors take their operands through this trait.
pub trait AsProperty {
    type Value: PartialEq + Clone + 'static;

    /// Views the receiver as a property.
    fn as_property(&self) -> Property<Self::Value>;

    /// Returns a view of the receiver through a further pure
    /// transform.  The result keeps the receiver's identity; only the
    /// projection changes.
    fn map<U>(&self, transform: impl Fn(&Self::Value) -> U + 'static) -> Property<U>
    where
        U: PartialEq + Clone + 'static,
    {
        let base = self.as_property();
        let inner = base.transform.clone();
        Property {
            identity: base.identity,
            transform: Arc::new(move |payload: &Value| {
                let middle = (*inner)(payload);
                let middle = middle
                    .downcast_ref::<Self::Value>()
                    .expect("property transform must produce its declared value type");
                Arc::new(transform(middle)) as Value
            }),
            _value: PhantomData,
        }
    }
}

impl<V: PartialEq + Clone + 'static> AsProperty for Property<V> {
    type Value = V;

    fn as_property(&self) -> Property<V> {
        self.clone()
    }
}

impl<V: PartialEq + Clone + 'static> AsProperty for Variable<V> {
    type Value = V;

    fn as_property(&self) -> Property<V> {
        Property {
            identity: self.identity().clone(),
            transform: Arc::new(|payload: &Value| payload.clone()),
            _value: PhantomData,
        }
    }
}

impl<P: AsProperty> AsProperty for &P {
    type Value = P::Value;

    fn as_property(&self) -> Property<P::Value> {
        (**self).as_property()
    }
}

impl<V> Clone for Property<V> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            transform: self.transform.clone(),
            _value: PhantomData,
        }
    }
}

/// Views are the same property iff they view the same variable; the
/// transforms are not part of the comparison.
impl<V, U> PartialEq<Property<U>> for Property<V> {
    fn eq(&self, other: &Property<U>) -> bool {
        self.identity == other.identity
    }
}

impl<V> std::fmt::Debug for Property<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Property({:?})", self.identity)
    }
}

#[test]
fn test_identity() {
    let length1 = Variable::<String>::new().map(|s| s.len());
    let length2 = length1.clone();
    let length3 = Variable::<String>::new().map(|s| s.len());

    assert_eq!(length1, length2);
    assert_ne!(length1, length3);
    assert_ne!(length2, length3);
}

#[test]
fn test_views_key_on_the_underlying_variable() {
    let name = Variable::<String>::new();
    let length = name.map(|s| s.len());

    // A view is "the same" as its variable for keying purposes, and
    // stacking further transforms changes nothing.
    assert_eq!(name.as_property(), length);
    assert_eq!(length.map(|n| n * 2), length);
}

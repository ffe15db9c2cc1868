use crate::error::Result;
use crate::error::UnificationError;
use crate::unification::State;
use crate::variable::AsProperty;
use crate::variable::Property;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// A predicate over a [`State`]: it either passes, possibly vacuously
/// when an operand is unbound, or fails uniformly.
///
/// A state accumulates constraints through [`State::constrain`] and
/// replays each of them after every binding change, so a constraint
/// written against partially bound operands keeps pruning as the
/// bindings arrive.
#[derive(Clone)]
pub struct Constraint {
    check: Arc<dyn Fn(&State) -> Result<()>>,
}

impl Constraint {
    pub fn new(check: impl Fn(&State) -> Result<()> + 'static) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    /// Runs the predicate against `state`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the predicate rejects `state`.
    pub fn check(&self, state: &State) -> Result<()> {
        (*self.check)(state)
    }
}

/// Returns the constraint that all bound operands hold one common
/// value.  Unbound operands pass vacuously.
pub fn equal<P: AsProperty>(properties: &[P]) -> Constraint {
    equality(properties, None)
}

/// Returns the constraint that every bound operand holds `value`.
pub fn equal_value<P: AsProperty>(properties: &[P], value: P::Value) -> Constraint {
    equality(properties, Some(value))
}

fn equality<P: AsProperty>(properties: &[P], seed: Option<P::Value>) -> Constraint {
    let properties: Vec<Property<P::Value>> =
        properties.iter().map(AsProperty::as_property).collect();
    Constraint::new(move |state| {
        let mut value = seed.clone();
        for property in &properties {
            if let Some(current) = state.project(property) {
                match &value {
                    None => value = Some(current),
                    Some(expected) => {
                        if *expected != current {
                            return Err(UnificationError);
                        }
                    }
                }
            }
        }
        Ok(())
    })
}

/// Returns the constraint that no two bound operands coincide.
/// Unbound operands pass vacuously.
pub fn unequal<P>(properties: &[P]) -> Constraint
where
    P: AsProperty,
    P::Value: Hash + Eq,
{
    distinctness(properties, &[])
}

/// Returns the constraint that no two bound operands coincide, nor
/// any operand with one of the fixed `values`.
pub fn unequal_values<P>(properties: &[P], values: &[P::Value]) -> Constraint
where
    P: AsProperty,
    P::Value: Hash + Eq,
{
    distinctness(properties, values)
}

fn distinctness<P>(properties: &[P], values: &[P::Value]) -> Constraint
where
    P: AsProperty,
    P::Value: Hash + Eq,
{
    let properties: Vec<Property<P::Value>> =
        properties.iter().map(AsProperty::as_property).collect();
    let values: HashSet<P::Value> = values.iter().cloned().collect();
    Constraint::new(move |state| {
        let mut seen = values.clone();
        for property in &properties {
            if let Some(current) = state.project(property) {
                if !seen.insert(current) {
                    return Err(UnificationError);
                }
            }
        }
        Ok(())
    })
}

#[test]
fn test_equal_with_a_seed_value() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = equal_value(&[&x, &y], 4);

    // Vacuous while nothing is bound, and satisfied by any subset of
    // operands bound to the seed.
    assert!(constraint.check(&State::new()).is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 4).expect("ok"))
        .is_ok());
    assert!(constraint
        .check(&State::new().bind(&y, 4).expect("ok"))
        .is_ok());

    let both = State::new()
        .bind(&x, 4)
        .expect("ok")
        .bind(&y, 4)
        .expect("ok");
    assert!(constraint.check(&both).is_ok());
}

#[test]
fn test_equal_with_a_seed_value_rejects_mismatches() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = equal_value(&[&x, &y], 4);

    assert!(constraint
        .check(&State::new().bind(&x, 5).expect("ok"))
        .is_err());
    assert!(constraint
        .check(&State::new().bind(&y, 5).expect("ok"))
        .is_err());

    // A value arriving through a merged group counts too.
    let z = Variable::<i32>::new();
    let merged = State::new()
        .bind(&z, 5)
        .expect("ok")
        .unify(&x, &z)
        .expect("ok");
    assert!(constraint.check(&merged).is_err());
}

#[test]
fn test_equal_without_a_seed() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = equal(&[&x, &y]);

    assert!(constraint.check(&State::new()).is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 5).expect("ok"))
        .is_ok());
    assert!(constraint
        .check(&State::new().bind(&y, 5).expect("ok"))
        .is_ok());

    let agreeing = State::new()
        .bind(&x, 5)
        .expect("ok")
        .bind(&y, 5)
        .expect("ok");
    assert!(constraint.check(&agreeing).is_ok());

    // Merging the operands together is fine, bound or not.
    let z = Variable::<i32>::new();
    let fused = State::new()
        .unify(&x, &z)
        .expect("ok")
        .unify(&y, &z)
        .expect("ok");
    assert!(constraint.check(&fused).is_ok());
    assert!(constraint
        .check(&fused.bind(&z, 5).expect("ok"))
        .is_ok());
}

#[test]
fn test_equal_without_a_seed_rejects_mismatches() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = equal(&[&x, &y]);

    let disagreeing = State::new()
        .bind(&x, 2)
        .expect("ok")
        .bind(&y, 7)
        .expect("ok");
    assert!(constraint.check(&disagreeing).is_err());

    let z = Variable::<i32>::new();
    let through_merge = State::new()
        .bind(&z, 2)
        .expect("ok")
        .unify(&x, &z)
        .expect("ok")
        .bind(&y, 7)
        .expect("ok");
    assert!(constraint.check(&through_merge).is_err());
}

#[test]
fn test_unequal_with_fixed_values() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let constraint = unequal_values(&[&x], &[42]);

    assert!(constraint.check(&State::new()).is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 5).expect("ok"))
        .is_ok());

    let y = Variable::<i32>::new();
    let merged = State::new().unify(&x, &y).expect("ok");
    assert!(constraint.check(&merged).is_ok());
    assert!(constraint
        .check(&merged.bind(&y, 5).expect("ok"))
        .is_ok());

    assert!(constraint
        .check(&State::new().bind(&x, 42).expect("ok"))
        .is_err());
    assert!(constraint
        .check(&merged.bind(&y, 42).expect("ok"))
        .is_err());
}

#[test]
fn test_unequal_between_operands() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = unequal(&[&x, &y]);

    assert!(constraint.check(&State::new()).is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 5).expect("ok"))
        .is_ok());
    assert!(constraint
        .check(&State::new().bind(&y, 5).expect("ok"))
        .is_ok());

    let differing = State::new()
        .bind(&x, 6)
        .expect("ok")
        .bind(&y, 5)
        .expect("ok");
    assert!(constraint.check(&differing).is_ok());

    let coinciding = State::new()
        .bind(&x, 42)
        .expect("ok")
        .bind(&y, 42)
        .expect("ok");
    assert!(constraint.check(&coinciding).is_err());

    let coinciding = State::new()
        .bind(&y, 42)
        .expect("ok")
        .bind(&x, 42)
        .expect("ok");
    assert!(constraint.check(&coinciding).is_err());

    let fused = State::new()
        .unify(&x, &y)
        .expect("ok")
        .bind(&y, 42)
        .expect("ok");
    assert!(constraint.check(&fused).is_err());
}

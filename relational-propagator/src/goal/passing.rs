use crate::error::UnificationError;
use crate::goal::Constraint;
use crate::variable::AsProperty;
use std::ops::Sub;

/// Returns the constraint that `test` accepts the two operands'
/// values.  While either operand is unbound the constraint passes
/// vacuously; it starts pruning once both are ground.
pub fn passing<P: AsProperty>(
    lhs: &P,
    rhs: &P,
    test: impl Fn(&P::Value, &P::Value) -> bool + 'static,
) -> Constraint {
    let lhs = lhs.as_property();
    let rhs = rhs.as_property();
    Constraint::new(move |state| {
        let lhs_value = state.project(&lhs);
        let rhs_value = state.project(&rhs);
        if let (Some(lhs_value), Some(rhs_value)) = (lhs_value, rhs_value) {
            if !test(&lhs_value, &rhs_value) {
                return Err(UnificationError);
            }
        }
        Ok(())
    })
}

/// Returns the constraint that `test` accepts the operand's value and
/// the fixed `value`, vacuously passing while the operand is unbound.
pub fn passing_value<P: AsProperty>(
    property: &P,
    value: P::Value,
    test: impl Fn(&P::Value, &P::Value) -> bool + 'static,
) -> Constraint {
    let property = property.as_property();
    Constraint::new(move |state| {
        if let Some(current) = state.project(&property) {
            if !test(&current, &value) {
                return Err(UnificationError);
            }
        }
        Ok(())
    })
}

/// Returns the binary test accepting values no further than
/// `distance` apart.
pub fn within<V>(distance: V) -> impl Fn(&V, &V) -> bool
where
    V: Clone + PartialOrd + Sub<Output = V>,
{
    move |lhs, rhs| {
        // Subtract small from large so unsigned values cannot wrap.
        let gap = if lhs >= rhs {
            lhs.clone() - rhs.clone()
        } else {
            rhs.clone() - lhs.clone()
        };
        gap <= distance
    }
}

/// Returns the complement of a binary test.
pub fn negate<V>(test: impl Fn(&V, &V) -> bool) -> impl Fn(&V, &V) -> bool {
    move |lhs, rhs| !test(lhs, rhs)
}

#[test]
fn test_passing_is_vacuous_until_both_operands_are_bound() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();
    let constraint = passing(&x, &y, |lhs, rhs| lhs < rhs);

    assert!(constraint.check(&State::new()).is_ok());

    let half = State::new().bind(&x, 9).expect("ok");
    assert!(constraint.check(&half).is_ok());

    let ordered = half.bind(&y, 10).expect("ok");
    assert!(constraint.check(&ordered).is_ok());

    let unordered = State::new()
        .bind(&x, 10)
        .expect("ok")
        .bind(&y, 9)
        .expect("ok");
    assert!(constraint.check(&unordered).is_err());
}

#[test]
fn test_passing_value_compares_against_the_fixed_side() {
    use crate::unification::State;
    use crate::variable::Variable;

    let x = Variable::<i32>::new();
    let constraint = passing_value(&x, 10, within(3));

    assert!(constraint.check(&State::new()).is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 8).expect("ok"))
        .is_ok());
    assert!(constraint
        .check(&State::new().bind(&x, 20).expect("ok"))
        .is_err());
}

#[test]
fn test_within_measures_distance_in_both_directions() {
    let close = within(2);

    assert!(close(&5, &7));
    assert!(close(&7, &5));
    assert!(close(&5, &5));
    assert!(!close(&4, &7));
}

#[test]
fn test_negate_inverts_a_test() {
    let apart = negate(within(2));

    assert!(apart(&4, &7));
    assert!(!apart(&5, &7));
}

use crate::error::Result;
use crate::error::UnificationError;
use crate::goal::equal_value;
use crate::goal::unequal;
use crate::goal::unequal_values;
use crate::goal::Constraint;
use crate::unification::State;
use crate::variable::AsProperty;
use crate::variable::Property;
use crate::variable::Variable;
use fairumerator::Generator;
use std::hash::Hash;
use std::sync::Arc;

/// A nondeterministic step of the search: a function from one state
/// to the lazy stream of successor states satisfying it.
///
/// Goals never surface [`UnificationError`] to the caller.  A failed
/// primitive contributes an empty stream, which is how dead branches
/// are pruned, and combinators only ever reshape streams.
#[derive(Clone)]
pub struct Goal {
    apply: Arc<dyn Fn(&State) -> Generator<State>>,
}

impl Goal {
    /// Returns a goal from an arbitrary state-to-stream function.
    pub fn custom(apply: impl Fn(&State) -> Generator<State> + 'static) -> Self {
        Self {
            apply: Arc::new(apply),
        }
    }

    /// Returns a goal from a fallible state transform: success yields
    /// the one transformed state, failure yields nothing.
    pub fn from_fn(transform: impl Fn(&State) -> Result<State> + 'static) -> Self {
        Self::custom(move |state| match transform(state) {
            Ok(next) => Generator::once(next),
            Err(UnificationError) => Generator::empty(),
        })
    }

    /// Returns the goal that accumulates `constraint` onto the state,
    /// yielding nothing if the state already violates it.
    pub fn from_constraint(constraint: Constraint) -> Self {
        Self::from_fn(move |state| state.constrain(constraint.clone()))
    }

    /// Runs the goal, producing the stream of satisfying states.
    #[must_use]
    pub fn apply(&self, state: &State) -> Generator<State> {
        (*self.apply)(state)
    }

    /// Returns the conjunction of the two goals.
    #[must_use]
    pub fn and(self, other: Goal) -> Goal {
        all(vec![self, other])
    }

    /// Returns the fair disjunction of the two goals.
    #[must_use]
    pub fn or(self, other: Goal) -> Goal {
        any(vec![self, other])
    }
}

impl From<Constraint> for Goal {
    fn from(constraint: Constraint) -> Self {
        Self::from_constraint(constraint)
    }
}

/// Returns the goal satisfied when every subgoal is satisfied.
///
/// Subgoals apply left to right: each state a subgoal yields seeds
/// the next subgoal, so later subgoals see earlier bindings.  Within
/// one subgoal, solutions keep their encounter order.
pub fn all(goals: Vec<Goal>) -> Goal {
    Goal::custom(move |state| {
        goals
            .iter()
            .cloned()
            .fold(Generator::once(state.clone()), |states, goal| {
                states.flat_map(move |state| goal.apply(&state))
            })
    })
}

/// Returns the goal satisfied when any subgoal is satisfied.
///
/// Every subgoal sees the same input state, and their solution
/// streams are interleaved fairly, so one branch with endless
/// solutions cannot starve the others.
pub fn any(goals: Vec<Goal>) -> Goal {
    Goal::custom(move |state| {
        Generator::interleave(goals.iter().map(|goal| goal.apply(state)).collect())
    })
}

/// Returns the goal satisfied when no two of the listed operands
/// share a value.
pub fn distinct<P>(properties: &[P]) -> Goal
where
    P: AsProperty,
    P::Value: Hash + Eq,
{
    Goal::from_constraint(unequal(properties))
}

impl<V: PartialEq + Clone + 'static> Variable<V> {
    /// Returns the goal satisfied when this variable equals `value`.
    pub fn equals(&self, value: V) -> Goal {
        let variable = self.clone();
        Goal::from_fn(move |state| state.bind(&variable, value.clone()))
    }

    /// Returns the goal satisfied when the two variables are equal.
    pub fn unifies(&self, other: &Variable<V>) -> Goal {
        let lhs = self.clone();
        let rhs = other.clone();
        Goal::from_fn(move |state| state.unify(&lhs, &rhs))
    }

    /// Returns the goal satisfied when this variable equals one of
    /// `values`, one solution per candidate, fairly interleaved.
    pub fn one_of(&self, values: impl IntoIterator<Item = V>) -> Goal {
        any(values.into_iter().map(|value| self.equals(value)).collect())
    }
}

impl<V: Hash + Eq + Clone + 'static> Variable<V> {
    /// Returns the goal satisfied while this variable avoids `value`.
    pub fn differs(&self, value: V) -> Goal {
        Goal::from_constraint(unequal_values(&[self], &[value]))
    }

    /// Returns the goal satisfied while the two variables hold
    /// different values.
    pub fn differs_from(&self, other: &Variable<V>) -> Goal {
        Goal::from_constraint(unequal(&[self.as_property(), other.as_property()]))
    }
}

impl<V: PartialEq + Clone + 'static> Property<V> {
    /// Returns the goal satisfied when this view equals `value`.
    pub fn equals(&self, value: V) -> Goal {
        Goal::from_constraint(equal_value(&[self], value))
    }
}

impl<V: Hash + Eq + Clone + 'static> Property<V> {
    /// Returns the goal satisfied while this view avoids `value`.
    pub fn differs(&self, value: V) -> Goal {
        Goal::from_constraint(unequal_values(&[self], &[value]))
    }
}

#[test]
fn test_and_threads_bindings_left_to_right() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    let solutions: Vec<State> = x.equals(3).and(y.equals(4)).apply(&State::new()).collect();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].value(&x), Some(3));
    assert_eq!(solutions[0].value(&y), Some(4));
}

#[test]
fn test_and_prunes_conflicts() {
    let x = Variable::<i32>::new();

    let solutions: Vec<State> = x.equals(3).and(x.equals(4)).apply(&State::new()).collect();
    assert!(solutions.is_empty());
}

#[test]
fn test_all_of_nothing_passes_the_state_through() {
    let solutions: Vec<State> = all(vec![]).apply(&State::new()).collect();
    assert_eq!(solutions.len(), 1);
}

#[test]
fn test_all_short_circuits_after_an_empty_branch() {
    use std::cell::Cell;
    use std::rc::Rc;

    let calls = Rc::new(Cell::new(0));
    let witness = calls.clone();
    let counting = Goal::custom(move |state| {
        witness.set(witness.get() + 1);
        Generator::once(state.clone())
    });
    let failing = Goal::from_fn(|_| Err(UnificationError));

    // The first subgoal yields no states, so the second subgoal has
    // nothing to run on and is never applied.
    let solutions: Vec<State> = all(vec![failing, counting]).apply(&State::new()).collect();
    assert!(solutions.is_empty());
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_or_yields_every_alternative() {
    use std::collections::HashSet;

    let x = Variable::<i32>::new();

    let solutions: HashSet<Option<i32>> = x
        .equals(1)
        .or(x.equals(2))
        .apply(&State::new())
        .map(move |state| state.value(&x))
        .collect();
    assert_eq!(solutions, HashSet::from([Some(1), Some(2)]));
}

#[test]
fn test_any_reaches_solutions_past_an_endless_branch() {
    let x = Variable::<i32>::new();

    let endless = Goal::custom(|state| {
        let state = state.clone();
        Generator::from_fn(move || Some(state.clone()))
    });
    let single = x.equals(7);

    // Fair interleaving must surface the finite branch's solution
    // after a bounded number of pulls.
    let found = any(vec![endless, single])
        .apply(&State::new())
        .take(4)
        .any(|state| state.value(&x) == Some(7));
    assert!(found);
}

#[test]
fn test_one_of_enumerates_the_candidates() {
    use std::collections::HashSet;

    let x = Variable::<i32>::new();

    let solutions: HashSet<Option<i32>> = x
        .one_of(vec![1, 2, 3])
        .apply(&State::new())
        .map(move |state| state.value(&x))
        .collect();
    assert_eq!(solutions, HashSet::from([Some(1), Some(2), Some(3)]));
}

#[test]
fn test_differs_prunes_the_matching_candidate() {
    use std::collections::HashSet;

    let x = Variable::<i32>::new();

    let solutions: HashSet<Option<i32>> = x
        .one_of(vec![1, 2])
        .and(x.differs(1))
        .apply(&State::new())
        .map(move |state| state.value(&x))
        .collect();
    assert_eq!(solutions, HashSet::from([Some(2)]));
}

#[test]
fn test_differs_from_excludes_agreement() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    let solutions: Vec<State> = x
        .equals(5)
        .and(x.differs_from(&y))
        .and(y.equals(5))
        .apply(&State::new())
        .collect();
    assert!(solutions.is_empty());

    let solutions: Vec<State> = x
        .equals(5)
        .and(x.differs_from(&y))
        .and(y.equals(6))
        .apply(&State::new())
        .collect();
    assert_eq!(solutions.len(), 1);
}

#[test]
fn test_unifies_shares_later_bindings() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    let solutions: Vec<State> = x.unifies(&y).and(y.equals(9)).apply(&State::new()).collect();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].value(&x), Some(9));
}

#[test]
fn test_distinct_requires_pairwise_difference() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    let pool = all(vec![x.one_of(vec![1, 2]), y.one_of(vec![1, 2])]);
    let solutions: Vec<State> = pool
        .and(distinct(&[&x, &y]))
        .apply(&State::new())
        .collect();

    assert_eq!(solutions.len(), 2);
    for state in &solutions {
        assert_ne!(state.value(&x), state.value(&y));
    }
}

#[test]
fn test_a_constraint_goal_keeps_pruning_afterwards() {
    let x = Variable::<i32>::new();

    let solutions: Vec<State> = Goal::from(equal_value(&[&x], 5))
        .apply(&State::new())
        .collect();
    assert_eq!(solutions.len(), 1);

    // The constraint travels with the state it produced.
    assert!(solutions[0].bind(&x, 6).is_err());
    assert_eq!(solutions[0].bind(&x, 5).expect("ok").value(&x), Some(5));
}

#[test]
fn test_property_goals_see_through_transforms() {
    use std::collections::HashSet;

    let word = Variable::<String>::new();
    let length = word.map(|word| word.len());

    let candidates = word.one_of(vec!["a".to_owned(), "toad".to_owned(), "newt".to_owned()]);
    let solutions: HashSet<Option<String>> = candidates
        .and(length.equals(4))
        .apply(&State::new())
        .map(move |state| state.value(&word))
        .collect();

    assert_eq!(
        solutions,
        HashSet::from([Some("toad".to_owned()), Some("newt".to_owned())])
    );
}

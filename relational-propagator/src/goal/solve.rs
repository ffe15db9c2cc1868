use crate::goal::Goal;
use crate::unification::State;
use crate::variable::Variable;
use fairumerator::Generator;

/// Runs the goal `block` builds over one fresh query variable,
/// starting from the empty state, and yields the variable's value in
/// each satisfying state.
///
/// A state that satisfies the goal without grounding the query
/// variable contributes nothing to the output.
pub fn solve<V>(block: impl FnOnce(&Variable<V>) -> Goal) -> Generator<V>
where
    V: PartialEq + Clone + 'static,
{
    let variable = Variable::new();
    let goal = block(&variable);
    goal.apply(&State::new())
        .filter_map(move |state| state.value(&variable))
}

/// Runs the goal `block` builds over a caller-populated vector of
/// query variables, and yields all their values per satisfying state.
///
/// A state contributes only if every query variable is ground in it.
pub fn solve_vars<V>(block: impl FnOnce(&mut Vec<Variable<V>>) -> Goal) -> Generator<Vec<V>>
where
    V: PartialEq + Clone + 'static,
{
    let mut variables = Vec::new();
    let goal = block(&mut variables);
    goal.apply(&State::new()).filter_map(move |state| {
        let mut values = Vec::with_capacity(variables.len());
        for variable in &variables {
            match state.value(variable) {
                Some(value) => values.push(value),
                None => return None,
            }
        }
        Some(values)
    })
}

#[test]
fn test_solve_projects_the_query_variable() {
    let solutions: Vec<i32> = solve(|v: &Variable<i32>| v.equals(5)).collect();
    assert_eq!(solutions, vec![5]);
}

#[test]
fn test_solve_covers_every_alternative() {
    use std::collections::HashSet;

    let solutions: HashSet<i32> =
        solve(|v: &Variable<i32>| v.equals(5).or(v.equals(6))).collect();
    assert_eq!(solutions, HashSet::from([5, 6]));
}

#[test]
fn test_solve_skips_states_leaving_the_query_unbound() {
    let solutions: Vec<i32> =
        solve(|_: &Variable<i32>| Goal::custom(|state| Generator::once(state.clone()))).collect();
    assert!(solutions.is_empty());
}

#[test]
fn test_solve_vars_projects_every_query_variable() {
    let mut solutions: Vec<Vec<i32>> = solve_vars(|variables: &mut Vec<Variable<i32>>| {
        let x = Variable::new();
        let y = Variable::new();
        variables.push(x.clone());
        variables.push(y.clone());
        x.equals(1).and(y.one_of(vec![2, 3]))
    })
    .collect();

    solutions.sort();
    assert_eq!(solutions, vec![vec![1, 2], vec![1, 3]]);
}

#[test]
fn test_solve_vars_skips_partially_bound_solutions() {
    let solutions: Vec<Vec<i32>> = solve_vars(|variables: &mut Vec<Variable<i32>>| {
        let x = Variable::new();
        let y = Variable::new();
        variables.push(x.clone());
        variables.push(y.clone());

        // The second branch succeeds without ever grounding y.
        let leaves_y_open = Goal::custom(|state| Generator::once(state.clone()));
        x.equals(1).and(y.equals(2).or(leaves_y_open))
    })
    .collect();

    assert_eq!(solutions, vec![vec![1, 2]]);
}

#[test]
fn test_solve_a_small_lineup_puzzle() {
    use crate::goal::all;
    use crate::goal::distinct;
    use crate::goal::passing;

    // Three slots drawn from {1, 2, 3}, pairwise distinct, with the
    // first strictly below the last.
    let mut solutions: Vec<Vec<i32>> = solve_vars(|variables: &mut Vec<Variable<i32>>| {
        for _ in 0..3 {
            variables.push(Variable::new());
        }
        let first = variables[0].clone();
        let middle = variables[1].clone();
        let last = variables[2].clone();

        let domains = all(variables
            .iter()
            .map(|slot| slot.one_of(vec![1, 2, 3]))
            .collect());
        domains
            .and(distinct(&[&first, &middle, &last]))
            .and(Goal::from(passing(&first, &last, |first, last| first < last)))
    })
    .collect();

    solutions.sort();
    assert_eq!(solutions, vec![vec![1, 2, 3], vec![1, 3, 2], vec![2, 1, 3]]);
}

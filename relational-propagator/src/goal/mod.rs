//! Goals, constraints, and the search entry points.
//!
//! A [`Constraint`] is a predicate over a state.  The constructors
//! here share one convention: an unbound operand makes the predicate
//! pass vacuously.  Combined with the store's replay of accumulated
//! constraints after every binding change, that convention lets a
//! constraint be declared long before its operands are ground and
//! still prune every inconsistent state the search proposes.
//!
//! A [`Goal`] turns constraint checking into nondeterministic search:
//! it maps one state to a lazy stream of successor states.  [`all`]
//! threads states through its subgoals left to right, so conjunction
//! preserves the order bindings are made in.  [`any`] fans one state
//! out to every subgoal and interleaves the resulting streams fairly,
//! round robin, so a branch with infinitely many solutions cannot
//! starve its siblings.  Failure inside a goal never escapes as an
//! error; it surfaces as a shorter stream.
//!
//! [`solve`] and [`solve_vars`] run a goal from the empty state and
//! project each satisfying state down to the values of the query
//! variables.
mod combinators;
mod constraint;
mod passing;
mod solve;

pub use combinators::all;
pub use combinators::any;
pub use combinators::distinct;
pub use combinators::Goal;
pub use constraint::equal;
pub use constraint::equal_value;
pub use constraint::unequal;
pub use constraint::unequal_values;
pub use constraint::Constraint;
pub use passing::negate;
pub use passing::passing;
pub use passing::passing_value;
pub use passing::within;
pub use solve::solve;
pub use solve::solve_vars;

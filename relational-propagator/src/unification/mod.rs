//! The binding store at the heart of the solver.
//!
//! A [`State`] maps each logical variable's identity to an
//! equivalence group, and each group to an `Info` record holding the
//! group's bound value (if any), the propagation closures registered
//! on it, and an index of the decomposition components derived from
//! it.  Three operations change a state, and each returns a fresh
//! snapshot: binding a group to a value, merging two groups, and
//! accumulating a constraint.
//!
//! Two invariants hold for every state an operation returns.  First,
//! bindings are consistent: a group holds at most one value, and an
//! operation that would give it a second, unequal one fails instead.
//! Second, the constraint list passes: after any change to the
//! bindings, every accumulated constraint is replayed against the
//! candidate state, and a rejection fails the whole operation.
//! Failure never damages anything, since the receiver of a failed
//! operation is unchanged and still valid.
//!
//! Derived variables make propagation interesting.  A derived
//! variable's closures are wired lazily, the first time a state
//! touches it: wiring registers each direction's closure on the group
//! that should re-fire it, converges with any sibling wired earlier
//! under the same derivation key, then runs every closure once to pick
//! up bindings that predate the wiring.  From then on the closures
//! behave like monotone propagators.  Binding a source projects its
//! components; binding the last component reconstructs the source;
//! merging two decomposed groups merges their components pairwise,
//! cascading until no merge implies another.
mod state;

pub use state::State;

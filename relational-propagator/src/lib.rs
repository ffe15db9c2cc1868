//! A relational programming kernel in the miniKanren tradition.
//!
//! Callers declare logical [`Variable`]s, relate them with goals
//! (equality, inequality, arbitrary predicates, conjunction,
//! disjunction), and lazily enumerate every assignment that satisfies
//! all of them.  Search states are immutable snapshots, so the engine
//! forks them freely; solutions stream back through a fair
//! [`Generator`] that never lets one infinite branch starve another.
//!
//! Variables can also be viewed through pure transformations:
//! [`Variable::bimap`] derives a variable isomorphic to its source,
//! `bimap2` through `bimap6` decompose a source into sibling parts
//! that reconstruct it once all are known, and [`AsProperty::map`]
//! derives read-only views for use in constraints.  Bindings flow
//! through all of these automatically, in both directions.
//!
//! ```
//! use relational_propagator::solve;
//! use relational_propagator::Variable;
//!
//! let solutions: Vec<i32> =
//!     solve(|n: &Variable<i32>| n.one_of(vec![1, 2, 3]).and(n.differs(2))).collect();
//!
//! assert_eq!(solutions.len(), 2);
//! assert!(solutions.contains(&1));
//! assert!(solutions.contains(&3));
//! ```
mod error;
mod goal;
mod store;
mod unification;
mod variable;

pub use error::Result;
pub use error::UnificationError;
pub use fairumerator::Generator;
pub use goal::all;
pub use goal::any;
pub use goal::distinct;
pub use goal::equal;
pub use goal::equal_value;
pub use goal::negate;
pub use goal::passing;
pub use goal::passing_value;
pub use goal::solve;
pub use goal::solve_vars;
pub use goal::unequal;
pub use goal::unequal_values;
pub use goal::within;
pub use goal::Constraint;
pub use goal::Goal;
pub use unification::State;
pub use variable::AsProperty;
pub use variable::Property;
pub use variable::Variable;

//! The one way things fail around here.
use thiserror::Error;

/// Two values that must coincide turned out not to: a group was bound
/// twice to unequal values, a bijection propagated a value that clashed
/// with an existing binding, or an accumulated constraint rejected a
/// candidate state.
///
/// Carries no payload.  Failure is local to one branch of the search,
/// and the only thing any caller does with it is abandon that branch.
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
#[error("unification failure: conflicting values for one variable group")]
pub struct UnificationError;

/// Shorthand for results whose only failure mode is `UnificationError`.
pub type Result<T> = std::result::Result<T, UnificationError>;

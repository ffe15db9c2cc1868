//! Logical variables and the views built on them.
//!
//! A `Variable<V>` is a typed handle on one storage slot.  The handle
//! carries everything unification will eventually need to know about
//! the variable's relationships: its identity, and the table of
//! propagation closures declared by the derivation that produced it
//! (empty for plain variables).  Derivations come in two shapes: an
//! unkeyed one-to-one `bimap`, and keyed N-way decompositions
//! (`bimap2`..`bimap6`) whose derived identities are structural.  Any
//! two call sites that decompose the same source under the same key
//! name the same derived variable.
//!
//! A `Property<V>` is the read-only cousin: a view of a variable
//! through a pure transform, with no propagation of its own.  Equality
//! and inequality constraints key their operands on properties so that
//! reading `length(name)` and reading `name` count as touching the
//! same variable.
mod identity;
mod property;
mod typed;

pub use property::AsProperty;
pub use property::Property;
pub use typed::Variable;

pub(crate) use identity::Identity;
pub(crate) use identity::Value;
pub(crate) use typed::Bijection;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared test fixture: a struct-valued variable and its standard
    //! two-way decomposition.
    use super::Variable;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct Point {
        pub(crate) x: i32,
        pub(crate) y: i32,
    }

    pub(crate) fn point_parts(point: &Variable<Point>) -> (Variable<i32>, Variable<i32>) {
        point.bimap2("point.parts", |p| (p.x, p.y), |(x, y)| Point { x, y })
    }
}

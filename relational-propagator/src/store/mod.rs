//! The persistent equivalence store.
//!
//! Binding a logical variable means writing through its key here;
//! unifying two variables means merging their groups.  The store knows
//! nothing about either operation: it only guarantees that group
//! members share one value, that merges union member sets, and that a
//! cloned store is forever independent of the original.  Those three
//! guarantees are what make states cheap to fork and safe to abandon
//! mid-search.
mod context;

pub use context::Context;

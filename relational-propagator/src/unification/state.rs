use crate::error::Result;
use crate::error::UnificationError;
use crate::goal::Constraint;
use crate::store::Context;
use crate::variable::AsProperty;
use crate::variable::Bijection;
use crate::variable::Identity;
use crate::variable::Value;
use crate::variable::Variable;
use log::trace;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Everything one equivalence group knows about itself.
#[derive(Clone, Default)]
struct Info {
    /// The group's bound value, if it is ground.
    value: Option<Value>,

    /// Derivation key to derived identity.  One entry per
    /// decomposition component already wired from this group; repeated
    /// decompositions converge through this map, and merging two
    /// decomposed groups must also merge children claiming the same
    /// key.
    derived: HashMap<String, Identity>,

    /// Write-target identity to propagation closure.  Every closure
    /// here reads this group, so all of them re-fire whenever the
    /// group's value changes.
    bijections: HashMap<Identity, Bijection>,
}

impl Info {
    /// The starting record for a freshly wired derived variable: no
    /// value, and the one closure that reconstructs its source.
    fn seeded(target: Identity, bijection: Bijection) -> Self {
        let mut bijections = HashMap::new();
        bijections.insert(target, bijection);
        Self {
            value: None,
            derived: HashMap::new(),
            bijections,
        }
    }
}

/// An immutable snapshot of every binding made so far, plus the
/// constraints accumulated along the way.
///
/// All mutating operations are copy-on-write: they return a new
/// `State` and leave the receiver untouched, so a failed operation
/// never corrupts anything and a search engine can fork one snapshot
/// into as many branches as it likes.  A `State` that an operation
/// returns is always *valid*: every accumulated constraint passed
/// against it after the last binding change.
#[derive(Clone, Default)]
pub struct State {
    context: Context<Identity, Info>,
    constraints: Vec<Constraint>,
}

impl State {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `variable`'s bound value, if its group is ground.
    ///
    /// Reading a derived variable wires its bijections first, which
    /// can propagate existing bindings around; if that propagation
    /// uncovers a conflict, there is no consistent value to read and
    /// the result is `None`.
    #[must_use]
    pub fn value<V>(&self, variable: &Variable<V>) -> Option<V>
    where
        V: PartialEq + Clone + 'static,
    {
        let state = self.bijected(variable).ok()?;
        let payload = state.raw_value(variable.identity())?;
        let value = payload
            .downcast_ref::<V>()
            .expect("group payload must match its declared value type")
            .clone();
        Some(value)
    }

    /// Returns a property's view of its group's bound value, if the
    /// group is ground.  Properties carry no bijections, so this is a
    /// plain read: nothing is wired, nothing propagates.
    #[must_use]
    pub fn project<P: AsProperty>(&self, property: &P) -> Option<P::Value> {
        let property = property.as_property();
        let payload = self.raw_value(property.identity())?;
        Some(property.project(&payload))
    }

    /// Binds `variable` to `value`.
    ///
    /// Propagates through every bijection registered on the group and
    /// replays the accumulated constraints before returning.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the group is already bound to an unequal
    /// value, if a propagated binding conflicts somewhere, or if a
    /// constraint rejects the result.
    pub fn bind<V>(&self, variable: &Variable<V>, value: V) -> Result<State>
    where
        V: PartialEq + Clone + 'static,
    {
        self.bijected(variable)?
            .bind_erased(variable.identity(), Arc::new(value) as Value)
    }

    /// Declares `lhs` and `rhs` equal, merging their groups.
    ///
    /// If both groups are decomposed, their matching decomposition
    /// children are merged as well, transitively.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the two groups hold unequal values, if a
    /// propagated binding conflicts somewhere, or if a constraint
    /// rejects the result.
    pub fn unify<V>(&self, lhs: &Variable<V>, rhs: &Variable<V>) -> Result<State>
    where
        V: PartialEq + Clone + 'static,
    {
        self.bijected(lhs)?
            .bijected(rhs)?
            .unify_erased(lhs.identity(), rhs.identity())
    }

    /// Adds `constraint` to the state, checking it immediately.
    ///
    /// Every later binding change replays it, so the constraint holds
    /// in any state reachable from this one.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the constraint already rejects this state.
    pub fn constrain(&self, constraint: Constraint) -> Result<State> {
        constraint.check(self)?;
        let mut state = self.clone();
        state.constraints.push(constraint);
        Ok(state)
    }

    /// Reads the erased payload of `identity`'s group, without wiring
    /// anything.
    pub(crate) fn raw_value(&self, identity: &Identity) -> Option<Value> {
        self.context
            .get(identity)
            .and_then(|info| info.value.clone())
    }

    /// Binds `identity`'s group to an erased payload: the write half
    /// of every propagation closure.
    pub(crate) fn bind_erased(&self, identity: &Identity, value: Value) -> Result<State> {
        let mut state = self.clone();
        let mut info = state.context.get(identity).cloned().unwrap_or_default();

        if let Some(existing) = &info.value {
            if identity.values_equal(existing, &value) {
                // Re-binding the same value is a no-op, and in
                // particular does not re-fire the propagations; that
                // is what terminates propagation cycles.
                return Ok(state);
            }
            trace!("rejected bind: {identity:?} is already bound to a different value");
            return Err(UnificationError);
        }

        info.value = Some(value);
        let propagations: Vec<Bijection> = info.bijections.values().cloned().collect();
        state.context.insert(identity.clone(), info);

        for bijection in propagations {
            state = (*bijection)(&state)?;
        }
        state.verify_constraints()?;

        Ok(state)
    }

    /// Ensures `variable`'s declared bijections are wired into this
    /// state, on the first touch of a derived variable.
    ///
    /// Wiring registers each peer's closure on the source group,
    /// creates (or converges with) the peers' own groups, runs every
    /// closure once to propagate any binding that already exists, and
    /// replays the constraints.
    fn bijected<V>(&self, variable: &Variable<V>) -> Result<State>
    where
        V: PartialEq + Clone + 'static,
    {
        let identity = variable.identity();

        // Either this lineage already wired the variable, or there is
        // nothing to wire.
        if self.context.get(identity).is_some() || variable.bijections().is_empty() {
            return Ok(self.clone());
        }

        let source = match identity.basis() {
            Some(basis) => basis.source.clone(),
            None => variable
                .bijections()
                .keys()
                .find(|peer| *peer != identity)
                .expect("a derivation always lists a peer")
                .clone(),
        };
        let reverse = variable
            .bijections()
            .get(&source)
            .expect("a derivation always links back to its source")
            .clone();

        let mut state = self.clone();
        let mut info = state.context.get(&source).cloned().unwrap_or_default();
        for (peer, bijection) in variable.bijections() {
            if *peer == source {
                continue;
            }

            info.bijections.insert(peer.clone(), bijection.clone());
            match peer.basis() {
                Some(basis) => match info.derived.entry(basis.key.clone()) {
                    Entry::Occupied(existing) => {
                        // Another handle already wired this component:
                        // adopt its group.  The new peer cannot have a
                        // value yet, so the existing info wins as is.
                        let existing = existing.get().clone();
                        state.context.merge(existing, peer.clone(), |kept, _| {
                            Ok::<_, UnificationError>(kept.cloned())
                        })?;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(peer.clone());
                        state
                            .context
                            .insert(peer.clone(), Info::seeded(source.clone(), reverse.clone()));
                    }
                },
                None => {
                    state
                        .context
                        .insert(peer.clone(), Info::seeded(source.clone(), reverse.clone()));
                }
            }
        }
        state.context.insert(source, info);

        let propagations: Vec<Bijection> = variable.bijections().values().cloned().collect();
        for bijection in propagations {
            state = (*bijection)(&state)?;
        }
        state.verify_constraints()?;

        Ok(state)
    }

    /// Merges the groups of two identities, both already wired.
    fn unify_erased(&self, lhs: &Identity, rhs: &Identity) -> Result<State> {
        let mut state = self.clone();

        // Merging two decomposed groups schedules merges between their
        // children; the queue is drained here rather than recursing so
        // deep decomposition chains cannot overflow the stack.
        let mut pending = vec![(lhs.clone(), rhs.clone())];
        while let Some((lhs, rhs)) = pending.pop() {
            state = state.merge_pair(&lhs, &rhs, &mut pending)?;
        }

        Ok(state)
    }

    /// Merges one pair of groups, pushing any implied child merges
    /// onto `pending`.
    fn merge_pair(
        &self,
        lhs: &Identity,
        rhs: &Identity,
        pending: &mut Vec<(Identity, Identity)>,
    ) -> Result<State> {
        let mut state = self.clone();

        state.context.merge(lhs.clone(), rhs.clone(), |left, right| {
            let left_value = left.and_then(|info| info.value.as_ref());
            let right_value = right.and_then(|info| info.value.as_ref());
            if let (Some(left_value), Some(right_value)) = (left_value, right_value) {
                if !lhs.values_equal(left_value, right_value) {
                    trace!("rejected merge: {lhs:?} and {rhs:?} hold different values");
                    return Err(UnificationError);
                }
            }

            let info = Info {
                value: left_value.or(right_value).cloned(),
                // Both sides of a shared derivation register the same
                // closure pair, so on a key collision either entry
                // will do.
                bijections: merged_maps(
                    left.map(|info| &info.bijections),
                    right.map(|info| &info.bijections),
                    |kept, _| kept.clone(),
                ),
                // A derivation key claimed by both sides with distinct
                // identities means both groups decomposed the same
                // component; those children must merge too.
                derived: merged_maps(
                    left.map(|info| &info.derived),
                    right.map(|info| &info.derived),
                    |kept, other| {
                        if kept != other {
                            pending.push((kept.clone(), other.clone()));
                        }
                        kept.clone()
                    },
                ),
            };
            Ok(Some(info))
        })?;

        let info = state
            .context
            .get(lhs)
            .cloned()
            .expect("a merged group always has an info record");
        for bijection in info.bijections.into_values() {
            state = (*bijection)(&state)?;
        }
        state.verify_constraints()?;

        Ok(state)
    }

    fn verify_constraints(&self) -> Result<()> {
        for constraint in &self.constraints {
            if constraint.check(self).is_err() {
                trace!("constraint rejected a candidate state");
                return Err(UnificationError);
            }
        }
        Ok(())
    }
}

/// Key-wise union of two optional maps; `on_both` resolves keys
/// present on both sides.
fn merged_maps<K, T>(
    left: Option<&HashMap<K, T>>,
    right: Option<&HashMap<K, T>>,
    mut on_both: impl FnMut(&T, &T) -> T,
) -> HashMap<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    let mut result = left.cloned().unwrap_or_default();
    if let Some(right) = right {
        for (key, value) in right {
            match result.entry(key.clone()) {
                Entry::Occupied(mut existing) => {
                    let merged = on_both(existing.get(), value);
                    existing.insert(merged);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value.clone());
                }
            }
        }
    }
    result
}

#[test]
fn test_bind_then_read() {
    let x = Variable::<i32>::new();

    let state = State::new().bind(&x, 5).expect("ok");
    assert_eq!(state.value(&x), Some(5));

    // A state that never saw the variable has no value for it.
    assert_eq!(State::new().value(&x), None);
}

#[test]
fn test_binding_is_idempotent() {
    let x = Variable::<i32>::new();

    let state = State::new()
        .bind(&x, 5)
        .expect("ok")
        .bind(&x, 5)
        .expect("rebinding the same value is fine");
    assert_eq!(state.value(&x), Some(5));
}

#[test]
fn test_conflicting_bindings_fail_in_either_order() {
    let x = Variable::<i32>::new();

    let bound_a = State::new().bind(&x, 1).expect("ok");
    assert!(bound_a.bind(&x, 2).is_err());

    let bound_b = State::new().bind(&x, 2).expect("ok");
    assert!(bound_b.bind(&x, 1).is_err());
}

#[test]
fn test_failed_operation_leaves_the_original_usable() {
    let x = Variable::<i32>::new();

    let state = State::new().bind(&x, 1).expect("ok");
    assert!(state.bind(&x, 2).is_err());
    assert_eq!(state.value(&x), Some(1));
}

#[test]
fn test_transitive_merge() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    // Merge first, bind second.
    let state = State::new()
        .unify(&x, &y)
        .expect("ok")
        .bind(&y, 7)
        .expect("ok");
    assert_eq!(state.value(&x), Some(7));

    // Bind first, merge second.
    let state = State::new()
        .bind(&y, 7)
        .expect("ok")
        .unify(&x, &y)
        .expect("ok");
    assert_eq!(state.value(&x), Some(7));
}

#[test]
fn test_merging_bound_groups() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    // Equal values merge fine.
    let state = State::new()
        .bind(&x, 3)
        .expect("ok")
        .bind(&y, 3)
        .expect("ok")
        .unify(&x, &y)
        .expect("ok");
    assert_eq!(state.value(&x), Some(3));

    // Unequal values do not.
    let state = State::new()
        .bind(&x, 3)
        .expect("ok")
        .bind(&y, 4)
        .expect("ok");
    assert!(state.unify(&x, &y).is_err());
}

#[test]
fn test_unify_is_idempotent() {
    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    let state = State::new()
        .unify(&x, &y)
        .expect("ok")
        .unify(&x, &y)
        .expect("ok")
        .bind(&x, 9)
        .expect("ok");
    assert_eq!(state.value(&y), Some(9));
}

#[test]
fn test_constraint_replay_on_later_bindings() {
    use crate::goal::equal_value;

    let x = Variable::<i32>::new();
    let y = Variable::<i32>::new();

    // Vacuously fine while both operands are unbound.
    let state = State::new()
        .constrain(equal_value(&[&x, &y], 4))
        .expect("ok");

    // A binding that violates the constraint is rejected outright.
    assert!(state.bind(&x, 5).is_err());

    // Bindings that satisfy it go through.
    let state = state.bind(&x, 4).expect("ok").bind(&y, 4).expect("ok");
    assert_eq!(state.value(&y), Some(4));
}

#[test]
fn test_constrain_checks_immediately() {
    use crate::goal::equal_value;

    let x = Variable::<i32>::new();

    let state = State::new().bind(&x, 5).expect("ok");
    assert!(state.constrain(equal_value(&[&x], 4)).is_err());
}

#[test]
fn test_binding_the_source_reaches_the_parts() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let (x, y) = point_parts(&p);

    let state = State::new().bind(&p, Point { x: 1, y: 2 }).expect("ok");
    assert_eq!(state.value(&x), Some(1));
    assert_eq!(state.value(&y), Some(2));
}

#[test]
fn test_binding_all_parts_reconstructs_the_source() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let (x, y) = point_parts(&p);

    // One part alone is not enough to reconstruct.
    let partial = State::new().bind(&x, 1).expect("ok");
    assert_eq!(partial.value(&p), None);

    let state = partial.bind(&y, 2).expect("ok");
    assert_eq!(state.value(&p), Some(Point { x: 1, y: 2 }));
}

#[test]
fn test_parts_conflicting_with_the_source_fail() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let (x, _) = point_parts(&p);

    let state = State::new().bind(&p, Point { x: 1, y: 2 }).expect("ok");
    assert!(state.bind(&x, 3).is_err());
    assert_eq!(state.bind(&x, 1).expect("ok").value(&x), Some(1));
}

#[test]
fn test_convergent_handles_share_bindings() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let (x1, _) = point_parts(&p);
    let (x2, y2) = point_parts(&p);

    // Binding through one handle is visible through the other.
    let state = State::new().bind(&x1, 4).expect("ok");
    assert_eq!(state.value(&x2), Some(4));

    let state = state.bind(&y2, 6).expect("ok");
    assert_eq!(state.value(&p), Some(Point { x: 4, y: 6 }));
}

#[test]
fn test_one_to_one_bimap_propagates_both_ways() {
    let celsius = Variable::<i32>::new();
    let fahrenheit = celsius.bimap(|c| c * 9 / 5 + 32, |f: i32| (f - 32) * 5 / 9);

    let state = State::new().bind(&celsius, 100).expect("ok");
    assert_eq!(state.value(&fahrenheit), Some(212));

    let state = State::new().bind(&fahrenheit, 32).expect("ok");
    assert_eq!(state.value(&celsius), Some(0));
}

#[test]
fn test_merging_decomposed_variables_cascades_to_children() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let q = Variable::<Point>::new();
    let (px, py) = point_parts(&p);
    let (qx, qy) = point_parts(&q);

    // Each point knows one coordinate; unifying the points must fuse
    // the part groups and reconstruct both wholes.
    let state = State::new()
        .bind(&px, 1)
        .expect("ok")
        .bind(&qy, 2)
        .expect("ok")
        .unify(&p, &q)
        .expect("ok");

    assert_eq!(state.value(&p), Some(Point { x: 1, y: 2 }));
    assert_eq!(state.value(&q), Some(Point { x: 1, y: 2 }));
    assert_eq!(state.value(&qx), Some(1));
    assert_eq!(state.value(&py), Some(2));
}

#[test]
fn test_merging_decomposed_variables_detects_child_conflicts() {
    use crate::variable::fixtures::point_parts;
    use crate::variable::fixtures::Point;

    let p = Variable::<Point>::new();
    let q = Variable::<Point>::new();
    let (px, _) = point_parts(&p);
    let (qx, _) = point_parts(&q);

    let state = State::new()
        .bind(&px, 1)
        .expect("ok")
        .bind(&qx, 5)
        .expect("ok");
    assert!(state.unify(&p, &q).is_err());
}

#[test]
fn test_project_reads_through_the_transform() {
    let name = Variable::<String>::new();
    let length = name.map(|s| s.len());

    let state = State::new().bind(&name, "hello".to_owned()).expect("ok");
    assert_eq!(state.project(&length), Some(5));

    // An unbound group projects to nothing.
    assert_eq!(State::new().project(&length), None);
}

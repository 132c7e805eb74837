//! Multi-component joins (spec §3 "Entity query"): "iterate all entities
//! bearing components `(A, B, …)` optionally excluding `(X, Y)`", cost
//! proportional to the smallest participating component.

use super::{Component, Ledger};
use crate::entity::EntityId;
use std::any::TypeId;

pub(super) fn join(ledger: &Ledger, include: &[TypeId], exclude: &[TypeId]) -> Vec<EntityId> {
    let Some(&smallest) = include.iter().min_by_key(|t| ledger.column_len_pub(**t)) else {
        return Vec::new();
    };
    ledger
        .column_keys_pub(smallest)
        .into_iter()
        .filter(|e| include.iter().all(|t| ledger.column_contains_pub(*t, *e)))
        .filter(|e| exclude.iter().all(|t| !ledger.column_contains_pub(*t, *e)))
        .collect()
}

/// Typed convenience wrapper over [`join`] for the common two-component
/// case, returning each matching entity alongside references to both of its
/// component values.
pub fn join2<'a, A: Component, B: Component>(ledger: &'a Ledger) -> Vec<(EntityId, &'a A, &'a B)> {
    let entities = join(ledger, &[TypeId::of::<A>(), TypeId::of::<B>()], &[]);
    let col_a = ledger.column::<A>();
    let col_b = ledger.column::<B>();
    entities
        .into_iter()
        .filter_map(|e| Some((e, col_a?.get(e)?, col_b?.get(e)?)))
        .collect()
}

/// Entities bearing `A` but not `B` — the shape used repeatedly by the
/// order pipeline (e.g. `Purchase` not yet `Order`, spec §4.3).
pub fn with_not<A: Component, B: Component>(ledger: &Ledger) -> Vec<EntityId> {
    join(ledger, &[TypeId::of::<A>()], &[TypeId::of::<B>()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;

    #[derive(Debug, Default, Clone, Copy)]
    struct A(i32);
    #[derive(Debug, Default, Clone, Copy)]
    struct B(i32);

    #[test]
    fn join_respects_exclusion() {
        let mut ledger = Ledger::new("TEST");
        let e1 = ledger.create_entity();
        let e2 = ledger.create_entity();
        ledger.insert_component(e1, A(1));
        ledger.insert_component(e2, A(2));
        ledger.insert_component(e1, B(1));

        let only_a = with_not::<A, B>(&ledger);
        assert_eq!(only_a, vec![e2]);
    }
}

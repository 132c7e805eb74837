use crate::entity::EntityId;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;

/// Marker implemented for every type that may be stored as a ledger
/// component. Blanket-implemented; components carry no extra requirements
/// beyond the lifetime/thread-safety the ledger itself needs.
pub trait Component: Any + Send + Sync + fmt::Debug {}
impl<T: Any + Send + Sync + fmt::Debug> Component for T {}

/// A single component type's storage: an insertion-ordered map from
/// [`EntityId`] to value. Lookup, insertion and removal are amortised
/// constant time via the underlying hash index; iteration visits entities
/// in insertion order, matching the contract in spec §3.
#[derive(Debug)]
pub struct Column<T> {
    values: IndexMap<EntityId, T>,
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }
}

impl<T> Column<T> {
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.values.insert(entity, value)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        // shift_remove preserves insertion order of the remaining entries;
        // deletion is rare (spec §3) so the O(n) shift cost is acceptable.
        self.values.shift_remove(&entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.values.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.values.get_mut(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.values.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entities bearing this component, in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (EntityId, &T)> {
        self.values.iter().map(|(e, v)| (*e, v))
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = EntityId> + '_ {
        self.values.keys().copied()
    }

    /// Entities with an id greater than `since`, in insertion order. Used by
    /// [`crate::ledger::Ledger::new_entities`] once the smallest requested
    /// column has been chosen.
    pub fn since(&self, since: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.values.keys().copied().filter(move |e| *e > since)
    }

    /// The greatest entity id currently stored, or `EntityId::NIL` if empty.
    pub fn max_entity(&self) -> EntityId {
        self.values.keys().copied().max().unwrap_or(EntityId::NIL)
    }

    /// The most recently inserted `(entity, value)` pair, if any.
    pub fn last(&self) -> Option<(EntityId, &T)> {
        self.values.iter().next_back().map(|(e, v)| (*e, v))
    }

    /// The `(entity, value)` pair immediately preceding `entity` in
    /// insertion order, or `None` if `entity` is absent or first.
    pub fn previous(&self, entity: EntityId) -> Option<(EntityId, &T)> {
        let idx = self.values.get_index_of(&entity)?;
        idx.checked_sub(1).and_then(|i| self.values.get_index(i)).map(|(e, v)| (*e, v))
    }

    /// The last `window` values ending at (and including) `entity`, in
    /// insertion order, or `None` if `entity` is absent or fewer than
    /// `window` entities precede it (spec §8: SMA/MovingStdDev "otherwise
    /// undefined and not produced"). O(window) via `IndexMap`'s O(1)
    /// index lookup.
    pub fn window_ending_at(&self, entity: EntityId, window: usize) -> Option<Vec<&T>> {
        let idx = self.values.get_index_of(&entity)?;
        if idx + 1 < window {
            return None;
        }
        let start = idx + 1 - window;
        Some((start..=idx).map(|i| self.values.get_index(i).expect("bounds checked").1).collect())
    }
}

/// Type-erased handle onto a [`Column<T>`], stored in the ledger's component
/// registry keyed by `TypeId`.
pub(crate) trait AnyColumn: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn len(&self) -> usize;
    fn remove_entity(&mut self, entity: EntityId);
    fn contains(&self, entity: EntityId) -> bool;
    fn keys(&self) -> Vec<EntityId>;
}

impl<T: Component> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        Column::len(self)
    }

    fn remove_entity(&mut self, entity: EntityId) {
        self.remove(entity);
    }

    fn contains(&self, entity: EntityId) -> bool {
        Column::contains(self, entity)
    }

    fn keys(&self) -> Vec<EntityId> {
        Column::keys(self).collect()
    }
}

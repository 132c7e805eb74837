//! Typed, column-oriented entity store (spec §3/§4.1). A [`Ledger`] owns one
//! [`Column`] per component type, a monotonic [`EntityId`] allocator, the
//! change-tracking high-water-marks consumed by [`Ledger::new_entities`],
//! and an ordered list of [`Stage`]s of [`System`]s.

pub mod column;
pub mod error;
pub mod query;
pub mod stage;

pub use column::{Column, Component};
pub use error::LedgerError;
pub use stage::{Stage, System};

use crate::entity::{EntityAllocator, EntityId};
use column::AnyColumn;
use std::any::TypeId;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Marker for component types of which at most one instance may exist in a
/// given ledger (spec §3 invariants: `Clock`, `Cash`, `PurchasePower`).
pub trait Singleton: Component {}

/// Describes a component a [`System`] reads or writes, used by the ledger to
/// (a) lazily create missing numeric columns, (b) compute the high-water
/// mark for [`Ledger::new_entities`], and (c) pick the smallest column for
/// an incremental scan or join.
#[derive(Clone, Copy)]
pub struct ComponentMeta {
    pub type_id: TypeId,
    pub name: &'static str,
    pub numeric: bool,
    create_empty: fn(&mut Ledger),
}

impl ComponentMeta {
    pub fn of<T: Component + Default>(name: &'static str, numeric: bool) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
            numeric,
            create_empty: |ledger| {
                ledger.ensure_column::<T>();
            },
        }
    }
}

impl std::fmt::Debug for ComponentMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentMeta")
            .field("name", &self.name)
            .field("numeric", &self.numeric)
            .finish()
    }
}

/// A typed, column-oriented store keyed by opaque [`EntityId`]s (spec §3).
#[derive(Default)]
pub struct Ledger {
    pub(crate) id: String,
    entities: EntityAllocator,
    columns: HashMap<TypeId, Box<dyn AnyColumn>>,
    singleton_types: std::collections::HashSet<TypeId>,
    watermarks: HashMap<(&'static str, TypeId), EntityId>,
    stages: Vec<Stage>,
    pub(crate) indicators_wanted: indexmap::IndexMap<TypeId, crate::indicator::IndicatorSpec>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("id", &self.id)
            .field("columns", &self.columns.len())
            .field("stages", &self.stages.iter().map(Stage::name).collect::<Vec<_>>())
            .finish()
    }
}

impl Ledger {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        info!(ledger = %id, "constructed new Ledger instance");
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn create_entity(&mut self) -> EntityId {
        self.entities.alloc()
    }

    /// Ensures a [`Column<T>`] exists, creating an empty one if absent.
    pub fn ensure_column<T: Component + Default>(&mut self) -> &mut Column<T> {
        self.columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::<Column<T>>::default())
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .expect("component registry type invariant")
    }

    pub fn has_column<T: Component>(&self) -> bool {
        self.columns.contains_key(&TypeId::of::<T>())
    }

    pub fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&TypeId::of::<T>())
            .map(|c| c.as_any().downcast_ref::<Column<T>>().expect("type invariant"))
    }

    pub fn column_mut<T: Component + Default>(&mut self) -> &mut Column<T> {
        self.ensure_column::<T>()
    }

    pub fn insert_component<T: Component + Default>(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.ensure_column::<T>().insert(entity, value)
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        let type_id = TypeId::of::<T>();
        self.columns
            .get_mut(&type_id)
            .and_then(|c| c.as_any_mut().downcast_mut::<Column<T>>())
            .and_then(|c| c.remove(entity))
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.column::<T>().map_or(false, |c| c.contains(entity))
    }

    /// Registers `T` as a [`Singleton`] type and inserts its sole instance.
    /// A second insertion for a type already singleton-registered is fatal
    /// (spec §4.1 "Failure semantics").
    pub fn insert_singleton<T: Component + Default + Singleton>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<(), LedgerError> {
        let type_id = TypeId::of::<T>();
        let already_present = self.column::<T>().map_or(false, |c| !c.is_empty());
        if already_present {
            error!(component = std::any::type_name::<T>(), "duplicate singleton insert rejected");
            return Err(LedgerError::DuplicateSingleton {
                component: std::any::type_name::<T>(),
            });
        }
        self.singleton_types.insert(type_id);
        self.ensure_column::<T>().insert(entity, value);
        Ok(())
    }

    pub fn singleton<T: Component + Singleton>(&self) -> Result<&T, LedgerError> {
        self.column::<T>()
            .and_then(|c| c.iter().next())
            .map(|(_, v)| v)
            .ok_or(LedgerError::MissingSingleton {
                component: std::any::type_name::<T>(),
            })
    }

    pub fn singleton_mut<T: Component + Singleton>(&mut self) -> Result<&mut T, LedgerError> {
        let missing = || LedgerError::MissingSingleton {
            component: std::any::type_name::<T>(),
        };
        let col = self.columns.get_mut(&TypeId::of::<T>()).ok_or_else(missing)?;
        let col = col.as_any_mut().downcast_mut::<Column<T>>().expect("type invariant");
        let entity = col.keys().next().ok_or_else(missing)?;
        col.get_mut(entity).ok_or_else(missing)
    }

    pub fn singleton_entity<T: Component + Singleton>(&self) -> Option<EntityId> {
        self.column::<T>().and_then(|c| c.keys().next())
    }

    fn column_len(&self, type_id: TypeId) -> usize {
        self.columns.get(&type_id).map_or(0, |c| c.len())
    }

    fn column_keys(&self, type_id: TypeId) -> Vec<EntityId> {
        self.columns.get(&type_id).map(|c| c.keys()).unwrap_or_default()
    }

    fn column_contains(&self, type_id: TypeId, entity: EntityId) -> bool {
        self.columns.get(&type_id).map_or(false, |c| c.contains(entity))
    }

    /// Ensures every component a system requests is registered, lazily
    /// creating numeric columns and erroring fatally for anything else
    /// (spec §4.1 "Failure semantics").
    pub fn ensure_requested(&mut self, system: &'static str, requested: &[ComponentMeta]) -> Result<(), LedgerError> {
        for meta in requested {
            if self.columns.contains_key(&meta.type_id) {
                continue;
            }
            if meta.numeric {
                debug!(system, component = meta.name, "lazily registering numeric component column");
                (meta.create_empty)(self);
            } else {
                error!(system, component = meta.name, "unregistered non-numeric component requested");
                return Err(LedgerError::UnregisteredComponent {
                    system,
                    component: meta.name,
                });
            }
        }
        Ok(())
    }

    /// Entities added to the smallest of `system`'s requested components
    /// since the previous call with this `system` name (spec §3 "Change
    /// tracking"). `requested` must already be registered (see
    /// [`Ledger::ensure_requested`]).
    pub fn new_entities(&mut self, system: &'static str, requested: &[ComponentMeta]) -> Vec<EntityId> {
        let Some(smallest) = requested.iter().min_by_key(|m| self.column_len(m.type_id)) else {
            return Vec::new();
        };
        let key = (system, smallest.type_id);
        let since = *self.watermarks.get(&key).unwrap_or(&EntityId::NIL);
        let mut fresh: Vec<EntityId> = self
            .column_keys(smallest.type_id)
            .into_iter()
            .filter(|e| *e > since)
            .collect();
        fresh.sort_unstable();
        if let Some(&max) = fresh.iter().max() {
            self.watermarks.insert(key, max);
        }
        fresh
    }

    /// Resets every recorded high-water-mark for `system`, so the next
    /// [`Ledger::new_entities`] call for it starts from the beginning
    /// (used by `DayCloser`, spec §4.3).
    pub fn reset_watermarks(&mut self, system: &'static str) {
        self.watermarks.retain(|(s, _), _| *s != system);
    }

    /// Type-erased join: entities bearing every type in `include` and none
    /// in `exclude`, cost proportional to the smallest `include` column
    /// (spec §3 "Entity query").
    pub fn join(&self, include: &[TypeId], exclude: &[TypeId]) -> Vec<EntityId> {
        query::join(self, include, exclude)
    }

    pub(crate) fn column_len_pub(&self, type_id: TypeId) -> usize {
        self.column_len(type_id)
    }

    pub(crate) fn column_keys_pub(&self, type_id: TypeId) -> Vec<EntityId> {
        self.column_keys(type_id)
    }

    pub(crate) fn column_contains_pub(&self, type_id: TypeId, entity: EntityId) -> bool {
        self.column_contains(type_id, entity)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut Vec<Stage> {
        &mut self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    pub fn stage_position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name() == name)
    }

    pub fn known_component_types(&self) -> Vec<TypeId> {
        self.columns.keys().copied().collect()
    }

    /// Records that `spec`'s component is wanted, seeding the indicator
    /// dependency solver (spec §4.2). Registering the same component twice
    /// is a no-op.
    pub fn want_indicator(&mut self, spec: crate::indicator::IndicatorSpec) {
        self.indicators_wanted.entry(spec.component_type).or_insert(spec);
    }

    pub fn wanted_indicators(&self) -> impl Iterator<Item = &crate::indicator::IndicatorSpec> {
        self.indicators_wanted.values()
    }

    pub(crate) fn indicators_wanted_len(&self) -> usize {
        self.indicators_wanted.len()
    }

    /// Runs every stage, in order, against this ledger. A system error
    /// aborts the tick and is surfaced to the caller (spec §7 category 4).
    pub fn run_stages(&mut self) -> Result<(), LedgerError> {
        let stages = std::mem::take(&mut self.stages);
        let mut result = Ok(());
        for stage in &stages {
            for system in stage.systems() {
                if let Err(err) = system.run(self) {
                    error!(stage = stage.name(), system = system.name(), %err, "system failed, aborting tick");
                    result = Err(err);
                    break;
                }
            }
            if result.is_err() {
                break;
            }
        }
        self.stages = stages;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Close(f64);

    #[test]
    fn insert_and_iterate_preserves_insertion_order() {
        let mut ledger = Ledger::new("TEST");
        let e1 = ledger.create_entity();
        let e2 = ledger.create_entity();
        let e3 = ledger.create_entity();
        ledger.insert_component(e1, Close(1.0));
        ledger.insert_component(e2, Close(2.0));
        ledger.insert_component(e3, Close(3.0));

        let values: Vec<_> = ledger.column::<Close>().unwrap().iter().map(|(_, v)| v.0).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn new_entities_yields_only_unseen_entities() {
        let mut ledger = Ledger::new("TEST");
        let e1 = ledger.create_entity();
        ledger.insert_component(e1, Close(1.0));

        let meta = [ComponentMeta::of::<Close>("Close", true)];
        let first = ledger.new_entities("sys", &meta);
        assert_eq!(first, vec![e1]);

        let e2 = ledger.create_entity();
        ledger.insert_component(e2, Close(2.0));
        let second = ledger.new_entities("sys", &meta);
        assert_eq!(second, vec![e2]);

        let third = ledger.new_entities("sys", &meta);
        assert!(third.is_empty());
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Clock {
        time: i64,
    }
    impl Singleton for Clock {}

    #[test]
    fn duplicate_singleton_insert_is_fatal() {
        let mut ledger = Ledger::new("MAIN");
        let e1 = ledger.create_entity();
        ledger.insert_singleton(e1, Clock { time: 0 }).unwrap();

        let e2 = ledger.create_entity();
        let err = ledger.insert_singleton(e2, Clock { time: 1 }).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSingleton { .. }));
    }

    #[test]
    fn missing_singleton_is_fatal() {
        let ledger = Ledger::new("MAIN");
        let err = ledger.singleton::<Clock>().unwrap_err();
        assert!(matches!(err, LedgerError::MissingSingleton { .. }));
    }
}

use super::{ComponentMeta, Ledger, LedgerError};

/// A unit of computation invoked once per tick on a [`Ledger`] (spec
/// GLOSSARY "System").
pub trait System: Send + Sync {
    /// Stable name, used as the key for change-tracking high-water-marks
    /// and for log output.
    fn name(&self) -> &'static str;

    /// Components this system reads or writes. The ledger uses this to
    /// lazily register missing numeric columns and to compute
    /// [`Ledger::new_entities`] (spec §4.1 "Per-system requested
    /// components").
    fn requests(&self) -> Vec<ComponentMeta>;

    /// Executes the system against `ledger`. Systems must never suspend
    /// (spec §5 "Suspension points").
    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError>;
}

/// An ordered list of [`System`]s invoked together (spec GLOSSARY "Stage").
pub struct Stage {
    name: &'static str,
    systems: Vec<Box<dyn System>>,
}

impl Stage {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            systems: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn systems(&self) -> &[Box<dyn System>] {
        &self.systems
    }

    pub fn push(&mut self, system: Box<dyn System>) -> &mut Self {
        self.systems.push(system);
        self
    }

    pub fn contains(&self, system_name: &str) -> bool {
        self.systems.iter().any(|s| s.name() == system_name)
    }

    pub fn push_if_absent(&mut self, system: Box<dyn System>) {
        if !self.contains(system.name()) {
            self.systems.push(system);
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("systems", &self.systems.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Ensures `ledger` requests for `system` are registered, runs it, then
/// updates its change-tracking watermark. Thin helper so calculator/pipeline
/// systems don't repeat this three-step dance in every `System::run` impl.
pub fn run_with_bookkeeping(
    ledger: &mut Ledger,
    system: &dyn System,
    body: impl FnOnce(&mut Ledger, &[ComponentMeta]) -> Result<(), LedgerError>,
) -> Result<(), LedgerError> {
    let requested = system.requests();
    ledger.ensure_requested(system.name(), &requested)?;
    body(ledger, &requested)
}

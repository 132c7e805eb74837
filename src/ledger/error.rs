use thiserror::Error;

/// All errors generated in the [`crate::ledger`] module.
///
/// Every variant here corresponds to a "structural violation" in the sense
/// of the runtime's error-handling design: these are fatal, the tick that
/// produced them aborts, and the error is surfaced to the caller of
/// `Trader::run`/`Trader::step`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("singleton component {component} missing from ledger")]
    MissingSingleton { component: &'static str },

    #[error("attempted to insert second singleton component {component}")]
    DuplicateSingleton { component: &'static str },

    #[error("system {system} requested unregistered non-numeric component {component}")]
    UnregisteredComponent {
        system: &'static str,
        component: &'static str,
    },

    #[error("failed to build struct due to incomplete attributes provided")]
    BuilderIncomplete,

    #[error("entity {entity} does not bear component {component}")]
    MissingComponent {
        entity: crate::entity::EntityId,
        component: &'static str,
    },
}

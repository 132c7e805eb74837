//! Declarative indicator registration (spec §4.2 registration-rule table).
//!
//! Each concrete instantiation — e.g. `SMA<20, Close>` — is "wanted" once,
//! at a call site where its horizon and source type are known at compile
//! time (`want_sma::<20, Close>(ledger)`). That call records an
//! [`IndicatorSpec`]: a small, `Copy` descriptor carrying the component's
//! identity plus three monomorphised, non-capturing function pointers
//! (`ensure_self`, `prerequisites`, `install_systems`) baked in at the call
//! site. [`super::solver::ensure_solved`] then walks this registry to a
//! fixed point purely through those function pointers — it never needs to
//! reconstruct a concrete Rust type from a runtime `TypeId`.

use super::calculators::{
    BollingerCalculator, DifferenceCalculator, EmaCalculator, LogValCalculator, MovingStdDevCalculator,
    RelativeDifferenceCalculator, RsiCalculator, SharpeCalculator, SmaCalculator, UpDownSeparator,
};
use super::{Bollinger, Difference, Indicator, LogVal, RelativeDifference, Sharpe, UpDown, EMA, RSI, SMA};
use crate::ledger::{Component, Ledger, System};
use std::any::{type_name, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    LogVal,
    Sma,
    Ema,
    MovingStdDev,
    Difference,
    RelativeDifference,
    UpDown,
    Rsi,
    Bollinger,
    Sharpe,
}

/// A declarative record of one wanted indicator component (spec §4.2).
#[derive(Clone, Copy)]
pub struct IndicatorSpec {
    pub component_type: TypeId,
    pub component_name: &'static str,
    pub kind: IndicatorKind,
    pub horizon: Option<usize>,
    pub source_type: TypeId,
    pub source_name: &'static str,
    pub(crate) ensure_self: fn(&mut Ledger),
    pub(crate) prerequisites: fn() -> Vec<IndicatorSpec>,
    pub(crate) install_systems: fn() -> Vec<Box<dyn System>>,
}

impl std::fmt::Debug for IndicatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorSpec")
            .field("kind", &self.kind)
            .field("horizon", &self.horizon)
            .field("component", &self.component_name)
            .field("source", &self.source_name)
            .finish()
    }
}

impl IndicatorSpec {
    pub fn log_val<S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<LogVal<S>>(),
            component_name: type_name::<LogVal<S>>(),
            kind: IndicatorKind::LogVal,
            horizon: None,
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<LogVal<S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(LogValCalculator::<S>::new())],
        }
    }

    pub fn sma<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<SMA<H, S>>(),
            component_name: type_name::<SMA<H, S>>(),
            kind: IndicatorKind::Sma,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<SMA<H, S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(SmaCalculator::<H, S>::new())],
        }
    }

    pub fn ema<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<EMA<H, S>>(),
            component_name: type_name::<EMA<H, S>>(),
            kind: IndicatorKind::Ema,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<EMA<H, S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(EmaCalculator::<H, S>::new())],
        }
    }

    pub fn moving_std_dev<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<super::MovingStdDev<H, S>>(),
            component_name: type_name::<super::MovingStdDev<H, S>>(),
            kind: IndicatorKind::MovingStdDev,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<super::MovingStdDev<H, S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(MovingStdDevCalculator::<H, S>::new())],
        }
    }

    pub fn difference<S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<Difference<S>>(),
            component_name: type_name::<Difference<S>>(),
            kind: IndicatorKind::Difference,
            horizon: None,
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<Difference<S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(DifferenceCalculator::<S>::new())],
        }
    }

    pub fn relative_difference<S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<RelativeDifference<S>>(),
            component_name: type_name::<RelativeDifference<S>>(),
            kind: IndicatorKind::RelativeDifference,
            horizon: None,
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<RelativeDifference<S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(RelativeDifferenceCalculator::<S>::new())],
        }
    }

    pub fn up_down<S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<UpDown<S>>(),
            component_name: type_name::<UpDown<S>>(),
            kind: IndicatorKind::UpDown,
            horizon: None,
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<UpDown<S>>();
            },
            prerequisites: || Vec::new(),
            install_systems: || vec![Box::new(UpDownSeparator::<S>::new())],
        }
    }

    /// `RSI<H,S>` ensures `EMA<H, UpDown<Difference<S>>>` (spec §4.2 table).
    pub fn rsi<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<RSI<H, S>>(),
            component_name: type_name::<RSI<H, S>>(),
            kind: IndicatorKind::Rsi,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<RSI<H, S>>();
            },
            // Listed in execution order: each entry must be computed before
            // the next, since `ensure_solved` installs their calculators in
            // this same order ahead of `RsiCalculator` itself.
            prerequisites: || {
                vec![
                    IndicatorSpec::difference::<S>(),
                    IndicatorSpec::up_down::<Difference<S>>(),
                    IndicatorSpec::ema::<H, UpDown<Difference<S>>>(),
                ]
            },
            install_systems: || vec![Box::new(RsiCalculator::<H, S>::new())],
        }
    }

    /// `Bollinger<H,S>` ensures `SMA<H,S>` and `S` (spec §4.2 table).
    pub fn bollinger<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<Bollinger<H, S>>(),
            component_name: type_name::<Bollinger<H, S>>(),
            kind: IndicatorKind::Bollinger,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<Bollinger<H, S>>();
            },
            prerequisites: || vec![IndicatorSpec::sma::<H, S>()],
            install_systems: || vec![Box::new(BollingerCalculator::<H, S>::new())],
        }
    }

    /// `Sharpe<H,S>` ensures `SMA<H,S>` and `MovingStdDev<H,S>` (spec §4.2
    /// table).
    pub fn sharpe<const H: usize, S: Indicator + Component>() -> Self {
        Self {
            component_type: TypeId::of::<Sharpe<H, S>>(),
            component_name: type_name::<Sharpe<H, S>>(),
            kind: IndicatorKind::Sharpe,
            horizon: Some(H),
            source_type: TypeId::of::<S>(),
            source_name: type_name::<S>(),
            ensure_self: |l| {
                l.ensure_column::<Sharpe<H, S>>();
            },
            prerequisites: || vec![IndicatorSpec::sma::<H, S>(), IndicatorSpec::moving_std_dev::<H, S>()],
            install_systems: || vec![Box::new(SharpeCalculator::<H, S>::new())],
        }
    }
}

macro_rules! want_fn {
    ($fn_name:ident, $ctor:ident $(, const $h:ident)?) => {
        pub fn $fn_name<$(const $h: usize,)? S: Indicator + Component>(ledger: &mut Ledger) {
            ledger.want_indicator(IndicatorSpec::$ctor::<$($h,)? S>());
        }
    };
}

want_fn!(want_log_val, log_val);
want_fn!(want_sma, sma, const H);
want_fn!(want_ema, ema, const H);
want_fn!(want_moving_std_dev, moving_std_dev, const H);
want_fn!(want_difference, difference);
want_fn!(want_relative_difference, relative_difference);
want_fn!(want_up_down, up_down);
want_fn!(want_rsi, rsi, const H);
want_fn!(want_bollinger, bollinger, const H);
want_fn!(want_sharpe, sharpe, const H);

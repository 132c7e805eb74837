//! Derived indicator components and the dependency solver that installs the
//! systems required to populate them (spec §4.2).

pub mod calculators;
pub mod solver;
pub mod spec;

pub use solver::{ensure_solved, SolverReport};
pub use spec::{
    want_bollinger, want_difference, want_ema, want_log_val, want_moving_std_dev, want_relative_difference, want_rsi,
    want_sharpe, want_sma, want_up_down, IndicatorKind, IndicatorSpec,
};

use crate::ledger::Component;
use std::marker::PhantomData;

/// Capability set required of any component participating as an
/// "indicator" in an aggregate system such as a moving average (spec
/// §4.1/§9). Implemented by the primitive bar types and by every derived
/// indicator component below.
pub trait Indicator: Component + Copy + Default {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn scale(self, factor: f64) -> Self;
    fn sqrt(self) -> Self;
    fn value(self) -> f64;
}

impl Indicator for f64 {
    fn zero() -> Self {
        0.0
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn value(self) -> f64 {
        self
    }
}

/// Natural log of a source series (registration rule: ensures `S`, installs
/// the LogVal calculator).
#[derive(Debug, Clone, Copy)]
pub struct LogVal<S> {
    pub value: f64,
    _src: PhantomData<S>,
}

impl<S: Indicator> Default for LogVal<S> {
    fn default() -> Self {
        Self {
            value: 0.0,
            _src: PhantomData,
        }
    }
}

/// Simple moving average over the last `H` values of `S`.
#[derive(Debug, Clone, Copy)]
pub struct SMA<const H: usize, S: Indicator> {
    pub value: S,
}

impl<const H: usize, S: Indicator> Default for SMA<H, S> {
    fn default() -> Self {
        Self { value: S::zero() }
    }
}

/// Exponential moving average of `S` with smoothing factor `2/(H+1)`.
#[derive(Debug, Clone, Copy)]
pub struct EMA<const H: usize, S: Indicator> {
    pub value: S,
}

impl<const H: usize, S: Indicator> Default for EMA<H, S> {
    fn default() -> Self {
        Self { value: S::zero() }
    }
}

/// Sample standard deviation over the last `H` values of `S`.
#[derive(Debug, Clone, Copy)]
pub struct MovingStdDev<const H: usize, S> {
    pub value: f64,
    _src: PhantomData<S>,
}

impl<const H: usize, S: Indicator> Default for MovingStdDev<H, S> {
    fn default() -> Self {
        Self {
            value: 0.0,
            _src: PhantomData,
        }
    }
}

/// First difference: `S(e) - S(e_prev)`.
#[derive(Debug, Clone, Copy)]
pub struct Difference<S: Indicator> {
    pub value: S,
}

impl<S: Indicator> Default for Difference<S> {
    fn default() -> Self {
        Self { value: S::zero() }
    }
}

/// Lets a `Difference<S>` series itself feed a further aggregate (the `EMA`
/// inside RSI smooths `UpDown<Difference<S>>`, which in turn wraps
/// `Difference<S>` values).
impl<S: Indicator> Indicator for Difference<S> {
    fn zero() -> Self {
        Self { value: S::zero() }
    }
    fn add(self, other: Self) -> Self {
        Self {
            value: self.value.add(other.value),
        }
    }
    fn scale(self, factor: f64) -> Self {
        Self {
            value: self.value.scale(factor),
        }
    }
    fn sqrt(self) -> Self {
        Self {
            value: self.value.sqrt(),
        }
    }
    fn value(self) -> f64 {
        self.value.value()
    }
}

/// Relative (percentage) difference: `(S(e) - S(e_prev)) / S(e_prev)`.
#[derive(Debug, Clone, Copy)]
pub struct RelativeDifference<S> {
    pub value: f64,
    _src: PhantomData<S>,
}

impl<S: Indicator> Default for RelativeDifference<S> {
    fn default() -> Self {
        Self {
            value: 0.0,
            _src: PhantomData,
        }
    }
}

/// Separates a `Difference<S>`-shaped series into its positive ("up") and
/// negative ("down") magnitude, componentwise, so it can itself serve as
/// the source of an aggregate (e.g. the `EMA` inside RSI).
#[derive(Debug, Clone, Copy)]
pub struct UpDown<S: Indicator> {
    pub up: S,
    pub down: S,
}

impl<S: Indicator> Default for UpDown<S> {
    fn default() -> Self {
        Self {
            up: S::zero(),
            down: S::zero(),
        }
    }
}

impl<S: Indicator> Indicator for UpDown<S> {
    fn zero() -> Self {
        Self {
            up: S::zero(),
            down: S::zero(),
        }
    }
    fn add(self, other: Self) -> Self {
        Self {
            up: self.up.add(other.up),
            down: self.down.add(other.down),
        }
    }
    fn scale(self, factor: f64) -> Self {
        Self {
            up: self.up.scale(factor),
            down: self.down.scale(factor),
        }
    }
    fn sqrt(self) -> Self {
        Self {
            up: self.up.sqrt(),
            down: self.down.sqrt(),
        }
    }
    fn value(self) -> f64 {
        self.up.value() - self.down.value()
    }
}

/// Relative Strength Index over `S` with horizon `H`, value in `[0, 100]`.
#[derive(Debug, Clone, Copy)]
pub struct RSI<const H: usize, S> {
    pub value: f64,
    _src: PhantomData<S>,
}

impl<const H: usize, S: Indicator> Default for RSI<H, S> {
    fn default() -> Self {
        Self {
            value: 50.0,
            _src: PhantomData,
        }
    }
}

/// Bollinger band: `SMA<H,S>` plus/minus `k` sample standard deviations of
/// the same window (`k` is fixed at 2.0, the conventional value).
#[derive(Debug, Clone, Copy, Default)]
pub struct Bollinger<const H: usize, S> {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    _src: PhantomData<S>,
}

/// Sharpe ratio over the last `H` values of `S`: mean divided by sample
/// standard deviation of the same window.
#[derive(Debug, Clone, Copy)]
pub struct Sharpe<const H: usize, S> {
    pub value: f64,
    _src: PhantomData<S>,
}

impl<const H: usize, S: Indicator> Default for Sharpe<H, S> {
    fn default() -> Self {
        Self {
            value: 0.0,
            _src: PhantomData,
        }
    }
}

//! Calculator systems installed by the indicator dependency solver (spec
//! §4.2). Each one requests only the component(s) it reads — never its own
//! output — so [`Ledger::new_entities`] change tracking stays correct, and
//! attaches its result to the same entity as the source bar that produced
//! it, never creating a new one.

use super::{Bollinger, Difference, Indicator, LogVal, MovingStdDev, RelativeDifference, Sharpe, UpDown, EMA, RSI, SMA};
use crate::ledger::{stage::run_with_bookkeeping, Component, ComponentMeta, Ledger, LedgerError, System};
use std::any::type_name;
use std::marker::PhantomData;

pub struct LogValCalculator<S>(PhantomData<S>);

impl<S: Indicator + Component> LogValCalculator<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Indicator + Component> System for LogValCalculator<S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let source = *ledger.column::<S>().expect("ensured above").get(entity).expect("fresh entity");
                ledger.insert_component(
                    entity,
                    LogVal::<S> {
                        value: source.value().ln(),
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

pub struct SmaCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> SmaCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<const H: usize, S: Indicator + Component> System for SmaCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let Some(window) = ledger.column::<S>().expect("ensured above").window_ending_at(entity, H) else {
                    continue;
                };
                let sum = window.into_iter().fold(S::zero(), |acc, v| acc.add(*v));
                ledger.insert_component(entity, SMA::<H, S> { value: sum.scale(1.0 / H as f64) });
            }
            Ok(())
        })
    }
}

pub struct EmaCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> EmaCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }

    fn alpha() -> f64 {
        2.0 / (H as f64 + 1.0)
    }
}

impl<const H: usize, S: Indicator + Component> System for EmaCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            let alpha = Self::alpha();
            for entity in ledger.new_entities(self.name(), requested) {
                let current = *ledger.column::<S>().expect("ensured above").get(entity).expect("fresh entity");
                let previous = ledger.column::<EMA<H, S>>().and_then(|c| c.last()).map(|(_, v)| v.value);
                let value = match previous {
                    Some(prev) => current.scale(alpha).add(prev.scale(1.0 - alpha)),
                    None => current,
                };
                ledger.insert_component(entity, EMA::<H, S> { value });
            }
            Ok(())
        })
    }
}

pub struct MovingStdDevCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> MovingStdDevCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<const H: usize, S: Indicator + Component> System for MovingStdDevCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let Some(window) = ledger.column::<S>().expect("ensured above").window_ending_at(entity, H) else {
                    continue;
                };
                let values: Vec<f64> = window.into_iter().map(|v| v.value()).collect();
                let std = sample_std_dev(&values);
                ledger.insert_component(
                    entity,
                    MovingStdDev::<H, S> {
                        value: std,
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

pub struct DifferenceCalculator<S>(PhantomData<S>);

impl<S: Indicator + Component> DifferenceCalculator<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Indicator + Component> System for DifferenceCalculator<S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let column = ledger.column::<S>().expect("ensured above");
                let Some((_, previous)) = column.previous(entity) else {
                    continue;
                };
                let current = *column.get(entity).expect("fresh entity");
                let previous = *previous;
                ledger.insert_component(entity, Difference::<S> { value: current.add(previous.scale(-1.0)) });
            }
            Ok(())
        })
    }
}

pub struct RelativeDifferenceCalculator<S>(PhantomData<S>);

impl<S: Indicator + Component> RelativeDifferenceCalculator<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Indicator + Component> System for RelativeDifferenceCalculator<S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let column = ledger.column::<S>().expect("ensured above");
                let Some((_, previous)) = column.previous(entity) else {
                    continue;
                };
                let previous = previous.value();
                let current = column.get(entity).expect("fresh entity").value();
                if previous == 0.0 {
                    continue;
                }
                ledger.insert_component(
                    entity,
                    RelativeDifference::<S> {
                        value: (current - previous) / previous,
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

pub struct UpDownSeparator<S>(PhantomData<S>);

impl<S: Indicator + Component> UpDownSeparator<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Indicator + Component> System for UpDownSeparator<S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<S>(type_name::<S>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let source = *ledger.column::<S>().expect("ensured above").get(entity).expect("fresh entity");
                let magnitude = source.value();
                let up_down = if magnitude >= 0.0 {
                    UpDown { up: source, down: S::zero() }
                } else {
                    UpDown {
                        up: S::zero(),
                        down: source.scale(-1.0),
                    }
                };
                ledger.insert_component(entity, up_down);
            }
            Ok(())
        })
    }
}

pub struct RsiCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> RsiCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<const H: usize, S: Indicator + Component> System for RsiCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<EMA<H, UpDown<Difference<S>>>>(
            type_name::<EMA<H, UpDown<Difference<S>>>>(),
            true,
        )]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let smoothed = ledger
                    .column::<EMA<H, UpDown<Difference<S>>>>()
                    .expect("ensured above")
                    .get(entity)
                    .expect("fresh entity")
                    .value;
                let up = smoothed.up.value();
                let down = smoothed.down.value();
                let value = if down == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + up / down)
                };
                ledger.insert_component(
                    entity,
                    RSI::<H, S> {
                        value,
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

pub struct BollingerCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> BollingerCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<const H: usize, S: Indicator + Component> System for BollingerCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<SMA<H, S>>(type_name::<SMA<H, S>>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        const K: f64 = 2.0;
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let mid = ledger
                    .column::<SMA<H, S>>()
                    .expect("ensured above")
                    .get(entity)
                    .expect("fresh entity")
                    .value
                    .value();
                let Some(window) = ledger.column::<S>().and_then(|c| c.window_ending_at(entity, H)) else {
                    continue;
                };
                let values: Vec<f64> = window.into_iter().map(|v| v.value()).collect();
                let std = sample_std_dev(&values);
                ledger.insert_component(
                    entity,
                    Bollinger::<H, S> {
                        upper: mid + K * std,
                        mid,
                        lower: mid - K * std,
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

pub struct SharpeCalculator<const H: usize, S>(PhantomData<S>);

impl<const H: usize, S: Indicator + Component> SharpeCalculator<H, S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<const H: usize, S: Indicator + Component> System for SharpeCalculator<H, S> {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn requests(&self) -> Vec<ComponentMeta> {
        vec![ComponentMeta::of::<MovingStdDev<H, S>>(type_name::<MovingStdDev<H, S>>(), true)]
    }

    fn run(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        run_with_bookkeeping(ledger, self, |ledger, requested| {
            for entity in ledger.new_entities(self.name(), requested) {
                let Some(mean) = ledger.column::<SMA<H, S>>().and_then(|c| c.get(entity)).map(|v| v.value.value()) else {
                    continue;
                };
                let std_dev = ledger
                    .column::<MovingStdDev<H, S>>()
                    .expect("ensured above")
                    .get(entity)
                    .expect("fresh entity")
                    .value;
                if std_dev == 0.0 {
                    continue;
                }
                ledger.insert_component(
                    entity,
                    Sharpe::<H, S> {
                        value: mean / std_dev,
                        _src: PhantomData,
                    },
                );
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Close;
    use crate::indicator::{want_rsi, want_sma};

    #[test]
    fn sma_waits_for_full_window_then_reports_mean() {
        let mut ledger = Ledger::new("TEST");
        want_sma::<3, Close>(&mut ledger);
        let report = crate::indicator::ensure_solved(&mut ledger);
        assert!(report.systems_installed >= 1);

        for close in [1.0, 2.0, 3.0, 4.0] {
            let e = ledger.create_entity();
            ledger.insert_component(e, Close(close));
        }
        ledger.run_stages().unwrap();

        let values: Vec<f64> = ledger.column::<SMA<3, Close>>().unwrap().iter().map(|(_, v)| v.value.0).collect();
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn rsi_chain_produces_bounded_value() {
        let mut ledger = Ledger::new("TEST");
        want_rsi::<2, Close>(&mut ledger);
        crate::indicator::ensure_solved(&mut ledger);

        for close in [10.0, 11.0, 10.5, 12.0, 13.0] {
            let e = ledger.create_entity();
            ledger.insert_component(e, Close(close));
            ledger.run_stages().unwrap();
        }

        let rsi_values: Vec<f64> = ledger.column::<RSI<2, Close>>().unwrap().iter().map(|(_, v)| v.value).collect();
        assert!(!rsi_values.is_empty());
        assert!(rsi_values.iter().all(|v| (0.0..=100.0).contains(v)));
    }
}

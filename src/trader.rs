//! Top-level orchestrator: owns the main ledger, one [`AssetLedger`] per
//! observed ticker plus one combined ledger per strategy, the registered
//! strategies, and a [`Broker`] (spec §2 "three cooperative tasks", §5
//! "Concurrency & resource model").

use crate::asset_ledger::AssetLedger;
use crate::bars::Bar;
use crate::broker::Broker;
use crate::indicator::ensure_solved;
use crate::ledger::Ledger;
use crate::portfolio::{Cash, Clock, PurchasePower};
use crate::statistic::TradingSummary;
use crate::strategy::pipeline::{snapshot_purchase_power, DayCloser, Filler, Purchaser, Seller, SnapShotter, Timer};
use crate::strategy::{Strategy, StrategyError};
use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// `{broker, strategies, start, dtime}` plus the back-tester-only fee
/// fields (spec §6 "Trader configuration surface"). `dtime` is the
/// historical-mode tick step `Timer::advance` applies to `Clock.time`
/// (spec §8 "`Clock.time(k) = Clock.time(k-1) + dtime`"); it is ignored in
/// live mode, where `Timer::publish` sets `Clock.time` to wall time
/// instead. The fee fields are consumed by the caller when constructing a
/// [`crate::broker::HistoricalBroker`]; `Trader` itself is broker-agnostic.
#[derive(Debug, Clone, Copy)]
pub struct TraderConfig {
    pub start: DateTime<Utc>,
    pub dtime: Duration,
    pub starting_cash: f64,
}

/// Stop flags a caller can set to cancel the three cooperative live tasks
/// between iterations (spec §5 "Cancellation").
#[derive(Debug, Clone, Default)]
pub struct StopFlags {
    pub main: Arc<AtomicBool>,
    pub trading: Arc<AtomicBool>,
    pub data: Arc<AtomicBool>,
}

impl StopFlags {
    pub fn request_stop_all(&self) {
        self.main.store(true, Ordering::SeqCst);
        self.trading.store(true, Ordering::SeqCst);
        self.data.store(true, Ordering::SeqCst);
    }
}

/// Selects how [`Trader::tick`] advances `Clock.time` (spec §4.3 `Timer`).
#[derive(Debug, Clone, Copy)]
pub enum ClockMode {
    /// `Clock.time += Clock.dtime`.
    Historical,
    /// `Clock.time = now`; the live task supplies wall time.
    Live(DateTime<Utc>),
}

/// Owns the ledgers, strategies, and broker, and drives the tick pipeline
/// identically whether `B` resolves fills synchronously (historical) or
/// against a live venue (spec §2).
pub struct Trader<B: Broker> {
    main: Ledger,
    assets: HashMap<String, AssetLedger>,
    combined: HashMap<String, AssetLedger>,
    strategies: Vec<Strategy>,
    broker: B,
    summary: TradingSummary,
    last_day: Option<u32>,
}

impl<B: Broker> Trader<B> {
    pub fn new(config: TraderConfig, strategies: Vec<Strategy>, broker: B) -> Result<Self, StrategyError> {
        let mut main = Ledger::new("MAIN");
        let clock_entity = main.create_entity();
        main.insert_singleton(
            clock_entity,
            Clock {
                time: config.start,
                dtime: config.dtime,
            },
        )?;
        let cash_entity = main.create_entity();
        main.insert_singleton(
            cash_entity,
            Cash {
                cash: config.starting_cash,
            },
        )?;
        let power_entity = main.create_entity();
        main.insert_singleton(power_entity, PurchasePower::default())?;

        let mut assets = HashMap::new();
        let mut combined = HashMap::new();
        for strategy in &strategies {
            for ticker in &strategy.config.tickers {
                assets.entry(ticker.clone()).or_insert_with(|| AssetLedger::new(ticker.clone()));
            }
            let combined_id = strategy.config.combined_id();
            combined.entry(combined_id.clone()).or_insert_with(|| AssetLedger::new(combined_id));
        }

        Ok(Self {
            main,
            assets,
            combined,
            strategies,
            broker,
            summary: TradingSummary::new(config.starting_cash),
            last_day: None,
        })
    }

    pub fn summary(&self) -> &TradingSummary {
        &self.summary
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Appends a bar to `ticker`'s asset ledger (spec §3 "Lifecycle").
    pub fn push_bar(&mut self, ticker: &str, bar: Bar) {
        if let Some(asset) = self.assets.get_mut(ticker) {
            asset.push_bar(bar);
        }
    }

    fn within_trading_day(&self) -> bool {
        // A deliberately simple session definition: any instant is "within
        // the trading day" for a back-test over pre-filtered session bars.
        // Calendar-aware sessions are a venue concern outside this core
        // (spec §1 "Explicitly out of scope").
        true
    }

    /// One full pass of the pipeline: indicators → strategies → orders →
    /// fills → snapshot → clock → day close (spec §2, §4.3). `clock` picks
    /// between the historical virtual-clock advance and the live wall-clock
    /// publish (spec §4.3 `Timer`).
    pub async fn tick(&mut self, clock: ClockMode) -> Result<(), StrategyError> {
        for asset in self.assets.values_mut() {
            ensure_solved(asset.ledger_mut());
            asset.ledger_mut().run_stages()?;
        }

        snapshot_purchase_power(&mut self.main)?;

        let within_day = self.within_trading_day();
        for strategy in &self.strategies {
            if !strategy.is_active(within_day) {
                continue;
            }
            let combined_id = strategy.config.combined_id();
            let Some(mut combined) = self.combined.remove(&combined_id) else {
                continue;
            };
            for system in &strategy.systems {
                system.run(&mut self.main, &mut self.assets, &mut combined)?;
            }
            self.combined.insert(combined_id, combined);
        }

        Purchaser::run(&mut self.main, &mut self.broker).await?;
        Seller::run(&mut self.main, &mut self.broker).await?;
        Filler::run(&mut self.main)?;
        SnapShotter::run(&mut self.main, &self.broker, &mut self.summary)?;

        match clock {
            ClockMode::Historical => Timer::advance(&mut self.main)?,
            ClockMode::Live(now) => Timer::publish(&mut self.main, now)?,
        }
        let after_day = self.main.singleton::<Clock>()?.time.ordinal();

        if self.last_day.is_some_and(|d| d != after_day) {
            info!(day = after_day, "day boundary crossed, resetting strategy watermarks");
            let system_names: Vec<&'static str> = self.strategies.iter().flat_map(|s| s.systems.iter().map(|sys| sys.name())).collect();
            DayCloser::run(self.assets.values_mut().chain(self.combined.values_mut()), &system_names);
        }
        self.last_day = Some(after_day);

        Ok(())
    }
}

impl<B: Broker> Trader<B> {
    /// Drives `ticks` synchronous ticks of the deterministic historical
    /// loop — "three tasks collapse into one loop" (spec §5 "Historical
    /// mode"). The caller is responsible for pushing that tick's bars
    /// (via [`Trader::push_bar`]) before each call, mirroring how a replay
    /// driver feeds bars ahead of the virtual clock.
    pub async fn run_historical_tick(&mut self) -> Result<(), StrategyError> {
        self.tick(ClockMode::Historical).await
    }
}

impl<B: Broker + 'static> Trader<B> {
    /// Spawns the main task of the live three-task model (spec §5): waits
    /// on `new_data`, then ticks the pipeline with the live clock. The data
    /// task — pushing bars from a live venue into asset ledgers — is a
    /// concrete market-data client, explicitly out of scope here (spec §1);
    /// this only requires that whoever drives it signals `new_data` after
    /// each push, per the contract below.
    pub fn spawn_main_task(trader: Arc<AsyncMutex<Self>>, stop: &StopFlags, new_data: Arc<Notify>) -> JoinHandle<()> {
        let stop = stop.main.clone();
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                new_data.notified().await;
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let now = Utc::now();
                let mut guard = trader.lock().await;
                if let Err(err) = guard.tick(ClockMode::Live(now)).await {
                    error!(%err, "live tick failed, aborting main task");
                    break;
                }
            }
        })
    }

    /// Spawns the trading task of the live three-task model (spec §5):
    /// drains order-update events from the broker. Besides the data task's
    /// own subscription, this is the only other suspension point (spec §5
    /// "Suspension points"); `Filler` still settles state from `Order`
    /// directly, so a dropped update here costs nothing but a log line.
    pub fn spawn_trading_task(trader: Arc<AsyncMutex<Self>>, stop: &StopFlags) -> JoinHandle<()> {
        let stop = stop.trading.clone();
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                let update = {
                    let mut guard = trader.lock().await;
                    guard.broker.receive_order().await
                };
                match update {
                    Some(response) => info!(symbol = %response.symbol, status = %response.status, "order update received"),
                    None => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::HistoricalBroker;
    use crate::strategy::{Strategy, StrategyConfig};

    struct NoopSystem;
    impl crate::strategy::StrategySystem for NoopSystem {
        fn name(&self) -> &'static str {
            "NoopSystem"
        }
        fn run(
            &self,
            _main: &mut Ledger,
            _assets: &mut HashMap<String, AssetLedger>,
            _combined: &mut AssetLedger,
        ) -> Result<(), StrategyError> {
            Ok(())
        }
    }

    fn bar_at(seconds: i64, close: f64) -> Bar {
        Bar {
            timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[tokio::test]
    async fn tick_advances_clock_and_emits_snapshot() {
        let config = StrategyConfig {
            name: "noop".into(),
            tickers: vec!["AAPL".into()],
            only_day: false,
        };
        let strategy = Strategy::new(config, vec![Box::new(NoopSystem)]).unwrap();

        let mut broker = HistoricalBroker::new(DateTime::<Utc>::UNIX_EPOCH, Duration::seconds(60), Default::default());
        broker.load_bars("AAPL", vec![bar_at(0, 10.0), bar_at(60, 10.0)]);

        let trader_config = TraderConfig {
            start: DateTime::<Utc>::UNIX_EPOCH,
            dtime: Duration::seconds(60),
            starting_cash: 1000.0,
        };
        let mut trader = Trader::new(trader_config, vec![strategy], broker).unwrap();
        trader.push_bar("AAPL", bar_at(0, 10.0));

        trader.run_historical_tick().await.unwrap();

        assert_eq!(trader.main.singleton::<Clock>().unwrap().time, DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(60));
        assert!(trader.main.column::<crate::portfolio::PortfolioSnapshot>().unwrap().len() >= 1);
    }

    #[tokio::test]
    async fn day_boundary_resets_strategy_watermark() {
        let config = StrategyConfig {
            name: "noop".into(),
            tickers: vec!["AAPL".into()],
            only_day: false,
        };
        let strategy = Strategy::new(config, vec![Box::new(NoopSystem)]).unwrap();

        let dtime = Duration::hours(20);
        let broker = HistoricalBroker::new(DateTime::<Utc>::UNIX_EPOCH, dtime, Default::default());
        let trader_config = TraderConfig {
            start: DateTime::<Utc>::UNIX_EPOCH,
            dtime,
            starting_cash: 1000.0,
        };
        let mut trader = Trader::new(trader_config, vec![strategy], broker).unwrap();

        trader.push_bar("AAPL", bar_at(0, 10.0));
        trader.run_historical_tick().await.unwrap();
        let day_one_ordinal = trader.main.singleton::<Clock>().unwrap().time.ordinal();

        trader.push_bar("AAPL", bar_at(1, 11.0));
        trader.run_historical_tick().await.unwrap();
        let day_two_ordinal = trader.main.singleton::<Clock>().unwrap().time.ordinal();

        assert_ne!(day_one_ordinal, day_two_ordinal);
        assert!(!trader.assets["AAPL"].ledger().column::<crate::bars::Close>().unwrap().is_empty());
    }
}

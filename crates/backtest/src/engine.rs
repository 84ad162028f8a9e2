//! Replay engine.
//!
//! Drives the per-tick state machine over an ordered stream of market frames:
//! `AwaitFrame -> ApplyFrame -> InvokeStrategies -> RecordOrders -> AwaitFrame`,
//! and `Done` once the stream is exhausted and the ledger has been settled.

use std::collections::BTreeMap;

use tickreplay_core::{
    Config, Error, MarketFrame, Order, Quantity, Result, Symbol, Timestamp, TraderState,
};
use tickreplay_features::{HistoryBuffer, MarketState};

use crate::ledger::OrderLedger;
use crate::position::PositionTracker;
use crate::router::{StrategyRouter, SymbolSummary};
use crate::settlement::Settlement;
use crate::strategy::StrategyContext;
use crate::telemetry::TelemetryLogger;

/// Replay state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPhase {
    AwaitFrame,
    ApplyFrame,
    InvokeStrategies,
    RecordOrders,
    Done,
}

/// Result of one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Frame timestamp.
    pub timestamp: Timestamp,
    /// Orders kept this tick, in emission order.
    pub orders: Vec<Order>,
    /// Strategy log lines of this tick.
    pub logs: Vec<String>,
    /// Whether a limit breach cut the tick short.
    pub aborted: bool,
    /// Telemetry record, when enabled.
    pub telemetry: Option<String>,
}

/// Everything a finished replay produced.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// Frames processed.
    pub ticks: usize,
    /// Ticks cut short by a limit breach.
    pub aborted_ticks: usize,
    /// Every kept order.
    pub ledger: OrderLedger,
    /// Last frame seen.
    pub final_frame: Option<MarketFrame>,
    /// Running position per symbol after the last tick.
    pub positions: BTreeMap<Symbol, Quantity>,
    /// Trader state after the last tick.
    pub trader_state: TraderState,
    /// Telemetry records, one per tick when enabled.
    pub telemetry: Vec<String>,
    /// Settlement of the ledger against the final frame.
    pub settlement: Settlement,
}

/// Orders, logs and summaries gathered while invoking strategies.
#[derive(Debug, Default)]
struct Invocation {
    orders: Vec<Order>,
    logs: Vec<String>,
    summaries: BTreeMap<Symbol, SymbolSummary>,
    aborted: bool,
}

/// Sequential, deterministic replay engine.
#[derive(Debug)]
pub struct ReplayEngine {
    router: StrategyRouter,
    history: HistoryBuffer,
    positions: PositionTracker,
    /// Position carried between ticks.
    running: BTreeMap<Symbol, Quantity>,
    ledger: OrderLedger,
    trader_state: TraderState,
    last_frame: Option<MarketFrame>,
    phase: ReplayPhase,
    telemetry: Option<TelemetryLogger>,
    telemetry_lines: Vec<String>,
    ticks: usize,
    aborted_ticks: usize,
}

impl ReplayEngine {
    /// Create an engine with the routes named in the configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_router(config, StrategyRouter::from_config(&config.strategies))
    }

    /// Create an engine with an explicit router.
    pub fn with_router(config: &Config, router: StrategyRouter) -> Self {
        let telemetry = config
            .telemetry
            .enabled
            .then(|| TelemetryLogger::from_config(&config.telemetry));

        Self {
            router,
            history: HistoryBuffer::new(&config.history),
            positions: PositionTracker::new(config.limits.clone()),
            running: BTreeMap::new(),
            ledger: OrderLedger::new(),
            trader_state: TraderState::Null,
            last_frame: None,
            phase: ReplayPhase::AwaitFrame,
            telemetry,
            telemetry_lines: Vec::new(),
            ticks: 0,
            aborted_ticks: 0,
        }
    }

    /// Start from a previously persisted trader state.
    pub fn with_trader_state(mut self, state: TraderState) -> Self {
        self.trader_state = state;
        self
    }

    /// Process one frame.
    ///
    /// A strategy error other than a limit breach is returned after the frame
    /// has been applied to history, so the frame counts as consumed and a
    /// retry with the same timestamp is rejected as out of order.
    pub fn step(&mut self, frame: MarketFrame) -> Result<TickReport> {
        if self.phase == ReplayPhase::Done {
            return Err(Error::Other("replay already settled".to_string()));
        }
        if let Some(previous) = &self.last_frame {
            if frame.timestamp <= previous.timestamp {
                return Err(Error::OutOfOrder {
                    previous: previous.timestamp,
                    current: frame.timestamp,
                });
            }
        }

        self.phase = ReplayPhase::ApplyFrame;
        self.apply_frame(&frame);

        self.phase = ReplayPhase::InvokeStrategies;
        let invocation = match self.invoke_strategies(&frame) {
            Ok(invocation) => invocation,
            Err(err) => {
                self.last_frame = Some(frame);
                self.phase = ReplayPhase::AwaitFrame;
                self.resync_optimistic()?;
                return Err(err);
            }
        };

        self.phase = ReplayPhase::RecordOrders;
        let telemetry = self.record_orders(&frame, &invocation)?;

        if invocation.aborted {
            self.aborted_ticks += 1;
        }
        self.ticks += 1;
        self.phase = ReplayPhase::AwaitFrame;

        tracing::debug!(
            timestamp = frame.timestamp,
            orders = invocation.orders.len(),
            aborted = invocation.aborted,
            "tick processed"
        );

        let timestamp = frame.timestamp;
        self.last_frame = Some(frame);
        Ok(TickReport {
            timestamp,
            orders: invocation.orders,
            logs: invocation.logs,
            aborted: invocation.aborted,
            telemetry,
        })
    }

    /// Process every frame, then settle.
    pub fn run<I>(mut self, frames: I) -> Result<ReplayOutcome>
    where
        I: IntoIterator<Item = MarketFrame>,
    {
        tracing::info!(routes = self.router.symbols().count(), "replay started");
        for frame in frames {
            self.step(frame)?;
        }
        Ok(self.finish())
    }

    /// Settle the ledger against the last frame and stop accepting frames.
    pub fn settle(&mut self) -> Settlement {
        self.phase = ReplayPhase::Done;
        Settlement::settle(self.ledger.orders(), self.last_frame.as_ref())
    }

    /// Settle and hand back everything the replay produced.
    pub fn finish(mut self) -> ReplayOutcome {
        let settlement = self.settle();

        tracing::info!(
            ticks = self.ticks,
            aborted_ticks = self.aborted_ticks,
            orders = self.ledger.len(),
            cash = settlement.cash,
            pnl = settlement.pnl,
            "replay finished"
        );

        ReplayOutcome {
            ticks: self.ticks,
            aborted_ticks: self.aborted_ticks,
            ledger: self.ledger,
            final_frame: self.last_frame,
            positions: self.running,
            trader_state: self.trader_state,
            telemetry: self.telemetry_lines,
            settlement,
        }
    }

    fn apply_frame(&mut self, frame: &MarketFrame) {
        for (symbol, book) in &frame.books {
            self.history.record_tick(symbol, book);
            self.history
                .update_ema(symbol, MarketState::new(symbol, book).mid());

            let running = self.running.get(symbol).copied().unwrap_or(0);
            self.positions.set_authoritative(symbol, running);
        }
    }

    fn invoke_strategies(&mut self, frame: &MarketFrame) -> Result<Invocation> {
        let mut invocation = Invocation::default();

        for (symbol, book) in &frame.books {
            if self.router.strategies_for(symbol).is_empty() {
                continue;
            }
            let Some(history) = self.history.get(symbol) else {
                continue;
            };

            let market = MarketState::new(symbol, book);
            let mut ctx =
                StrategyContext::new(frame.timestamp, market, history, &mut self.positions);

            match self.router.run_symbol(&mut ctx) {
                Ok(()) => {
                    let (orders, logs) = ctx.into_parts();
                    invocation.orders.extend(orders);
                    invocation.logs.extend(logs);
                    let summary =
                        SymbolSummary::capture(frame.timestamp, &market, history, &self.positions);
                    invocation.summaries.insert(symbol.clone(), summary);
                }
                Err(err) if err.is_tick_fatal() => {
                    tracing::warn!(
                        timestamp = frame.timestamp,
                        symbol = %symbol,
                        error = %err,
                        "strategy breached a limit, aborting tick"
                    );
                    let (_, logs) = ctx.into_parts();
                    invocation.logs.extend(logs);
                    invocation.aborted = true;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(invocation)
    }

    /// Fold kept orders into the running position and the ledger, then resync
    /// the optimistic views so partial orders of an aborted invocation vanish.
    fn record_orders(
        &mut self,
        frame: &MarketFrame,
        invocation: &Invocation,
    ) -> Result<Option<String>> {
        let positions_in = self.running.clone();

        for order in &invocation.orders {
            *self.running.entry(order.symbol.clone()).or_insert(0) += order.quantity;
            self.ledger.record(frame.timestamp, order.clone());
        }
        self.resync_optimistic()?;

        let trader_state_in = std::mem::take(&mut self.trader_state);
        self.trader_state = self.router.persist(&trader_state_in, &invocation.summaries)?;

        let Some(telemetry) = self.telemetry.as_mut() else {
            return Ok(None);
        };
        for line in &invocation.logs {
            telemetry.print(line);
        }
        let line = telemetry.flush(
            frame,
            &trader_state_in,
            &positions_in,
            &invocation.orders,
            &self.trader_state,
        )?;
        self.telemetry_lines.push(line.clone());
        Ok(Some(line))
    }

    /// Reset every optimistic view to the running position.
    fn resync_optimistic(&mut self) -> Result<()> {
        let symbols: Vec<Symbol> = self.positions.records().keys().cloned().collect();
        for symbol in symbols {
            let target = self.running.get(&symbol).copied().unwrap_or(0);
            self.positions.update_optimistic(&symbol, target)?;
        }
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// History of every symbol seen so far.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Position tracker.
    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    /// Running position of a symbol.
    pub fn position(&self, symbol: &str) -> Quantity {
        self.running.get(symbol).copied().unwrap_or(0)
    }

    /// Orders recorded so far.
    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    /// Trader state after the last tick.
    pub fn trader_state(&self) -> &TraderState {
        &self.trader_state
    }

    /// Frames processed so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Ticks cut short by a limit breach.
    pub fn aborted_ticks(&self) -> usize {
        self.aborted_ticks
    }
}

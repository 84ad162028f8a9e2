//! Per-symbol strategy routing and persisted trader state.

use serde::Serialize;
use std::collections::BTreeMap;

use tickreplay_core::config::StrategyConfig;
use tickreplay_core::{Price, Quantity, Result, Symbol, Timestamp, TraderState};
use tickreplay_features::{MarketState, SymbolHistory};

use crate::position::PositionTracker;
use crate::strategy::{AnyStrategy, Strategy, StrategyContext};

/// Parameters of one symbol captured at the end of its invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSummary {
    /// Best bid, synthesized for a one-sided book.
    pub best_bid: Option<Price>,
    /// Best ask, synthesized for a one-sided book.
    pub best_ask: Option<Price>,
    /// All-level volume-weighted price.
    pub vwap: Option<f64>,
    /// Mid of the best levels.
    pub mid_price: Option<f64>,
    /// Remaining buy room after the invocation.
    pub possible_buy: Quantity,
    /// Remaining sell room after the invocation.
    pub possible_sell: Quantity,
    /// Tick timestamp.
    pub timestamp: Timestamp,
    /// Latest fast EMA.
    pub ema_fast: Option<f64>,
    /// Latest slow EMA.
    pub ema_slow: Option<f64>,
}

impl SymbolSummary {
    /// Capture the current parameters of one symbol.
    pub fn capture(
        timestamp: Timestamp,
        market: &MarketState<'_>,
        history: &SymbolHistory,
        positions: &PositionTracker,
    ) -> Self {
        let symbol = market.symbol();
        Self {
            best_bid: market.best_bid(),
            best_ask: market.best_ask(),
            vwap: market.vwap(),
            mid_price: market.mid(),
            possible_buy: positions.room_to_buy(symbol),
            possible_sell: positions.room_to_sell(symbol),
            timestamp,
            ema_fast: history.ema_fast().latest(),
            ema_slow: history.ema_slow().latest(),
        }
    }
}

/// Strategies to run for each symbol.
///
/// Symbols are processed in ascending order, which is the fixed order any
/// cross-symbol strategy can rely on.
#[derive(Debug, Default)]
pub struct StrategyRouter {
    routes: BTreeMap<Symbol, Vec<Box<dyn Strategy>>>,
}

impl StrategyRouter {
    /// Create a router with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the routes named in the configuration.
    pub fn from_config(config: &StrategyConfig) -> Self {
        let routes = config
            .routes
            .iter()
            .map(|(symbol, kinds)| {
                let strategies = kinds
                    .iter()
                    .map(|kind| {
                        Box::new(AnyStrategy::from_kind(*kind, config)) as Box<dyn Strategy>
                    })
                    .collect();
                (symbol.clone(), strategies)
            })
            .collect();
        Self { routes }
    }

    /// Append a strategy to a symbol's route.
    pub fn with_strategy<S>(mut self, symbol: impl Into<Symbol>, strategy: S) -> Self
    where
        S: Strategy + 'static,
    {
        self.routes
            .entry(symbol.into())
            .or_default()
            .push(Box::new(strategy));
        self
    }

    /// Symbols with at least one route, ascending.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.routes.keys()
    }

    /// Strategies routed to a symbol, in run order.
    pub fn strategies_for(&self, symbol: &str) -> &[Box<dyn Strategy>] {
        self.routes.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Run every strategy routed to the context's symbol, in order.
    pub fn run_symbol(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        for strategy in self.strategies_for(ctx.symbol()) {
            strategy.on_tick(ctx)?;
            tracing::trace!(
                symbol = ctx.symbol(),
                strategy = strategy.name(),
                orders = ctx.orders().len(),
                "strategy done"
            );
        }
        Ok(())
    }

    /// Merge this tick's summaries into the previous trader state.
    ///
    /// Symbols not traded this tick keep their previous entry.
    pub fn persist(
        &self,
        previous: &TraderState,
        summaries: &BTreeMap<Symbol, SymbolSummary>,
    ) -> Result<TraderState> {
        let mut state = match previous {
            TraderState::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        for (symbol, summary) in summaries {
            state.insert(symbol.clone(), serde_json::to_value(summary)?);
        }
        Ok(TraderState::Object(state))
    }
}

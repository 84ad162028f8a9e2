//! Per-invocation strategy context.

use tickreplay_core::{Order, Price, Quantity, Result, Timestamp};
use tickreplay_features::{MarketState, SymbolHistory};

use crate::position::PositionTracker;

/// Everything a strategy may read or mutate for one symbol on one tick.
///
/// Every order goes through [`PositionTracker::update_optimistic`] before it
/// is recorded, so an order is only emitted if the limit allows it.
pub struct StrategyContext<'a> {
    timestamp: Timestamp,
    market: MarketState<'a>,
    history: &'a SymbolHistory,
    positions: &'a mut PositionTracker,
    orders: Vec<Order>,
    logs: Vec<String>,
}

impl<'a> StrategyContext<'a> {
    /// Create a context for one symbol.
    pub fn new(
        timestamp: Timestamp,
        market: MarketState<'a>,
        history: &'a SymbolHistory,
        positions: &'a mut PositionTracker,
    ) -> Self {
        Self {
            timestamp,
            market,
            history,
            positions,
            orders: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// Tick timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Symbol being traded.
    pub fn symbol(&self) -> &'a str {
        self.market.symbol()
    }

    /// Current book view.
    pub fn market(&self) -> MarketState<'a> {
        self.market
    }

    /// History of this symbol, including the current tick.
    pub fn history(&self) -> &'a SymbolHistory {
        self.history
    }

    /// Position tracker (read-only).
    pub fn positions(&self) -> &PositionTracker {
        self.positions
    }

    /// Optimistic position of this symbol.
    pub fn position(&self) -> Quantity {
        self.positions.optimistic(self.symbol())
    }

    /// Remaining buy room for this symbol.
    pub fn room_to_buy(&self) -> Quantity {
        self.positions.room_to_buy(self.symbol())
    }

    /// Remaining sell room for this symbol.
    pub fn room_to_sell(&self) -> Quantity {
        self.positions.room_to_sell(self.symbol())
    }

    /// Buy `quantity` at `price`. Non-positive quantities emit nothing.
    pub fn buy(&mut self, price: Price, quantity: Quantity) -> Result<()> {
        if quantity <= 0 {
            return Ok(());
        }
        self.submit(price, quantity)
    }

    /// Sell `quantity` at `price`. Non-positive quantities emit nothing.
    pub fn sell(&mut self, price: Price, quantity: Quantity) -> Result<()> {
        if quantity <= 0 {
            return Ok(());
        }
        self.submit(price, -quantity)
    }

    fn submit(&mut self, price: Price, signed_quantity: Quantity) -> Result<()> {
        let symbol = self.market.symbol();
        let target = self.positions.optimistic(symbol) + signed_quantity;
        self.positions.update_optimistic(symbol, target)?;
        self.orders.push(Order::new(symbol, price, signed_quantity));
        Ok(())
    }

    /// Append a free-text line to this tick's log.
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Orders emitted so far, in emission order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Consume the context, returning emitted orders and log lines.
    pub fn into_parts(self) -> (Vec<Order>, Vec<String>) {
        (self.orders, self.logs)
    }
}

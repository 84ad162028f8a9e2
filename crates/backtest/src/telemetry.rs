//! Per-tick telemetry records.
//!
//! Each tick renders to one compact JSON line:
//! `[state, orders, conversions, trader_state, logs]`. The three free-text
//! fields share a byte budget so that a record fits `max_log_length`.

use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

use tickreplay_core::config::TelemetryConfig;
use tickreplay_core::{MarketFrame, Order, Quantity, Result, Side, Symbol, TraderState};

/// Marker appended to truncated strings.
const ELLIPSIS: &str = "...";

/// Denomination listed for every symbol.
const DENOMINATION: &str = "SEASHELLS";

/// Accumulates free-text lines and renders one record per tick.
#[derive(Debug, Clone)]
pub struct TelemetryLogger {
    max_log_length: usize,
    logs: String,
}

impl TelemetryLogger {
    /// Create a logger with the given record budget.
    pub fn new(max_log_length: usize) -> Self {
        Self {
            max_log_length,
            logs: String::new(),
        }
    }

    /// Create a logger from configuration.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.max_log_length)
    }

    /// Append one line to the pending logs.
    pub fn print(&mut self, line: &str) {
        self.logs.push_str(line);
        self.logs.push('\n');
    }

    /// Pending logs since the last flush.
    pub fn pending(&self) -> &str {
        &self.logs
    }

    /// Render this tick's record and reset the pending logs.
    pub fn flush(
        &mut self,
        frame: &MarketFrame,
        trader_state_in: &TraderState,
        positions: &BTreeMap<Symbol, Quantity>,
        orders: &[Order],
        trader_state_out: &TraderState,
    ) -> Result<String> {
        let state_in = state_text(trader_state_in)?;
        let state_out = state_text(trader_state_out)?;

        let base = record(frame, "", positions, orders, "", "");
        let base_length = serde_json::to_string(&base)?.len();
        let budget = self.max_log_length.saturating_sub(base_length) / 3;

        let full = record(
            frame,
            &truncate(&state_in, budget),
            positions,
            orders,
            &truncate(&state_out, budget),
            &truncate(&self.logs, budget),
        );
        let line = serde_json::to_string(&full)?;

        self.logs.clear();
        Ok(line)
    }
}

fn state_text(state: &TraderState) -> Result<String> {
    Ok(match state {
        TraderState::Null => String::new(),
        TraderState::String(text) => text.clone(),
        other => serde_json::to_string(other)?,
    })
}

fn record(
    frame: &MarketFrame,
    trader_state_in: &str,
    positions: &BTreeMap<Symbol, Quantity>,
    orders: &[Order],
    trader_state_out: &str,
    logs: &str,
) -> Value {
    let listings: Vec<Value> = frame
        .symbols()
        .map(|symbol| json!([symbol, symbol, DENOMINATION]))
        .collect();

    let mut depths = Map::new();
    for symbol in frame.symbols() {
        if let Some(book) = frame.book(symbol) {
            let render = |side| {
                let levels: Map<String, Value> = book
                    .levels(side)
                    .map(|level| (level.price.to_string(), json!(level.quantity)))
                    .collect();
                Value::Object(levels)
            };
            depths.insert(symbol.clone(), json!([render(Side::Bid), render(Side::Ask)]));
        }
    }

    let orders: Vec<Value> = orders
        .iter()
        .map(|order| json!([order.symbol, order.price, order.quantity]))
        .collect();

    let state = json!([
        frame.timestamp,
        trader_state_in,
        listings,
        depths,
        [],
        [],
        positions,
        [{}, {}],
    ]);

    json!([state, orders, 0, trader_state_out, logs])
}

/// Keep at most `max_length` bytes of `value`, replacing the tail with `...`.
///
/// The cut is moved back to the nearest char boundary.
pub fn truncate(value: &str, max_length: usize) -> Cow<'_, str> {
    if value.len() <= max_length {
        return Cow::Borrowed(value);
    }
    let mut cut = max_length.saturating_sub(ELLIPSIS.len());
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    Cow::Owned(format!("{}{ELLIPSIS}", &value[..cut]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickreplay_core::BookSnapshot;

    fn frame() -> MarketFrame {
        MarketFrame::new(300)
            .with_book("KELP", BookSnapshot::from_levels([(100, 5)], [(102, 3)]))
    }

    #[test]
    fn test_truncate_keeps_head() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate("abcdefghijk", 10), "abcdefg...");
        assert_eq!(truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is two bytes; a cut at byte 4 would split the second one.
        let out = truncate("aéééé", 7);
        assert_eq!(out, "aé...");
    }

    #[test]
    fn test_record_layout() {
        let mut logger = TelemetryLogger::new(3750);
        logger.print("hello");

        let mut positions = BTreeMap::new();
        positions.insert("KELP".to_string(), 2);
        let orders = vec![Order::new("KELP", 102, 2)];

        let line = logger
            .flush(&frame(), &TraderState::Null, &positions, &orders, &json!({"a": 1}))
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        let state = &value[0];
        assert_eq!(state[0], 300);
        assert_eq!(state[1], "");
        assert_eq!(state[2], json!([["KELP", "KELP", "SEASHELLS"]]));
        assert_eq!(state[3]["KELP"], json!([{"100": 5}, {"102": -3}]));
        assert_eq!(state[6]["KELP"], 2);
        assert_eq!(value[1], json!([["KELP", 102, 2]]));
        assert_eq!(value[2], 0);
        assert_eq!(value[3], r#"{"a":1}"#);
        assert_eq!(value[4], "hello\n");

        assert!(logger.pending().is_empty());
    }

    #[test]
    fn test_record_fits_budget() {
        let mut logger = TelemetryLogger::new(400);
        for _ in 0..100 {
            logger.print("a fairly long log line that will not fit");
        }
        let big = TraderState::String("x".repeat(1000));

        let line = logger
            .flush(&frame(), &big, &BTreeMap::new(), &[], &big)
            .unwrap();

        let value: Value = serde_json::from_str(&line).unwrap();
        let logs = value[4].as_str().unwrap();
        let state_out = value[3].as_str().unwrap();
        assert!(logs.ends_with("..."));
        assert!(state_out.ends_with("..."));
        assert_eq!(logs.len(), state_out.len());
        assert!(logs.len() < 400 / 3);
    }
}

//! Exponential moving averages of the mid price.

/// Direction of a fast/slow crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    /// Fast moved from below to at-or-above slow.
    Up,
    /// Fast moved from above to at-or-below slow.
    Down,
}

/// Exponential moving average keeping its full series.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    values: Vec<f64>,
}

impl Ema {
    /// Create an EMA with smoothing factor `alpha`.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            values: Vec::new(),
        }
    }

    /// Create an EMA with `alpha = 2 / (window + 1)`.
    pub fn with_window(window: u32) -> Self {
        Self::new(2.0 / (window as f64 + 1.0))
    }

    /// Fold in a new observation. The first observation seeds the series.
    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.values.last() {
            Some(prev) => prev * (1.0 - self.alpha) + self.alpha * value,
            None => value,
        };
        self.values.push(next);
        next
    }

    /// Repeat the latest value for a tick without an observation.
    pub fn carry_forward(&mut self) -> Option<f64> {
        let last = *self.values.last()?;
        self.values.push(last);
        Some(last)
    }

    /// Latest value.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Value before the latest.
    pub fn previous(&self) -> Option<f64> {
        self.values.len().checked_sub(2).map(|i| self.values[i])
    }

    /// Full series, oldest first.
    pub fn series(&self) -> &[f64] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the EMA has been seeded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Crossover between the last two values of `fast` and `slow`.
pub fn crossover(fast: &Ema, slow: &Ema) -> Option<Cross> {
    let (f1, s1) = (fast.latest()?, slow.latest()?);
    let (f0, s0) = (fast.previous()?, slow.previous()?);

    if f1 >= s1 && f0 < s0 {
        Some(Cross::Up)
    } else if s1 >= f1 && f0 > s0 {
        Some(Cross::Down)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_seed_and_update() {
        let mut ema = Ema::with_window(35);
        assert!(ema.is_empty());

        ema.update(10.0);
        ema.update(12.0);
        ema.update(11.0);

        let series = ema.series();
        assert_relative_eq!(series[0], 10.0);
        assert_relative_eq!(series[1], 10.0 * (34.0 / 36.0) + 12.0 * (2.0 / 36.0));
        assert_relative_eq!(series[1], 10.1111, epsilon = 1e-4);
        assert_relative_eq!(series[2], series[1] * (34.0 / 36.0) + 11.0 * (2.0 / 36.0));
    }

    #[test]
    fn test_carry_forward() {
        let mut ema = Ema::with_window(10);
        assert_eq!(ema.carry_forward(), None);
        assert!(ema.is_empty());

        ema.update(5.0);
        assert_eq!(ema.carry_forward(), Some(5.0));
        assert_eq!(ema.len(), 2);
    }

    #[test]
    fn test_crossover_up() {
        let mut fast = Ema::new(0.5);
        let mut slow = Ema::new(0.1);

        fast.update(10.0);
        slow.update(10.0);
        assert_eq!(crossover(&fast, &slow), None);

        // Fast drops below slow.
        fast.update(8.0);
        slow.update(8.0);
        assert!(fast.latest().unwrap() < slow.latest().unwrap());

        // Fast recovers above slow.
        fast.update(14.0);
        slow.update(14.0);
        assert_eq!(crossover(&fast, &slow), Some(Cross::Up));
    }

    #[test]
    fn test_crossover_down() {
        let mut fast = Ema::new(0.5);
        let mut slow = Ema::new(0.1);

        fast.update(10.0);
        slow.update(10.0);
        fast.update(12.0);
        slow.update(12.0);
        fast.update(6.0);
        slow.update(6.0);

        assert_eq!(crossover(&fast, &slow), Some(Cross::Down));
    }
}

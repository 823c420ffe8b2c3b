use std::collections::{VecDeque, vec_deque};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::{
    domain::{Candle, Price},
    error::{ArenaResult, ConfigError},
    market::generator::PriceGenerator,
};

/// Bounded, time-ordered candle buffer. Pushing at capacity evicts the oldest candle.
#[derive(Clone, Debug)]
pub struct CandleHistory {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Builds a history of `count` synthetic candles spaced `spacing` apart,
    /// the last one stamped at `until`.
    pub fn seeded<R: Rng + ?Sized>(
        generator: &PriceGenerator,
        capacity: usize,
        count: usize,
        spacing: Duration,
        until: DateTime<Utc>,
        rng: &mut R,
    ) -> ArenaResult<Self> {
        let mut history = Self::with_capacity(capacity);
        let count = count.min(capacity);
        if count == 0 {
            return Ok(history);
        }

        let out_of_range = || ConfigError::IntervalOutOfRange {
            name: "price interval",
            msg: format!("{count} seed candles spaced {spacing} do not fit before {until}"),
        };
        let offset = |n: usize| i32::try_from(n).ok().and_then(|n| spacing.checked_mul(n));
        let start = offset(count - 1)
            .and_then(|span| until.checked_sub_signed(span))
            .ok_or_else(out_of_range)?;

        let mut prev = generator.seed_candle(start, rng)?;
        history.push(prev);
        for i in 1..count {
            let ts = offset(i)
                .and_then(|span| start.checked_add_signed(span))
                .ok_or_else(out_of_range)?;
            prev = generator.next_seed_candle(&prev, ts, rng)?;
            history.push(prev);
        }

        debug!(
            candles = history.len(),
            first_open = history.candles.front().map(|c| c.open().0),
            "Seeded candle history"
        );
        Ok(history)
    }

    /// Appends `candle`, returning the evicted oldest candle when at capacity.
    pub fn push(&mut self, candle: Candle) -> Option<Candle> {
        let evicted = if self.candles.len() >= self.capacity {
            self.candles.pop_front()
        } else {
            None
        };
        self.candles.push_back(candle);
        evicted
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn oldest(&self) -> Option<&Candle> {
        self.candles.front()
    }

    /// Close of the newest candle, or `fallback` when the history is empty.
    pub fn latest_close_or(&self, fallback: Price) -> Price {
        self.latest().map(Candle::close).unwrap_or(fallback)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }
}

impl<'a> IntoIterator for &'a CandleHistory {
    type Item = &'a Candle;
    type IntoIter = vec_deque::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{config::MarketConfig, domain::Volume, error::ArenaError};

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 19, 10, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn flat(offset_secs: i64, price: f64) -> Candle {
        Candle::new(
            ts(offset_secs),
            Price(price),
            Price(price),
            Price(price),
            Price(price),
            Volume(1.0),
        )
        .unwrap()
    }

    #[test]
    fn test_push_beyond_capacity_evicts_oldest_first() {
        // Arrange
        let capacity = 20;
        let mut history = CandleHistory::with_capacity(capacity);
        for i in 0..capacity as i64 {
            assert!(history.push(flat(i, 100.0 + i as f64)).is_none());
        }

        // Act
        let evicted = history.push(flat(capacity as i64, 999.0));

        // Assert
        assert_eq!(history.len(), capacity);
        assert_eq!(evicted.map(|c| c.timestamp()), Some(ts(0)));
        assert_eq!(history.oldest().map(|c| c.timestamp()), Some(ts(1)));
        assert_eq!(history.latest().map(|c| c.close()), Some(Price(999.0)));

        let stamps: Vec<_> = history.iter().map(Candle::timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]), "order must be preserved");
    }

    #[test]
    fn test_latest_close_falls_back_when_empty() {
        let history = CandleHistory::with_capacity(3);
        assert!(history.is_empty());
        assert_eq!(history.latest_close_or(Price(70_000.0)), Price(70_000.0));
    }

    #[test]
    fn test_seeded_history_is_chained_and_spaced() {
        let generator = PriceGenerator::new(MarketConfig::default());
        let mut rng = StdRng::seed_from_u64(12);

        let history =
            CandleHistory::seeded(&generator, 20, 20, Duration::seconds(10), ts(200), &mut rng)
                .unwrap();

        assert_eq!(history.len(), 20);
        assert_eq!(history.latest().map(Candle::timestamp), Some(ts(200)));
        assert_eq!(history.oldest().map(Candle::timestamp), Some(ts(10)));
        for pair in history.to_vec().windows(2) {
            assert_eq!(pair[1].open(), pair[0].close());
            assert_eq!(pair[1].timestamp() - pair[0].timestamp(), Duration::seconds(10));
        }
    }

    #[test]
    fn test_seeded_history_is_clamped_to_capacity() {
        let generator = PriceGenerator::new(MarketConfig::default());
        let mut rng = StdRng::seed_from_u64(12);

        let history =
            CandleHistory::seeded(&generator, 5, 50, Duration::seconds(10), ts(0), &mut rng)
                .unwrap();
        let empty =
            CandleHistory::seeded(&generator, 5, 0, Duration::seconds(10), ts(0), &mut rng)
                .unwrap();

        assert_eq!(history.len(), 5);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_seeded_history_before_start_of_clock_is_rejected() {
        // Arrange
        let generator = PriceGenerator::new(MarketConfig::default());
        let mut rng = StdRng::seed_from_u64(12);
        let until = DateTime::<Utc>::MIN_UTC + Duration::seconds(5);

        // Act
        let result =
            CandleHistory::seeded(&generator, 20, 3, Duration::seconds(10), until, &mut rng);

        // Assert
        assert!(matches!(
            result.unwrap_err(),
            ArenaError::Config(ConfigError::IntervalOutOfRange { .. })
        ));
    }
}

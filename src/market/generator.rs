use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    config::{CandleShape, MarketConfig},
    domain::{Candle, Price, Volume},
    error::{ArenaResult, ensure_finite, ensure_non_negative},
};

/// Produces the synthetic price series by random-walk perturbation of the previous close.
///
/// The generator is pure arithmetic over an injected random source: the same
/// seed and the same sequence of calls always yield the same candles.
#[derive(Clone, Debug)]
pub struct PriceGenerator {
    config: MarketConfig,
}

impl PriceGenerator {
    pub fn new(config: MarketConfig) -> Self {
        Self { config }
    }

    pub fn base_price(&self) -> Price {
        self.config.base_price
    }

    /// Creates the first candle of a series, opening at the base price plus jitter.
    pub fn seed_candle<R: Rng + ?Sized>(
        &self,
        timestamp: DateTime<Utc>,
        rng: &mut R,
    ) -> ArenaResult<Candle> {
        let jitter = if self.config.seed_jitter > 0.0 {
            rng.random_range(-self.config.seed_jitter..self.config.seed_jitter)
        } else {
            0.0
        };
        let open = Price(self.config.base_price.0 + jitter);
        self.shape_candle(open, timestamp, &self.config.seed_shape, rng)
    }

    /// Creates the successor of `previous` on the live schedule.
    pub fn next_candle<R: Rng + ?Sized>(
        &self,
        previous: &Candle,
        timestamp: DateTime<Utc>,
        rng: &mut R,
    ) -> ArenaResult<Candle> {
        self.shape_candle(previous.close(), timestamp, &self.config.live_shape, rng)
    }

    /// Creates the successor of `previous` using the calmer seeding shape.
    pub fn next_seed_candle<R: Rng + ?Sized>(
        &self,
        previous: &Candle,
        timestamp: DateTime<Utc>,
        rng: &mut R,
    ) -> ArenaResult<Candle> {
        self.shape_candle(previous.close(), timestamp, &self.config.seed_shape, rng)
    }

    fn shape_candle<R: Rng + ?Sized>(
        &self,
        open: Price,
        timestamp: DateTime<Utc>,
        shape: &CandleShape,
        rng: &mut R,
    ) -> ArenaResult<Candle> {
        let open = ensure_finite("open", open.0)?;
        let close = ensure_finite("close", open * (1.0 + shape.close_drift.sample(rng)))?;
        let high = ensure_finite("high", open.max(close) * (1.0 + shape.wick.sample(rng)))?;
        let low = ensure_finite("low", open.min(close) * (1.0 - shape.wick.sample(rng)))?;
        let volume = ensure_non_negative("volume", shape.volume.sample(rng))?;

        Candle::new(
            timestamp,
            Price(open),
            Price(high),
            Price(low),
            Price(close),
            Volume(volume),
        )
    }
}

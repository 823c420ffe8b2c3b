use std::{collections::HashSet, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    agent::{BehaviorBias, policy::ActionWeights},
    domain::{Money, Price},
    error::{ArenaResult, ConfigError, IoError},
};

// ================================================================================================
// Sampling Band
// ================================================================================================

/// A half-open interval `[low, high)` sampled uniformly.
///
/// A degenerate band (`low == high`) always yields `low`, which lets tests pin
/// any random quantity to a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// A band that always samples `value`.
    pub const fn fixed(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    /// Symmetric band `[-half_width, half_width)`.
    pub const fn symmetric(half_width: f64) -> Self {
        Self {
            low: -half_width,
            high: half_width,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.high <= self.low {
            return self.low;
        }
        rng.random_range(self.low..self.high)
    }

    pub fn contains(&self, value: f64) -> bool {
        if self.high <= self.low {
            return value == self.low;
        }
        value >= self.low && value < self.high
    }

    fn validate(&self, name: &'static str) -> ArenaResult<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(ConfigError::InvalidRange {
                name,
                low: self.low,
                high: self.high,
                msg: "bounds must be finite".into(),
            }
            .into());
        }
        if self.low > self.high {
            return Err(ConfigError::InvalidRange {
                name,
                low: self.low,
                high: self.high,
                msg: "lower bound exceeds upper bound".into(),
            }
            .into());
        }
        if !(self.high - self.low).is_finite() {
            return Err(ConfigError::InvalidRange {
                name,
                low: self.low,
                high: self.high,
                msg: "width must be finite".into(),
            }
            .into());
        }
        Ok(())
    }

    fn validate_non_negative(&self, name: &'static str) -> ArenaResult<()> {
        self.validate(name)?;
        if self.low < 0.0 {
            return Err(ConfigError::InvalidRange {
                name,
                low: self.low,
                high: self.high,
                msg: "bounds must be >= 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

// ================================================================================================
// Sub-Configurations
// ================================================================================================

/// Random-walk parameters of one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleShape {
    /// Relative close-to-open move, e.g. `[-0.02, 0.02)`.
    pub close_drift: Band,
    /// Relative wick extension beyond the candle body, e.g. `[0, 0.01)`.
    pub wick: Band,
    pub volume: Band,
}

impl CandleShape {
    /// Shape used for candles produced on the live price schedule.
    pub const fn live() -> Self {
        Self {
            close_drift: Band::symmetric(0.02),
            wick: Band::new(0.0, 0.01),
            volume: Band::new(50.0, 150.0),
        }
    }

    /// Calmer shape used for the synthetic history seeded at start-up.
    pub const fn seed() -> Self {
        Self {
            close_drift: Band::symmetric(0.01),
            wick: Band::new(0.0, 0.005),
            volume: Band::new(50.0, 150.0),
        }
    }

    fn validate(&self) -> ArenaResult<()> {
        self.close_drift.validate("candle close drift")?;
        if self.close_drift.low <= -1.0 {
            return Err(ConfigError::InvalidRange {
                name: "candle close drift",
                low: self.close_drift.low,
                high: self.close_drift.high,
                msg: "a drift of -100% or below would zero the price".into(),
            }
            .into());
        }
        self.wick.validate_non_negative("candle wick")?;
        if self.wick.high >= 1.0 {
            return Err(ConfigError::InvalidRange {
                name: "candle wick",
                low: self.wick.low,
                high: self.wick.high,
                msg: "wick must stay below 100%".into(),
            }
            .into());
        }
        self.volume.validate_non_negative("candle volume")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Anchor of the very first seeded candle and fallback price when no candle exists.
    pub base_price: Price,
    /// Absolute jitter applied to `base_price` for the first open.
    pub seed_jitter: f64,
    pub live_shape: CandleShape,
    pub seed_shape: CandleShape,
    /// Number of candles retained in the history.
    pub history_depth: usize,
    /// Number of synthetic candles seeded at start-up (clamped to `history_depth`).
    pub seed_candles: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_price: Price(70_000.0),
            seed_jitter: 1_000.0,
            live_shape: CandleShape::live(),
            seed_shape: CandleShape::seed(),
            history_depth: 20,
            seed_candles: 20,
        }
    }
}

/// Rank-dependent adjustment of the profit/loss factor.
///
/// The leading `top_count` positions receive `+top_bonus`, the trailing
/// `bottom_count` positions receive `-bottom_penalty`. Top wins on overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankBias {
    pub top_count: usize,
    pub top_bonus: f64,
    pub bottom_count: usize,
    pub bottom_penalty: f64,
}

impl Default for RankBias {
    fn default() -> Self {
        Self {
            top_count: 2,
            top_bonus: 0.01,
            bottom_count: 1,
            bottom_penalty: 0.01,
        }
    }
}

impl RankBias {
    /// Bias for the agent at 0-based `position` in a field of `field_size` agents.
    pub fn for_position(&self, position: usize, field_size: usize) -> f64 {
        if position < self.top_count {
            self.top_bonus
        } else if position + self.bottom_count >= field_size {
            -self.bottom_penalty
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub short_biased: ActionWeights,
    pub long_biased: ActionWeights,
    pub balanced: ActionWeights,
    /// Displayed trade size band in dollars (floored when sampled).
    pub trade_size: Band,
    /// Fraction of the cash balance committed by a non-hold action.
    pub commitment: Band,
    pub rank_bias: RankBias,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            short_biased: ActionWeights::new(0.3, 0.6, 0.1),
            long_biased: ActionWeights::new(0.6, 0.3, 0.1),
            balanced: ActionWeights::uniform(),
            trade_size: Band::new(9_000.0, 51_000.0),
            commitment: Band::new(0.1, 0.2),
            rank_bias: RankBias::default(),
        }
    }
}

impl PolicyConfig {
    pub fn weights(&self, bias: BehaviorBias) -> &ActionWeights {
        match bias {
            BehaviorBias::Short => &self.short_biased,
            BehaviorBias::Long => &self.long_biased,
            BehaviorBias::Balanced => &self.balanced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Initial portfolio value and cash balance of every agent.
    pub starting_capital: Money,
    /// Profit/loss factor band before rank bias is added.
    ///
    /// Defaults to `[-0.04, 0.06)`: ten points wide starting at -4 %, which is
    /// what the draw has always produced. The upper bound is not +10 %.
    pub pnl_factor: Band,
    /// Maximum number of transactions retained per agent.
    pub transaction_depth: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            starting_capital: Money(100_000.0),
            pnl_factor: Band::new(-0.04, 0.06),
            transaction_depth: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimatorConfig {
    /// Fraction of the remaining gap closed per animation tick.
    pub rate: f64,
    /// Absolute gap below which the displayed value snaps onto its target.
    pub snap_threshold: f64,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            rate: 0.1,
            snap_threshold: 100.0,
        }
    }
}

/// Periods of the four logical timers.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub price_interval: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub decision_interval: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub animation_interval: Duration,

    /// How long the trade marker stays visible after a new candle.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub marker_duration: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            price_interval: Duration::from_secs(10),
            decision_interval: Duration::from_secs(2),
            animation_interval: Duration::from_millis(50),
            marker_duration: Duration::from_secs(3),
        }
    }
}

impl ScheduleConfig {
    /// Longest accepted timer period.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    fn validate(&self) -> ArenaResult<()> {
        let intervals = [
            ("price interval", self.price_interval),
            ("decision interval", self.decision_interval),
            ("animation interval", self.animation_interval),
            ("marker duration", self.marker_duration),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval { name }.into());
            }
            if interval > Self::MAX_INTERVAL {
                return Err(ConfigError::IntervalOutOfRange {
                    name,
                    msg: format!(
                        "{} exceeds the {} limit",
                        humantime::format_duration(interval),
                        humantime::format_duration(Self::MAX_INTERVAL)
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    /// Opaque token handed through to renderers.
    pub color: String,
    pub bias: BehaviorBias,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, color: impl Into<String>, bias: BehaviorBias) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            bias,
        }
    }
}

// ================================================================================================
// Preset Arena Configurations
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
pub enum ArenaPreset {
    /// **Classic five-agent race**
    ///
    /// * One short-biased agent (`JealousDove3996`, the highlighted "your agent").
    /// * Two long-biased agents.
    /// * Two balanced agents.
    /// * BTC-like base price around $70,000, default schedules.
    Classic,
}

impl From<ArenaPreset> for ArenaConfig {
    fn from(preset: ArenaPreset) -> Self {
        match preset {
            ArenaPreset::Classic => ArenaConfig::default()
                .add_agent(AgentSpec::new(
                    "MetropolitanLandfowl",
                    "#9b87f5",
                    BehaviorBias::Balanced,
                ))
                .add_agent(AgentSpec::new(
                    "BetterEagle8900",
                    "#7E69AB",
                    BehaviorBias::Balanced,
                ))
                .add_agent(AgentSpec::new(
                    "EmbarrassedAnteater5",
                    "#6E59A5",
                    BehaviorBias::Long,
                ))
                .add_agent(AgentSpec::new(
                    "JealousDove3996",
                    "#0EA5E9",
                    BehaviorBias::Short,
                ))
                .add_agent(AgentSpec::new(
                    "YammeringJunglefowl7",
                    "#33C3F0",
                    BehaviorBias::Long,
                )),
        }
    }
}

// ================================================================================================
// Arena Configuration
// ================================================================================================

/// Configuration blueprint for building an [`Arena`](crate::arena::Arena).
///
/// Every numeric range of the engine is a tunable default here rather than a
/// hard-coded constant.
///
/// # Example
///
/// ```
/// # use trade_arena::prelude::*;
/// let cfg = ArenaConfig::from(ArenaPreset::Classic)
///     .with_seed(42)
///     .with_transaction_depth(5);
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.roster().len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    roster: Vec<AgentSpec>,
    #[serde(default)]
    schedule: ScheduleConfig,
    #[serde(default)]
    market: MarketConfig,
    #[serde(default)]
    policy: PolicyConfig,
    #[serde(default)]
    portfolio: PortfolioConfig,
    #[serde(default)]
    animator: AnimatorConfig,
    /// Seed of the arena's random source.
    #[serde(default)]
    seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            roster: Vec::new(),
            schedule: ScheduleConfig::default(),
            market: MarketConfig::default(),
            policy: PolicyConfig::default(),
            portfolio: PortfolioConfig::default(),
            animator: AnimatorConfig::default(),
            seed: 0,
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl ArenaConfig {
    /// Appends an agent to the roster. Ids follow roster order.
    pub fn add_agent(mut self, spec: AgentSpec) -> Self {
        self.roster.push(spec);
        self
    }

    pub fn with_roster(self, roster: Vec<AgentSpec>) -> Self {
        Self { roster, ..self }
    }

    pub fn with_schedule(self, schedule: ScheduleConfig) -> Self {
        Self { schedule, ..self }
    }

    pub fn with_market(self, market: MarketConfig) -> Self {
        Self { market, ..self }
    }

    pub fn with_policy(self, policy: PolicyConfig) -> Self {
        Self { policy, ..self }
    }

    pub fn with_portfolio(self, portfolio: PortfolioConfig) -> Self {
        Self { portfolio, ..self }
    }

    pub fn with_animator(self, animator: AnimatorConfig) -> Self {
        Self { animator, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_base_price(mut self, base_price: Price) -> Self {
        self.market.base_price = base_price;
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.market.history_depth = depth;
        self
    }

    pub fn with_transaction_depth(mut self, depth: usize) -> Self {
        self.portfolio.transaction_depth = depth;
        self
    }

    pub fn with_pnl_factor(mut self, pnl_factor: Band) -> Self {
        self.portfolio.pnl_factor = pnl_factor;
        self
    }

    pub fn with_rank_bias(mut self, rank_bias: RankBias) -> Self {
        self.policy.rank_bias = rank_bias;
        self
    }
}

// ================================================================================================
// Accessor Methods
// ================================================================================================

impl ArenaConfig {
    pub fn roster(&self) -> &[AgentSpec] {
        &self.roster
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn market(&self) -> &MarketConfig {
        &self.market
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn portfolio(&self) -> &PortfolioConfig {
        &self.portfolio
    }

    pub fn animator(&self) -> &AnimatorConfig {
        &self.animator
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

// ================================================================================================
// Validation & Encoding
// ================================================================================================

impl ArenaConfig {
    /// Checks every structural constraint the engine relies on.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.roster.is_empty() {
            return Err(ConfigError::EmptyRoster.into());
        }
        let mut names = HashSet::with_capacity(self.roster.len());
        for spec in &self.roster {
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateAgentName(spec.name.clone()).into());
            }
        }

        self.schedule.validate()?;

        let market = &self.market;
        if market.history_depth == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "candle history depth",
                value: market.history_depth,
            }
            .into());
        }
        if !market.base_price.0.is_finite() || market.base_price.0 <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "base price",
                value: market.base_price.0,
                msg: "must be finite and > 0".into(),
            }
            .into());
        }
        if !market.seed_jitter.is_finite()
            || market.seed_jitter < 0.0
            || market.seed_jitter >= market.base_price.0
        {
            return Err(ConfigError::InvalidValue {
                name: "seed jitter",
                value: market.seed_jitter,
                msg: "must be >= 0 and below the base price".into(),
            }
            .into());
        }
        market.live_shape.validate()?;
        market.seed_shape.validate()?;

        let policy = &self.policy;
        for bias in [BehaviorBias::Short, BehaviorBias::Long, BehaviorBias::Balanced] {
            policy.weights(bias).validate(bias)?;
        }
        policy.trade_size.validate_non_negative("trade size")?;
        policy.commitment.validate_non_negative("cash commitment")?;
        if policy.commitment.high > 1.0 {
            return Err(ConfigError::InvalidRange {
                name: "cash commitment",
                low: policy.commitment.low,
                high: policy.commitment.high,
                msg: "cannot commit more than the whole balance".into(),
            }
            .into());
        }
        let rank_bias = &policy.rank_bias;
        for (name, value) in [
            ("top rank bonus", rank_bias.top_bonus),
            ("bottom rank penalty", rank_bias.bottom_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    value,
                    msg: "must be finite and >= 0".into(),
                }
                .into());
            }
        }

        let portfolio = &self.portfolio;
        if portfolio.transaction_depth == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "transaction depth",
                value: portfolio.transaction_depth,
            }
            .into());
        }
        if !portfolio.starting_capital.0.is_finite() || portfolio.starting_capital.0 < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "starting capital",
                value: portfolio.starting_capital.0,
                msg: "must be finite and >= 0".into(),
            }
            .into());
        }
        portfolio.pnl_factor.validate("profit/loss factor")?;

        let animator = &self.animator;
        if !(animator.rate > 0.0 && animator.rate <= 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "animation rate",
                value: animator.rate,
                msg: "must lie in (0, 1]".into(),
            }
            .into());
        }
        if !animator.snap_threshold.is_finite() || animator.snap_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "snap threshold",
                value: animator.snap_threshold,
                msg: "must be finite and > 0".into(),
            }
            .into());
        }

        Ok(())
    }

    /// Decodes and validates a JSON configuration.
    pub fn from_json(json: &str) -> ArenaResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(ConfigError::Decode)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> ArenaResult<String> {
        Ok(serde_json::to_string_pretty(self).map_err(IoError::Json)?)
    }

    /// Computes a deterministic fingerprint of this configuration.
    ///
    /// Two arenas built from configs with equal hashes replay identically.
    pub fn hash(&self) -> ArenaResult<String> {
        let mut hasher = blake3::Hasher::new();
        let bytes = postcard::to_stdvec(self).map_err(IoError::Encoding)?;
        hasher.update(&bytes);
        Ok(format!("{}", hasher.finalize()))
    }
}

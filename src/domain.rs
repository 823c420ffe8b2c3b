// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{ArenaResult, SystemError},
    impl_abs_primitive, impl_add_sub_primitive, impl_from_primitive, impl_scale_primitive,
};

/// Quoted price of the simulated instrument, in dollars per unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(pub f64);
impl_from_primitive!(Price, f64);
impl_add_sub_primitive!(Price, f64);
impl_scale_primitive!(Price, f64);
impl_abs_primitive!(Price, f64);

/// A dollar amount: portfolio values, cash balances, trade sizes and PnL.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Money(pub f64);
impl_from_primitive!(Money, f64);
impl_add_sub_primitive!(Money, f64);
impl_scale_primitive!(Money, f64);
impl_abs_primitive!(Money, f64);

/// Traded volume of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Volume(pub f64);
impl_from_primitive!(Volume, f64);

/// Stable identity of an agent within a session.
///
/// Ids are assigned in roster order starting at 1 and double as the
/// deterministic tie-breaker of the rank tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);
impl_from_primitive!(AgentId, u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ================================================================================================
// Trade Action
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    EnumCount,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Long,
    Short,
    #[default]
    Hold,
}

impl TradeAction {
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

// ================================================================================================
// Candle
// ================================================================================================

/// An immutable OHLCV bar of the synthetic price series.
///
/// Construction goes through [`Candle::new`], which enforces
/// `low <= min(open, close)`, `high >= max(open, close)` and `volume >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    timestamp: DateTime<Utc>,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: Volume,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Volume,
    ) -> ArenaResult<Self> {
        let all_finite = [open.0, high.0, low.0, close.0, volume.0]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SystemError::InvariantViolation(format!(
                "candle at {timestamp} has non-finite values"
            ))
            .into());
        }
        if low.0 > open.0.min(close.0) || high.0 < open.0.max(close.0) || low.0 > high.0 {
            return Err(SystemError::InvariantViolation(format!(
                "candle at {timestamp} violates bounds: o={} h={} l={} c={}",
                open.0, high.0, low.0, close.0
            ))
            .into());
        }
        if volume.0 < 0.0 {
            return Err(SystemError::InvariantViolation(format!(
                "candle at {timestamp} has negative volume {}",
                volume.0
            ))
            .into());
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> Price {
        self.open
    }

    pub fn high(&self) -> Price {
        self.high
    }

    pub fn low(&self) -> Price {
        self.low
    }

    pub fn close(&self) -> Price {
        self.close
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn is_bullish(&self) -> bool {
        self.close.0 >= self.open.0
    }
}

// ================================================================================================
// Transaction
// ================================================================================================

/// Identifies a transaction by the agent that placed it and the decision tick it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    pub agent_id: AgentId,
    pub tick: u64,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.agent_id, self.tick)
    }
}

/// One entry of an agent's bounded trade log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    /// Displayed trade size. Zero for [`TradeAction::Hold`].
    pub amount: Money,
    /// Latest known price when the decision was taken.
    pub price: Price,
}

use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};
use serde::{Deserialize, Serialize};

use crate::{
    agent::{AgentState, BehaviorBias},
    config::PolicyConfig,
    domain::{Money, Price, TradeAction},
    error::{ArenaResult, ConfigError, ensure_finite, ensure_non_negative},
};

/// Relative likelihood of each action. Weights need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionWeights {
    pub long: f64,
    pub short: f64,
    pub hold: f64,
}

impl ActionWeights {
    pub const fn new(long: f64, short: f64, hold: f64) -> Self {
        Self { long, short, hold }
    }

    pub const fn uniform() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub(crate) fn validate(&self, bias: BehaviorBias) -> ArenaResult<()> {
        let weights = [self.long, self.short, self.hold];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidWeights {
                bias: bias.to_string(),
                msg: "weights must be finite and >= 0".into(),
            }
            .into());
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::InvalidWeights {
                bias: bias.to_string(),
                msg: "at least one weight must be positive".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Probability of `action` after normalisation.
    pub fn probability(&self, action: TradeAction) -> f64 {
        let total = self.long + self.short + self.hold;
        let w = match action {
            TradeAction::Long => self.long,
            TradeAction::Short => self.short,
            TradeAction::Hold => self.hold,
        };
        w / total
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ArenaResult<TradeAction> {
        const ACTIONS: [TradeAction; 3] =
            [TradeAction::Short, TradeAction::Long, TradeAction::Hold];
        let dist = WeightedIndex::new([self.short, self.long, self.hold]).map_err(|e| {
            ConfigError::InvalidWeights {
                bias: "sampled".into(),
                msg: e.to_string(),
            }
        })?;
        Ok(ACTIONS[dist.sample(rng)])
    }
}

/// What an agent does on one decision tick.
///
/// `trade_size` and `commitment` are sampled independently: the former is the
/// size shown in the transaction log, the latter the amount of cash tied up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub action: TradeAction,
    /// Displayed trade size, drawn from a fixed absolute band.
    pub trade_size: Money,
    /// Cash consumed by this action, a fraction of the current cash balance.
    pub commitment: Money,
    /// Additive profit/loss factor adjustment derived from the current rank.
    pub rank_bias: f64,
    /// Price the decision was taken against.
    pub price: Price,
}

/// Chooses actions for agents according to their behavior bias and rank.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: PolicyConfig,
}

impl DecisionEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Decides the next action of `agent`.
    ///
    /// # Arguments
    /// * `position` - 0-based rank of the agent in the snapshot shared by the whole tick.
    /// * `field_size` - Number of ranked agents.
    /// * `latest_price` - Close of the newest candle, or the configured fallback.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        agent: &AgentState,
        position: usize,
        field_size: usize,
        latest_price: Price,
        rng: &mut R,
    ) -> ArenaResult<Decision> {
        let action = self.config.weights(agent.bias()).sample(rng)?;

        let (trade_size, commitment) = if action.is_hold() {
            (0.0, 0.0)
        } else {
            let trade_size = self.config.trade_size.sample(rng).floor();
            let fraction = self.config.commitment.sample(rng);
            // A balance driven negative commits nothing further
            let commitment = agent.cash_balance().0.max(0.0) * fraction;
            (trade_size, commitment)
        };

        let trade_size = ensure_non_negative("trade size", trade_size)?;
        let commitment = ensure_non_negative("cash commitment", commitment)?;
        let rank_bias = ensure_finite(
            "rank bias",
            self.config.rank_bias.for_position(position, field_size),
        )?;

        Ok(Decision {
            action,
            trade_size: Money(trade_size),
            commitment: Money(commitment),
            rank_bias,
            price: latest_price,
        })
    }
}

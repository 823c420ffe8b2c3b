pub mod policy;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString};

use crate::{
    config::AgentSpec,
    domain::{AgentId, Money, TradeAction, Transaction},
};

// ============================================================================
//  Behavior Bias
// ============================================================================

/// Behavioral class of an agent, selecting its action distribution.
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
)]
#[strum(serialize_all = "snake_case")]
pub enum BehaviorBias {
    /// Prefers opening short positions.
    Short,
    /// Prefers opening long positions.
    Long,
    /// Samples uniformly among long, short and hold.
    #[default]
    Balanced,
}

// ============================================================================
//  Agent State
// ============================================================================

/// The mutable state of one competitor.
///
/// `portfolio_value` is the *displayed* value and trails `target_portfolio_value`
/// until the value animator has converged. Neither value is clamped, so both may
/// become negative under a long losing streak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentState {
    pub(crate) id: AgentId,
    pub(crate) name: String,
    pub(crate) color: String,
    pub(crate) bias: BehaviorBias,
    pub(crate) portfolio_value: Money,
    pub(crate) target_portfolio_value: Money,
    pub(crate) cash_balance: Money,
    pub(crate) last_action: TradeAction,
    pub(crate) last_amount: Money,
    pub(crate) profit_loss: Money,
    /// Newest first; capped by the portfolio's transaction depth.
    pub(crate) transactions: VecDeque<Transaction>,
}

impl AgentState {
    /// Creates a fresh agent from its roster entry with `capital` as both
    /// portfolio value and cash balance.
    pub fn new(id: AgentId, spec: &AgentSpec, capital: Money) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            color: spec.color.clone(),
            bias: spec.bias,
            portfolio_value: capital,
            target_portfolio_value: capital,
            cash_balance: capital,
            last_action: TradeAction::Hold,
            last_amount: Money(0.0),
            profit_loss: Money(0.0),
            transactions: VecDeque::new(),
        }
    }

    /// Overrides both displayed and target value, e.g. to stage a scenario.
    pub fn with_portfolio_value(self, value: Money) -> Self {
        Self {
            portfolio_value: value,
            target_portfolio_value: value,
            ..self
        }
    }

    /// Overrides only the target value, leaving the displayed value to animate.
    pub fn with_target(self, target: Money) -> Self {
        Self {
            target_portfolio_value: target,
            ..self
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn bias(&self) -> BehaviorBias {
        self.bias
    }

    pub fn portfolio_value(&self) -> Money {
        self.portfolio_value
    }

    pub fn target_portfolio_value(&self) -> Money {
        self.target_portfolio_value
    }

    pub fn cash_balance(&self) -> Money {
        self.cash_balance
    }

    pub fn last_action(&self) -> TradeAction {
        self.last_action
    }

    pub fn last_amount(&self) -> Money {
        self.last_amount
    }

    pub fn profit_loss(&self) -> Money {
        self.profit_loss
    }

    pub fn transactions(&self) -> impl ExactSizeIterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn latest_transaction(&self) -> Option<&Transaction> {
        self.transactions.front()
    }

    /// True while the displayed value has not yet settled on its target.
    pub fn is_animating(&self) -> bool {
        self.portfolio_value != self.target_portfolio_value
    }

    /// Percentage return of the displayed value relative to `initial`.
    pub fn return_pct(&self, initial: Money) -> f64 {
        if initial.0 == 0.0 {
            return 0.0;
        }
        (self.portfolio_value.0 / initial.0) * 100.0 - 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> AgentSpec {
        AgentSpec::new("BetterEagle8900", "#7E69AB", BehaviorBias::Balanced)
    }

    #[test]
    fn test_new_agent_starts_settled_and_holding() {
        let agent = AgentState::new(AgentId(2), &spec(), Money(100_000.0));

        assert_eq!(agent.id(), AgentId(2));
        assert_eq!(agent.portfolio_value(), agent.target_portfolio_value());
        assert_eq!(agent.cash_balance(), Money(100_000.0));
        assert_eq!(agent.last_action(), TradeAction::Hold);
        assert_eq!(agent.transactions().len(), 0);
        assert!(!agent.is_animating());
    }

    #[test]
    fn test_return_pct() {
        let agent = AgentState::new(AgentId(1), &spec(), Money(100_000.0))
            .with_portfolio_value(Money(112_500.0));

        assert!((agent.return_pct(Money(100_000.0)) - 12.5).abs() < 1e-9);
        assert_eq!(agent.return_pct(Money(0.0)), 0.0);
    }

    #[test]
    fn test_with_target_marks_animation() {
        let agent =
            AgentState::new(AgentId(1), &spec(), Money(100_000.0)).with_target(Money(90_000.0));
        assert!(agent.is_animating());
    }
}

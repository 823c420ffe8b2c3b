use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    agent::{AgentState, policy::Decision},
    config::PortfolioConfig,
    domain::{Money, Transaction, TransactionId},
    error::{ArenaResult, ensure_finite},
};

/// Turns decisions into new target values, cash balances and ledger entries.
#[derive(Clone, Debug)]
pub struct PortfolioUpdater {
    config: PortfolioConfig,
}

impl PortfolioUpdater {
    pub fn new(config: PortfolioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Applies one decision tick to `agent` and returns the updated state.
    ///
    /// The displayed `portfolio_value` is left untouched; only the target moves.
    /// The input is not modified, so a failed tick leaves the caller's state intact.
    pub fn apply_tick<R: Rng + ?Sized>(
        &self,
        agent: &AgentState,
        decision: &Decision,
        timestamp: DateTime<Utc>,
        tick: u64,
        rng: &mut R,
    ) -> ArenaResult<AgentState> {
        let factor = ensure_finite(
            "profit/loss factor",
            self.config.pnl_factor.sample(rng) + decision.rank_bias,
        )?;
        let profit_loss = Money(ensure_finite(
            "profit/loss",
            agent.portfolio_value.0 * factor,
        )?);

        let cash_balance = if decision.action.is_hold() {
            agent.cash_balance
        } else {
            agent.cash_balance - decision.commitment
        };

        let transaction = Transaction {
            id: TransactionId {
                agent_id: agent.id,
                tick,
            },
            timestamp,
            action: decision.action,
            amount: decision.trade_size,
            price: decision.price,
        };
        let mut transactions = agent.transactions.clone();
        transactions.push_front(transaction);
        transactions.truncate(self.config.transaction_depth);

        Ok(AgentState {
            target_portfolio_value: agent.portfolio_value + profit_loss,
            cash_balance,
            last_action: decision.action,
            last_amount: decision.trade_size,
            profit_loss,
            transactions,
            ..agent.clone()
        })
    }
}

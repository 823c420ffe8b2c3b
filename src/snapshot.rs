use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    agent::AgentState,
    domain::{AgentId, Candle, Money, Transaction},
    error::{ArenaResult, IoError},
    rank::Ranking,
};

/// Immutable, self-contained view of the arena handed to renderers.
///
/// Everything a leaderboard, chart or transaction table needs is in here;
/// nothing in it borrows from the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Monotonic state version. Equal versions carry equal content.
    pub version: u64,
    /// Simulation clock at the time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Agents in stable id order.
    pub agents: Vec<AgentState>,
    pub ranking: Ranking,
    /// Oldest first.
    pub candles: Vec<Candle>,
    pub latest_candle: Option<Candle>,
    pub show_trade_marker: bool,
    pub starting_capital: Money,
}

impl Snapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.id() == id)
    }

    /// Agents in leaderboard order, best first.
    pub fn sorted_agents(&self) -> Vec<&AgentState> {
        self.ranking
            .sorted
            .iter()
            .filter_map(|id| self.agent(*id))
            .collect()
    }

    pub fn leader(&self) -> Option<&AgentState> {
        self.ranking.leader().and_then(|id| self.agent(id))
    }

    /// Percentage return of `id` against the starting capital.
    pub fn return_pct(&self, id: AgentId) -> Option<f64> {
        self.agent(id).map(|a| a.return_pct(self.starting_capital))
    }

    /// The `limit` most recent transactions across all agents, newest first.
    ///
    /// Entries of the same tick are ordered by agent id.
    pub fn recent_transactions(&self, limit: usize) -> Vec<(&AgentState, &Transaction)> {
        self.agents
            .iter()
            .map(|agent| agent.transactions().map(move |tx| (agent, tx)))
            .kmerge_by(|a, b| {
                (Reverse(a.1.timestamp), a.0.id()) < (Reverse(b.1.timestamp), b.0.id())
            })
            .take(limit)
            .collect()
    }

    /// Upper bound of a value chart axis: the largest displayed or target value,
    /// never below `floor`.
    pub fn display_scale(&self, floor: f64) -> f64 {
        self.agents
            .iter()
            .flat_map(|a| [a.portfolio_value().0, a.target_portfolio_value().0])
            .fold(floor, f64::max)
    }

    pub fn to_json(&self) -> ArenaResult<String> {
        Ok(serde_json::to_string(self).map_err(IoError::Json)?)
    }
}

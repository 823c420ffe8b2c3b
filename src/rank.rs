use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, HashSet},
};

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tracing::trace;

use crate::{
    agent::AgentState,
    domain::AgentId,
    error::{ArenaResult, RankError},
};

/// Movement of an agent relative to the previous ranking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, EnumString, EnumIter, Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RankChange {
    /// Moved to a lower (better) index.
    Up,
    /// Moved to a higher (worse) index.
    Down,
    #[default]
    Same,
}

/// Position an agent held at the previous recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PreviousRank {
    /// No recompute has happened yet. Distinct from every real position.
    #[default]
    Unranked,
    Ranked(usize),
}

impl PreviousRank {
    fn change_to(self, position: usize) -> RankChange {
        match self {
            Self::Unranked => RankChange::Same,
            Self::Ranked(prev) if position < prev => RankChange::Up,
            Self::Ranked(prev) if position > prev => RankChange::Down,
            Self::Ranked(_) => RankChange::Same,
        }
    }
}

/// Result of one rank computation. Replaced wholesale every time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ranking {
    /// Agent ids ordered best to worst.
    pub sorted: Vec<AgentId>,
    /// 0-based position of each agent in `sorted`.
    pub position_by_id: BTreeMap<AgentId, usize>,
    pub change_by_id: BTreeMap<AgentId, RankChange>,
}

impl Ranking {
    /// A ranking in the given order with nobody moving.
    pub fn unchanged(sorted: Vec<AgentId>) -> Self {
        let position_by_id = sorted
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        let change_by_id = sorted.iter().map(|id| (*id, RankChange::Same)).collect();
        Self {
            sorted,
            position_by_id,
            change_by_id,
        }
    }

    pub fn position(&self, id: AgentId) -> Option<usize> {
        self.position_by_id.get(&id).copied()
    }

    pub fn change(&self, id: AgentId) -> Option<RankChange> {
        self.change_by_id.get(&id).copied()
    }

    pub fn leader(&self) -> Option<AgentId> {
        self.sorted.first().copied()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

/// Orders agents by displayed portfolio value and tracks movement between recomputes.
#[derive(Clone, Debug, Default)]
pub struct RankTracker {
    baseline: HashMap<AgentId, PreviousRank>,
}

impl RankTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the descending value order without touching the baseline.
    ///
    /// Ties are broken by ascending agent id so that identical inputs always
    /// produce identical orders.
    pub fn positions(agents: &[AgentState]) -> Vec<AgentId> {
        agents
            .iter()
            .sorted_by_key(|a| (Reverse(OrderedFloat(a.portfolio_value().0)), a.id()))
            .map(AgentState::id)
            .collect()
    }

    /// The previous position of `id`, `Unranked` before the first recompute.
    pub fn previous(&self, id: AgentId) -> PreviousRank {
        self.baseline.get(&id).copied().unwrap_or_default()
    }

    /// Forgets the baseline so the next recompute reports every agent as `Same`.
    pub fn reset(&mut self) {
        self.baseline.clear();
    }

    /// Ranks `agents` and reports each move against the stored baseline,
    /// leaving the baseline as is.
    ///
    /// # Errors
    /// Returns a [`RankError`] if the roster no longer matches the baseline
    /// (an agent was added, removed or duplicated).
    pub fn rank(&self, agents: &[AgentState]) -> ArenaResult<Ranking> {
        self.check_roster(agents)?;

        let sorted = Self::positions(agents);
        let mut position_by_id = BTreeMap::new();
        let mut change_by_id = BTreeMap::new();
        for (position, id) in sorted.iter().copied().enumerate() {
            let change = self.previous(id).change_to(position);
            if change != RankChange::Same {
                trace!(agent = %id, position, %change, "Rank changed");
            }
            position_by_id.insert(id, position);
            change_by_id.insert(id, change);
        }

        Ok(Ranking {
            sorted,
            position_by_id,
            change_by_id,
        })
    }

    /// Stores the positions of `ranking` as the baseline for later calls.
    pub fn rebase(&mut self, ranking: &Ranking) {
        self.baseline = ranking
            .position_by_id
            .iter()
            .map(|(id, pos)| (*id, PreviousRank::Ranked(*pos)))
            .collect();
    }

    /// Ranks `agents` and stores the result as the baseline for the next call.
    ///
    /// # Errors
    /// Same as [`RankTracker::rank`]; the baseline is then left as is.
    pub fn recompute(&mut self, agents: &[AgentState]) -> ArenaResult<Ranking> {
        let ranking = self.rank(agents)?;
        self.rebase(&ranking);
        Ok(ranking)
    }

    fn check_roster(&self, agents: &[AgentState]) -> ArenaResult<()> {
        let mut seen = HashSet::with_capacity(agents.len());
        for agent in agents {
            if !seen.insert(agent.id()) {
                return Err(RankError::DuplicateAgent(agent.id()).into());
            }
        }

        if self.baseline.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = agents.iter().find(|a| !self.baseline.contains_key(&a.id())) {
            return Err(RankError::UnknownAgent(unknown.id()).into());
        }
        if let Some(missing) = self
            .baseline
            .keys()
            .filter(|id| !seen.contains(*id))
            .min()
        {
            return Err(RankError::MissingAgent(*missing).into());
        }
        Ok(())
    }
}

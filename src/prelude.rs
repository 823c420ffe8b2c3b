// 1. The Core Loop Types
pub use crate::arena::{Arena, ArenaStatus, StepOutcome};
pub use crate::scheduler::{ScheduledEvent, Scheduler, TimerKind};
pub use crate::snapshot::Snapshot;

// 2. Engine Components
pub use crate::agent::{
    AgentState, BehaviorBias,
    policy::{ActionWeights, Decision, DecisionEngine},
};
pub use crate::animator::ValueAnimator;
pub use crate::market::{CandleHistory, PriceGenerator};
pub use crate::portfolio::PortfolioUpdater;
pub use crate::rank::{PreviousRank, RankChange, RankTracker, Ranking};

// 3. Domain Types
pub use crate::domain::{
    AgentId, Candle, Money, Price, TradeAction, Transaction, TransactionId, Volume,
};

// 4. Configurations & Presets
pub use crate::config::{
    AgentSpec, AnimatorConfig, ArenaConfig, ArenaPreset, Band, CandleShape, MarketConfig,
    PolicyConfig, PortfolioConfig, RankBias, ScheduleConfig,
};

// 5. Errors
pub use crate::error::{ArenaError, ArenaResult, ConfigError, IoError, RankError, SystemError};

// 6. Runtime
pub use crate::runtime::{ArenaHandle, Command, RuntimeOptions};

use chrono::{DateTime, Utc};
use humantime::format_duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, trace};

use crate::{
    agent::{AgentState, policy::DecisionEngine},
    animator::ValueAnimator,
    config::ArenaConfig,
    domain::{AgentId, Candle, Price},
    error::{ArenaResult, ConfigError, SystemError},
    market::{CandleHistory, PriceGenerator},
    portfolio::PortfolioUpdater,
    rank::{RankTracker, Ranking},
    scheduler::{ScheduledEvent, Scheduler, TimerKind},
    snapshot::Snapshot,
};

/// Lifecycle status of an arena.
///
/// ```md
/// Current State | Action         | Next State | Notes
/// --------------|----------------|------------|--------------------------------------
/// `Running`     | step()         | Running    | Processes at most one event
/// `Running`     | shutdown()     | Stopped    | All timers stopped, queue emptied
/// `Stopped`     | step()/handle()| Stopped    | Rejected with `SystemError::InvalidState`
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaStatus {
    Running,
    Stopped,
}

impl ArenaStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// What a call to [`Arena::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One event was taken from the queue and applied.
    Processed(ScheduledEvent),
    /// Every timer is stopped; nothing left to do.
    Idle,
}

impl StepOutcome {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// The trading arena: one serialized simulation state driven by a deterministic event queue.
///
/// All mutation goes through `&mut self`, one event at a time. Each handler
/// computes its complete result before committing, so a failing tick leaves
/// the arena exactly as it was.
///
/// # The Master Clock Logic
/// [`Arena::step`] pops the earliest pending timer event and dispatches it:
/// 1. **Price tick:** appends a candle and raises the trade marker.
/// 2. **Decision tick:** every agent decides against one shared rank snapshot and price.
///    That snapshot becomes the baseline rank changes are reported against.
/// 3. **Animation tick:** displayed values move toward their targets and are re-ranked.
/// 4. **Marker expiry:** hides the trade marker again.
#[derive(Clone, Debug)]
pub struct Arena<R = StdRng> {
    // === Configuration & Components ===
    config: ArenaConfig,
    rng: R,
    scheduler: Scheduler,
    generator: PriceGenerator,
    policy: DecisionEngine,
    updater: PortfolioUpdater,
    ranker: RankTracker,
    animator: ValueAnimator,

    // === Simulation State ===
    /// Stable id order.
    agents: Vec<AgentState>,
    candles: CandleHistory,
    ranking: Ranking,
    show_trade_marker: bool,

    // === Bookkeeping ===
    decision_ticks: u64,
    /// Bumped on every observable state change.
    version: u64,
    status: ArenaStatus,
}

impl Arena<StdRng> {
    /// Builds an arena whose clock starts now, seeded from the configuration.
    pub fn new(config: ArenaConfig) -> ArenaResult<Self> {
        Self::with_origin(config, Utc::now())
    }

    /// Builds an arena whose clock starts at `origin`, seeded from the configuration.
    pub fn with_origin(config: ArenaConfig, origin: DateTime<Utc>) -> ArenaResult<Self> {
        let rng = StdRng::seed_from_u64(config.seed());
        Self::with_rng(config, origin, rng)
    }
}

impl<R: Rng> Arena<R> {
    /// Builds an arena around an injected random source.
    #[tracing::instrument(skip_all, fields(agents = config.roster().len(), origin = %origin))]
    pub fn with_rng(config: ArenaConfig, origin: DateTime<Utc>, mut rng: R) -> ArenaResult<Self> {
        config.validate()?;

        let schedule = config.schedule();
        let scheduler = Scheduler::new(schedule, origin)?;
        let generator = PriceGenerator::new(*config.market());
        let spacing = chrono::Duration::from_std(schedule.price_interval).map_err(|e| {
            ConfigError::IntervalOutOfRange {
                name: "price interval",
                msg: e.to_string(),
            }
        })?;
        let candles = CandleHistory::seeded(
            &generator,
            config.market().history_depth,
            config.market().seed_candles,
            spacing,
            origin,
            &mut rng,
        )?;

        let capital = config.portfolio().starting_capital;
        let agents: Vec<AgentState> = config
            .roster()
            .iter()
            .zip(1u32..)
            .map(|(spec, id)| AgentState::new(AgentId(id), spec, capital))
            .collect();

        let mut ranker = RankTracker::new();
        let ranking = ranker.recompute(&agents)?;

        info!(
            price_interval = %format_duration(schedule.price_interval),
            decision_interval = %format_duration(schedule.decision_interval),
            animation_interval = %format_duration(schedule.animation_interval),
            seeded_candles = candles.len(),
            seed = config.seed(),
            "Arena built"
        );

        Ok(Self {
            policy: DecisionEngine::new(*config.policy()),
            updater: PortfolioUpdater::new(*config.portfolio()),
            animator: ValueAnimator::new(*config.animator()),
            config,
            rng,
            scheduler,
            generator,
            ranker,
            agents,
            candles,
            ranking,
            show_trade_marker: false,
            decision_ticks: 0,
            version: 0,
            status: ArenaStatus::Running,
        })
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Processes the next scheduled event, advancing the simulation clock to it.
    pub fn step(&mut self) -> ArenaResult<StepOutcome> {
        self.check_running()?;
        match self.scheduler.next_event() {
            Some(event) => {
                self.dispatch(event.kind, event.timestamp)?;
                Ok(StepOutcome::Processed(event))
            }
            None => Ok(StepOutcome::Idle),
        }
    }

    /// Processes every event due at or before `until`. Returns how many were applied.
    pub fn run_until(&mut self, until: DateTime<Utc>) -> ArenaResult<usize> {
        self.check_running()?;
        let mut processed = 0;
        while let Some(event) = self.scheduler.next_event_until(until) {
            self.dispatch(event.kind, event.timestamp)?;
            processed += 1;
        }
        trace!(processed, until = %until, "Ran arena forward");
        Ok(processed)
    }

    /// Runs the simulation clock forward by `span`.
    pub fn run_for(&mut self, span: std::time::Duration) -> ArenaResult<usize> {
        let until = chrono::Duration::from_std(span)
            .ok()
            .and_then(|delta| self.now().checked_add_signed(delta))
            .ok_or_else(|| {
                SystemError::InvalidState(format!(
                    "{} does not fit the simulation clock",
                    format_duration(span)
                ))
            })?;
        self.run_until(until)
    }

    /// Applies one synthetic tick at the current clock time, bypassing the queue.
    ///
    /// Useful to drive the engine through a hand-written sequence of events.
    pub fn handle(&mut self, kind: TimerKind) -> ArenaResult<()> {
        self.check_running()?;
        self.dispatch(kind, self.now())
    }

    fn dispatch(&mut self, kind: TimerKind, ts: DateTime<Utc>) -> ArenaResult<()> {
        match kind {
            TimerKind::PriceTick => self.on_price_tick(ts),
            TimerKind::DecisionTick => self.on_decision_tick(ts),
            TimerKind::AnimationTick => self.on_animation_tick(),
            TimerKind::MarkerExpiry => {
                self.on_marker_expiry();
                Ok(())
            }
        }
    }

    // ========================================================================
    // Tick Handlers
    // ========================================================================

    #[tracing::instrument(level = "debug", skip_all, fields(ts = %ts))]
    fn on_price_tick(&mut self, ts: DateTime<Utc>) -> ArenaResult<()> {
        let candle = match self.candles.latest() {
            Some(prev) => self.generator.next_candle(prev, ts, &mut self.rng)?,
            None => self.generator.seed_candle(ts, &mut self.rng)?,
        };

        let evicted = self.candles.push(candle);
        self.show_trade_marker = true;
        self.scheduler.arm_marker_expiry(ts);
        self.version += 1;

        debug!(
            open = candle.open().0,
            close = candle.close().0,
            volume = candle.volume().0,
            evicted = evicted.is_some(),
            "New candle"
        );
        Ok(())
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(ts = %ts, tick = self.decision_ticks + 1)
    )]
    fn on_decision_tick(&mut self, ts: DateTime<Utc>) -> ArenaResult<()> {
        let tick = self.decision_ticks + 1;

        // One rank snapshot and one price for the whole tick. The snapshot is
        // also the baseline animation frames report movement against.
        let snapshot = Ranking::unchanged(RankTracker::positions(&self.agents));
        let field_size = self.agents.len();
        let price = self.latest_price();

        let mut updated = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let position = snapshot.position(agent.id()).ok_or_else(|| {
                SystemError::InvariantViolation(format!(
                    "agent {} missing from rank snapshot",
                    agent.id()
                ))
            })?;
            let decision = self
                .policy
                .decide(agent, position, field_size, price, &mut self.rng)?;
            let next = self
                .updater
                .apply_tick(agent, &decision, ts, tick, &mut self.rng)?;

            trace!(
                agent = %agent.id(),
                position,
                action = %decision.action,
                trade_size = decision.trade_size.0,
                target = next.target_portfolio_value().0,
                "Agent decided"
            );
            updated.push(next);
        }

        self.agents = updated;
        self.ranker.rebase(&snapshot);
        self.ranking = snapshot;
        self.decision_ticks = tick;
        self.version += 1;
        debug!(price = price.0, agents = field_size, "Decision tick applied");
        Ok(())
    }

    fn on_animation_tick(&mut self) -> ArenaResult<()> {
        let mut next = self.agents.clone();
        let still_moving = self.animator.step(&mut next);
        let ranking = self.ranker.rank(&next)?;

        let changed = next != self.agents || ranking != self.ranking;
        self.agents = next;
        self.ranking = ranking;
        if changed {
            self.version += 1;
            trace!(still_moving, leader = ?self.ranking.leader(), "Animation frame");
        }
        Ok(())
    }

    fn on_marker_expiry(&mut self) {
        if self.show_trade_marker {
            self.show_trade_marker = false;
            self.version += 1;
        }
    }

    // ========================================================================
    // Timer Control & Lifecycle
    // ========================================================================

    pub fn stop_timer(&mut self, kind: TimerKind) {
        self.scheduler.stop(kind);
    }

    pub fn resume_timer(&mut self, kind: TimerKind) -> ArenaResult<()> {
        self.check_running()?;
        self.scheduler.resume(kind);
        Ok(())
    }

    /// Moves the simulation clock forward to `ts` without processing events.
    ///
    /// Used by real-time drivers before resuming a timer so that it re-arms
    /// from the present instead of from the last processed event.
    pub fn advance_clock(&mut self, ts: DateTime<Utc>) {
        self.scheduler.advance_to(ts);
    }

    /// Stops every timer. The state stays readable; further steps are rejected.
    pub fn shutdown(&mut self) {
        if self.status.is_stopped() {
            return;
        }
        self.scheduler.stop_all();
        self.status = ArenaStatus::Stopped;
        info!(
            decision_ticks = self.decision_ticks,
            version = self.version,
            "Arena shut down"
        );
    }

    fn check_running(&self) -> ArenaResult<()> {
        match self.status {
            ArenaStatus::Running => Ok(()),
            ArenaStatus::Stopped => {
                Err(SystemError::InvalidState("arena has been shut down".into()).into())
            }
        }
    }
}

// ============================================================================
// Read Access
// ============================================================================

impl<R> Arena<R> {
    /// Read-only view for renderers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            timestamp: self.scheduler.current_ts(),
            agents: self.agents.clone(),
            ranking: self.ranking.clone(),
            candles: self.candles.to_vec(),
            latest_candle: self.candles.latest().copied(),
            show_trade_marker: self.show_trade_marker,
            starting_capital: self.config.portfolio().starting_capital,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn status(&self) -> ArenaStatus {
        self.status
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.current_ts()
    }

    /// Timestamp of the next pending event.
    pub fn next_event_at(&self) -> Option<DateTime<Utc>> {
        self.scheduler.peek()
    }

    pub fn is_timer_enabled(&self, kind: TimerKind) -> bool {
        self.scheduler.is_enabled(kind)
    }

    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn candles(&self) -> &CandleHistory {
        &self.candles
    }

    pub fn latest_candle(&self) -> Option<&Candle> {
        self.candles.latest()
    }

    /// Close of the newest candle, falling back to the configured base price.
    pub fn latest_price(&self) -> Price {
        self.candles.latest_close_or(self.config.market().base_price)
    }

    pub fn show_trade_marker(&self) -> bool {
        self.show_trade_marker
    }

    pub fn decision_ticks(&self) -> u64 {
        self.decision_ticks
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        agent::BehaviorBias,
        config::{
            AgentSpec, ArenaPreset, Band, MarketConfig, PortfolioConfig, RankBias, ScheduleConfig,
        },
        domain::{Money, TradeAction},
        error::ArenaError,
        rank::RankChange,
    };

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 19, 10, 0, 0).unwrap()
    }

    fn classic(seed: u64) -> Arena {
        Arena::with_origin(ArenaConfig::from(ArenaPreset::Classic).with_seed(seed), origin())
            .expect("classic arena")
    }

    #[test]
    fn test_build_seeds_agents_candles_and_ranking() {
        let arena = classic(1);

        assert_eq!(arena.agents().len(), 5);
        assert_eq!(arena.agents()[0].id(), AgentId(1));
        assert_eq!(arena.candles().len(), 20);
        assert_eq!(arena.latest_candle().map(Candle::timestamp), Some(origin()));
        assert_eq!(arena.ranking().len(), 5);
        // Equal starting capital: id order, nobody moved
        assert_eq!(arena.ranking().leader(), Some(AgentId(1)));
        assert!(arena.ranking().change_by_id.values().all(|c| *c == RankChange::Same));
        assert!(!arena.show_trade_marker());
    }

    #[test]
    fn test_invalid_config_is_rejected_at_build() {
        let err = Arena::with_origin(ArenaConfig::default(), origin()).unwrap_err();
        assert!(matches!(err, ArenaError::Config(_)));
    }

    #[test]
    fn test_out_of_range_clock_is_rejected_at_build() {
        // Arrange
        let huge_interval = ArenaConfig::from(ArenaPreset::Classic).with_schedule(ScheduleConfig {
            price_interval: std::time::Duration::from_millis(10_u64.pow(16)),
            ..ScheduleConfig::default()
        });
        let late_origin = DateTime::<Utc>::MAX_UTC - Duration::seconds(1);
        let early_origin = DateTime::<Utc>::MIN_UTC + Duration::seconds(1);

        // Act
        let huge = Arena::with_origin(huge_interval, origin());
        let late = Arena::with_origin(ArenaConfig::from(ArenaPreset::Classic), late_origin);
        let early = Arena::with_origin(ArenaConfig::from(ArenaPreset::Classic), early_origin);

        // Assert
        for result in [huge, late, early] {
            assert!(matches!(
                result.unwrap_err(),
                ArenaError::Config(ConfigError::IntervalOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_empty_history_falls_back_to_base_price() {
        // Arrange
        let config = ArenaConfig::from(ArenaPreset::Classic).with_market(MarketConfig {
            seed_candles: 0,
            ..MarketConfig::default()
        });
        let mut arena = Arena::with_origin(config, origin()).unwrap();
        assert!(arena.candles().is_empty());

        // Act
        arena.handle(TimerKind::DecisionTick).unwrap();

        // Assert
        for agent in arena.agents() {
            let tx = agent.latest_transaction().unwrap();
            assert_eq!(tx.price, Price(70_000.0));
        }
    }

    #[test]
    fn test_price_tick_on_empty_history_seeds_a_candle() {
        let config = ArenaConfig::from(ArenaPreset::Classic).with_market(MarketConfig {
            seed_candles: 0,
            ..MarketConfig::default()
        });
        let mut arena = Arena::with_origin(config, origin()).unwrap();

        arena.handle(TimerKind::PriceTick).unwrap();

        assert_eq!(arena.candles().len(), 1);
        assert!(arena.show_trade_marker());
    }

    #[test]
    fn test_marker_raised_by_price_tick_and_expired_later() {
        let mut arena = classic(2);

        arena.run_until(origin() + Duration::seconds(10)).unwrap();
        assert!(arena.show_trade_marker(), "raised at the 10s price tick");
        assert_eq!(arena.candles().len(), 20, "history stays bounded");

        arena.run_until(origin() + Duration::milliseconds(12_950)).unwrap();
        assert!(arena.show_trade_marker(), "still visible before expiry");

        arena.run_until(origin() + Duration::seconds(13)).unwrap();
        assert!(!arena.show_trade_marker(), "expired after 3s");
    }

    #[test]
    fn test_decision_tick_uses_latest_close() {
        let mut arena = classic(3);
        let close = arena.latest_price();

        arena.handle(TimerKind::DecisionTick).unwrap();

        assert_eq!(arena.decision_ticks(), 1);
        for agent in arena.agents() {
            let tx = agent.latest_transaction().unwrap();
            assert_eq!(tx.price, close);
            assert_eq!(tx.id.tick, 1);
            assert_eq!(tx.action, agent.last_action());
            // Displayed values only move on animation ticks
            assert_eq!(agent.portfolio_value(), Money(100_000.0));
        }
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut a = classic(42);
        let mut b = classic(42);
        let until = origin() + Duration::seconds(60);

        a.run_until(until).unwrap();
        b.run_until(until).unwrap();

        assert_eq!(a.agents(), b.agents());
        assert_eq!(a.ranking(), b.ranking());
        assert_eq!(a.candles().to_vec(), b.candles().to_vec());
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn test_cash_never_increases_over_a_session() {
        let mut arena = classic(5);
        let mut cash: Vec<Money> = arena.agents().iter().map(|a| a.cash_balance()).collect();

        for _ in 0..30 {
            arena.handle(TimerKind::DecisionTick).unwrap();
            for (agent, before) in arena.agents().iter().zip(cash.iter()) {
                if agent.last_action() == TradeAction::Hold {
                    assert_eq!(agent.cash_balance(), *before);
                } else {
                    assert!(agent.cash_balance() < *before);
                }
            }
            cash = arena.agents().iter().map(|a| a.cash_balance()).collect();
        }
    }

    #[test]
    fn test_shared_rank_snapshot_within_a_tick() {
        // Everyone gains exactly the rank bias: top two +1%, last -1%, others 0
        let config = ArenaConfig::from(ArenaPreset::Classic)
            .with_pnl_factor(Band::fixed(0.0))
            .with_rank_bias(RankBias::default());
        let mut arena = Arena::with_origin(config, origin()).unwrap();

        arena.handle(TimerKind::DecisionTick).unwrap();

        let expected = [101_000.0, 101_000.0, 100_000.0, 100_000.0, 99_000.0];
        for (agent, want) in arena.agents().iter().zip(expected) {
            assert!(
                (agent.target_portfolio_value().0 - want).abs() < 1e-6,
                "agent {} target {:?}",
                agent.id(),
                agent.target_portfolio_value()
            );
        }
    }

    #[test]
    fn test_two_agent_swap_after_convergence() {
        // Arrange: A leads at 120k, B trails at 100k
        let config = ArenaConfig::default()
            .add_agent(AgentSpec::new("A", "red", BehaviorBias::Balanced))
            .add_agent(AgentSpec::new("B", "blue", BehaviorBias::Balanced))
            .with_rank_bias(RankBias {
                top_count: 0,
                top_bonus: 0.0,
                bottom_count: 0,
                bottom_penalty: 0.0,
            })
            .with_portfolio(PortfolioConfig::default());
        let mut arena = Arena::with_origin(config, origin()).unwrap();
        arena.agents[0] = arena.agents[0].clone().with_portfolio_value(Money(120_000.0));
        arena.agents[1] = arena.agents[1].clone().with_portfolio_value(Money(100_000.0));
        arena.handle(TimerKind::AnimationTick).unwrap();
        assert_eq!(arena.ranking().sorted, vec![AgentId(1), AgentId(2)]);

        // Act: targets flip, then animate to convergence
        arena.agents[0] = arena.agents[0].clone().with_target(Money(90_000.0));
        arena.agents[1] = arena.agents[1].clone().with_target(Money(130_000.0));
        let mut frames = 0;
        while arena.agents().iter().any(AgentState::is_animating) {
            arena.handle(TimerKind::AnimationTick).unwrap();
            frames += 1;
            assert!(frames < 1_000);
        }
        let settled = arena.ranking().clone();
        arena.handle(TimerKind::AnimationTick).unwrap();

        // Assert: the move is still reported once the values have settled
        assert_eq!(settled.sorted, vec![AgentId(2), AgentId(1)]);
        assert_eq!(settled.change(AgentId(2)), Some(RankChange::Up));
        assert_eq!(settled.change(AgentId(1)), Some(RankChange::Down));
        assert_eq!(arena.ranking(), &settled);
        assert_eq!(arena.agent(AgentId(1)).unwrap().portfolio_value(), Money(90_000.0));
        assert_eq!(arena.agent(AgentId(2)).unwrap().portfolio_value(), Money(130_000.0));
    }

    #[test]
    fn test_decision_tick_rebases_rank_changes() {
        // Arrange: B has overtaken A since the last decision tick
        let mut arena = classic(12);
        arena.agents[1] = arena.agents[1].clone().with_portfolio_value(Money(150_000.0));
        arena.handle(TimerKind::AnimationTick).unwrap();
        assert_eq!(arena.ranking().change(AgentId(2)), Some(RankChange::Up));

        // Act
        arena.handle(TimerKind::DecisionTick).unwrap();

        // Assert: the new baseline is the order the tick decided on
        assert_eq!(arena.ranking().leader(), Some(AgentId(2)));
        assert!(arena.ranking().change_by_id.values().all(|c| *c == RankChange::Same));
    }

    #[test]
    fn test_stopped_timer_is_skipped_by_step() {
        let mut arena = classic(6);
        arena.stop_timer(TimerKind::AnimationTick);
        arena.stop_timer(TimerKind::PriceTick);

        let outcome = arena.step().unwrap();

        match outcome {
            StepOutcome::Processed(event) => assert_eq!(event.kind, TimerKind::DecisionTick),
            StepOutcome::Idle => panic!("decision timer still running"),
        }
        assert!(!arena.is_timer_enabled(TimerKind::AnimationTick));
    }

    #[test]
    fn test_all_timers_stopped_means_idle() {
        let mut arena = classic(6);
        for kind in [
            TimerKind::PriceTick,
            TimerKind::DecisionTick,
            TimerKind::AnimationTick,
            TimerKind::MarkerExpiry,
        ] {
            arena.stop_timer(kind);
        }

        assert!(arena.step().unwrap().is_idle());
    }

    #[test]
    fn test_shutdown_rejects_further_steps_but_keeps_state() {
        let mut arena = classic(7);
        arena.run_until(origin() + Duration::seconds(4)).unwrap();
        let before = arena.snapshot();

        arena.shutdown();

        assert!(arena.status().is_stopped());
        assert!(matches!(
            arena.step().unwrap_err(),
            ArenaError::System(SystemError::InvalidState(_))
        ));
        assert!(arena.handle(TimerKind::DecisionTick).is_err());
        assert_eq!(arena.snapshot().agents, before.agents);
        assert!(arena.next_event_at().is_none());
    }

    #[test]
    fn test_version_tracks_state_changes() {
        let mut arena = classic(8);
        let v0 = arena.version();

        arena.handle(TimerKind::DecisionTick).unwrap();
        let v1 = arena.version();
        arena.handle(TimerKind::MarkerExpiry).unwrap();

        assert!(v1 > v0);
        assert_eq!(arena.version(), v1, "expiring a hidden marker changes nothing");
    }
}

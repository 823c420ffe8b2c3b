use std::time::Duration;

use trade_arena::prelude::*;

mod common;

// ================================================================================================
// Session Replay
// ================================================================================================

#[test]
fn test_same_seed_produces_identical_session() {
    // Arrange
    let mut a = common::setup_classic(42);
    let mut b = common::setup_classic(42);

    // Act
    a.run_for(Duration::from_secs(120)).unwrap();
    b.run_for(Duration::from_secs(120)).unwrap();

    // Assert
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.decision_ticks(), 60);
}

#[test]
fn test_different_seeds_diverge() {
    let mut a = common::setup_classic(1);
    let mut b = common::setup_classic(2);

    a.run_for(Duration::from_secs(20)).unwrap();
    b.run_for(Duration::from_secs(20)).unwrap();

    assert_ne!(a.snapshot().candles, b.snapshot().candles);
}

#[test]
fn test_config_json_round_trip_replays_identically() {
    let config = ArenaConfig::from(ArenaPreset::Classic).with_seed(77);
    let decoded = ArenaConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(config.hash().unwrap(), decoded.hash().unwrap());

    let mut a = Arena::with_origin(config, common::origin()).unwrap();
    let mut b = Arena::with_origin(decoded, common::origin()).unwrap();
    a.run_for(Duration::from_secs(30)).unwrap();
    b.run_for(Duration::from_secs(30)).unwrap();

    assert_eq!(a.snapshot(), b.snapshot());
}

// ================================================================================================
// Long-Run Invariants
// ================================================================================================

#[test]
fn test_long_session_keeps_every_bound() {
    // Arrange
    let mut arena = common::setup_classic(2026);
    let depth = arena.config().portfolio().transaction_depth;
    let history = arena.config().market().history_depth;

    // Act: ten simulated minutes
    for _ in 0..10 {
        arena.run_for(Duration::from_secs(60)).unwrap();

        // Assert
        let snapshot = arena.snapshot();
        assert_eq!(snapshot.candles.len(), history);
        assert!(
            snapshot
                .candles
                .windows(2)
                .all(|w| w[0].timestamp() < w[1].timestamp())
        );
        for candle in &snapshot.candles {
            assert!(candle.low().0 <= candle.open().0.min(candle.close().0));
            assert!(candle.high().0 >= candle.open().0.max(candle.close().0));
            assert!(candle.low().0 > 0.0);
        }
        for agent in &snapshot.agents {
            assert!(agent.transactions().len() <= depth);
            assert!(agent.portfolio_value().0.is_finite());
        }
        assert_eq!(snapshot.ranking.len(), 5);
    }
    assert_eq!(arena.decision_ticks(), 300);
}

#[test]
fn test_transaction_ids_are_unique_and_newest_first() {
    let mut arena = common::setup_classic(8);
    arena.run_for(Duration::from_secs(60)).unwrap();

    for agent in arena.agents() {
        let ticks: Vec<u64> = agent.transactions().map(|t| t.id.tick).collect();
        assert_eq!(ticks, (21..=30).rev().collect::<Vec<_>>());
        assert!(agent.transactions().all(|t| t.id.agent_id == agent.id()));
    }
}

// ================================================================================================
// Ranking & Animation
// ================================================================================================

#[test]
fn test_equal_losses_keep_id_order() {
    // Arrange: both agents lose exactly 5% per decision
    let mut arena = Arena::with_origin(common::setup_duel(-0.05), common::origin()).unwrap();

    // Act
    arena.handle(TimerKind::DecisionTick).unwrap();
    common::drain_animation(&mut arena);

    // Assert
    for agent in arena.agents() {
        assert_eq!(agent.portfolio_value(), Money(95_000.0));
        assert_eq!(arena.ranking().change(agent.id()), Some(RankChange::Same));
    }
    assert_eq!(arena.ranking().sorted, vec![AgentId(1), AgentId(2)]);
}

#[test]
fn test_animation_settles_within_bound() {
    let mut arena = Arena::with_origin(common::setup_duel(0.1), common::origin()).unwrap();
    let bound = ValueAnimator::new(*arena.config().animator()).ticks_to_converge(10_000.0);
    arena.handle(TimerKind::DecisionTick).unwrap();

    let frames = common::drain_animation(&mut arena);

    assert!(frames <= bound, "took {frames} frames, bound {bound}");
    for agent in arena.agents() {
        assert_eq!(agent.portfolio_value(), agent.target_portfolio_value());
        assert!((agent.portfolio_value().0 - 110_000.0).abs() < 1e-6);
    }
}

#[test]
fn test_leaderboard_order_matches_displayed_values() {
    let mut arena = common::setup_classic(13);
    arena.run_for(Duration::from_secs(45)).unwrap();

    let snapshot = arena.snapshot();
    let values: Vec<Money> = snapshot
        .sorted_agents()
        .iter()
        .map(|a| a.portfolio_value())
        .collect();

    assert!(values.windows(2).all(|w| w[0] >= w[1]));
    assert!(snapshot.display_scale(100_000.0) >= values[0].0);
}

// ================================================================================================
// Timers & Lifecycle
// ================================================================================================

#[test]
fn test_stopped_decision_timer_freezes_ledgers() {
    // Arrange
    let mut arena = common::setup_classic(4);
    arena.run_for(Duration::from_secs(10)).unwrap();
    let ledgers: Vec<usize> = arena.agents().iter().map(|a| a.transactions().len()).collect();

    // Act
    arena.stop_timer(TimerKind::DecisionTick);
    arena.run_for(Duration::from_secs(20)).unwrap();

    // Assert: candles keep coming, trades do not
    let after: Vec<usize> = arena.agents().iter().map(|a| a.transactions().len()).collect();
    assert_eq!(ledgers, after);
    assert_eq!(arena.decision_ticks(), 5);
    assert_eq!(
        arena.latest_candle().map(Candle::timestamp),
        Some(common::origin() + chrono::Duration::seconds(30))
    );

    // Resume picks up one interval after the current clock
    arena.resume_timer(TimerKind::DecisionTick).unwrap();
    arena.run_for(Duration::from_secs(2)).unwrap();
    assert_eq!(arena.decision_ticks(), 6);
}

#[test]
fn test_trade_marker_follows_price_ticks() {
    let mut arena = common::setup_classic(5);

    arena.run_for(Duration::from_secs(11)).unwrap();
    assert!(arena.show_trade_marker());

    arena.run_for(Duration::from_secs(3)).unwrap();
    assert!(!arena.show_trade_marker());
}

#[test]
fn test_shutdown_keeps_final_snapshot() {
    let mut arena = common::setup_classic(6);
    arena.run_for(Duration::from_secs(8)).unwrap();
    let last = arena.snapshot();

    arena.shutdown();

    assert!(arena.run_for(Duration::from_secs(8)).is_err());
    assert_eq!(arena.snapshot().agents, last.agents);
    assert!(arena.snapshot().to_json().is_ok());
}

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use trade_arena::prelude::*;

pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 19, 10, 0, 0).unwrap()
}

pub fn setup_classic(seed: u64) -> Arena {
    Arena::with_origin(ArenaConfig::from(ArenaPreset::Classic).with_seed(seed), origin())
        .expect("classic preset must build")
}

/// Two balanced agents, no rank bias, profit/loss pinned to `factor`.
pub fn setup_duel(factor: f64) -> ArenaConfig {
    ArenaConfig::default()
        .add_agent(AgentSpec::new("Alpha", "#9b87f5", BehaviorBias::Balanced))
        .add_agent(AgentSpec::new("Beta", "#0EA5E9", BehaviorBias::Balanced))
        .with_pnl_factor(Band::fixed(factor))
        .with_rank_bias(RankBias {
            top_count: 0,
            top_bonus: 0.0,
            bottom_count: 0,
            bottom_penalty: 0.0,
        })
        .with_seed(3)
}

pub fn drain_animation(arena: &mut Arena) -> usize {
    let mut frames = 0;
    while arena.agents().iter().any(AgentState::is_animating) {
        arena.handle(TimerKind::AnimationTick).expect("animation tick");
        frames += 1;
        assert!(frames < 10_000, "animation never settled");
    }
    frames
}

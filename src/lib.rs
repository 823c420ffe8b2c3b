//! Deterministic engine for multi-agent trading competitions.
//!
//! An [`Arena`](arena::Arena) owns a synthetic candle market, a roster of
//! behaviorally biased agents, their portfolios, a rank tracker and a value
//! animator. Four logical timers drive it through a single serialized event
//! queue; renderers read immutable [`Snapshot`](snapshot::Snapshot)s.

pub mod agent;
pub mod animator;
pub mod arena;
pub mod config;
pub mod domain;
pub mod error;
mod macros;
pub mod market;
pub mod portfolio;
pub mod prelude;
pub mod rank;
pub mod runtime;
pub mod scheduler;
pub mod snapshot;

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, trace, warn};

use crate::{
    config::ScheduleConfig,
    error::{ArenaResult, ConfigError},
};

// ============================================================================
// 1. Timers & Events
// ============================================================================

/// The four logical timers driving the simulation.
///
/// Declaration order is also the processing priority for events that fall on
/// the same instant: a new candle is in place before agents decide, and values
/// are animated after the decisions that moved their targets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    EnumString,
    EnumIter,
    EnumCount,
    Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum TimerKind {
    PriceTick,
    DecisionTick,
    AnimationTick,
    /// One-shot: armed by every price tick, hides the trade marker.
    MarkerExpiry,
}

impl TimerKind {
    pub fn is_periodic(&self) -> bool {
        !matches!(self, Self::MarkerExpiry)
    }

    /// Name of the period that configures this timer.
    pub fn interval_name(&self) -> &'static str {
        match self {
            Self::PriceTick => "price interval",
            Self::DecisionTick => "decision interval",
            Self::AnimationTick => "animation interval",
            Self::MarkerExpiry => "marker duration",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: TimerKind,
    /// Insertion counter; keeps ordering total and FIFO among equal keys.
    seq: u64,
}

impl ScheduledEvent {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.kind.cmp(&other.kind))
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    interval: Duration,
    enabled: bool,
}

// ============================================================================
// 2. The Scheduler (Master Clock)
// ============================================================================

/// Serializes the four timers into one deterministic event stream.
///
/// Periodic timers re-arm themselves when their event is popped, so the queue
/// holds at most one pending event per timer. Stopping a timer removes its
/// pending event; nothing ever fires concurrently.
#[derive(Clone, Debug)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<ScheduledEvent>>,
    timers: [Timer; TimerKind::COUNT],
    current_ts: DateTime<Utc>,
    previous_ts: Option<DateTime<Utc>>,
    next_seq: u64,
}

impl Scheduler {
    /// Creates a scheduler whose clock starts at `origin`. Periodic timers first
    /// fire one interval after the origin.
    pub fn new(config: &ScheduleConfig, origin: DateTime<Utc>) -> ArenaResult<Self> {
        let to_sim = |name: &'static str, d: std::time::Duration| {
            Duration::from_std(d).map_err(|e| ConfigError::IntervalOutOfRange {
                name,
                msg: e.to_string(),
            })
        };
        let timers = [
            Timer {
                interval: to_sim("price interval", config.price_interval)?,
                enabled: true,
            },
            Timer {
                interval: to_sim("decision interval", config.decision_interval)?,
                enabled: true,
            },
            Timer {
                interval: to_sim("animation interval", config.animation_interval)?,
                enabled: true,
            },
            Timer {
                interval: to_sim("marker duration", config.marker_duration)?,
                enabled: true,
            },
        ];

        let mut scheduler = Self {
            queue: BinaryHeap::with_capacity(TimerKind::COUNT),
            timers,
            current_ts: origin,
            previous_ts: None,
            next_seq: 0,
        };
        for kind in TimerKind::iter().filter(TimerKind::is_periodic) {
            if !scheduler.arm(kind, origin) {
                return Err(ConfigError::IntervalOutOfRange {
                    name: kind.interval_name(),
                    msg: format!("first firing after {origin} is past the end of the clock"),
                }
                .into());
            }
        }
        Ok(scheduler)
    }

    pub fn current_ts(&self) -> DateTime<Utc> {
        self.current_ts
    }

    pub fn previous_ts(&self) -> Option<DateTime<Utc>> {
        self.previous_ts
    }

    pub fn interval(&self, kind: TimerKind) -> Duration {
        self.timers[kind as usize].interval
    }

    pub fn is_enabled(&self, kind: TimerKind) -> bool {
        self.timers[kind as usize].enabled
    }

    /// Timestamp of the next event, if any timer is pending.
    pub fn peek(&self) -> Option<DateTime<Utc>> {
        self.queue.peek().map(|Reverse(e)| e.timestamp)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pops the next event and advances the clock to it.
    pub fn next_event(&mut self) -> Option<ScheduledEvent> {
        let Reverse(event) = self.queue.pop()?;
        self.update_time(event.timestamp);
        if event.kind.is_periodic() && self.is_enabled(event.kind) {
            self.arm(event.kind, event.timestamp);
        }
        trace!(kind = %event.kind, ts = %event.timestamp, "Event dequeued");
        Some(event)
    }

    /// Pops the next event only if it is due at or before `until`.
    pub fn next_event_until(&mut self, until: DateTime<Utc>) -> Option<ScheduledEvent> {
        match self.peek() {
            Some(ts) if ts <= until => self.next_event(),
            _ => None,
        }
    }

    /// Moves the clock forward to `ts` without firing anything.
    ///
    /// Never passes a pending event, so the clock cannot run ahead of the queue.
    pub fn advance_to(&mut self, ts: DateTime<Utc>) {
        let target = self.peek().map_or(ts, |next| next.min(ts));
        if target > self.current_ts {
            self.update_time(target);
        }
    }

    /// (Re)arms the one-shot marker-expiry timer relative to `from`.
    ///
    /// A pending expiry is replaced, so overlapping markers extend the display.
    pub fn arm_marker_expiry(&mut self, from: DateTime<Utc>) {
        if !self.is_enabled(TimerKind::MarkerExpiry) {
            return;
        }
        self.remove_pending(TimerKind::MarkerExpiry);
        self.arm(TimerKind::MarkerExpiry, from);
    }

    /// Stops `kind`, dropping its pending event. Idempotent.
    pub fn stop(&mut self, kind: TimerKind) {
        let timer = &mut self.timers[kind as usize];
        if !timer.enabled {
            return;
        }
        timer.enabled = false;
        self.remove_pending(kind);
        debug!(%kind, "Timer stopped");
    }

    /// Resumes a stopped periodic timer, next firing one interval from now.
    ///
    /// The one-shot marker timer is only re-enabled; it is armed by the next price tick.
    /// A timer whose next firing would be past the end of the clock stays stopped.
    pub fn resume(&mut self, kind: TimerKind) {
        let timer = &mut self.timers[kind as usize];
        if timer.enabled {
            return;
        }
        timer.enabled = true;
        if kind.is_periodic() && !self.arm(kind, self.current_ts) {
            return;
        }
        debug!(%kind, "Timer resumed");
    }

    /// Stops every timer and empties the queue.
    pub fn stop_all(&mut self) {
        for kind in TimerKind::iter() {
            self.stop(kind);
        }
        self.queue.clear();
    }

    /// Queues the next firing of `kind`. A firing past the end of the clock
    /// disables the timer instead; returns whether an event was queued.
    fn arm(&mut self, kind: TimerKind, from: DateTime<Utc>) -> bool {
        let Some(timestamp) = from.checked_add_signed(self.interval(kind)) else {
            warn!(%kind, %from, "Timer would fire past the end of the clock; disabling it");
            self.timers[kind as usize].enabled = false;
            return false;
        };
        let event = ScheduledEvent {
            timestamp,
            kind,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(event));
        true
    }

    fn remove_pending(&mut self, kind: TimerKind) {
        self.queue.retain(|Reverse(e)| e.kind != kind);
    }

    fn update_time(&mut self, new_ts: DateTime<Utc>) {
        if new_ts < self.current_ts {
            warn!(from = %self.current_ts, to = %new_ts, "Simulation clock moved backwards");
        }
        self.previous_ts = Some(self.current_ts);
        self.current_ts = new_ts;
    }
}

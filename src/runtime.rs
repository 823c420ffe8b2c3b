use rand::{Rng, rngs::StdRng};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    arena::{Arena, StepOutcome},
    error::{ArenaResult, ConfigError, SystemError},
    scheduler::TimerKind,
    snapshot::Snapshot,
};

/// Control messages accepted by a running arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StopTimer(TimerKind),
    ResumeTimer(TimerKind),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeOptions {
    /// Simulated seconds per wall-clock second.
    speed: f64,
    /// Capacity of the command queue.
    command_buffer: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            command_buffer: 16,
        }
    }
}

impl RuntimeOptions {
    pub fn with_speed(self, speed: f64) -> Self {
        Self { speed, ..self }
    }

    pub fn with_command_buffer(self, command_buffer: usize) -> Self {
        Self {
            command_buffer,
            ..self
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    fn validate(&self) -> ArenaResult<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "runtime speed",
                value: self.speed,
                msg: "must be finite and > 0".into(),
            }
            .into());
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "command buffer",
                value: self.command_buffer,
            }
            .into());
        }
        Ok(())
    }
}

/// Owner-side handle of an arena running on the tokio runtime.
///
/// Snapshots are published through a `watch` channel whenever the arena's
/// version changes; readers never block the engine.
#[derive(Debug)]
pub struct ArenaHandle<R = StdRng> {
    tx: async_channel::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    cx: CancellationToken,
    task: JoinHandle<ArenaResult<Arena<R>>>,
}

/// Moves `arena` onto a tokio task that drives its timers in (scaled) real time.
///
/// Must be called from within a tokio runtime.
#[tracing::instrument(skip_all, fields(speed = options.speed))]
pub fn spawn<R>(arena: Arena<R>, options: RuntimeOptions) -> ArenaResult<ArenaHandle<R>>
where
    R: Rng + Send + 'static,
{
    options.validate()?;
    if arena.status().is_stopped() {
        return Err(
            SystemError::InvalidState("cannot spawn an arena that was shut down".into()).into(),
        );
    }

    let cx = CancellationToken::new();
    let (tx, rx) = async_channel::bounded(options.command_buffer);
    let (snapshot_tx, snapshots) = watch::channel(arena.snapshot());

    let args = driver::Args {
        cx: cx.clone(),
        rx,
        snapshots: snapshot_tx,
        arena,
        speed: options.speed,
    };
    let task = tokio::spawn(driver::run(args));
    info!("Arena runtime started");

    Ok(ArenaHandle {
        tx,
        snapshots,
        cx,
        task,
    })
}

impl<R> ArenaHandle<R> {
    pub async fn stop_timer(&self, kind: TimerKind) -> ArenaResult<()> {
        self.send(Command::StopTimer(kind)).await
    }

    pub async fn resume_timer(&self, kind: TimerKind) -> ArenaResult<()> {
        self.send(Command::ResumeTimer(kind)).await
    }

    /// A fresh subscription to the snapshot stream.
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Token that aborts the driver without waiting for queued commands.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops all timers after every queued command has been applied and
    /// returns the arena in its final state.
    pub async fn shutdown(self) -> ArenaResult<Arena<R>> {
        if self.tx.send(Command::Shutdown).await.is_err() {
            debug!("Driver already gone; collecting its result");
        }
        self.task
            .await
            .map_err(|e| SystemError::Runtime(format!("arena task failed: {e}")))?
    }

    async fn send(&self, command: Command) -> ArenaResult<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SystemError::Runtime("command channel closed".into()).into())
    }
}

// ================================================================================================
// Driver
// ================================================================================================

mod driver {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use futures::future::OptionFuture;
    use tokio::time::Instant;

    use super::*;

    pub struct Args<R> {
        pub cx: CancellationToken,
        pub rx: async_channel::Receiver<Command>,
        pub snapshots: watch::Sender<Snapshot>,
        pub arena: Arena<R>,
        pub speed: f64,
    }

    /// Maps the simulation clock onto the tokio clock.
    struct Pace {
        wall_origin: Instant,
        sim_origin: DateTime<Utc>,
        speed: f64,
    }

    /// Roughly 30 years; stands in for deadlines the tokio clock cannot hold.
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

    impl Pace {
        fn deadline(&self, ts: DateTime<Utc>) -> Instant {
            let sim = (ts - self.sim_origin).to_std().unwrap_or_default();
            Duration::try_from_secs_f64(sim.as_secs_f64() / self.speed)
                .ok()
                .and_then(|wall| self.wall_origin.checked_add(wall))
                .unwrap_or_else(|| self.wall_origin + FAR_FUTURE)
        }

        fn sim_now(&self) -> DateTime<Utc> {
            let wall = self.wall_origin.elapsed().as_secs_f64() * self.speed;
            Duration::try_from_secs_f64(wall)
                .ok()
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .and_then(|d| self.sim_origin.checked_add_signed(d))
                .unwrap_or(self.sim_origin)
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run<R: Rng>(args: Args<R>) -> ArenaResult<Arena<R>> {
        let Args {
            cx,
            rx,
            snapshots,
            mut arena,
            speed,
        } = args;

        let pace = Pace {
            wall_origin: Instant::now(),
            sim_origin: arena.now(),
            speed,
        };
        let mut published = arena.version();

        loop {
            let next = arena.next_event_at().map(|ts| pace.deadline(ts));
            let sleep: OptionFuture<_> = next.map(tokio::time::sleep_until).into();

            tokio::select! {
            biased;

            // A. External Cancellation
            _ = cx.cancelled() => {
                info!("Arena driver cancelled.");
                break;
            }

            // B. Control Commands
            command = rx.recv() => {
                match command {
                    Ok(Command::StopTimer(kind)) => arena.stop_timer(kind),
                    Ok(Command::ResumeTimer(kind)) => {
                        arena.advance_clock(pace.sim_now());
                        arena.resume_timer(kind)?;
                    }
                    Ok(Command::Shutdown) => {
                        info!("Shutdown requested.");
                        break;
                    }
                    Err(_) => {
                        info!("Command channel closed; shutting down.");
                        break;
                    }
                }
            }

            // C. Next Timer Event
            Some(()) = sleep => {
                match arena.step() {
                    Ok(StepOutcome::Processed(_)) | Ok(StepOutcome::Idle) => {}
                    Err(e) => {
                        error!(?e, "Arena step failed.");
                        arena.shutdown();
                        snapshots.send_replace(arena.snapshot());
                        return Err(e);
                    }
                }
            }
            }

            if arena.version() != published {
                published = arena.version();
                snapshots.send_replace(arena.snapshot());
            }
        }

        arena.shutdown();
        snapshots.send_replace(arena.snapshot());
        Ok(arena)
    }
}

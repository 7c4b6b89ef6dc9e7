use beamsweep_shared::geometry::Pose;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::beam::InputMode;
use crate::config::LoopConfig;
use crate::events::GameEvent;
use crate::game::Game;
use crate::leaderboard::Leaderboard;
use crate::session::Phase;
use crate::sync::RemoteEvent;
use crate::target_pool::TargetId;

/// Commands into the game loop. Everything that mutates the game goes here.
#[derive(Debug)]
pub enum GameCommand {
    Start { mode: InputMode },
    Pause,
    Resume,
    NextLevel,
    Finish,
    Reset,
    PlayAgain,
    SetMuted(bool),
    SetSharing { shared: bool, spatial: bool },
    SetRoster(Vec<String>),
    Reseed(u64),
    ContinuousAim(Option<Pose>),
    DragBegin,
    DragDelta { dx_deg: f64, dy_deg: f64 },
    DragEnd,
    ControllerAxis { x: f64, y: f64 },
    Activate { target_id: TargetId },
    Remote(RemoteEvent),
    Snapshot { response: oneshot::Sender<GameSnapshot> },
    Shutdown,
}

/// Read-only view of the game for callers outside the loop
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub level: u32,
    pub score: u32,
    pub time_left: u32,
    pub live_targets: Vec<TargetId>,
    pub beam_emitting: bool,
    pub sweep_phase: f64,
    pub sweep_running: bool,
}

/// Periodic sweep task. Ticks carry the generation they were spawned with.
struct SweepTask {
    generation: u64,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepTask {
    fn spawn(generation: u64, period: Duration, tick_tx: mpsc::Sender<u64>) -> Self {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;

                    _ = cancelled.changed() => break,

                    _ = interval.tick() => {
                        if *cancelled.borrow() {
                            break;
                        }
                        if tick_tx.send(generation).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            generation,
            cancel,
            handle,
        }
    }

    fn cancel(self) {
        let _ = self.cancel.send(true);
        drop(self.handle);
    }
}

fn snapshot(game: &Game, sweep_running: bool) -> GameSnapshot {
    let session = game.session();
    GameSnapshot {
        phase: session.phase,
        level: session.level,
        score: session.score,
        time_left: session.time_left,
        live_targets: game.pool().iter().map(|t| t.id).collect(),
        beam_emitting: game.beam().is_emitting(),
        sweep_phase: game.beam().sweep_phase(),
        sweep_running,
    }
}

/// Returns false when the loop should stop.
fn apply_command(game: &mut Game, cmd: GameCommand, now: f64, sweep_running: bool) -> bool {
    match cmd {
        GameCommand::Start { mode } => game.start(mode, now),
        GameCommand::Pause => game.pause(now),
        GameCommand::Resume => game.resume(now),
        GameCommand::NextLevel => {
            game.next_level(now);
        }
        GameCommand::Finish => game.finish(now),
        GameCommand::Reset => game.reset(now),
        GameCommand::PlayAgain => game.play_again(now),
        GameCommand::SetMuted(muted) => game.set_muted(muted),
        GameCommand::SetSharing { shared, spatial } => game.set_sharing(shared, spatial),
        GameCommand::SetRoster(names) => game.set_roster(names),
        GameCommand::Reseed(seed) => game.reseed(seed),
        GameCommand::ContinuousAim(pose) => game.continuous_aim(pose, now),
        GameCommand::DragBegin => game.drag_begin(now),
        GameCommand::DragDelta { dx_deg, dy_deg } => game.drag_delta(dx_deg, dy_deg),
        GameCommand::DragEnd => game.drag_end(),
        GameCommand::ControllerAxis { x, y } => game.controller_axis(x, y, now),
        GameCommand::Activate { target_id } => {
            game.activate_target(target_id, now);
        }
        GameCommand::Remote(event) => game.apply_remote(event, now),
        GameCommand::Snapshot { response } => {
            let _ = response.send(snapshot(game, sweep_running));
        }
        GameCommand::Shutdown => return false,
    }
    true
}

fn publish(
    game: &mut Game,
    broadcast_tx: &broadcast::Sender<GameEvent>,
    leaderboard: &dyn Leaderboard,
) {
    for event in game.take_events() {
        if let GameEvent::SessionFinished { identity, score } = &event {
            match leaderboard.submit_score(identity, *score) {
                Ok(()) => tracing::info!("Submitted score {} for {}", score, identity),
                Err(e) => tracing::warn!("Leaderboard submission failed: {}", e),
            }
        }
        // No subscribers is fine
        let _ = broadcast_tx.send(event);
    }
}

/// Run the game loop. Owns the game until shutdown, then hands it back.
pub async fn run_game_loop(
    mut game: Game,
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameEvent>,
    leaderboard: Arc<dyn Leaderboard>,
    config: LoopConfig,
) -> Game {
    let started = Instant::now();
    let clock = move || started.elapsed().as_secs_f64();

    let mut frame_interval = tokio::time::interval(config.frame_interval);
    frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let sweep_interval = Duration::from_secs_f64(game.config().sweep_tick);
    let (tick_tx, mut tick_rx) = mpsc::channel::<u64>(4);
    let mut sweep: Option<SweepTask> = None;
    let mut generation: u64 = 0;

    loop {
        tokio::select! {
            _ = frame_interval.tick() => {
                game.update(clock());
            }

            Some(tick_generation) = tick_rx.recv() => {
                match &sweep {
                    Some(task) if task.generation == tick_generation => game.sweep_tick(clock()),
                    _ => tracing::trace!("Ignoring stale sweep tick {}", tick_generation),
                }
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                if !apply_command(&mut game, cmd, clock(), sweep.is_some()) {
                    break;
                }
            }
        }

        match (game.is_sweeping(), sweep.is_some()) {
            (true, false) => {
                generation += 1;
                sweep = Some(SweepTask::spawn(
                    generation,
                    sweep_interval,
                    tick_tx.clone(),
                ));
                tracing::debug!("Sweep task {} started", generation);
            }
            (false, true) => {
                if let Some(task) = sweep.take() {
                    tracing::debug!("Sweep task {} cancelled", task.generation);
                    task.cancel();
                }
            }
            _ => {}
        }

        publish(&mut game, &broadcast_tx, leaderboard.as_ref());
    }

    if let Some(task) = sweep.take() {
        task.cancel();
    }
    tracing::info!("Game loop ended");
    game
}

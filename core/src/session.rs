use beamsweep_shared::config::GameConfig;
use serde::{Deserialize, Serialize};

use crate::beam::InputMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    MainMenu,
    CountingDown { remaining: u32 },
    Playing,
    Paused,
    LevelComplete,
    Finished,
}

impl Phase {
    /// A round is in progress (targets, clock and beam are live or frozen).
    pub fn is_round_active(self) -> bool {
        matches!(self, Phase::Playing | Phase::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
}

/// Who caused a hit. Remote hits arrive through the sync layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: u32,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
        }
    }
}

/// Phase, clock, level and score of one session. Invalid transitions are
/// no-ops returning `None`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub time_left: u32,
    pub level: u32,
    pub score: u32,
    pub players: Vec<Player>,
    pub local_name: String,
    pub input_mode: InputMode,
    /// Part of a multi-peer session
    pub shared: bool,
    /// Peers share one physical space, so beam poses are meaningful to them
    pub spatial: bool,
    pub muted: bool,

    roster: Vec<Player>,
    game_time_secs: u32,
    countdown_secs: u32,
    max_level: u32,
}

impl SessionState {
    pub fn new(
        config: &GameConfig,
        local_name: impl Into<String>,
        roster: Vec<Player>,
        input_mode: InputMode,
    ) -> Self {
        let local_name = local_name.into();
        let mut roster: Vec<Player> = roster
            .into_iter()
            .map(|p| Player::new(p.name))
            .collect();
        if !roster.iter().any(|p| p.name == local_name) {
            roster.insert(0, Player::new(local_name.clone()));
        }
        Self {
            phase: Phase::MainMenu,
            time_left: config.game_time_secs,
            level: 1,
            score: 0,
            players: roster.clone(),
            local_name,
            input_mode,
            shared: false,
            spatial: false,
            muted: false,
            roster,
            game_time_secs: config.game_time_secs,
            countdown_secs: config.countdown_secs,
            max_level: config.max_level,
        }
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.name == self.local_name)
    }

    fn change(&mut self, to: Phase) -> PhaseChange {
        let from = self.phase;
        self.phase = to;
        PhaseChange { from, to }
    }

    fn enter_countdown(&mut self) -> PhaseChange {
        self.time_left = self.game_time_secs;
        if self.countdown_secs == 0 {
            self.change(Phase::Playing)
        } else {
            self.change(Phase::CountingDown {
                remaining: self.countdown_secs,
            })
        }
    }

    pub fn start(&mut self, mode: InputMode) -> Option<PhaseChange> {
        if self.phase != Phase::MainMenu {
            return None;
        }
        self.input_mode = mode;
        Some(self.enter_countdown())
    }

    /// One countdown second. The last one enters `Playing`.
    pub fn countdown_tick(&mut self) -> Option<PhaseChange> {
        let Phase::CountingDown { remaining } = self.phase else {
            return None;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            Some(self.change(Phase::Playing))
        } else {
            Some(self.change(Phase::CountingDown { remaining }))
        }
    }

    /// One second of round time. Running out completes the level, and at the
    /// last level the session finishes right away.
    pub fn clock_tick(&mut self) -> Vec<PhaseChange> {
        if self.phase != Phase::Playing {
            return Vec::new();
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return Vec::new();
        }
        let mut changes = vec![self.change(Phase::LevelComplete)];
        if self.level >= self.max_level {
            changes.push(self.change(Phase::Finished));
        }
        changes
    }

    pub fn pause(&mut self) -> Option<PhaseChange> {
        if self.phase != Phase::Playing {
            return None;
        }
        Some(self.change(Phase::Paused))
    }

    pub fn resume(&mut self) -> Option<PhaseChange> {
        if self.phase != Phase::Paused {
            return None;
        }
        Some(self.change(Phase::Playing))
    }

    /// Credit a hit that already passed the registry gate. Local and remote
    /// hits alike count for the local player.
    pub fn score_hit(&mut self) -> u32 {
        self.score += 1;
        let local = self.local_name.clone();
        if let Some(player) = self.players.iter_mut().find(|p| p.name == local) {
            player.score += 1;
        }
        self.score
    }

    /// Advance a level. Refused at the last level and once finished; a
    /// finished session only leaves through `reset`.
    pub fn next_level(&mut self) -> Option<PhaseChange> {
        if self.level >= self.max_level || self.phase == Phase::Finished {
            return None;
        }
        self.level += 1;
        Some(self.enter_countdown())
    }

    /// Game over from any in-session phase.
    pub fn finish(&mut self) -> Option<PhaseChange> {
        match self.phase {
            Phase::MainMenu | Phase::Finished => None,
            _ => Some(self.change(Phase::Finished)),
        }
    }

    /// Round-scoped reset; score and level survive.
    pub fn reset_for_next_level(&mut self) {
        self.time_left = self.game_time_secs;
    }

    /// Back to the main menu with a fresh roster and score. Input mode and
    /// sharing flags are kept.
    pub fn reset(&mut self) -> Option<PhaseChange> {
        self.reset_for_next_level();
        self.score = 0;
        self.level = 1;
        self.players = self.roster.clone();
        if self.phase == Phase::MainMenu {
            None
        } else {
            Some(self.change(Phase::MainMenu))
        }
    }

    /// Returns true if the flag changed.
    pub fn set_muted(&mut self, muted: bool) -> bool {
        let changed = self.muted != muted;
        self.muted = muted;
        changed
    }

    /// Replace the roster. Known players keep their current score.
    pub fn set_roster(&mut self, names: Vec<String>) {
        let mut roster: Vec<Player> = names.into_iter().map(Player::new).collect();
        if !roster.iter().any(|p| p.name == self.local_name) {
            roster.insert(0, Player::new(self.local_name.clone()));
        }
        let players = roster
            .iter()
            .map(|p| {
                self.players
                    .iter()
                    .find(|old| old.name == p.name)
                    .cloned()
                    .unwrap_or_else(|| p.clone())
            })
            .collect();
        self.roster = roster;
        self.players = players;
    }
}

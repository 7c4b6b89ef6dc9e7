/// Target template kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize, ts_rs::TS,
)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Basketball,
    Football,
    Soccer,
    Baseball,
}

/// One spawnable template with its bounding half-extents (meters)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct TargetTemplate {
    pub kind: TargetKind,
    pub half_extents: [f64; 3],
}

impl TargetTemplate {
    pub const fn cube(kind: TargetKind, half: f64) -> Self {
        Self {
            kind,
            half_extents: [half, half, half],
        }
    }
}

pub fn default_templates() -> Vec<TargetTemplate> {
    vec![
        TargetTemplate::cube(TargetKind::Basketball, 0.12),
        TargetTemplate::cube(TargetKind::Football, 0.09),
        TargetTemplate::cube(TargetKind::Soccer, 0.11),
        TargetTemplate::cube(TargetKind::Baseball, 0.04),
    ]
}

/// Gameplay tuning shared by every peer of a session
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Round length in whole seconds
    pub game_time_secs: u32,
    pub countdown_secs: u32,
    pub max_level: u32,
    /// Collisions needed before a target counts as scored
    pub min_hits: u32,
    /// Delay between scoring a target and removing it (seconds)
    pub removal_delay: f64,

    /// Sweep cycles per second at level 1
    pub sweep_rate: f64,
    /// Sweep tick period (seconds)
    pub sweep_tick: f64,
    /// How long a continuous aim may vanish before the beam stops (seconds)
    pub aim_grace: f64,
    pub smoothing_window: usize,
    pub continuous_reach: f64,
    pub continuous_probe_radius: f64,
    pub discrete_reach: f64,
    pub discrete_probe_radius: f64,
    /// Yaw/pitch clamp for discrete aiming (degrees)
    pub discrete_clamp_deg: f64,
    /// Where the turret sits in discrete mode
    pub turret_position: [f64; 3],
    /// Degrees per controller axis event
    pub controller_speed: f64,
    /// Seconds without controller input before the beam is dismissed
    pub controller_idle: f64,

    /// Seconds between spawns at level 1
    pub spawn_interval: f64,
    pub max_live_targets: usize,
    pub max_spawn_attempts: u32,
    /// Half-width of the fallback placement cube
    pub fallback_range: f64,
    pub spawn_offset: [f64; 3],
    /// Displacement every target travels over its lifetime
    pub path_delta: [f64; 3],
    /// Seconds to complete the displacement at level 1
    pub traversal_secs: f64,
    /// Per-level speed-up applied to sweep rate, traversal and spawn interval
    pub level_speedup: f64,

    pub templates: Vec<TargetTemplate>,
    #[ts(type = "number")]
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_time_secs: 35,
            countdown_secs: 3,
            max_level: 5,
            min_hits: 1,
            removal_delay: 3.0,
            sweep_rate: 1.5,
            sweep_tick: 1.0 / 15.0, // 66.67 ms
            aim_grace: 0.1,
            smoothing_window: 24,
            continuous_reach: 1400.0,
            continuous_probe_radius: 0.5,
            discrete_reach: 23.0,
            discrete_probe_radius: 0.1,
            discrete_clamp_deg: 90.0,
            turret_position: [0.0, 0.8, -1.7],
            controller_speed: 0.7,
            controller_idle: 3.0,
            spawn_interval: 1.0,
            max_live_targets: 30,
            max_spawn_attempts: 8,
            fallback_range: 1.0,
            spawn_offset: [0.0, 0.0, -0.7],
            path_delta: [0.02, -0.12, 12.0],
            traversal_secs: 11.73,
            level_speedup: 0.15,
            templates: default_templates(),
            rng_seed: 42,
        }
    }
}

fn positive(name: &str, v: f64) -> Result<(), String> {
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("{} must be finite and > 0", name));
    }
    Ok(())
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.game_time_secs == 0 {
            return Err("game_time_secs must be > 0".to_string());
        }
        if self.max_level == 0 {
            return Err("max_level must be >= 1".to_string());
        }
        if self.min_hits == 0 {
            return Err("min_hits must be >= 1".to_string());
        }
        if !self.removal_delay.is_finite() || self.removal_delay < 0.0 {
            return Err("removal_delay must be finite and >= 0".to_string());
        }
        positive("sweep_rate", self.sweep_rate)?;
        positive("sweep_tick", self.sweep_tick)?;
        if !self.aim_grace.is_finite() || self.aim_grace < 0.0 {
            return Err("aim_grace must be finite and >= 0".to_string());
        }
        if self.smoothing_window == 0 {
            return Err("smoothing_window must be >= 1".to_string());
        }
        positive("continuous_reach", self.continuous_reach)?;
        positive("continuous_probe_radius", self.continuous_probe_radius)?;
        positive("discrete_reach", self.discrete_reach)?;
        positive("discrete_probe_radius", self.discrete_probe_radius)?;
        if !(0.0..=180.0).contains(&self.discrete_clamp_deg) {
            return Err("discrete_clamp_deg must be within 0..=180".to_string());
        }
        positive("controller_speed", self.controller_speed)?;
        positive("controller_idle", self.controller_idle)?;
        positive("spawn_interval", self.spawn_interval)?;
        if self.max_live_targets == 0 {
            return Err("max_live_targets must be >= 1".to_string());
        }
        if self.max_spawn_attempts == 0 {
            return Err("max_spawn_attempts must be >= 1".to_string());
        }
        positive("fallback_range", self.fallback_range)?;
        positive("traversal_secs", self.traversal_secs)?;
        if !self.level_speedup.is_finite() || self.level_speedup < 0.0 {
            return Err("level_speedup must be finite and >= 0".to_string());
        }
        if self.templates.is_empty() {
            return Err("templates must not be empty".to_string());
        }
        for t in &self.templates {
            if t.half_extents.iter().any(|h| !h.is_finite() || *h <= 0.0) {
                return Err(format!("template {:?} has invalid half_extents", t.kind));
            }
        }
        Ok(())
    }

    /// Speed multiplier for a level (1-based), non-decreasing in level.
    pub fn level_factor(&self, level: u32) -> f64 {
        1.0 + self.level_speedup * level.saturating_sub(1) as f64
    }

    pub fn sweep_rate_for(&self, level: u32) -> f64 {
        self.sweep_rate * self.level_factor(level)
    }

    pub fn traversal_secs_for(&self, level: u32) -> f64 {
        self.traversal_secs / self.level_factor(level)
    }

    pub fn spawn_interval_for(&self, level: u32) -> f64 {
        self.spawn_interval / self.level_factor(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_templates() {
        let config = GameConfig {
            templates: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_sweep_rate() {
        let config = GameConfig {
            sweep_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            sweep_rate: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_spawn_attempts() {
        let config = GameConfig {
            max_spawn_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn difficulty_curves_are_monotonic() {
        let config = GameConfig::default();
        for level in 1..config.max_level {
            assert!(config.sweep_rate_for(level + 1) > config.sweep_rate_for(level));
            assert!(config.traversal_secs_for(level + 1) < config.traversal_secs_for(level));
            assert!(config.spawn_interval_for(level + 1) < config.spawn_interval_for(level));
        }
        assert_eq!(config.sweep_rate_for(1), config.sweep_rate);
    }

    #[test]
    fn config_serializes_camel_case() {
        let json = serde_json::to_string(&GameConfig::default()).unwrap();
        assert!(json.contains("\"gameTimeSecs\":35"));
        assert!(json.contains("\"kind\":\"basketball\""));
    }
}

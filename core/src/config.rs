use std::env;
use std::time::Duration;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: String,
    /// Seed handed to every peer in `Welcome`
    pub rng_seed: u64,
    pub max_peers: usize,
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9002".to_string(),
            rng_seed: 42,
            max_peers: 8,
            broadcast_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by `BEAMSWEEP_ADDR`, `BEAMSWEEP_SEED` and
    /// `BEAMSWEEP_MAX_PEERS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("BEAMSWEEP_ADDR").unwrap_or(defaults.listen_addr),
            rng_seed: env::var("BEAMSWEEP_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rng_seed),
            max_peers: env::var("BEAMSWEEP_MAX_PEERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_peers),
            broadcast_capacity: defaults.broadcast_capacity,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.trim().is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.max_peers == 0 {
            return Err("max_peers must be >= 1".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Game loop plumbing (not gameplay tuning)
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Target motion, timers and spawns. The sweep period comes from
    /// `GameConfig::sweep_tick`.
    pub frame_interval: Duration,
    pub command_capacity: usize,
    pub event_capacity: usize,
    pub score_queue_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_micros(66_667),
            command_capacity: 256,
            event_capacity: 256,
            score_queue_capacity: 64,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval.is_zero() {
            return Err("frame_interval must be > 0".to_string());
        }
        if self.command_capacity == 0 || self.event_capacity == 0 || self.score_queue_capacity == 0
        {
            return Err("channel capacities must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RelayConfig::default().validate().is_ok());
        assert!(LoopConfig::default().validate().is_ok());
    }

    #[test]
    fn relay_rejects_zero_peers() {
        let config = RelayConfig {
            max_peers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loop_rejects_zero_frame_interval() {
        let config = LoopConfig {
            frame_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Beam-sweep arcade gameplay core.
//!
//! The gameplay types are plain synchronous state machines driven by an
//! explicit clock; `game_loop`, `peer` and `relay` put them on tokio.

pub mod beam;
pub mod collision;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod game_loop;
pub mod hit_registry;
pub mod leaderboard;
pub mod peer;
pub mod relay;
pub mod session;
pub mod sync;
pub mod target_pool;

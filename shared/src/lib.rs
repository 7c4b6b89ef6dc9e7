//! Types shared between the game core, the relay and presentation clients.

pub mod config;
pub mod geometry;
pub mod protocol;

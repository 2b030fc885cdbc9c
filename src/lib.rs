//! Avatar overlay for a multiplayer vehicle game
//!
//! Each player's vehicle can be replaced by a simulated character. The host
//! game calls into a [`Session`] from its physics and render callbacks; the
//! session steps the characters, replicates their state between match
//! participants and pushes their geometry to the renderer.

pub mod app;
pub mod assets;
pub mod audio;
pub mod config;
pub mod engine;
pub mod game;
pub mod host;
pub mod net;
pub mod pool;
pub mod render;
pub mod telemetry;
pub mod util;

pub use app::{Collaborators, HostSystems, Session};
pub use config::{Config, ConfigError};

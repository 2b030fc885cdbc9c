//! Avatar instances, their registry and the simulation bridge

pub mod bridge;
pub mod instance;
pub mod interaction;
pub mod settings;
pub mod store;

pub use bridge::SimulationBridge;
pub use instance::{AvatarInstance, InstanceRef};
pub use interaction::InteractionTuning;
pub use settings::{MatchSettings, RosterEntry, SharedSettings};
pub use store::InstanceStore;

//! Pooled resources: render meshes and team color slots

pub mod color;
pub mod resource;

pub use color::{ColorIndex, ColorPools, TeamColors, PALETTE, TEAM_COLOR_POOL_SIZE, UNASSIGNED_COLOR};
pub use resource::{ResourcePool, SlotId};

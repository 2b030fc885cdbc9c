//! Accessors into the host game's object model
//!
//! The host wraps its own objects behind these traits. Wrappers are cheap
//! handles with interior mutability, so setters take `&self`.

use std::sync::Arc;

use crate::util::math::{Rotator, Vec3};

/// Stable per-match player identifier assigned by the host game
pub type PlayerId = i32;

/// Team index reported for players that are not on a team yet
pub const NO_TEAM: i32 = -1;

/// The controller state the host feeds its vehicle physics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerInput {
    pub throttle: f32,
    pub steer: f32,
    pub pitch: f32,
    pub jump: bool,
    pub handbrake: bool,
    pub holding_boost: bool,
}

impl ControllerInput {
    /// Zero every field the vehicle would react to
    pub fn neutralize(&mut self) {
        self.throttle = 0.0;
        self.steer = 0.0;
        self.pitch = 0.0;
        self.jump = false;
        self.handbrake = false;
    }

    pub fn is_idle(&self) -> bool {
        !self.jump
            && !self.handbrake
            && self.throttle == 0.0
            && self.steer == 0.0
            && self.pitch == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Camera {
    pub location: Vec3,
    pub rotation: Rotator,
}

pub trait Vehicle: Send + Sync {
    /// None while the vehicle has no player attached
    fn player_id(&self) -> Option<PlayerId>;
    fn is_local(&self) -> bool;
    fn team_index(&self) -> i32;
    /// Host body/loadout identifier
    fn body_id(&self) -> i32;

    fn location(&self) -> Vec3;
    fn set_location(&self, location: Vec3);
    fn velocity(&self) -> Vec3;
    fn set_velocity(&self, velocity: Vec3);
    fn rotation(&self) -> Rotator;
    fn set_rotation(&self, rotation: Rotator);

    fn controller_input(&self) -> Option<ControllerInput>;
    /// None when the vehicle has no boost component
    fn boost_amount(&self) -> Option<f32>;
    fn set_boost_amount(&self, amount: f32);

    fn set_hidden(&self, hidden: bool);
    fn demolish(&self);
}

pub trait Ball: Send + Sync {
    fn location(&self) -> Vec3;
    fn rotation(&self) -> Rotator;
    fn velocity(&self) -> Vec3;
    fn set_velocity(&self, velocity: Vec3);
}

pub trait HostGame: Send + Sync {
    /// In a match, replay, or online game
    fn is_in_game(&self) -> bool;
    fn is_paused(&self) -> bool;
    /// Current vehicles, in the host's roster order
    fn cars(&self) -> Vec<Arc<dyn Vehicle>>;
    fn ball(&self) -> Option<Arc<dyn Ball>>;
    fn camera(&self) -> Option<Camera>;
    fn target_fps(&self) -> Option<f32>;
    /// Ask the host to join the configured match; executed on the host's game thread
    fn join_game(&self);
    /// Advance a finished match to its next game
    fn next_game_in_match(&self);
}

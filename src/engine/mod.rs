//! Contract with the external character-simulation engine
//!
//! The engine is a black box: given a handle and an input it advances the
//! character and fills in state and triangle geometry. Everything in this
//! module is the shape of that boundary; no simulation happens here.

pub mod action;

use serde::{Deserialize, Serialize};

use crate::util::math::Vec3;

/// Maximum triangles the engine emits for one character
pub const MAX_TRIANGLES: usize = 1024;
/// Engine texture atlas dimensions (RGBA8)
pub const TEXTURE_WIDTH: usize = 64 * 11;
pub const TEXTURE_HEIGHT: usize = 64;
pub const TEXTURE_SIZE: usize = 4 * TEXTURE_WIDTH * TEXTURE_HEIGHT;

/// Identifier of one simulated character inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimHandle {
    /// No creation attempted since the last release
    #[default]
    Uninitialized,
    /// The engine refused to create a character
    Failed,
    Active(u32),
}

impl SimHandle {
    pub const UNINITIALIZED_RAW: i32 = -2;
    pub const FAILED_RAW: i32 = -1;

    /// Interpret the result of [`SimulationEngine::create`]: any negative
    /// value is a refusal
    pub fn from_create(raw: i32) -> Self {
        match u32::try_from(raw) {
            Ok(id) => SimHandle::Active(id),
            Err(_) => SimHandle::Failed,
        }
    }

    /// Decode a handle previously encoded with [`SimHandle::raw`]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            r if r >= 0 => SimHandle::Active(r as u32),
            Self::UNINITIALIZED_RAW => SimHandle::Uninitialized,
            _ => SimHandle::Failed,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            SimHandle::Uninitialized => Self::UNINITIALIZED_RAW,
            SimHandle::Failed => Self::FAILED_RAW,
            SimHandle::Active(id) => id as i32,
        }
    }

    pub fn active(self) -> Option<u32> {
        match self {
            SimHandle::Active(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, SimHandle::Active(_))
    }
}

/// How the speed-boost move is offered to players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BoostMode {
    #[default]
    Disabled = 0,
    /// Triggered by pressing the button
    Press = 1,
    /// Triggered while the button is held
    Hold = 2,
}

impl BoostMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BoostMode::Disabled),
            1 => Some(BoostMode::Press),
            2 => Some(BoostMode::Hold),
            _ => None,
        }
    }
}

/// Match-wide speed-boost configuration passed through to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoostConfig {
    pub mode: BoostMode,
    /// 0..=10
    pub velocity: u8,
}

/// An attack landed on this character by another one
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttackInput {
    pub is_attacked: bool,
    /// Attacker position in simulation space
    pub attacker_position: Vec3,
}

/// One step's worth of input for a character
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimInput {
    pub button_a: bool,
    pub button_b: bool,
    pub button_z: bool,
    pub stick_x: f32,
    pub stick_y: f32,
    pub cam_look_x: f32,
    pub cam_look_z: f32,
    pub is_boosting: bool,
    pub attack: AttackInput,
    pub boost: BoostConfig,
    /// False when stepping a replicated character purely for animation
    pub is_input: bool,
    /// Grants the cosmetic wing accessory on the locally driven character
    pub grant_cosmetic: bool,
}

impl SimInput {
    /// Clear every controller-derived field, keeping configuration
    pub fn neutralize_controls(&mut self) {
        self.button_a = false;
        self.button_b = false;
        self.button_z = false;
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

/// Latest simulated output for one character (simulation space)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimState {
    pub position: Vec3,
    /// Render-only: position smoothed between update frames
    pub interpolated_position: Vec3,
    pub velocity: Vec3,
    /// Radians
    pub face_angle: f32,
    /// Sounds triggered during the last step, see `audio::sound`
    pub sound_mask: u32,
    pub is_update_frame: bool,
    pub is_attacked: bool,
}

/// The network-serializable record of a character, broadcast per update frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    pub state: SimState,
    /// Current action tag, see [`action`]
    pub action: u32,
    pub anim_id: i16,
    pub anim_frame: i16,
    /// Cap / hand / eye appearance bits
    pub appearance: u32,
}

/// Triangle soup emitted by the engine for one character
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    pub position: Vec<f32>,
    pub normal: Vec<f32>,
    pub color: Vec<f32>,
    pub uv: Vec<f32>,
    pub triangles_used: usize,
}

impl GeometryBuffer {
    pub fn with_capacity(max_triangles: usize) -> Self {
        Self {
            position: vec![0.0; 9 * max_triangles],
            normal: vec![0.0; 9 * max_triangles],
            color: vec![0.0; 9 * max_triangles],
            uv: vec![0.0; 6 * max_triangles],
            triangles_used: 0,
        }
    }

    pub fn max_triangles(&self) -> usize {
        self.position.len() / 9
    }

    pub fn clear(&mut self) {
        self.triangles_used = 0;
    }
}

/// Collision triangle handed to the engine, in simulation space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSurface {
    pub surface_type: i16,
    pub force: i16,
    pub terrain: u16,
    pub vertices: [[i32; 3]; 3],
}

pub const SURFACE_DEFAULT: i16 = 0;
pub const TERRAIN_GRASS: u16 = 0;

/// The character-simulation engine
///
/// Raw handles cross this trait as `i32`, negative meaning failure; callers
/// convert with [`SimHandle::from_create`].
pub trait SimulationEngine: Send + Sync {
    /// Global initialisation with the ROM image; fills the texture atlas
    fn init(&self, rom: &[u8], texture: &mut [u8]);

    fn terminate(&self);

    fn load_static_surfaces(&self, surfaces: &[StaticSurface]);

    /// Create a character at integer simulation-space coordinates
    fn create(&self, x: i16, y: i16, z: i16) -> i32;

    /// Advance one character; writes body state (including its sim state) and geometry
    fn step(
        &self,
        handle: u32,
        input: &SimInput,
        body: &mut BodyState,
        geometry: &mut GeometryBuffer,
    );

    fn delete(&self, handle: u32);

    /// Whether the next step lands on an update-frame boundary
    fn should_update(&self) -> bool;

    fn set_interpolation_interval(&self, interval: u32);
}

//! Per-player avatar state

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::audio::AudioHandles;
use crate::engine::{BodyState, GeometryBuffer, SimHandle, SimInput, SimulationEngine, MAX_TRIANGLES};
use crate::host::{PlayerId, NO_TEAM};
use crate::pool::{ColorIndex, ColorPools, SlotId};
use crate::render::MeshPool;
use crate::util::math::{Rotator, Vec3};

/// Shared, individually locked instance
pub type InstanceRef = Arc<Mutex<AvatarInstance>>;

/// Everything the overlay tracks for one player
#[derive(Debug)]
pub struct AvatarInstance {
    pub player_id: PlayerId,
    pub handle: SimHandle,
    pub input: SimInput,
    /// Latest simulated output; also the network record
    pub body: BodyState,
    /// Allocated once for the instance's lifetime
    pub geometry: GeometryBuffer,
    /// Checked-out mesh, owned by the pool
    pub mesh: Option<SlotId>,
    pub is_car_mode: bool,
    pub color_index: Option<ColorIndex>,
    pub team_index: i32,
    pub is_active_this_frame: bool,
    /// Consecutive render passes without a car in the host's list
    pub inactive_passes: u32,
    pub audio: AudioHandles,
    /// Host physics ticks seen by the vehicle input hook
    pub tick_count: u64,
    pub last_ball_interaction: Option<u64>,
    /// Host vehicle rotation sampled when the simulation was created;
    /// write-back keeps its pitch and roll
    pub spawn_rotation: Rotator,
}

impl AvatarInstance {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            handle: SimHandle::Uninitialized,
            input: SimInput::default(),
            body: BodyState::default(),
            geometry: GeometryBuffer::with_capacity(MAX_TRIANGLES),
            mesh: None,
            is_car_mode: false,
            color_index: None,
            team_index: NO_TEAM,
            is_active_this_frame: false,
            inactive_passes: 0,
            audio: AudioHandles::default(),
            tick_count: 0,
            last_ball_interaction: None,
            spawn_rotation: Rotator::default(),
        }
    }

    pub fn into_ref(self) -> InstanceRef {
        Arc::new(Mutex::new(self))
    }

    /// Simulation-space position of the latest output
    pub fn sim_position(&self) -> Vec3 {
        self.body.state.position
    }

    /// Host-space position of the latest output
    pub fn host_position(&self) -> Vec3 {
        self.body.state.position.to_host()
    }

    pub fn host_velocity(&self) -> Vec3 {
        self.body.state.velocity.to_host()
    }

    /// A live handle whose output is still the origin sentinel
    pub fn is_desynchronized(&self) -> bool {
        self.handle.is_active() && self.body.state.position.is_origin()
    }

    /// Forget the simulated position; the next tick respawns at the vehicle
    pub fn reset_position(&mut self) {
        self.body.state.position = Vec3::ZERO;
    }

    /// Delete the engine character, if any
    pub fn release_simulation(&mut self, engine: &dyn SimulationEngine) {
        if let Some(id) = self.handle.active() {
            engine.delete(id);
            debug!(player_id = self.player_id, handle = id, "Simulation released");
        }
        self.handle = SimHandle::Uninitialized;
    }

    /// Draw nothing from this instance's mesh until new geometry arrives
    pub fn clear_mesh(&self, meshes: &MeshPool) {
        if let Some(slot) = self.mesh {
            meshes.with(slot, |mesh| mesh.upload(0, None));
        }
    }

    /// Clear and return the mesh slot to its pool
    pub fn release_mesh(&mut self, meshes: &MeshPool) {
        if let Some(slot) = self.mesh.take() {
            meshes.with(slot, |mesh| mesh.upload(0, None));
            meshes.release(slot);
        }
    }

    /// Return the color index to its team pool. True when one was held.
    pub fn release_color(&mut self, colors: &ColorPools) -> bool {
        match self.color_index.take() {
            Some(index) => {
                colors.release(index);
                true
            }
            None => false,
        }
    }
}

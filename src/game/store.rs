//! Registry of avatar instances and the pools they draw from
//!
//! Lock order: the store map lock, then an instance lock. Pool locks are
//! leaves and may be taken under either.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::engine::SimulationEngine;
use crate::host::PlayerId;
use crate::pool::ColorPools;
use crate::render::MeshPool;

use super::instance::{AvatarInstance, InstanceRef};

pub struct InstanceStore {
    instances: Mutex<HashMap<PlayerId, InstanceRef>>,
    local_player: Mutex<Option<PlayerId>>,
    colors: ColorPools,
    meshes: OnceLock<MeshPool>,
    engine: Arc<dyn SimulationEngine>,
}

impl InstanceStore {
    pub fn new(engine: Arc<dyn SimulationEngine>) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            local_player: Mutex::new(None),
            colors: ColorPools::new(),
            meshes: OnceLock::new(),
            engine,
        }
    }

    pub fn engine(&self) -> &dyn SimulationEngine {
        self.engine.as_ref()
    }

    pub fn engine_arc(&self) -> Arc<dyn SimulationEngine> {
        self.engine.clone()
    }

    pub fn colors(&self) -> &ColorPools {
        &self.colors
    }

    /// The mesh pool, once the render side has built it
    pub fn meshes(&self) -> Option<&MeshPool> {
        self.meshes.get()
    }

    /// Build the mesh pool on first call; later calls return the existing pool
    pub fn init_meshes(&self, build: impl FnOnce() -> MeshPool) -> &MeshPool {
        self.meshes.get_or_init(build)
    }

    pub fn local_player(&self) -> Option<PlayerId> {
        *self.local_player.lock()
    }

    pub fn set_local_player(&self, player_id: PlayerId) {
        *self.local_player.lock() = Some(player_id);
    }

    /// The instance for `player_id`, created on first reference
    pub fn get_or_create(&self, player_id: PlayerId) -> InstanceRef {
        let mut instances = self.instances.lock();
        instances
            .entry(player_id)
            .or_insert_with(|| {
                debug!(player_id, "Avatar instance created");
                AvatarInstance::new(player_id).into_ref()
            })
            .clone()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<InstanceRef> {
        self.instances.lock().get(&player_id).cloned()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.instances.lock().contains_key(&player_id)
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every instance under the store lock, locking each in turn
    pub fn for_each(&self, mut f: impl FnMut(&mut AvatarInstance)) {
        let instances = self.instances.lock();
        for instance in instances.values() {
            f(&mut instance.lock());
        }
    }

    /// Run `f` against the raw map under the store lock.
    /// `f` must not call back into the store.
    pub fn with_map<T>(&self, f: impl FnOnce(&HashMap<PlayerId, InstanceRef>) -> T) -> T {
        f(&self.instances.lock())
    }

    /// Release every resource the instance holds back to its owner.
    /// Color indices are only returned by the authoritative side.
    pub fn release_resources(&self, instance: &mut AvatarInstance, authoritative: bool) {
        if let Some(meshes) = self.meshes() {
            instance.release_mesh(meshes);
        }
        instance.release_simulation(self.engine());
        if authoritative {
            instance.release_color(&self.colors);
        }
    }

    /// Release the instance's resources and drop it from the store
    pub fn remove(&self, player_id: PlayerId, authoritative: bool) -> bool {
        let mut instances = self.instances.lock();
        let Some(instance) = instances.remove(&player_id) else {
            return false;
        };
        self.release_resources(&mut instance.lock(), authoritative);
        debug!(player_id, "Avatar instance removed");
        true
    }

    /// Release and drop every instance
    pub fn clear(&self, authoritative: bool) {
        let mut instances = self.instances.lock();
        let count = instances.len();
        for (_, instance) in instances.drain() {
            self.release_resources(&mut instance.lock(), authoritative);
        }
        *self.local_player.lock() = None;
        info!(count, "Avatar instances cleared");
    }
}

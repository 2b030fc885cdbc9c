//! Per-frame render pass
//!
//! Runs on the host's render thread. Liveness is recomputed from the host's
//! car list every frame; instances that drop out of it release their
//! resources here.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::assets::AssetData;
use crate::engine::{SimHandle, MAX_TRIANGLES};
use crate::game::{InstanceStore, SimulationBridge};
use crate::host::{Camera, HostGame, PlayerId, Vehicle};
use crate::net::NetworkSync;
use crate::pool::color::palette_entry;
use crate::pool::ResourcePool;
use crate::util::time::interpolation_factor;

use super::scenery::Scenery;
use super::{write_geometry, MeshPool, RenderEngine};

/// Render passes an instance may spend outside the car list before it is
/// dropped from the store
pub const STALE_INSTANCE_PASSES: u32 = 600;

/// What one pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Instances whose geometry was uploaded
    pub rendered: Vec<PlayerId>,
    /// Instances that were not in the car list and gave up their resources
    pub released: Vec<PlayerId>,
    /// Instances absent for [`STALE_INSTANCE_PASSES`] and removed from the store
    pub evicted: Vec<PlayerId>,
    pub settings_broadcast: bool,
}

pub struct RenderBridge {
    store: Arc<InstanceStore>,
    simulation: Arc<SimulationBridge>,
    sync: Arc<NetworkSync>,
    host: Arc<dyn HostGame>,
    renderer: Arc<dyn RenderEngine>,
    mesh_pool_size: usize,
    scenery: Mutex<Option<Scenery>>,
    menu_depth: AtomicU32,
}

impl RenderBridge {
    pub fn new(
        store: Arc<InstanceStore>,
        simulation: Arc<SimulationBridge>,
        sync: Arc<NetworkSync>,
        host: Arc<dyn HostGame>,
        renderer: Arc<dyn RenderEngine>,
        mesh_pool_size: usize,
    ) -> Self {
        Self {
            store,
            simulation,
            sync,
            host,
            renderer,
            mesh_pool_size,
            scenery: Mutex::new(None),
            menu_depth: AtomicU32::new(0),
        }
    }

    pub fn menu_pushed(&self) {
        self.menu_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn menu_popped(&self) {
        let _ = self
            .menu_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| depth.checked_sub(1));
    }

    /// Forget any open menus, e.g. once the local player drives again
    pub fn reset_menus(&self) {
        self.menu_depth.store(0, Ordering::Relaxed);
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_depth.load(Ordering::Relaxed) > 0
    }

    /// Build the mesh pool and scenery if this is the first frame with assets
    fn ensure_resources(&self, assets: &AssetData) -> &MeshPool {
        let meshes = self.store.init_meshes(|| {
            info!(size = self.mesh_pool_size, "Building avatar mesh pool");
            ResourcePool::from_fn(self.mesh_pool_size, |_| {
                self.renderer.create_avatar_mesh(MAX_TRIANGLES, &assets.texture)
            })
        });
        let mut scenery = self.scenery.lock();
        if scenery.is_none() {
            *scenery = Some(Scenery::new(self.renderer.as_ref(), assets.arena.clone()));
        }
        meshes
    }

    /// Hide all scenery until the next pass draws it
    pub fn disable_scenery(&self) {
        if let Some(scenery) = self.scenery.lock().as_mut() {
            scenery.disable_all();
        }
    }

    /// One frame: sync liveness with the car list, advance replicas and draw.
    /// The caller has checked that a session is running inside a game.
    pub fn render_frame(&self, assets: &AssetData) -> FrameSummary {
        let mut summary = FrameSummary::default();
        let meshes = self.ensure_resources(assets);

        let Some(camera) = self.host.camera() else {
            return summary;
        };

        if let Some(fps) = self.host.target_fps() {
            let factor = interpolation_factor(fps);
            self.simulation.set_interpolation_factor(factor);
            let engine = self.store.engine();
            if engine.should_update() {
                engine.set_interpolation_interval(factor);
            }
        }

        let is_host = self.sync.is_host();
        let cars = self.host.cars();
        let local_car = cars
            .iter()
            .find(|car| car.is_local() && car.player_id().is_some());

        // Locally driven avatar first; tick takes the store lock itself
        if let Some(car) = local_car {
            if let Some(player_id) = car.player_id() {
                self.store.set_local_player(player_id);
                let instance = self.store.get_or_create(player_id);
                if !is_host {
                    self.simulation.tick(&instance, car.as_ref());
                }
            }
        }
        let local_player = self.store.local_player();

        let menu_open = self.is_menu_open();
        let mut settings_changed = false;
        let mut scenery = self.scenery.lock();

        self.store.with_map(|instances| {
            for instance in instances.values() {
                let mut avatar = instance.lock();
                avatar.is_active_this_frame = false;
                if avatar.handle == SimHandle::Failed {
                    avatar.handle = SimHandle::Uninitialized;
                }
            }

            for car in &cars {
                let Some(player_id) = car.player_id() else {
                    continue;
                };
                let Some(instance) = instances.get(&player_id) else {
                    continue;
                };
                let mut avatar = instance.lock();
                avatar.is_active_this_frame = true;
                avatar.team_index = car.team_index();
                if is_host && avatar.color_index.is_none() {
                    avatar.color_index = Some(self.store.colors().acquire(avatar.team_index));
                    debug!(player_id, color = ?avatar.color_index, "Color assigned");
                    settings_changed = true;
                }
                if avatar.is_car_mode {
                    avatar.clear_mesh(meshes);
                    avatar.release_simulation(self.store.engine());
                    if let Some(scenery) = scenery.as_mut() {
                        scenery.render_ghost(car.as_ref(), &camera);
                    }
                }
            }

            for (&player_id, instance) in instances {
                let mut avatar = instance.lock();

                if !avatar.is_active_this_frame {
                    avatar.inactive_passes = avatar.inactive_passes.saturating_add(1);
                    if avatar.inactive_passes >= STALE_INSTANCE_PASSES
                        && Some(player_id) != local_player
                    {
                        summary.evicted.push(player_id);
                    }
                    // Clients keep replicated colors; only the host owns them
                    let holds_color = is_host && avatar.color_index.is_some();
                    if avatar.mesh.is_some() || avatar.handle.is_active() || holds_color {
                        self.store.release_resources(&mut avatar, is_host);
                        settings_changed |= is_host;
                        summary.released.push(player_id);
                        trace!(player_id, "Avatar left the car list");
                    }
                    continue;
                }
                avatar.inactive_passes = 0;
                if avatar.is_car_mode {
                    continue;
                }
                if avatar.mesh.is_none() {
                    avatar.mesh = meshes.acquire();
                }
                let Some(slot) = avatar.mesh else {
                    continue;
                };
                if Some(player_id) != local_player {
                    self.simulation.step_replica(&mut avatar, Some(&camera));
                }

                let colors = avatar.color_index.and_then(palette_entry);
                let geometry = &avatar.geometry;
                meshes.with(slot, |mesh| {
                    let triangles = write_geometry(geometry, mesh.vertices_mut());
                    if let Some(colors) = &colors {
                        mesh.set_team_colors(colors);
                    }
                    mesh.upload(if menu_open { 0 } else { triangles }, Some(&camera));
                });
                summary.rendered.push(player_id);
            }
        });

        for &player_id in &summary.evicted {
            if self.store.remove(player_id, is_host) {
                settings_changed |= is_host;
            }
        }

        if settings_changed && is_host {
            summary.settings_broadcast = self.sync.broadcast_settings();
        }

        if let Some(scenery) = scenery.as_mut() {
            self.render_scenery(scenery, &camera);
        }
        summary.rendered.sort_unstable();
        summary.released.sort_unstable();
        summary.evicted.sort_unstable();
        summary
    }

    fn render_scenery(&self, scenery: &mut Scenery, camera: &Camera) {
        if let Some(ball) = self.host.ball() {
            scenery.render_ball(ball.as_ref(), camera);
        }
        scenery.render_arena(camera);
    }
}

/// The local car, if the host has one with a player attached
pub fn local_vehicle(host: &dyn HostGame) -> Option<Arc<dyn Vehicle>> {
    host.cars()
        .into_iter()
        .find(|car| car.is_local() && car.player_id().is_some())
}

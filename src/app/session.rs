//! The overlay session: every host callback lands on a method of [`Session`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::assets::{spawn_load, AssetLoader, Assets, FileAssetLoader};
use crate::audio::{AudioBridge, AudioEngine};
use crate::config::Config;
use crate::engine::{BoostConfig, SimulationEngine};
use crate::game::{InstanceStore, MatchSettings, SharedSettings, SimulationBridge};
use crate::host::{ControllerInput, HostGame, PlayerId, Vehicle};
use crate::net::{Dispatch, JoinTask, NetworkSync, Transport, UdpTransport};
use crate::render::bridge::{local_vehicle, FrameSummary};
use crate::render::{RenderBridge, RenderEngine};
use crate::telemetry::init_tracing;

/// Delay between a match winner and the host advancing to the next game
pub const NEXT_GAME_DELAY: Duration = Duration::from_secs(15);

/// External systems the overlay drives
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn SimulationEngine>,
    pub host: Arc<dyn HostGame>,
    pub renderer: Arc<dyn RenderEngine>,
    pub audio: Arc<dyn AudioEngine>,
    pub transport: Arc<dyn Transport>,
    pub assets: Arc<dyn AssetLoader>,
}

/// Collaborators only the embedding host can provide
#[derive(Clone)]
pub struct HostSystems {
    pub engine: Arc<dyn SimulationEngine>,
    pub host: Arc<dyn HostGame>,
    pub renderer: Arc<dyn RenderEngine>,
    pub audio: Arc<dyn AudioEngine>,
}

impl Collaborators {
    /// Bind the UDP transport to the configured address and peers, and read
    /// assets from the configured files
    pub async fn from_config(
        config: &Config,
        systems: HostSystems,
        runtime: &Handle,
    ) -> anyhow::Result<Self> {
        let transport = UdpTransport::bind(config.bind_addr, runtime)
            .await
            .with_context(|| format!("binding {}", config.bind_addr))?;
        transport.set_peers(config.peers.clone());

        let HostSystems {
            engine,
            host,
            renderer,
            audio,
        } = systems;
        Ok(Self {
            engine,
            host,
            renderer,
            audio,
            transport,
            assets: Arc::new(FileAssetLoader::from_config(config)),
        })
    }
}

pub struct Session {
    config: Config,
    session_id: Uuid,
    host: Arc<dyn HostGame>,
    transport: Arc<dyn Transport>,
    loader: Arc<dyn AssetLoader>,
    runtime: Handle,
    store: Arc<InstanceStore>,
    settings: SharedSettings,
    sync: Arc<NetworkSync>,
    simulation: Arc<SimulationBridge>,
    render: RenderBridge,
    audio: Arc<AudioBridge>,
    assets: Arc<Assets>,
    join: Mutex<Option<JoinTask>>,
    /// The avatar mode is switched on for this participant
    mode_active: AtomicBool,
}

impl Session {
    pub fn new(config: Config, collaborators: Collaborators, runtime: Handle) -> Arc<Self> {
        let Collaborators {
            engine,
            host,
            renderer,
            audio,
            transport,
            assets,
        } = collaborators;

        let store = Arc::new(InstanceStore::new(engine));
        let settings: SharedSettings = Arc::new(Mutex::new(MatchSettings::default()));
        let sync = Arc::new(NetworkSync::new(
            store.clone(),
            settings.clone(),
            transport.clone(),
        ));
        let audio = Arc::new(AudioBridge::new(audio, config.master_volume));
        let simulation = Arc::new(SimulationBridge::new(
            store.clone(),
            sync.clone(),
            host.clone(),
            audio.clone(),
            config.tuning,
        ));
        let render = RenderBridge::new(
            store.clone(),
            simulation.clone(),
            sync.clone(),
            host.clone(),
            renderer,
            config.mesh_pool_size,
        );

        Arc::new(Self {
            config,
            session_id: Uuid::new_v4(),
            host,
            transport,
            loader: assets,
            runtime,
            store,
            settings,
            sync,
            simulation,
            render,
            audio,
            assets: Arc::new(Assets::new()),
            join: Mutex::new(None),
            mode_active: AtomicBool::new(false),
        })
    }

    /// Full setup from configuration: tracing, transport, asset loader.
    /// The session still has to be [started](Session::start).
    pub async fn from_config(
        config: Config,
        systems: HostSystems,
        runtime: Handle,
    ) -> anyhow::Result<Arc<Self>> {
        if !init_tracing(&config.log_level, config.log_json) {
            debug!("Tracing subscriber already installed");
        }
        let collaborators = Collaborators::from_config(&config, systems, &runtime).await?;
        Ok(Self::new(config, collaborators, runtime))
    }

    /// Register for incoming datagrams and start the one-time asset load.
    /// The returned thread handle may be dropped.
    pub fn start(self: &Arc<Self>) -> anyhow::Result<std::thread::JoinHandle<()>> {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.transport.set_receiver(Arc::new(move |bytes: &[u8]| {
            if let Some(session) = weak.upgrade() {
                session.on_bytes(bytes);
            }
        }));

        let loader = spawn_load(
            self.assets.clone(),
            self.loader.clone(),
            self.store.engine_arc(),
            self.config.rom_sha256.clone(),
        )?;
        info!(session_id = %self.session_id, "Avatar overlay started");
        Ok(loader)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn store(&self) -> &Arc<InstanceStore> {
        &self.store
    }

    pub fn sync(&self) -> &Arc<NetworkSync> {
        &self.sync
    }

    pub fn simulation(&self) -> &Arc<SimulationBridge> {
        &self.simulation
    }

    pub fn settings(&self) -> MatchSettings {
        self.settings.lock().clone()
    }

    pub fn assets_ready(&self) -> bool {
        self.assets.is_ready()
    }

    pub fn is_mode_active(&self) -> bool {
        self.mode_active.load(Ordering::Acquire)
    }

    fn session_active(&self) -> bool {
        self.settings.lock().session_active
    }

    /// Transport receive callback
    pub fn on_bytes(&self, bytes: &[u8]) {
        if let Dispatch::Settings {
            join_requested: true,
        } = self.sync.on_bytes(bytes)
        {
            self.begin_join();
        }
    }

    /// Tear the current game down and rejoin the host's match in the background
    fn begin_join(&self) {
        self.leave_game(true);
        let task = JoinTask::spawn(
            &self.runtime,
            self.transport.clone(),
            self.host.clone(),
            self.config.join_config(),
        );
        if let Some(previous) = self.join.lock().replace(task) {
            previous.cancel();
        }
        info!(session_id = %self.session_id, "Join requested by host");
    }

    /// Take the pending join attempt, if any
    pub fn take_join_task(&self) -> Option<JoinTask> {
        self.join.lock().take()
    }

    /// Switching the mode on makes this participant authoritative
    pub fn activate(&self, active: bool) {
        self.mode_active.store(active, Ordering::Release);
        self.sync.set_host(active);
        info!(session_id = %self.session_id, active, "Avatar mode toggled");
    }

    pub fn on_round_start(&self) {
        let is_host = self.sync.is_host();
        {
            let mut settings = self.settings.lock();
            settings.pre_round = true;
            if is_host && self.is_mode_active() {
                settings.session_active = true;
            }
        }
        self.sync.broadcast_settings();
    }

    pub fn on_countdown_end(&self) {
        self.settings.lock().pre_round = false;
        self.sync.broadcast_settings();
    }

    pub fn on_goal_scored(&self) {
        self.leave_game(false);
    }

    pub fn on_overtime_start(&self) {
        self.leave_game(false);
    }

    /// Host only: advance to the next game once the celebration is over
    pub fn on_match_winner_set(self: &Arc<Self>) {
        if !self.sync.is_host() || !self.session_active() {
            return;
        }
        let weak = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(NEXT_GAME_DELAY).await;
            let Some(session) = weak.upgrade() else {
                return;
            };
            if session.session_active() {
                info!(session_id = %session.session_id, "Advancing to next game");
                session.host.next_game_in_match();
            }
        });
    }

    /// Player joined, left or changed team
    pub fn on_roster_changed(&self) {
        self.sync.broadcast_settings();
    }

    pub fn on_menu_pushed(&self) {
        self.render.menu_pushed();
    }

    pub fn on_menu_popped(&self) {
        self.render.menu_popped();
    }

    /// Synchronous teardown. Geometry is cleared before any resource is
    /// released. `delete` drops every instance and leaves the mode; without
    /// it instances survive and respawn at their vehicles.
    pub fn leave_game(&self, delete: bool) {
        let is_host = self.sync.is_host();
        {
            let mut settings = self.settings.lock();
            if delete {
                settings.reset();
            } else {
                settings.session_active = false;
            }
        }

        let meshes = self.store.meshes();
        self.store.for_each(|instance| {
            if let Some(meshes) = meshes {
                instance.clear_mesh(meshes);
            }
            self.audio.stop_all(&mut instance.audio);
            if delete {
                self.store.release_resources(instance, is_host);
            } else {
                instance.reset_position();
            }
        });

        if delete {
            self.store.clear(is_host);
            self.mode_active.store(false, Ordering::Release);
            self.sync.set_host(false);
        }
        self.render.disable_scenery();
        debug!(session_id = %self.session_id, delete, "Left game");
    }

    /// Final teardown before the process unloads the overlay
    pub fn shutdown(&self) {
        if let Some(task) = self.join.lock().take() {
            task.cancel();
        }
        self.leave_game(true);
        if self.assets.is_ready() {
            self.store.engine().terminate();
        }
        info!(session_id = %self.session_id, "Avatar overlay shut down");
    }

    /// Settings toggle: the player drives their vehicle instead of an avatar
    pub fn set_car_mode(&self, player_id: PlayerId, is_car_mode: bool) {
        if !self.sync.is_host() {
            return;
        }
        let Some(instance) = self.store.get(player_id) else {
            debug!(player_id, "Car mode toggle for unknown player ignored");
            return;
        };
        let changed = {
            let mut avatar = instance.lock();
            let changed = avatar.is_car_mode != is_car_mode;
            avatar.is_car_mode = is_car_mode;
            changed
        };
        if changed {
            debug!(player_id, is_car_mode, "Car mode changed");
            self.sync.broadcast_settings();
        }
    }

    pub fn set_boost_config(&self, boost: BoostConfig) {
        if !self.sync.is_host() {
            return;
        }
        self.settings.lock().boost = boost;
        self.sync.broadcast_settings();
    }

    /// Settings slider, 0..=100
    pub fn set_master_volume(&self, volume: u8) {
        self.audio.set_master_volume(volume);
    }

    pub fn invite_to_join(&self) -> bool {
        self.sync.invite_to_join()
    }

    /// Round tick hook. Only the authoritative side runs it; it drives the
    /// local avatar.
    pub fn on_host_tick(&self) {
        if !self.is_mode_active() || !self.assets.is_ready() || !self.host.is_in_game() {
            return;
        }
        self.sync.set_host(true);
        self.settings.lock().session_active = true;

        let Some(car) = local_vehicle(self.host.as_ref()) else {
            return;
        };
        let Some(player_id) = car.player_id() else {
            return;
        };
        self.store.set_local_player(player_id);
        let instance = self.store.get_or_create(player_id);
        self.simulation.tick(&instance, car.as_ref());
    }

    /// Host vehicle input hook, once per car per physics tick
    pub fn on_vehicle_input(&self, vehicle: &dyn Vehicle, controls: &mut ControllerInput) {
        if !self.session_active() {
            return;
        }
        if vehicle.is_local() && !controls.is_idle() {
            self.render.reset_menus();
        }
        self.simulation.on_vehicle_input(vehicle, controls);
    }

    /// Client only: keep host physics from moving cars off their avatars
    pub fn on_post_physics(&self) {
        if self.sync.is_host() || !self.session_active() {
            return;
        }
        for car in self.host.cars() {
            self.simulation.follow_avatar(car.as_ref());
        }
    }

    /// Render callback
    pub fn on_render(&self) -> Option<FrameSummary> {
        let assets = self.assets.data()?;
        let in_game = self.host.is_in_game();
        let active = self.session_active();
        if !in_game && active {
            self.leave_game(true);
        }
        if !in_game || !active {
            return None;
        }
        Some(self.render.render_frame(assets))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.join.get_mut().take() {
            task.cancel();
        }
    }
}

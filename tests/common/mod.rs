//! In-memory fakes of every collaborator the overlay drives
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use avatar_overlay::assets::{AssetError, AssetLoader, Triangle};
use avatar_overlay::audio::{AudioEngine, SoundHandle};
use avatar_overlay::engine::{BodyState, GeometryBuffer, SimInput, SimulationEngine, StaticSurface};
use avatar_overlay::host::{Ball, Camera, ControllerInput, HostGame, PlayerId, Vehicle};
use avatar_overlay::net::{HostStatus, ReceiveCallback, Transport};
use avatar_overlay::pool::TeamColors;
use avatar_overlay::render::{AvatarMesh, RenderEngine, SceneryKind, SceneryMesh, Vertex};
use avatar_overlay::util::math::{Rotator, Vec3};
use avatar_overlay::{Collaborators, Config, Session};

/// Engine and mesh calls in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Create(u32),
    Delete(u32),
    Upload { mesh: usize, triangles: usize },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub struct FakeEngine {
    events: EventLog,
    next: AtomicI32,
    pub fail_create: AtomicBool,
    /// Value `create` returns while `fail_create` is set
    pub failure_code: AtomicI32,
    pub create_calls: AtomicUsize,
    pub update_frames: AtomicBool,
    /// Action reported by every step
    pub action: Mutex<u32>,
    spawns: Mutex<HashMap<u32, [i16; 3]>>,
    pub steps: AtomicUsize,
    pub last_input: Mutex<Option<SimInput>>,
    pub terminated: AtomicBool,
}

impl FakeEngine {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            next: AtomicI32::new(0),
            fail_create: AtomicBool::new(false),
            failure_code: AtomicI32::new(-1),
            create_calls: AtomicUsize::new(0),
            update_frames: AtomicBool::new(true),
            action: Mutex::new(0),
            spawns: Mutex::new(HashMap::new()),
            steps: AtomicUsize::new(0),
            last_input: Mutex::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn spawn_of(&self, handle: u32) -> Option<[i16; 3]> {
        self.spawns.lock().get(&handle).copied()
    }

    pub fn created(&self) -> usize {
        self.spawns.lock().len()
    }
}

impl SimulationEngine for FakeEngine {
    fn init(&self, _rom: &[u8], _texture: &mut [u8]) {}

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn load_static_surfaces(&self, _surfaces: &[StaticSurface]) {}

    fn create(&self, x: i16, y: i16, z: i16) -> i32 {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return self.failure_code.load(Ordering::SeqCst);
        }
        let handle = self.next.fetch_add(1, Ordering::SeqCst);
        self.spawns.lock().insert(handle as u32, [x, y, z]);
        self.events.lock().push(Event::Create(handle as u32));
        handle
    }

    /// Places the character at its spawn point and emits two triangles
    fn step(&self, handle: u32, input: &SimInput, body: &mut BodyState, geometry: &mut GeometryBuffer) {
        self.steps.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock() = Some(*input);
        let [x, y, z] = self.spawn_of(handle).unwrap_or([1, 1, 1]);
        let position = Vec3::new(x as f32, y as f32, z as f32);
        body.state.position = position;
        body.state.interpolated_position = position;
        body.state.velocity = Vec3::new(1.0, 2.0, 3.0);
        body.state.is_update_frame = self.update_frames.load(Ordering::SeqCst);
        body.action = *self.action.lock();
        geometry.triangles_used = 2;
    }

    fn delete(&self, handle: u32) {
        self.events.lock().push(Event::Delete(handle));
    }

    fn should_update(&self) -> bool {
        true
    }

    fn set_interpolation_interval(&self, _interval: u32) {}
}

#[derive(Debug, Default)]
struct VehicleState {
    location: Vec3,
    velocity: Vec3,
    rotation: Rotator,
    controls: Option<ControllerInput>,
    boost: Option<f32>,
    hidden: bool,
    demolished: bool,
}

pub struct FakeVehicle {
    player_id: Option<PlayerId>,
    local: bool,
    team: i32,
    state: Mutex<VehicleState>,
}

impl FakeVehicle {
    pub fn new(player_id: PlayerId, local: bool, team: i32, location: Vec3) -> Arc<Self> {
        Arc::new(Self {
            player_id: Some(player_id),
            local,
            team,
            state: Mutex::new(VehicleState {
                location,
                controls: Some(ControllerInput::default()),
                boost: Some(1.0),
                ..VehicleState::default()
            }),
        })
    }

    pub fn set_controls(&self, controls: Option<ControllerInput>) {
        self.state.lock().controls = controls;
    }

    pub fn hidden(&self) -> bool {
        self.state.lock().hidden
    }

    pub fn demolished(&self) -> bool {
        self.state.lock().demolished
    }

    pub fn boost(&self) -> Option<f32> {
        self.state.lock().boost
    }
}

impl Vehicle for FakeVehicle {
    fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }
    fn is_local(&self) -> bool {
        self.local
    }
    fn team_index(&self) -> i32 {
        self.team
    }
    fn body_id(&self) -> i32 {
        23
    }
    fn location(&self) -> Vec3 {
        self.state.lock().location
    }
    fn set_location(&self, location: Vec3) {
        self.state.lock().location = location;
    }
    fn velocity(&self) -> Vec3 {
        self.state.lock().velocity
    }
    fn set_velocity(&self, velocity: Vec3) {
        self.state.lock().velocity = velocity;
    }
    fn rotation(&self) -> Rotator {
        self.state.lock().rotation
    }
    fn set_rotation(&self, rotation: Rotator) {
        self.state.lock().rotation = rotation;
    }
    fn controller_input(&self) -> Option<ControllerInput> {
        self.state.lock().controls
    }
    fn boost_amount(&self) -> Option<f32> {
        self.state.lock().boost
    }
    fn set_boost_amount(&self, amount: f32) {
        self.state.lock().boost = Some(amount);
    }
    fn set_hidden(&self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }
    fn demolish(&self) {
        self.state.lock().demolished = true;
    }
}

#[derive(Default)]
pub struct FakeBall {
    pub location: Mutex<Vec3>,
    pub velocity: Mutex<Vec3>,
}

impl Ball for FakeBall {
    fn location(&self) -> Vec3 {
        *self.location.lock()
    }
    fn rotation(&self) -> Rotator {
        Rotator::default()
    }
    fn velocity(&self) -> Vec3 {
        *self.velocity.lock()
    }
    fn set_velocity(&self, velocity: Vec3) {
        *self.velocity.lock() = velocity;
    }
}

pub struct FakeHost {
    pub cars: Mutex<Vec<Arc<FakeVehicle>>>,
    pub ball: Mutex<Option<Arc<FakeBall>>>,
    pub in_game: AtomicBool,
    pub paused: AtomicBool,
    pub joins: AtomicUsize,
    pub next_games: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cars: Mutex::new(Vec::new()),
            ball: Mutex::new(None),
            in_game: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            joins: AtomicUsize::new(0),
            next_games: AtomicUsize::new(0),
        })
    }

    pub fn set_cars(&self, cars: &[&Arc<FakeVehicle>]) {
        *self.cars.lock() = cars.iter().map(|car| Arc::clone(car)).collect();
    }
}

impl HostGame for FakeHost {
    fn is_in_game(&self) -> bool {
        self.in_game.load(Ordering::SeqCst)
    }
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
    fn cars(&self) -> Vec<Arc<dyn Vehicle>> {
        self.cars
            .lock()
            .iter()
            .map(|car| car.clone() as Arc<dyn Vehicle>)
            .collect()
    }
    fn ball(&self) -> Option<Arc<dyn Ball>> {
        self.ball.lock().clone().map(|ball| ball as Arc<dyn Ball>)
    }
    fn camera(&self) -> Option<Camera> {
        Some(Camera::default())
    }
    fn target_fps(&self) -> Option<f32> {
        Some(60.0)
    }
    fn join_game(&self) {
        self.joins.fetch_add(1, Ordering::SeqCst);
    }
    fn next_game_in_match(&self) {
        self.next_games.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeMesh {
    index: usize,
    vertices: Vec<Vertex>,
    events: EventLog,
}

impl AvatarMesh for FakeMesh {
    fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }
    fn set_team_colors(&mut self, _colors: &TeamColors) {}
    fn upload(&mut self, triangles: usize, _camera: Option<&Camera>) {
        self.events.lock().push(Event::Upload {
            mesh: self.index,
            triangles,
        });
    }
}

struct NullScenery {
    vertices: Vec<Vertex>,
}

impl SceneryMesh for NullScenery {
    fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }
    fn upload(&mut self, _triangles: usize, _camera: &Camera) {}
    fn set_transform(&mut self, _translation: Vec3, _rotation: Rotator) {}
    fn render(&mut self, _camera: &Camera) {}
    fn set_disabled(&mut self, _disabled: bool) {}
}

pub struct FakeRenderer {
    events: EventLog,
    meshes: AtomicUsize,
}

impl FakeRenderer {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            meshes: AtomicUsize::new(0),
        }
    }
}

impl RenderEngine for FakeRenderer {
    fn create_avatar_mesh(&self, max_triangles: usize, _texture: &[u8]) -> Box<dyn AvatarMesh> {
        Box::new(FakeMesh {
            index: self.meshes.fetch_add(1, Ordering::SeqCst),
            vertices: vec![Vertex::default(); max_triangles * 3],
            events: self.events.clone(),
        })
    }

    fn create_scenery(&self, kind: SceneryKind) -> Box<dyn SceneryMesh> {
        let triangles = match kind {
            SceneryKind::Arena { max_triangles } => max_triangles,
            _ => 0,
        };
        Box::new(NullScenery {
            vertices: vec![Vertex::default(); triangles * 3],
        })
    }
}

pub struct NullAudio;

impl AudioEngine for NullAudio {
    fn play_3d(&self, _clip: usize, _position: Vec3, _velocity: Vec3, _volume: f32) -> SoundHandle {
        0
    }
    fn set_play_speed(&self, _handle: SoundHandle, _speed: f32) {}
    fn set_looping(&self, _handle: SoundHandle, _looping: bool) {}
    fn set_source(&self, _handle: SoundHandle, _position: Vec3, _velocity: Vec3, _volume: f32) {}
    fn stop(&self, _handle: SoundHandle) {}
    fn set_listener(&self, _position: Vec3, _at: Vec3) {}
}

/// Records outgoing datagrams; pings answer with a fixed status
pub struct Outbox {
    pub sent: Mutex<Vec<Bytes>>,
    pub ping_answer: Mutex<HostStatus>,
    pub pings: AtomicUsize,
    receiver: Mutex<Option<ReceiveCallback>>,
}

impl Outbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            ping_answer: Mutex::new(HostStatus::Online),
            pings: AtomicUsize::new(0),
            receiver: Mutex::new(None),
        })
    }

    /// Hand a datagram to whoever registered for incoming bytes
    pub fn deliver(&self, bytes: &[u8]) {
        let receiver = self.receiver.lock().clone();
        if let Some(receiver) = receiver {
            receiver(bytes);
        }
    }

    pub fn sent_kinds(&self) -> Vec<i32> {
        self.sent
            .lock()
            .iter()
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

impl Transport for Outbox {
    fn send_bytes(&self, bytes: Bytes) {
        self.sent.lock().push(bytes);
    }

    fn ping_host(&self, _addr: SocketAddr, _timeout: Duration) -> BoxFuture<'static, HostStatus> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let answer = *self.ping_answer.lock();
        async move { answer }.boxed()
    }

    fn set_receiver(&self, callback: ReceiveCallback) {
        *self.receiver.lock() = Some(callback);
    }
}

pub struct MemoryAssets;

impl AssetLoader for MemoryAssets {
    fn load_rom(&self) -> Result<Vec<u8>, AssetError> {
        Ok(vec![0u8; 16])
    }
    fn arena_triangles(&self) -> Result<Vec<Triangle>, AssetError> {
        Ok(Vec::new())
    }
}

pub struct Harness {
    pub session: Arc<Session>,
    pub engine: Arc<FakeEngine>,
    pub host: Arc<FakeHost>,
    pub transport: Arc<Outbox>,
    pub events: EventLog,
}

impl Harness {
    /// A started session with assets loaded. Must run inside a tokio runtime.
    pub fn start() -> Self {
        Self::start_with(Config::default())
    }

    pub fn start_with(config: Config) -> Self {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let engine = Arc::new(FakeEngine::new(events.clone()));
        let host = FakeHost::new();
        let transport = Outbox::new();

        let session = Session::new(
            config,
            Collaborators {
                engine: engine.clone(),
                host: host.clone(),
                renderer: Arc::new(FakeRenderer::new(events.clone())),
                audio: Arc::new(NullAudio),
                transport: transport.clone(),
                assets: Arc::new(MemoryAssets),
            },
            tokio::runtime::Handle::current(),
        );
        let loader = session.start().expect("session starts");
        loader.join().expect("asset thread");
        assert!(session.assets_ready());

        Self {
            session,
            engine,
            host,
            transport,
            events,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

/// A body state that is not at the origin sentinel
pub fn body_at(position: Vec3) -> BodyState {
    let mut body = BodyState::default();
    body.state.position = position;
    body.state.interpolated_position = position;
    body.state.is_update_frame = true;
    body
}

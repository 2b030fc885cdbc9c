//! Positional audio driven by the engine's per-step sound mask

pub mod sound;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::util::math::Vec3;

use sound::{SoundKind, SOUND_TABLE};

/// Distance attenuation factor: volume = 1 - (distance * ROLLOFF)^2
pub const ATTENUATION_ROLLOFF: f32 = 0.0003;

/// Range of the randomised playback speed for clips with speed 0
const RANDOM_SPEED_BASE: f32 = 1.05;
const RANDOM_SPEED_SPREAD: f32 = 0.07;

/// Handle of a playing voice inside the audio engine
pub type SoundHandle = u32;

pub trait AudioEngine: Send + Sync {
    /// Start a positional clip (index into [`SOUND_TABLE`])
    fn play_3d(&self, clip: usize, position: Vec3, velocity: Vec3, volume: f32) -> SoundHandle;
    fn set_play_speed(&self, handle: SoundHandle, speed: f32);
    fn set_looping(&self, handle: SoundHandle, looping: bool);
    fn set_source(&self, handle: SoundHandle, position: Vec3, velocity: Vec3, volume: f32);
    fn stop(&self, handle: SoundHandle);
    fn set_listener(&self, position: Vec3, at: Vec3);
}

/// Voices an instance currently owns in the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioHandles {
    pub looping: Option<SoundHandle>,
    pub one_shot: Option<SoundHandle>,
}

/// Where one avatar's sounds come from and who hears them (host space)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoundEmitter {
    pub position: Vec3,
    pub velocity: Vec3,
    pub listener_position: Vec3,
    pub listener_at: Vec3,
}

pub struct AudioBridge {
    engine: Arc<dyn AudioEngine>,
    /// 0..=100
    master_volume: AtomicU8,
    rng: Mutex<ChaCha8Rng>,
}

impl AudioBridge {
    pub fn new(engine: Arc<dyn AudioEngine>, master_volume: u8) -> Self {
        Self::with_rng(engine, master_volume, ChaCha8Rng::from_entropy())
    }

    pub fn with_rng(engine: Arc<dyn AudioEngine>, master_volume: u8, rng: ChaCha8Rng) -> Self {
        Self {
            engine,
            master_volume: AtomicU8::new(master_volume.min(100)),
            rng: Mutex::new(rng),
        }
    }

    pub fn set_master_volume(&self, volume: u8) {
        self.master_volume.store(volume.min(100), Ordering::Relaxed);
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume.load(Ordering::Relaxed)
    }

    /// Volume for a clip heard at `distance`
    pub fn attenuated_volume(&self, distance: f32, clip_volume: f32) -> f32 {
        let falloff = (1.0 - (distance * ATTENUATION_ROLLOFF).powi(2)).max(0.0);
        falloff * clip_volume * self.master_volume() as f32 / 100.0
    }

    /// Play, continue or stop every sound the mask calls for
    pub fn update_sounds(&self, sound_mask: u32, emitter: &SoundEmitter, handles: &mut AudioHandles) {
        let distance = emitter.position.distance(&emitter.listener_position);

        for (clip, def) in SOUND_TABLE.iter().enumerate() {
            let triggered = sound_mask & def.mask != 0;
            let volume = self.attenuated_volume(distance, def.volume);

            match def.kind {
                SoundKind::Looping => match (triggered, handles.looping) {
                    (true, Some(handle)) => {
                        self.engine
                            .set_source(handle, emitter.position, emitter.velocity, volume);
                    }
                    (true, None) => {
                        let handle = self.play(clip, emitter, volume);
                        self.engine.set_looping(handle, true);
                        handles.looping = Some(handle);
                    }
                    (false, Some(handle)) => {
                        self.engine.stop(handle);
                        handles.looping = None;
                    }
                    (false, None) => {}
                },
                SoundKind::Voice if triggered => {
                    if let Some(previous) = handles.one_shot.take() {
                        self.engine.stop(previous);
                    }
                    handles.one_shot = Some(self.play(clip, emitter, volume));
                }
                SoundKind::Effect if triggered => {
                    self.play(clip, emitter, volume);
                }
                _ => {}
            }
        }

        self.engine
            .set_listener(emitter.listener_position, emitter.listener_at);
    }

    /// Stop everything an instance owns
    pub fn stop_all(&self, handles: &mut AudioHandles) {
        if let Some(handle) = handles.looping.take() {
            self.engine.stop(handle);
        }
        if let Some(handle) = handles.one_shot.take() {
            self.engine.stop(handle);
        }
    }

    fn play(&self, clip: usize, emitter: &SoundEmitter, volume: f32) -> SoundHandle {
        let def = &SOUND_TABLE[clip];
        let handle = self
            .engine
            .play_3d(clip, emitter.position, emitter.velocity, volume);
        let speed = if def.playback_speed == 0.0 {
            let percent = self.rng.lock().gen_range(0..=100) as f32 / 100.0;
            RANDOM_SPEED_BASE + RANDOM_SPEED_SPREAD * percent
        } else {
            def.playback_speed
        };
        self.engine.set_play_speed(handle, speed);
        handle
    }
}

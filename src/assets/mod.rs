//! One-time asset loading and engine global initialisation
//!
//! Loading runs once on a short-lived background thread. The render callback
//! never waits for it; it polls [`Assets::is_ready`] and skips the frame.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::config::Config;
use crate::engine::{SimulationEngine, StaticSurface, SURFACE_DEFAULT, TERRAIN_GRASS, TEXTURE_SIZE};
use crate::util::math::Vec3;
use crate::util::time::Timer;

/// Host-space triangle
pub type Triangle = [Vec3; 3];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ROM digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}

pub trait AssetLoader: Send + Sync {
    fn load_rom(&self) -> Result<Vec<u8>, AssetError>;
    /// Arena collision and render triangles; empty when the arena is not replaced
    fn arena_triangles(&self) -> Result<Vec<Triangle>, AssetError>;
}

/// Reads the ROM image from disk and the arena from a JSON triangle list
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    pub rom_path: PathBuf,
    pub arena_path: Option<PathBuf>,
}

impl FileAssetLoader {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rom_path: config.rom_path.clone(),
            arena_path: config.arena_file.clone(),
        }
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_rom(&self) -> Result<Vec<u8>, AssetError> {
        std::fs::read(&self.rom_path).map_err(|source| AssetError::Io {
            path: self.rom_path.display().to_string(),
            source,
        })
    }

    fn arena_triangles(&self) -> Result<Vec<Triangle>, AssetError> {
        let Some(path) = &self.arena_path else {
            return Ok(Vec::new());
        };
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AssetError::Parse {
            path: display,
            source,
        })
    }
}

/// Lowercase hex SHA-256 of a ROM image
pub fn rom_digest(rom: &[u8]) -> String {
    hex::encode(Sha256::digest(rom))
}

pub fn verify_rom(rom: &[u8], expected: Option<&str>) -> Result<(), AssetError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = rom_digest(rom);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(AssetError::DigestMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Engine collision surfaces for host-space triangles: axes swapped into
/// simulation space, winding reversed
pub fn surfaces_from_triangles(triangles: &[Triangle]) -> Vec<StaticSurface> {
    triangles
        .iter()
        .map(|triangle| {
            let mut vertices = [[0i32; 3]; 3];
            for (out, corner) in vertices.iter_mut().zip(triangle.iter().rev()) {
                let sim = corner.to_sim();
                *out = [sim.x as i16 as i32, sim.y as i16 as i32, sim.z as i16 as i32];
            }
            StaticSurface {
                surface_type: SURFACE_DEFAULT,
                force: 0,
                terrain: TERRAIN_GRASS,
                vertices,
            }
        })
        .collect()
}

/// What the render side needs once loading finished
#[derive(Debug, Clone, PartialEq)]
pub struct AssetData {
    /// Engine texture atlas (RGBA8)
    pub texture: Vec<u8>,
    pub arena: Vec<Triangle>,
}

#[derive(Debug, Default)]
pub struct Assets {
    ready: AtomicBool,
    data: OnceLock<AssetData>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn data(&self) -> Option<&AssetData> {
        if self.is_ready() {
            self.data.get()
        } else {
            None
        }
    }

    /// Load everything and initialise the engine. Sets the ready flag last.
    pub fn load(
        &self,
        loader: &dyn AssetLoader,
        engine: &dyn SimulationEngine,
        rom_sha256: Option<&str>,
    ) -> anyhow::Result<()> {
        let timer = Timer::new();
        let rom = loader.load_rom().context("loading ROM image")?;
        verify_rom(&rom, rom_sha256).context("verifying ROM image")?;
        let arena = loader.arena_triangles().context("loading arena")?;

        let mut texture = vec![0u8; TEXTURE_SIZE];
        engine.init(&rom, &mut texture);
        if !arena.is_empty() {
            engine.load_static_surfaces(&surfaces_from_triangles(&arena));
        }

        let triangles = arena.len();
        if self.data.set(AssetData { texture, arena }).is_err() {
            anyhow::bail!("assets already loaded");
        }
        self.ready.store(true, Ordering::Release);
        info!(triangles, elapsed_ms = timer.elapsed_ms(), "Assets loaded");
        Ok(())
    }
}

/// Run [`Assets::load`] on a background thread; failures are logged and
/// leave the ready flag unset
pub fn spawn_load(
    assets: Arc<Assets>,
    loader: Arc<dyn AssetLoader>,
    engine: Arc<dyn SimulationEngine>,
    rom_sha256: Option<String>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("avatar-assets".into())
        .spawn(move || {
            if let Err(e) = assets.load(loader.as_ref(), engine.as_ref(), rom_sha256.as_deref()) {
                error!(error = %format!("{e:#}"), "Asset loading failed");
            }
        })
}

//! Time utilities for bridging the host frame rate and the simulation rate

use std::time::Instant;

/// The character simulation advances its real state at this rate; host frames
/// in between are interpolation-only steps
pub const SIMULATION_TPS: u32 = 30;

/// Simulation update frames a ball interaction stays on cool-down, before
/// scaling by the interpolation factor
pub const BALL_INTERACTION_COOLDOWN_FRAMES: u64 = 10;

/// Host frames per simulation update frame for a given host target frame rate
pub fn interpolation_factor(target_fps: f32) -> u32 {
    let factor = (target_fps / SIMULATION_TPS as f32) as u32;
    factor.max(1)
}

/// Host ticks an instance must wait between two ball interactions
pub fn ball_cooldown_ticks(interpolation_factor: u32) -> u64 {
    BALL_INTERACTION_COOLDOWN_FRAMES * interpolation_factor as u64
}

/// Wall-clock stopwatch for load timings
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

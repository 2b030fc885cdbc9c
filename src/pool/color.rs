//! Team color slots
//!
//! The palette is split in two disjoint ranges, one per team. Only the
//! authoritative participant hands out indices; everyone else receives them
//! through the settings broadcast.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

/// Index into [`PALETTE`]
pub type ColorIndex = i32;

/// Wire value for "no color assigned"
pub const UNASSIGNED_COLOR: ColorIndex = -1;

/// Colors per team; indices below this belong to the first team's range
pub const TEAM_COLOR_POOL_SIZE: ColorIndex = 10;

pub const PALETTE_SIZE: usize = 2 * TEAM_COLOR_POOL_SIZE as usize;

/// Cap and shirt colors for one palette entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamColors {
    pub cap: [f32; 3],
    pub shirt: [f32; 3],
}

const fn colors(cap: [f32; 3], shirt: [f32; 3]) -> TeamColors {
    TeamColors { cap, shirt }
}

pub const PALETTE: [TeamColors; PALETTE_SIZE] = [
    // Team 0
    colors([0.00, 0.35, 1.00], [0.95, 0.95, 1.00]),
    colors([0.10, 0.60, 1.00], [0.00, 0.20, 0.60]),
    colors([0.00, 0.80, 0.90], [0.05, 0.25, 0.55]),
    colors([0.20, 0.20, 0.85], [0.60, 0.80, 1.00]),
    colors([0.00, 0.55, 0.55], [0.85, 0.95, 0.95]),
    colors([0.35, 0.45, 1.00], [0.10, 0.10, 0.35]),
    colors([0.00, 0.25, 0.50], [0.30, 0.70, 1.00]),
    colors([0.45, 0.75, 1.00], [0.00, 0.35, 0.70]),
    colors([0.10, 0.40, 0.75], [0.75, 0.75, 0.80]),
    colors([0.00, 0.65, 0.75], [0.00, 0.15, 0.30]),
    // Team 1
    colors([1.00, 0.45, 0.00], [1.00, 0.95, 0.90]),
    colors([1.00, 0.60, 0.10], [0.60, 0.20, 0.00]),
    colors([0.95, 0.30, 0.05], [1.00, 0.80, 0.40]),
    colors([1.00, 0.75, 0.00], [0.55, 0.25, 0.05]),
    colors([0.85, 0.35, 0.00], [0.95, 0.90, 0.80]),
    colors([1.00, 0.55, 0.35], [0.40, 0.10, 0.00]),
    colors([0.70, 0.25, 0.00], [1.00, 0.65, 0.20]),
    colors([1.00, 0.85, 0.30], [0.80, 0.35, 0.00]),
    colors([0.90, 0.50, 0.20], [0.80, 0.78, 0.75]),
    colors([1.00, 0.35, 0.20], [0.30, 0.10, 0.00]),
];

/// Palette entry for an index, None for unassigned or out of range
pub fn palette_entry(index: ColorIndex) -> Option<TeamColors> {
    usize::try_from(index)
        .ok()
        .and_then(|i| PALETTE.get(i).copied())
}

/// Which team range an index belongs to
pub fn team_of(index: ColorIndex) -> usize {
    if index < TEAM_COLOR_POOL_SIZE {
        0
    } else {
        1
    }
}

pub struct ColorPools {
    pools: Mutex<[VecDeque<ColorIndex>; 2]>,
}

impl ColorPools {
    pub fn new() -> Self {
        let first = (0..TEAM_COLOR_POOL_SIZE).collect();
        let second = (TEAM_COLOR_POOL_SIZE..2 * TEAM_COLOR_POOL_SIZE).collect();
        Self {
            pools: Mutex::new([first, second]),
        }
    }

    /// Pop the front index of the team's pool. An exhausted pool yields 0,
    /// which may duplicate an index already held.
    pub fn acquire(&self, team_index: i32) -> ColorIndex {
        let team = if team_index == 1 { 1 } else { 0 };
        let mut pools = self.pools.lock();
        match pools[team].pop_front() {
            Some(index) => index,
            None => {
                debug!(team, "Color pool exhausted, falling back to index 0");
                0
            }
        }
    }

    /// Return an index to the front of the pool its range belongs to
    pub fn release(&self, index: ColorIndex) {
        if palette_entry(index).is_none() {
            return;
        }
        let mut pools = self.pools.lock();
        let pool = &mut pools[team_of(index)];
        if !pool.contains(&index) {
            pool.push_front(index);
        }
    }

    pub fn available(&self, team: usize) -> usize {
        self.pools.lock().get(team).map(VecDeque::len).unwrap_or(0)
    }

    /// Copy of one team's free indices, front first
    pub fn snapshot(&self, team: usize) -> Vec<ColorIndex> {
        self.pools
            .lock()
            .get(team)
            .map(|pool| pool.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for ColorPools {
    fn default() -> Self {
        Self::new()
    }
}

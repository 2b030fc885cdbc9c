//! Replicated match-wide settings

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::engine::BoostConfig;
use crate::host::PlayerId;
use crate::pool::ColorIndex;

/// Players carried by one settings broadcast
pub const MAX_ROSTER: usize = 16;

/// Settings shared between callbacks. A leaf lock: never held while taking
/// the store or an instance lock.
pub type SharedSettings = Arc<Mutex<MatchSettings>>;

/// One player's replicated appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub color_index: ColorIndex,
    pub is_car_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchSettings {
    /// An avatar session is running in the current match
    pub session_active: bool,
    /// Countdown phase: avatars spawn but take no input
    pub pre_round: bool,
    /// Receivers should rejoin the host's match
    pub join_game: bool,
    pub boost: BoostConfig,
    pub roster: Vec<RosterEntry>,
}

impl MatchSettings {
    /// Replace the roster, keeping at most [`MAX_ROSTER`] entries
    pub fn set_roster(&mut self, entries: impl IntoIterator<Item = RosterEntry>) {
        self.roster = entries.into_iter().take(MAX_ROSTER).collect();
    }

    pub fn roster_entry(&self, player_id: PlayerId) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.player_id == player_id)
    }

    /// Back to the state of a freshly started plugin, keeping the boost setup
    pub fn reset(&mut self) {
        self.session_active = false;
        self.pre_round = false;
        self.join_game = false;
        self.roster.clear();
    }
}

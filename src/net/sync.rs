//! Replicating settings and avatar state between participants
//!
//! One participant is authoritative (the host). It alone assigns colors and
//! sends settings; every participant sends the state of its own avatar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::engine::BodyState;
use crate::game::settings::{MatchSettings, RosterEntry, SharedSettings};
use crate::game::store::InstanceStore;
use crate::host::PlayerId;
use crate::pool::UNASSIGNED_COLOR;

use super::protocol::{encode_settings, encode_state, NetMessage};
use super::transport::Transport;

/// What an incoming datagram did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Malformed, or not meant for this role
    Dropped,
    /// Our own state reflected back
    Echo,
    State(PlayerId),
    Settings { join_requested: bool },
}

pub struct NetworkSync {
    store: Arc<InstanceStore>,
    settings: SharedSettings,
    transport: Arc<dyn Transport>,
    is_host: AtomicBool,
}

impl NetworkSync {
    pub fn new(
        store: Arc<InstanceStore>,
        settings: SharedSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            settings,
            transport,
            is_host: AtomicBool::new(false),
        }
    }

    pub fn is_host(&self) -> bool {
        self.is_host.load(Ordering::Acquire)
    }

    pub fn set_host(&self, is_host: bool) {
        let was = self.is_host.swap(is_host, Ordering::AcqRel);
        if was != is_host {
            info!(is_host, "Network role changed");
        }
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Decode one datagram and apply it
    pub fn on_bytes(&self, bytes: &[u8]) -> Dispatch {
        match NetMessage::decode(bytes) {
            Ok(NetMessage::Settings(settings)) => self.apply_settings(settings),
            Ok(NetMessage::PlayerState { player_id, body }) => {
                self.apply_player_state(player_id, body)
            }
            Err(e) => {
                debug!(error = %e, "Dropped malformed datagram");
                Dispatch::Dropped
            }
        }
    }

    /// Overwrite local settings and push roster entries onto existing instances
    pub fn apply_settings(&self, received: MatchSettings) -> Dispatch {
        if self.is_host() {
            debug!("Ignoring settings broadcast while authoritative");
            return Dispatch::Dropped;
        }

        let join_requested = received.join_game;
        let roster = received.roster.clone();
        *self.settings.lock() = received;

        for entry in roster {
            let Some(instance) = self.store.get(entry.player_id) else {
                continue;
            };
            let mut instance = instance.lock();
            instance.color_index = (entry.color_index != UNASSIGNED_COLOR).then_some(entry.color_index);
            instance.is_car_mode = entry.is_car_mode;
        }

        trace!(join_requested, "Settings applied");
        Dispatch::Settings { join_requested }
    }

    /// Store a remote player's body state; the first one starts the session
    pub fn apply_player_state(&self, player_id: PlayerId, body: BodyState) -> Dispatch {
        if self.store.local_player() == Some(player_id) {
            return Dispatch::Echo;
        }

        let instance = self.store.get_or_create(player_id);
        instance.lock().body = body;

        let mut settings = self.settings.lock();
        if !settings.session_active {
            info!(player_id, "Avatar session started by remote state");
            settings.session_active = true;
        }
        Dispatch::State(player_id)
    }

    /// Every instance holding a color, ordered by player id
    pub fn roster_snapshot(&self) -> Vec<RosterEntry> {
        let mut roster = Vec::new();
        self.store.for_each(|instance| {
            if let Some(color_index) = instance.color_index {
                roster.push(RosterEntry {
                    player_id: instance.player_id,
                    color_index,
                    is_car_mode: instance.is_car_mode,
                });
            }
        });
        roster.sort_by_key(|entry| entry.player_id);
        roster
    }

    /// Send settings to everyone. Only the host does; returns whether it sent.
    pub fn broadcast_settings(&self) -> bool {
        self.send_settings(false)
    }

    /// Send settings carrying the join trigger, which is cleared again locally
    pub fn invite_to_join(&self) -> bool {
        self.send_settings(true)
    }

    fn send_settings(&self, join_game: bool) -> bool {
        if !self.is_host() {
            return false;
        }

        let roster = self.roster_snapshot();
        let bytes = {
            let mut settings = self.settings.lock();
            if settings.session_active {
                settings.set_roster(roster);
            }
            settings.join_game = join_game;
            let bytes = encode_settings(&settings);
            settings.join_game = false;
            bytes
        };

        debug!(join_game, "Broadcasting settings");
        self.transport.send_bytes(bytes);
        true
    }

    pub fn broadcast_state(&self, player_id: PlayerId, body: &BodyState) {
        self.transport.send_bytes(encode_state(player_id, body));
    }
}

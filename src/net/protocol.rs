//! Wire messages exchanged between participants
//!
//! Every datagram starts with a little-endian `i32` kind: `-1` for a
//! settings broadcast, otherwise the sender's player id followed by that
//! player's body state. Payloads are fixed size; anything else is rejected.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::engine::{BodyState, BoostConfig, BoostMode, SimState};
use crate::game::settings::{MatchSettings, RosterEntry, MAX_ROSTER};
use crate::host::PlayerId;
use crate::util::math::Vec3;

/// Kind tag of a settings broadcast
pub const SETTINGS_KIND: i32 = -1;

const KIND_LEN: usize = 4;
const ROSTER_ENTRY_LEN: usize = 4 + 4 + 1;
/// Flags, boost mode, boost velocity, roster count, fixed roster
pub const SETTINGS_PAYLOAD_LEN: usize = 3 + 1 + 1 + 1 + MAX_ROSTER * ROSTER_ENTRY_LEN;
/// Position, velocity, face angle, sound mask, two flags, action, animation, appearance
pub const STATE_PAYLOAD_LEN: usize = 12 + 12 + 4 + 4 + 1 + 1 + 4 + 2 + 2 + 4;

pub const SETTINGS_MESSAGE_LEN: usize = KIND_LEN + SETTINGS_PAYLOAD_LEN;
pub const STATE_MESSAGE_LEN: usize = KIND_LEN + STATE_PAYLOAD_LEN;

/// A decoded datagram
#[derive(Debug, Clone, PartialEq)]
pub enum NetMessage {
    /// Whole match settings, sent by the authoritative participant
    Settings(MatchSettings),
    /// One player's latest simulated body state
    PlayerState {
        player_id: PlayerId,
        body: BodyState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Datagram too short for a kind tag: {0} bytes")]
    TooShort(usize),

    #[error("Invalid message kind {0}")]
    InvalidKind(i32),

    #[error("Length {actual} does not match {expected} for kind {kind}")]
    LengthMismatch {
        kind: i32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid value for {0}")]
    InvalidField(&'static str),
}

impl NetMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < KIND_LEN {
            return Err(ProtocolError::TooShort(bytes.len()));
        }
        let mut buf = bytes;
        let kind = buf.get_i32_le();

        let expected = match kind {
            SETTINGS_KIND => SETTINGS_MESSAGE_LEN,
            k if k >= 0 => STATE_MESSAGE_LEN,
            k => return Err(ProtocolError::InvalidKind(k)),
        };
        if bytes.len() != expected {
            return Err(ProtocolError::LengthMismatch {
                kind,
                expected,
                actual: bytes.len(),
            });
        }

        if kind == SETTINGS_KIND {
            decode_settings(&mut buf).map(NetMessage::Settings)
        } else {
            Ok(NetMessage::PlayerState {
                player_id: kind,
                body: decode_body(&mut buf),
            })
        }
    }

    pub fn encode(&self) -> Bytes {
        match self {
            NetMessage::Settings(settings) => encode_settings(settings),
            NetMessage::PlayerState { player_id, body } => encode_state(*player_id, body),
        }
    }
}

pub fn encode_settings(settings: &MatchSettings) -> Bytes {
    let mut buf = BytesMut::with_capacity(SETTINGS_MESSAGE_LEN);
    buf.put_i32_le(SETTINGS_KIND);
    buf.put_u8(settings.session_active as u8);
    buf.put_u8(settings.pre_round as u8);
    buf.put_u8(settings.join_game as u8);
    buf.put_u8(settings.boost.mode as u8);
    buf.put_u8(settings.boost.velocity);

    let count = settings.roster.len().min(MAX_ROSTER);
    buf.put_u8(count as u8);
    for slot in 0..MAX_ROSTER {
        match settings.roster.get(slot).filter(|_| slot < count) {
            Some(entry) => {
                buf.put_i32_le(entry.player_id);
                buf.put_i32_le(entry.color_index);
                buf.put_u8(entry.is_car_mode as u8);
            }
            None => buf.put_bytes(0, ROSTER_ENTRY_LEN),
        }
    }
    buf.freeze()
}

pub fn encode_state(player_id: PlayerId, body: &BodyState) -> Bytes {
    let mut buf = BytesMut::with_capacity(STATE_MESSAGE_LEN);
    buf.put_i32_le(player_id);
    let state = &body.state;
    put_vec3(&mut buf, state.position);
    put_vec3(&mut buf, state.velocity);
    buf.put_f32_le(state.face_angle);
    buf.put_u32_le(state.sound_mask);
    buf.put_u8(state.is_update_frame as u8);
    buf.put_u8(state.is_attacked as u8);
    buf.put_u32_le(body.action);
    buf.put_i16_le(body.anim_id);
    buf.put_i16_le(body.anim_frame);
    buf.put_u32_le(body.appearance);
    buf.freeze()
}

fn decode_settings(buf: &mut &[u8]) -> Result<MatchSettings, ProtocolError> {
    let session_active = buf.get_u8() != 0;
    let pre_round = buf.get_u8() != 0;
    let join_game = buf.get_u8() != 0;
    let mode = BoostMode::from_u8(buf.get_u8()).ok_or(ProtocolError::InvalidField("boost mode"))?;
    let velocity = buf.get_u8();
    let count = buf.get_u8() as usize;
    if count > MAX_ROSTER {
        return Err(ProtocolError::InvalidField("roster count"));
    }

    let mut roster = Vec::with_capacity(count);
    for slot in 0..MAX_ROSTER {
        let entry = RosterEntry {
            player_id: buf.get_i32_le(),
            color_index: buf.get_i32_le(),
            is_car_mode: buf.get_u8() != 0,
        };
        if slot < count {
            roster.push(entry);
        }
    }

    Ok(MatchSettings {
        session_active,
        pre_round,
        join_game,
        boost: BoostConfig { mode, velocity },
        roster,
    })
}

fn decode_body(buf: &mut &[u8]) -> BodyState {
    let position = get_vec3(buf);
    let velocity = get_vec3(buf);
    let state = SimState {
        position,
        interpolated_position: position,
        velocity,
        face_angle: buf.get_f32_le(),
        sound_mask: buf.get_u32_le(),
        is_update_frame: buf.get_u8() != 0,
        is_attacked: buf.get_u8() != 0,
    };
    BodyState {
        state,
        action: buf.get_u32_le(),
        anim_id: buf.get_i16_le(),
        anim_frame: buf.get_i16_le(),
        appearance: buf.get_u32_le(),
    }
}

fn put_vec3(buf: &mut BytesMut, v: Vec3) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
    buf.put_f32_le(v.z);
}

fn get_vec3(buf: &mut &[u8]) -> Vec3 {
    Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le())
}

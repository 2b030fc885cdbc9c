//! Avatar interactions with the ball and with other avatars

use serde::{Deserialize, Serialize};

use crate::engine::action;
use crate::util::math::Vec3;

/// Boost left below which a vehicle counts as empty
pub const BOOST_EMPTY: f32 = 0.01;

/// Tunable interaction constants, loadable from a JSON file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionTuning {
    /// Boost removed from a vehicle whose avatar is hit
    pub attack_boost_damage: f32,
    /// Distance under which an attacking avatar hits another one
    pub attack_proximity: f32,
    pub ground_pound_ball_radius: f32,
    pub ground_pound_pinch_velocity: f32,
    pub attack_ball_radius: f32,
    pub kick_ball_vel_horiz: f32,
    pub kick_ball_vel_vert: f32,
    pub punch_ball_vel_horiz: f32,
    pub punch_ball_vel_vert: f32,
    pub dive_ball_vel_horiz: f32,
    pub dive_ball_vel_vert: f32,
    pub fly_ball_vel: f32,
}

impl Default for InteractionTuning {
    fn default() -> Self {
        Self {
            attack_boost_damage: 0.20,
            attack_proximity: 100.0,
            ground_pound_ball_radius: 200.0,
            ground_pound_pinch_velocity: 2708.0,
            attack_ball_radius: 261.0,
            kick_ball_vel_horiz: 583.0,
            kick_ball_vel_vert: 305.0,
            punch_ball_vel_horiz: 1388.0,
            punch_ball_vel_vert: 250.0,
            dive_ball_vel_horiz: 639.0,
            dive_ball_vel_vert: 166.6,
            fly_ball_vel: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallInteraction {
    GroundPoundPinch,
    Kick,
    Punch,
    Dive,
    Fly,
}

/// Velocity to add to the ball, if the avatar's current action touches it.
/// Positions are in host space.
pub fn ball_impulse(
    tuning: &InteractionTuning,
    avatar_action: u32,
    avatar: Vec3,
    ball: Vec3,
) -> Option<(BallInteraction, Vec3)> {
    let distance = avatar.distance(&ball);
    let dx = ball.x - avatar.x;
    let dy = ball.y - avatar.y;
    let angle = dy.atan2(dx);
    let horizontal = |magnitude: f32, vertical: f32| {
        Vec3::new(magnitude * angle.cos(), magnitude * angle.sin(), vertical)
    };
    let in_reach = distance < tuning.attack_ball_radius;

    if distance < tuning.ground_pound_ball_radius && avatar_action == action::GROUND_POUND_LAND {
        return Some((
            BallInteraction::GroundPoundPinch,
            horizontal(tuning.ground_pound_pinch_velocity, 0.0),
        ));
    }
    if !in_reach {
        return None;
    }

    match avatar_action {
        action::JUMP_KICK => Some((
            BallInteraction::Kick,
            horizontal(tuning.kick_ball_vel_horiz, tuning.kick_ball_vel_vert),
        )),
        action::MOVE_PUNCHING => Some((
            BallInteraction::Punch,
            horizontal(tuning.punch_ball_vel_horiz, tuning.punch_ball_vel_vert),
        )),
        action::DIVE | action::DIVE_SLIDE => Some((
            BallInteraction::Dive,
            horizontal(tuning.dive_ball_vel_horiz, tuning.dive_ball_vel_vert),
        )),
        action::FLYING => {
            let dz = ball.z - avatar.z;
            let z_factor = dz.atan2(dx).sin();
            let speed = tuning.fly_ball_vel;
            Some((
                BallInteraction::Fly,
                Vec3::new(
                    speed * angle.cos() * z_factor.abs(),
                    speed * angle.sin() * z_factor.abs(),
                    speed * z_factor,
                ),
            ))
        }
        _ => None,
    }
}

/// Boost left after an avatar hit, and whether the vehicle must be demolished
pub fn apply_attack_damage(boost: f32, damage: f32) -> (f32, bool) {
    let mut remaining = boost;
    if remaining >= BOOST_EMPTY {
        remaining = (remaining - damage).max(0.0);
    }
    (remaining, remaining < BOOST_EMPTY)
}

/// Whether another avatar at `other` hits one at `own` this frame
pub fn is_hit_by(tuning: &InteractionTuning, own: Vec3, other: Vec3, other_action: u32) -> bool {
    own.distance(&other) < tuning.attack_proximity && action::is_attacking(other_action)
}

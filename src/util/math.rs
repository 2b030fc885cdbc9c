//! Vector math and the coordinate bridge between host space and simulation space
//!
//! The host game is Z-up; the character simulation is Y-up. Crossing the
//! boundary swaps the vertical and depth axes, in both directions, everywhere.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Full turn of a host rotator axis as used by the vehicle yaw bridge
pub const YAW_RANGE: i32 = 64692;
/// Host yaw units per simulation face-angle radian
pub const YAW_SCALE: i32 = YAW_RANGE / 6;
/// Quarter-turn offset between the simulation's forward axis and the host's
pub const YAW_QUARTER_TURN: i32 = YAW_RANGE / 4;
/// Height of the vehicle origin above the avatar's feet
pub const CAR_OFFSET_Z: f32 = 45.0;

/// Host rotator units per half turn
const ROTATOR_HALF_TURN: f32 = 32768.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Host space -> simulation space
    pub fn to_sim(self) -> Self {
        Self::new(self.x, self.z, self.y)
    }

    /// Simulation space -> host space
    pub fn to_host(self) -> Self {
        Self::new(self.x, self.z, self.y)
    }

    /// Integer spawn coordinates for the simulation engine, already axis-swapped
    pub fn to_sim_spawn(self) -> [i16; 3] {
        self.to_sim().to_spawn_coords()
    }

    /// Integer coordinates of a sim-space position. Values beyond the i16
    /// range saturate at its bounds rather than wrapping around.
    pub fn to_spawn_coords(self) -> [i16; 3] {
        [self.x as i16, self.y as i16, self.z as i16]
    }

    /// Exact comparison against the origin, used as the "no output yet" sentinel
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Host rotator in integer axis units (65536 per full turn)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: i32,
    pub yaw: i32,
    pub roll: i32,
}

impl Rotator {
    pub const fn new(pitch: i32, yaw: i32, roll: i32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Unit forward vector, i.e. (1, 0, 0) rotated by this rotator
    pub fn forward(&self) -> Vec3 {
        let pitch = self.pitch as f32 * PI / ROTATOR_HALF_TURN;
        let yaw = self.yaw as f32 * PI / ROTATOR_HALF_TURN;
        Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin())
    }
}

/// Host yaw for a simulation face angle (radians)
pub fn yaw_from_face_angle(face_angle: f32) -> i32 {
    (-face_angle * YAW_SCALE as f32) as i32 + YAW_QUARTER_TURN
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_axis_swap_moves_vertical_to_depth() {
        let host = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(host.to_sim(), Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_spawn_coordinates_are_swapped_and_truncated() {
        let host = Vec3::new(100.7, -2000.2, 17.9);
        assert_eq!(host.to_sim_spawn(), [100, 17, -2000]);
    }

    #[test]
    fn test_out_of_range_spawn_saturates() {
        let far = Vec3::new(40_000.0, -40_000.0, 0.0);
        assert_eq!(far.to_spawn_coords(), [i16::MAX, i16::MIN, 0]);
    }

    #[test]
    fn test_yaw_for_zero_face_angle_is_quarter_turn() {
        assert_eq!(yaw_from_face_angle(0.0), YAW_QUARTER_TURN);
        assert_eq!(yaw_from_face_angle(1.0), YAW_QUARTER_TURN - YAW_SCALE);
    }

    #[test]
    fn test_forward_of_identity_rotator() {
        let f = Rotator::default().forward();
        assert!((f.x - 1.0).abs() < 1e-6);
        assert!(f.y.abs() < 1e-6);
        assert!(f.z.abs() < 1e-6);
    }

    #[test]
    fn test_origin_sentinel() {
        assert!(Vec3::ZERO.is_origin());
        assert!(!Vec3::new(0.0, 0.0, 0.01).is_origin());
    }

    proptest! {
        #[test]
        fn prop_axis_swap_round_trips_exactly(
            x in proptest::num::f32::ANY,
            y in proptest::num::f32::ANY,
            z in proptest::num::f32::ANY,
        ) {
            let v = Vec3::new(x, y, z);
            let back = v.to_sim().to_host();
            prop_assert_eq!(back.x.to_bits(), x.to_bits());
            prop_assert_eq!(back.y.to_bits(), y.to_bits());
            prop_assert_eq!(back.z.to_bits(), z.to_bits());
        }
    }
}

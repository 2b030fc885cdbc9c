//! Action tags reported by the engine that the overlay reacts to

/// Set on every action that can hurt another character
pub const FLAG_ATTACKING: u32 = 0x0080_0000;

pub const GROUND_POUND_LAND: u32 = 0x0080_023C;
pub const JUMP_KICK: u32 = 0x0180_08AC;
pub const MOVE_PUNCHING: u32 = 0x0080_0380;
pub const DIVE: u32 = 0x0188_088A;
pub const DIVE_SLIDE: u32 = 0x0088_0456;
pub const FLYING: u32 = 0x1088_0899;
pub const WALL_KICK_AIR: u32 = 0x0300_0886;

pub fn is_attacking(action: u32) -> bool {
    action & FLAG_ATTACKING != 0
}

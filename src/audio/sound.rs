//! Sound-mask bits reported by the engine and the clip table they map to

pub const YAH: u32 = 0x0000_0001;
pub const WAH: u32 = 0x0000_0002;
pub const HOO: u32 = 0x0000_0004;
pub const YAHOO: u32 = 0x0000_0008;
pub const HOOHOO: u32 = 0x0000_0010;
pub const PUNCH_YAH: u32 = 0x0000_0020;
pub const PUNCH_WAH: u32 = 0x0000_0040;
pub const PUNCH_HOO: u32 = 0x0000_0080;
pub const TERRAIN_STEP: u32 = 0x0000_0100;
pub const SPIN: u32 = 0x0000_0200;
pub const TERRAIN_HEAVY_LANDING: u32 = 0x0000_0400;
pub const GROUND_POUND_WAH: u32 = 0x0000_0800;
pub const SIDE_FLIP: u32 = 0x0000_1000;
pub const HAHA: u32 = 0x0000_2000;
pub const TERRAIN_LANDING: u32 = 0x0000_4000;
pub const TERRAIN_SLIDE: u32 = 0x0000_8000;
pub const BONK: u32 = 0x0001_0000;
pub const UH: u32 = 0x0002_0000;
pub const DOH: u32 = 0x0004_0000;
pub const OOOF: u32 = 0x0008_0000;
pub const BODY_HIT_GROUND: u32 = 0x0010_0000;
pub const ATTACKED: u32 = 0x0020_0000;

/// How a clip is played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    /// Character voice; a new one cuts off the previous one
    Voice,
    /// Fire and forget
    Effect,
    /// Plays for as long as its bit stays set
    Looping,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundDef {
    pub mask: u32,
    /// Path relative to the sound asset directory
    pub clip: &'static str,
    /// Relative playback speed; 0 picks a random speed per play
    pub playback_speed: f32,
    pub volume: f32,
    pub kind: SoundKind,
}

const fn voice(mask: u32, clip: &'static str, playback_speed: f32) -> SoundDef {
    SoundDef {
        mask,
        clip,
        playback_speed,
        volume: 1.0,
        kind: SoundKind::Voice,
    }
}

const fn effect(mask: u32, clip: &'static str, playback_speed: f32, volume: f32) -> SoundDef {
    SoundDef {
        mask,
        clip,
        playback_speed,
        volume,
        kind: SoundKind::Effect,
    }
}

/// Clip ids handed to the audio engine are indices into this table
pub const SOUND_TABLE: [SoundDef; 22] = [
    voice(YAH, "voice/02.wav", 0.91),
    voice(WAH, "voice/01.wav", 0.85),
    voice(HOO, "voice/00.wav", 1.08),
    voice(YAHOO, "voice/04.wav", 1.0),
    voice(HOOHOO, "voice_alt/01.wav", 1.0),
    voice(PUNCH_YAH, "voice/02.wav", 0.91),
    voice(PUNCH_WAH, "voice/01.wav", 0.85),
    voice(PUNCH_HOO, "voice_alt/09.wav", 1.05),
    effect(TERRAIN_STEP, "terrain/step_grass.wav", 0.0, 0.30),
    effect(SPIN, "action/twirl.wav", 1.14, 0.85),
    effect(TERRAIN_HEAVY_LANDING, "action/heavy_landing.wav", 1.13, 1.0),
    voice(GROUND_POUND_WAH, "voice/07.wav", 0.86),
    effect(SIDE_FLIP, "action/twirl.wav", 1.14, 1.0),
    voice(HAHA, "voice/03.wav", 1.0),
    effect(TERRAIN_LANDING, "terrain/land_grass.wav", 1.0, 0.30),
    SoundDef {
        mask: TERRAIN_SLIDE,
        clip: "terrain/slide.wav",
        playback_speed: 1.05,
        volume: 0.30,
        kind: SoundKind::Looping,
    },
    effect(BONK, "action/hand_touch.wav", 1.0, 0.10),
    voice(UH, "voice/05.wav", 1.0),
    voice(DOH, "voice/10.wav", 1.09),
    voice(OOOF, "voice/0B.wav", 1.0),
    effect(BODY_HIT_GROUND, "terrain/land_grass.wav", 1.0, 0.55),
    voice(ATTACKED, "voice/0A.wav", 1.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mask_bit_is_unique() {
        let mut seen = 0u32;
        for def in SOUND_TABLE.iter() {
            assert_eq!(def.mask.count_ones(), 1);
            assert_eq!(seen & def.mask, 0, "duplicate mask {:#x}", def.mask);
            seen |= def.mask;
        }
    }

    #[test]
    fn test_only_slide_loops() {
        let looping: Vec<_> = SOUND_TABLE
            .iter()
            .filter(|d| d.kind == SoundKind::Looping)
            .collect();
        assert_eq!(looping.len(), 1);
        assert_eq!(looping[0].mask, TERRAIN_SLIDE);
    }
}

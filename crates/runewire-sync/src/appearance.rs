//! Player appearance blocks and the per-slot replay cache.

use runewire_codec::{Buffer, decode_name, display_name, encode_name};
use rustc_hash::FxHashMap;

use crate::entity::IdleAnimations;
use crate::error::SyncError;

pub const EQUIPMENT_SLOTS: usize = 12;
pub const COLOR_SLOTS: usize = 5;

const NO_ANIMATION: u16 = u16::MAX;
const ITEM_OFFSET: u16 = 512;
const BODY_KIT_OFFSET: u16 = 256;

/// What an equipment slot shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Equipment {
    #[default]
    Empty,
    Item(u16),
    BodyKit(u16),
}

impl Equipment {
    fn decode(buf: &mut Buffer) -> Result<Self, SyncError> {
        let high = buf.read_u8()?;
        if high == 0 {
            return Ok(Self::Empty);
        }
        let value = u16::from_be_bytes([high, buf.read_u8()?]);
        Ok(match value {
            ITEM_OFFSET.. => Self::Item(value - ITEM_OFFSET),
            BODY_KIT_OFFSET.. => Self::BodyKit(value - BODY_KIT_OFFSET),
            _ => Self::Empty,
        })
    }

    fn encode(self, buf: &mut Buffer) {
        match self {
            Self::Empty => buf.write_u8(0),
            Self::Item(id) => buf.write_u16(id + ITEM_OFFSET),
            Self::BodyKit(id) => buf.write_u16(id + BODY_KIT_OFFSET),
        }
    }
}

/// A decoded appearance block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    pub gender: u8,
    pub head_icon: u8,
    pub equipment: [Equipment; EQUIPMENT_SLOTS],
    pub colors: [u8; COLOR_SLOTS],
    pub idle: IdleAnimations,
    /// Display-formatted name, if the packed name was valid.
    pub name: Option<String>,
    pub combat_level: u8,
    pub skill_total: u16,
}

impl Appearance {
    pub fn decode(buf: &mut Buffer) -> Result<Self, SyncError> {
        let gender = buf.read_u8()?;
        let head_icon = buf.read_u8()?;

        let mut equipment = [Equipment::Empty; EQUIPMENT_SLOTS];
        for slot in &mut equipment {
            *slot = Equipment::decode(buf)?;
        }

        let mut colors = [0u8; COLOR_SLOTS];
        for color in &mut colors {
            *color = buf.read_u8()?;
        }

        let mut read_anim = || -> Result<Option<u16>, SyncError> {
            let id = buf.read_u16()?;
            Ok((id != NO_ANIMATION).then_some(id))
        };
        let idle = IdleAnimations {
            stand: read_anim()?,
            stand_turn: read_anim()?,
            walk: read_anim()?,
            turn_180: read_anim()?,
            turn_90_cw: read_anim()?,
            turn_90_ccw: read_anim()?,
            run: read_anim()?,
        };

        let name = decode_name(buf.read_i64()?).map(|name| display_name(&name));
        let combat_level = buf.read_u8()?;
        let skill_total = buf.read_u16()?;

        Ok(Self {
            gender,
            head_icon,
            equipment,
            colors,
            idle,
            name,
            combat_level,
            skill_total,
        })
    }

    pub fn encode(&self, buf: &mut Buffer) {
        buf.write_u8(self.gender);
        buf.write_u8(self.head_icon);
        for slot in self.equipment {
            slot.encode(buf);
        }
        for color in self.colors {
            buf.write_u8(color);
        }
        let idle = self.idle;
        for anim in [
            idle.stand,
            idle.stand_turn,
            idle.walk,
            idle.turn_180,
            idle.turn_90_cw,
            idle.turn_90_ccw,
            idle.run,
        ] {
            buf.write_u16(anim.unwrap_or(NO_ANIMATION));
        }
        buf.write_i64(self.name.as_deref().map_or(0, encode_name));
        buf.write_u8(self.combat_level);
        buf.write_u16(self.skill_total);
    }
}

/// Raw appearance blocks keyed by player slot.
///
/// Blocks outlive the entity that sent them so a player re-admitted without
/// an appearance update can replay the last one seen for its slot.
#[derive(Debug, Clone, Default)]
pub struct AppearanceCache {
    blocks: FxHashMap<u16, Vec<u8>>,
}

impl AppearanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: u16, block: Vec<u8>) {
        self.blocks.insert(slot, block);
    }

    pub fn get(&self, slot: u16) -> Option<&[u8]> {
        self.blocks.get(&slot).map(Vec::as_slice)
    }

    /// Decodes the cached block for `slot`.
    pub fn replay(&self, slot: u16) -> Option<Result<Appearance, SyncError>> {
        let block = self.get(slot)?;
        Some(Appearance::decode(&mut Buffer::wrap(block.to_vec())))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

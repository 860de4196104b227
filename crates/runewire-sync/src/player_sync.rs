//! Player sync frame: local movement, the other-player roster, and player
//! update masks.

use runewire_codec::{Buffer, STRING_TERMINATOR};
use tracing::{debug, trace};

use crate::appearance::Appearance;
use crate::chat::{ChatKind, ChatMessage};
use crate::descriptor::DescriptorLookup;
use crate::entity::{EntityRef, Facing, ForcedMovement, Player, Tile};
use crate::error::SyncError;
use crate::roster::LOCAL_PLAYER_INDEX;
use crate::sync::{
    self, AdmissionLayout, MOVE_NONE, MOVE_RUN, MOVE_WALK, SyncPass, read_direction, read_flag,
};
use crate::world::{EntityKind, WorldEvent, WorldState};

const LAYOUT: AdmissionLayout = AdmissionLayout {
    index_bits: 11,
    sentinel: LOCAL_PLAYER_INDEX as u32,
    descriptor_bits: None,
};

// Update mask bits.
pub const MASK_FACE_ENTITY: u16 = 0x1;
pub const MASK_FACE_TILE: u16 = 0x2;
pub const MASK_FORCED_CHAT: u16 = 0x4;
pub const MASK_ANIMATION: u16 = 0x8;
pub const MASK_APPEARANCE: u16 = 0x10;
pub const MASK_HIT: u16 = 0x20;
pub const MASK_EXTENDED: u16 = 0x40;
pub const MASK_CHAT: u16 = 0x80;
pub const MASK_SPOT: u16 = 0x100;
pub const MASK_HIT_2: u16 = 0x200;
pub const MASK_FORCED_MOVEMENT: u16 = 0x400;

const BROADCAST_PREFIX: char = '~';

/// Applies a player sync payload to `world`.
pub fn decode(
    buf: &mut Buffer,
    world: &mut WorldState,
    descriptors: &dyn DescriptorLookup,
) -> Result<(), SyncError> {
    let expected = buf.len();
    buf.set_position(0);
    buf.begin_bit_access();

    let local_masked = read_local_movement(buf, world)?;
    let (mut pass, count) = SyncPass::begin(EntityKind::Player, buf, &mut world.players)?;
    if local_masked {
        pass.masked.push(LOCAL_PLAYER_INDEX);
    }

    let outcome = decode_body(buf, world, descriptors, &mut pass, count, expected);
    pass.finish(
        &mut world.players,
        &mut world.events,
        outcome,
        buf.position(),
        expected,
    )
}

fn decode_body(
    buf: &mut Buffer,
    world: &mut WorldState,
    descriptors: &dyn DescriptorLookup,
    pass: &mut SyncPass,
    count: usize,
    payload_len: usize,
) -> Result<(), SyncError> {
    pass.read_existing(buf, &mut world.players, count)?;

    let origin = world.local_tile();
    while let Some(admission) = pass.read_admission(buf, LAYOUT, payload_len)? {
        let index = admission.index;
        let replayed = world.appearances.replay(index).transpose()?;
        let (player, created) = pass.admit(&mut world.players, &admission)?;
        if let Some(appearance) = replayed {
            apply_appearance(player, appearance);
        }
        player.mobile.teleport(
            origin.x + admission.dx,
            origin.y + admission.dy,
            admission.discard_queue,
        );
        trace!(index, created, "player admitted");
    }
    buf.end_bit_access();

    let tick = world.tick();
    for index in std::mem::take(&mut pass.masked) {
        read_mask_block(buf, world, descriptors, index, tick)?;
    }
    Ok(())
}

/// Phase 0. Returns whether the local player has a mask block.
fn read_local_movement(buf: &mut Buffer, world: &mut WorldState) -> Result<bool, SyncError> {
    if !read_flag(buf)? {
        return Ok(false);
    }
    let move_type = buf.read_bits(2)?;
    let mut plane = None;
    let local = world
        .local_player_mut()
        .ok_or(SyncError::EmptyTrackedSlot(LOCAL_PLAYER_INDEX))?;
    let masked = match move_type {
        MOVE_NONE => true,
        MOVE_WALK => {
            local.mobile.step(read_direction(buf)?, false);
            read_flag(buf)?
        }
        MOVE_RUN => {
            local.mobile.step(read_direction(buf)?, true);
            local.mobile.step(read_direction(buf)?, true);
            read_flag(buf)?
        }
        _ => {
            plane = Some(buf.read_bits(2)? as u8);
            let discard_queue = read_flag(buf)?;
            let masked = read_flag(buf)?;
            let y = buf.read_bits(7)? as i32;
            let x = buf.read_bits(7)? as i32;
            local.mobile.teleport(x, y, discard_queue);
            masked
        }
    };
    local.mobile.updated = true;
    if let Some(plane) = plane {
        debug!(plane, tile = ?local.mobile.head(), "local player placed");
        world.plane = plane;
    }
    Ok(masked)
}

fn apply_appearance(player: &mut Player, appearance: Appearance) {
    player.name = appearance.name;
    player.combat_level = appearance.combat_level;
    player.skill_total = appearance.skill_total;
    player.head_icon = appearance.head_icon;
    player.mobile.idle = appearance.idle;
}

/// Phase 3 block for one player.
fn read_mask_block(
    buf: &mut Buffer,
    world: &mut WorldState,
    descriptors: &dyn DescriptorLookup,
    index: u16,
    tick: u64,
) -> Result<(), SyncError> {
    let mut mask = u16::from(buf.read_u8()?);
    if mask & MASK_EXTENDED != 0 {
        mask |= u16::from(buf.read_u8()?) << 8;
    }
    trace!(index, mask, "player mask");

    let Some(player) = world.players.get_mut(index) else {
        return Err(SyncError::EmptyTrackedSlot(index));
    };

    if mask & MASK_FORCED_MOVEMENT != 0 {
        let start = Tile::new(i32::from(buf.read_u8_sub()?), i32::from(buf.read_u8_sub()?));
        let end = Tile::new(i32::from(buf.read_u8_sub()?), i32::from(buf.read_u8_sub()?));
        player.mobile.forced_movement = Some(ForcedMovement {
            start,
            end,
            start_delay: buf.read_u16_le_add()?,
            end_delay: buf.read_u16_add()?,
            direction: buf.read_u8_sub()?,
        });
    }
    if mask & MASK_SPOT != 0 {
        let id = buf.read_u16_le()?;
        let packed = buf.read_i32()?;
        sync::play_spot(&mut player.mobile, id, packed, tick);
    }
    if mask & MASK_ANIMATION != 0 {
        let id = buf.read_u16_le()?;
        let delay = buf.read_u8_neg()?;
        sync::play_animation(&mut player.mobile, id, delay, tick, descriptors);
    }
    if mask & MASK_FORCED_CHAT != 0 {
        let text = buf.read_string(STRING_TERMINATOR)?;
        player.mobile.say(text, 0, 0);
    }

    let mut chat = None;
    if mask & MASK_CHAT != 0 {
        let style = buf.read_u16_le()?;
        let rights = buf.read_u8()?;
        let length = buf.read_u8_neg()?;
        let bytes = buf.read_bytes(usize::from(length))?;
        let raw: String = bytes.iter().map(|&b| char::from(b)).collect();
        let (kind, text) = match raw.strip_prefix(BROADCAST_PREFIX) {
            Some(rest) => (ChatKind::Broadcast, rest.to_string()),
            None => (ChatKind::Public, raw.clone()),
        };
        let (effect, color) = ((style >> 8) as u8, (style & 0xFF) as u8);
        player.mobile.say(text.clone(), color, effect);
        chat = Some((kind, rights, text));
    }
    if mask & MASK_FACE_ENTITY != 0 {
        player.mobile.facing = EntityRef::from_wire(buf.read_u16_le()?).map(Facing::Entity);
    }

    let mut appearance_changed = false;
    if mask & MASK_APPEARANCE != 0 {
        let length = buf.read_u8_neg()?;
        let block = buf.read_bytes(usize::from(length))?;
        let appearance = Appearance::decode(&mut Buffer::wrap(block.clone()))?;
        apply_appearance(player, appearance);
        world.appearances.insert(index, block);
        appearance_changed = true;
    }
    if mask & MASK_FACE_TILE != 0 {
        let x = buf.read_u16_le_add()?;
        let y = buf.read_u16_le()?;
        player.mobile.facing = Some(Facing::Tile { x, y });
    }
    if mask & MASK_HIT != 0 {
        let damage = buf.read_u8()?;
        let kind = buf.read_u8_add()?;
        let current = buf.read_u8_neg()?;
        let max = buf.read_u8()?;
        sync::apply_hit(&mut player.mobile, damage, kind, current, max, tick);
    }
    if mask & MASK_HIT_2 != 0 {
        let damage = buf.read_u8()?;
        let kind = buf.read_u8_sub()?;
        let current = buf.read_u8()?;
        let max = buf.read_u8_neg()?;
        sync::apply_hit(&mut player.mobile, damage, kind, current, max, tick);
    }

    let sender = player.name.clone().unwrap_or_default();
    if appearance_changed {
        world.push_event(WorldEvent::AppearanceChanged { index });
    }
    if let Some((kind, rights, text)) = chat {
        let sender = if rights > 0 {
            format!("@cr{rights}@{sender}")
        } else {
            sender
        };
        world.chat.push(ChatMessage {
            kind,
            sender: Some(sender),
            text,
            tick,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "player_sync_tests.rs"]
mod tests;

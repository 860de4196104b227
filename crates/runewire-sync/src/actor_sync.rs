//! Actor sync frame: the actor roster and actor update masks.

use runewire_codec::{Buffer, STRING_TERMINATOR};
use tracing::trace;

use crate::descriptor::DescriptorLookup;
use crate::entity::{Actor, EntityRef, Facing};
use crate::error::SyncError;
use crate::sync::{self, AdmissionLayout, SyncPass};
use crate::world::{EntityKind, WorldState};

const LAYOUT: AdmissionLayout = AdmissionLayout {
    index_bits: 14,
    sentinel: 16383,
    descriptor_bits: Some(18),
};

// Update mask bits.
pub const MASK_FORCED_CHAT: u8 = 0x1;
pub const MASK_TRANSFORM: u8 = 0x2;
pub const MASK_FACE_TILE: u8 = 0x4;
pub const MASK_HIT: u8 = 0x8;
pub const MASK_ANIMATION: u8 = 0x10;
pub const MASK_FACE_ENTITY: u8 = 0x20;
pub const MASK_HIT_2: u8 = 0x40;
pub const MASK_SPOT: u8 = 0x80;

/// Applies an actor sync payload to `world`.
pub fn decode(
    buf: &mut Buffer,
    world: &mut WorldState,
    descriptors: &dyn DescriptorLookup,
) -> Result<(), SyncError> {
    let expected = buf.len();
    buf.set_position(0);
    buf.begin_bit_access();

    let (mut pass, count) = SyncPass::begin(EntityKind::Actor, buf, &mut world.actors)?;
    let outcome = decode_body(buf, world, descriptors, &mut pass, count, expected);
    pass.finish(
        &mut world.actors,
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
    pass.read_existing(buf, &mut world.actors, count)?;

    let origin = world.local_tile();
    while let Some(admission) = pass.read_admission(buf, LAYOUT, payload_len)? {
        let (actor, created) = pass.admit(&mut world.actors, &admission)?;
        if let Some(descriptor) = admission.descriptor {
            transform(actor, descriptor, descriptors);
        }
        actor.mobile.teleport(
            origin.x + admission.dx,
            origin.y + admission.dy,
            admission.discard_queue,
        );
        trace!(
            index = admission.index,
            descriptor = actor.descriptor,
            created,
            "actor admitted"
        );
    }
    buf.end_bit_access();

    let tick = world.tick();
    for index in std::mem::take(&mut pass.masked) {
        let actor = world
            .actors
            .get_mut(index)
            .ok_or(SyncError::EmptyTrackedSlot(index))?;
        read_mask_block(buf, actor, descriptors, index, tick)?;
    }
    Ok(())
}

/// Switches an actor to another descriptor, taking its footprint and idle
/// animations when the descriptor is known.
fn transform(actor: &mut Actor, id: u32, descriptors: &dyn DescriptorLookup) {
    actor.descriptor = id;
    if let Some(descriptor) = descriptors.actor(id) {
        actor.mobile.size = i32::from(descriptor.size.max(1));
        actor.mobile.idle = descriptor.idle;
    }
}

/// Phase 3 block for one actor.
fn read_mask_block(
    buf: &mut Buffer,
    actor: &mut Actor,
    descriptors: &dyn DescriptorLookup,
    index: u16,
    tick: u64,
) -> Result<(), SyncError> {
    let mask = buf.read_u8()?;
    trace!(index, mask, "actor mask");

    if mask & MASK_ANIMATION != 0 {
        let id = buf.read_u16_le()?;
        let delay = buf.read_u8()?;
        sync::play_animation(&mut actor.mobile, id, delay, tick, descriptors);
    }
    if mask & MASK_HIT != 0 {
        let damage = buf.read_u8_add()?;
        let kind = buf.read_u8_neg()?;
        let current = buf.read_u8_add()?;
        let max = buf.read_u8_neg()?;
        sync::apply_hit(&mut actor.mobile, damage, kind, current, max, tick);
    }
    if mask & MASK_SPOT != 0 {
        let id = buf.read_u16()?;
        let packed = buf.read_i32()?;
        sync::play_spot(&mut actor.mobile, id, packed, tick);
    }
    if mask & MASK_FACE_ENTITY != 0 {
        actor.mobile.facing = EntityRef::from_wire(buf.read_u16()?).map(Facing::Entity);
    }
    if mask & MASK_FORCED_CHAT != 0 {
        let text = buf.read_string(STRING_TERMINATOR)?;
        actor.mobile.say(text, 0, 0);
    }
    if mask & MASK_HIT_2 != 0 {
        let damage = buf.read_u8_neg()?;
        let kind = buf.read_u8_sub()?;
        let current = buf.read_u8_neg()?;
        let max = buf.read_u8()?;
        sync::apply_hit(&mut actor.mobile, damage, kind, current, max, tick);
    }
    if mask & MASK_TRANSFORM != 0 {
        let id = buf.read_u16_le_add()?;
        transform(actor, u32::from(id), descriptors);
    }
    if mask & MASK_FACE_TILE != 0 {
        let x = buf.read_u16_le()?;
        let y = buf.read_u16_le()?;
        actor.mobile.facing = Some(Facing::Tile { x, y });
    }
    Ok(())
}

#[cfg(test)]
#[path = "actor_sync_tests.rs"]
mod tests;

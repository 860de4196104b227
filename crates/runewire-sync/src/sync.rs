//! Machinery shared by the player and actor sync decoders.
//!
//! Both frames have the same three-phase body over a [`Roster`]:
//!
//! 1. existing entities, in tracked order: stay, move, or drop out;
//! 2. admissions, until a sentinel index or the bits run out;
//! 3. mask-driven field updates for every entity queued by 1 and 2.
//!
//! A [`SyncPass`] carries the bookkeeping between phases and rebuilds the
//! tracked list when the pass ends, whether or not decoding succeeded.

use std::collections::VecDeque;

use runewire_codec::Buffer;
use tracing::trace;

use crate::descriptor::DescriptorLookup;
use crate::entity::{Animation, Direction, Entity, Mobile, SpotAnimation};
use crate::error::SyncError;
use crate::roster::Roster;
use crate::world::{EntityKind, WorldEvent};

pub(crate) const MOVE_NONE: u32 = 0;
pub(crate) const MOVE_WALK: u32 = 1;
pub(crate) const MOVE_RUN: u32 = 2;

const COUNT_BITS: u32 = 8;
const OFFSET_BITS: u32 = 5;
const NO_SEQUENCE: u16 = u16::MAX;

/// Reads a 3-bit direction.
pub(crate) fn read_direction(buf: &mut Buffer) -> Result<Direction, SyncError> {
    Ok(Direction::from_bits(buf.read_bits(3)?))
}

pub(crate) fn read_flag(buf: &mut Buffer) -> Result<bool, SyncError> {
    Ok(buf.read_bits(1)? == 1)
}

/// Reads a 5-bit two's-complement tile offset.
fn read_offset(buf: &mut Buffer) -> Result<i32, SyncError> {
    let raw = buf.read_bits(OFFSET_BITS)? as i32;
    Ok(if raw > 15 { raw - 32 } else { raw })
}

/// Wire shape of the admission records of one roster.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdmissionLayout {
    pub index_bits: u32,
    pub sentinel: u32,
    pub descriptor_bits: Option<u32>,
}

/// One phase-2 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Admission {
    pub index: u16,
    pub dx: i32,
    pub dy: i32,
    pub discard_queue: bool,
    pub descriptor: Option<u32>,
    pub masked: bool,
}

/// Bookkeeping for one sync frame over one roster.
#[derive(Debug)]
pub(crate) struct SyncPass {
    kind: EntityKind,
    previous: Vec<u16>,
    next: Vec<u16>,
    /// Indices queued for phase 3, in queue order.
    pub masked: Vec<u16>,
    events: Vec<WorldEvent>,
}

impl SyncPass {
    /// Reads the phase-1 count and opens a pass over `roster`.
    ///
    /// A count above the tracked length is rejected before anything is
    /// touched.
    pub fn begin<T: Entity>(
        kind: EntityKind,
        buf: &mut Buffer,
        roster: &mut Roster<T>,
    ) -> Result<(Self, usize), SyncError> {
        let count = buf.read_bits(COUNT_BITS)? as usize;
        let previous = roster.tracked().to_vec();
        if count > previous.len() {
            return Err(SyncError::RosterGrew {
                previous: previous.len(),
                count,
            });
        }

        for &index in &previous {
            if let Some(entity) = roster.get_mut(index) {
                entity.mobile_mut().updated = false;
            }
        }
        let pass = Self {
            kind,
            next: Vec::with_capacity(previous.len()),
            previous,
            masked: Vec::new(),
            events: Vec::new(),
        };
        Ok((pass, count))
    }

    /// Phase 1: movement of the first `count` tracked entities. Entities
    /// past `count`, and those given move type 3, are left un-updated and
    /// fall to the end-of-pass sweep.
    pub fn read_existing<T: Entity>(
        &mut self,
        buf: &mut Buffer,
        roster: &mut Roster<T>,
        count: usize,
    ) -> Result<(), SyncError> {
        for position in 0..count {
            let index = self.previous[position];
            let entity = roster
                .get_mut(index)
                .ok_or(SyncError::EmptyTrackedSlot(index))?;
            let mobile = entity.mobile_mut();

            if read_flag(buf)? {
                mobile.updated = true;
                self.next.push(index);
                continue;
            }

            let masked = match buf.read_bits(2)? {
                MOVE_NONE => true,
                MOVE_WALK => {
                    mobile.step(read_direction(buf)?, false);
                    read_flag(buf)?
                }
                MOVE_RUN => {
                    mobile.step(read_direction(buf)?, true);
                    mobile.step(read_direction(buf)?, true);
                    read_flag(buf)?
                }
                // Type 3: left for the end-of-pass sweep.
                _ => {
                    trace!(kind = ?self.kind, index, "dropped by move type");
                    continue;
                }
            };
            mobile.updated = true;
            self.next.push(index);
            if masked {
                self.masked.push(index);
            }
        }
        Ok(())
    }

    /// Phase 2: reads the next admission record, or `None` at the sentinel
    /// or when fewer than one index width of bits remain.
    pub fn read_admission(
        &self,
        buf: &mut Buffer,
        layout: AdmissionLayout,
        payload_len: usize,
    ) -> Result<Option<Admission>, SyncError> {
        if buf.bit_position() + layout.index_bits as usize > payload_len * 8 {
            return Ok(None);
        }
        let index = buf.read_bits(layout.index_bits)?;
        if index == layout.sentinel {
            return Ok(None);
        }
        let dy = read_offset(buf)?;
        let dx = read_offset(buf)?;
        let discard_queue = read_flag(buf)?;
        let descriptor = layout
            .descriptor_bits
            .map(|bits| buf.read_bits(bits))
            .transpose()?;
        let masked = read_flag(buf)?;
        let index = u16::try_from(index).map_err(|_| SyncError::IndexOutOfRange(index))?;
        Ok(Some(Admission {
            index,
            dx,
            dy,
            discard_queue,
            descriptor,
            masked,
        }))
    }

    /// Allocates and tracks an admitted entity. The returned flag is `true`
    /// when the slot was empty.
    pub fn admit<'r, T: Entity + Default>(
        &mut self,
        roster: &'r mut Roster<T>,
        admission: &Admission,
    ) -> Result<(&'r mut T, bool), SyncError> {
        let index = admission.index;
        if self.next.contains(&index) {
            return Err(SyncError::DuplicateAdmission(index));
        }
        let (entity, created) = roster.get_or_insert(index)?;
        if created {
            self.events.push(WorldEvent::Spawned {
                kind: self.kind,
                index,
            });
        }
        entity.mobile_mut().updated = true;
        self.next.push(index);
        if admission.masked {
            self.masked.push(index);
        }
        Ok((entity, created))
    }

    /// Ends the pass: despawns every previously tracked entity that was not
    /// updated, installs the new tracked list, then checks consistency.
    ///
    /// `outcome` is the result of phases 1 to 3; an error there is returned
    /// after reconciliation and skips the checks.
    pub fn finish<T: Entity>(
        self,
        roster: &mut Roster<T>,
        events: &mut VecDeque<WorldEvent>,
        outcome: Result<(), SyncError>,
        consumed: usize,
        expected: usize,
    ) -> Result<(), SyncError> {
        let Self {
            kind,
            previous,
            next,
            events: mut pending,
            ..
        } = self;

        for index in previous {
            let updated = roster
                .get(index)
                .is_some_and(|entity| entity.mobile().updated);
            if !updated && roster.remove(index).is_some() {
                trace!(?kind, index, "despawned");
                pending.push(WorldEvent::Despawned { kind, index });
            }
        }
        roster.set_tracked(next);
        events.extend(pending);

        outcome?;
        if consumed != expected {
            return Err(SyncError::LengthMismatch { consumed, expected });
        }
        if let Some(&index) = roster
            .tracked()
            .iter()
            .find(|&&index| !roster.contains(index))
        {
            return Err(SyncError::EmptyTrackedSlot(index));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Phase 3 helpers
// ---------------------------------------------------------------------------

/// Requests an animation, applying the interrupt rules.
///
/// `65535` stops the current animation. Repeating the playing sequence
/// restarts it only if the sequence allows it or it already finished. A
/// different sequence replaces the current one if that one is finished or
/// the new priority is at least the current priority.
pub(crate) fn play_animation(
    mobile: &mut Mobile,
    id: u16,
    delay: u8,
    tick: u64,
    descriptors: &dyn DescriptorLookup,
) {
    if id == NO_SEQUENCE {
        mobile.animation = None;
        return;
    }
    let requested = descriptors.sequence(id).copied().unwrap_or_default();
    let replace = match mobile.animation {
        None => true,
        Some(current) => {
            let playing = descriptors
                .sequence(current.id)
                .copied()
                .unwrap_or_default();
            let finished = tick
                >= current.start_tick
                    + u64::from(current.delay)
                    + u64::from(playing.duration_ticks);
            if current.id == id {
                requested.restart_on_repeat || finished
            } else {
                finished || requested.priority >= playing.priority
            }
        }
    };
    if replace {
        mobile.animation = Some(Animation {
            id,
            delay,
            start_tick: tick,
        });
    }
}

/// Spot animation with its height and delay packed into one int.
pub(crate) fn play_spot(mobile: &mut Mobile, id: u16, packed: i32, tick: u64) {
    if id == NO_SEQUENCE {
        mobile.spot = None;
        return;
    }
    let packed = packed as u32;
    mobile.spot = Some(SpotAnimation {
        id,
        height: (packed >> 16) as u16,
        delay: (packed & 0xFFFF) as u16,
        start_tick: tick,
    });
}

pub(crate) fn apply_hit(
    mobile: &mut Mobile,
    damage: u8,
    kind: u8,
    current: u8,
    max: u8,
    tick: u64,
) {
    mobile.add_hit(damage, kind, tick);
    mobile.set_health(current, max, tick);
}

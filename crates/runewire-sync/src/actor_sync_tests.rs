//! Unit tests for actor sync decoding.

use super::*;
use crate::descriptor::{ActorDescriptor, DescriptorTable, SequenceDescriptor};
use crate::entity::{IdleAnimations, Tile};
use crate::test_support::{ACTOR_SENTINEL, SyncWriter};
use crate::world::WorldEvent;

/// World with the local player standing on `(50, 50)`.
fn world_at_50_50() -> WorldState {
    let mut world = WorldState::new();
    world
        .local_player_mut()
        .unwrap()
        .mobile
        .teleport(50, 50, true);
    world
}

fn admit_three(world: &mut WorldState, table: &DescriptorTable) {
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(1, 1, 0, true, 10, false)
        .actor_admission(2, 2, 0, true, 10, false)
        .actor_admission(3, 3, 0, true, 10, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, world, table).unwrap();
}

#[test]
fn test_admission_relative_to_local_player() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(5, 2, -3, false, 1234, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();

    let actor = world.actors.get(5).unwrap();
    assert_eq!(actor.mobile.head(), Tile::new(52, 47));
    assert_eq!(actor.descriptor, 1234);
    assert_eq!(world.actors.tracked(), &[5]);
    assert_eq!(
        world.drain_events().collect::<Vec<_>>(),
        vec![WorldEvent::Spawned {
            kind: EntityKind::Actor,
            index: 5
        }]
    );
}

#[test]
fn test_admission_applies_descriptor() {
    let mut world = world_at_50_50();
    let mut table = DescriptorTable::new();
    table.insert_actor(
        77,
        ActorDescriptor {
            name: "Giant".into(),
            size: 2,
            combat_level: 28,
            idle: IdleAnimations {
                stand: Some(4650),
                ..IdleAnimations::default()
            },
        },
    );
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(9, 0, 1, true, 77, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();

    let actor = world.actors.get(9).unwrap();
    assert_eq!(actor.mobile.size, 2);
    assert_eq!(actor.mobile.idle.stand, Some(4650));
    assert_eq!(actor.mobile.fine_x, 50 * 128 + 128);
}

#[test]
fn test_sentinel_less_frame_stops_at_guard() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    // 52 bits pad to 7 bytes, leaving 4 spare bits: less than one index.
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(4, 0, 0, true, 1, false)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();
    assert_eq!(world.actors.tracked(), &[4]);
}

#[test]
fn test_roster_surplus_removed_then_growth_rejected() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    admit_three(&mut world, &table);
    assert_eq!(world.actors.tracked(), &[1, 2, 3]);
    world.drain_events().for_each(drop);

    let mut buf = SyncWriter::new()
        .bits(8, 3)
        .stay()
        .stay()
        .stay()
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();
    assert_eq!(world.actors.tracked(), &[1, 2, 3]);

    let mut buf = SyncWriter::new()
        .bits(8, 1)
        .stay()
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();
    assert_eq!(world.actors.tracked(), &[1]);
    assert!(world.actors.get(2).is_none());
    assert!(world.actors.get(3).is_none());
    assert_eq!(
        world.drain_events().collect::<Vec<_>>(),
        vec![
            WorldEvent::Despawned {
                kind: EntityKind::Actor,
                index: 2
            },
            WorldEvent::Despawned {
                kind: EntityKind::Actor,
                index: 3
            },
        ]
    );

    let mut buf = SyncWriter::new()
        .bits(8, 4)
        .stay()
        .bits(14, ACTOR_SENTINEL)
        .finish();
    assert_eq!(
        decode(&mut buf, &mut world, &table),
        Err(SyncError::RosterGrew {
            previous: 1,
            count: 4
        })
    );
    assert_eq!(world.actors.tracked(), &[1]);
    assert!(world.actors.get(1).is_some());
}

#[test]
fn test_movement_and_lazy_eviction() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    admit_three(&mut world, &table);

    // East walk, north-west then north run, and a type-3 drop.
    let mut buf = SyncWriter::new()
        .bits(8, 3)
        .walk(4, false)
        .run(0, 1, false)
        .evict()
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();

    let walker = world.actors.get(1).unwrap();
    assert_eq!(walker.mobile.head(), Tile::new(52, 50));
    let runner = world.actors.get(2).unwrap();
    assert_eq!(runner.mobile.head(), Tile::new(51, 52));
    assert_eq!(runner.mobile.path_len, 3);
    assert!(runner.mobile.path_run[0]);
    assert!(world.actors.get(3).is_none());
    assert_eq!(world.actors.tracked(), &[1, 2]);
}

#[test]
fn test_readmission_after_eviction_in_same_pass() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    admit_three(&mut world, &table);

    let mut buf = SyncWriter::new()
        .bits(8, 3)
        .stay()
        .stay()
        .evict()
        .actor_admission(3, -4, -4, true, 11, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();
    let actor = world.actors.get(3).unwrap();
    assert_eq!(actor.mobile.head(), Tile::new(46, 46));
    assert_eq!(actor.descriptor, 11);
    assert_eq!(world.actors.tracked(), &[1, 2, 3]);
}

#[test]
fn test_duplicate_admission_is_violation() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    admit_three(&mut world, &table);

    let mut buf = SyncWriter::new()
        .bits(8, 3)
        .stay()
        .stay()
        .stay()
        .actor_admission(2, 0, 0, true, 10, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    assert_eq!(
        decode(&mut buf, &mut world, &table),
        Err(SyncError::DuplicateAdmission(2))
    );
    // The pass still reconciles what it decoded.
    assert_eq!(world.actors.tracked(), &[1, 2, 3]);
}

#[test]
fn test_trailing_bytes_are_length_mismatch() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .bits(14, ACTOR_SENTINEL)
        .bytes(|b| b.write_u8(0xAB))
        .finish();
    assert_eq!(
        decode(&mut buf, &mut world, &table),
        Err(SyncError::LengthMismatch {
            consumed: 3,
            expected: 4
        })
    );
}

#[test]
fn test_truncated_mask_block_still_reconciles() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    admit_three(&mut world, &table);

    let mut buf = SyncWriter::new()
        .bits(8, 1)
        .mask_only()
        .bits(14, ACTOR_SENTINEL)
        .finish();
    assert!(matches!(
        decode(&mut buf, &mut world, &table),
        Err(SyncError::Codec(_))
    ));
    assert_eq!(world.actors.tracked(), &[1]);
    assert!(world.actors.get(2).is_none());
}

#[test]
fn test_index_beyond_roster_is_rejected() {
    let mut world = world_at_50_50();
    let table = DescriptorTable::new();
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(9000, 0, 0, true, 1, false)
        .bits(14, ACTOR_SENTINEL)
        .finish();
    assert_eq!(
        decode(&mut buf, &mut world, &table),
        Err(SyncError::IndexOutOfRange(9000))
    );
}

#[test]
fn test_mask_block_fields() {
    let mut world = world_at_50_50();
    let mut table = DescriptorTable::new();
    table.insert_sequence(
        866,
        SequenceDescriptor {
            priority: 9,
            ..SequenceDescriptor::default()
        },
    );
    table.insert_actor(
        40,
        ActorDescriptor {
            size: 3,
            ..ActorDescriptor::default()
        },
    );

    let mask = MASK_ANIMATION
        | MASK_HIT
        | MASK_SPOT
        | MASK_FACE_ENTITY
        | MASK_FORCED_CHAT
        | MASK_HIT_2
        | MASK_TRANSFORM
        | MASK_FACE_TILE;
    let mut buf = SyncWriter::new()
        .bits(8, 0)
        .actor_admission(7, 1, 1, true, 1, true)
        .bits(14, ACTOR_SENTINEL)
        .bytes(|b| {
            b.write_u8(mask);
            b.write_u16_le(866);
            b.write_u8(2);
            b.write_u8_add(12);
            b.write_u8_neg(1);
            b.write_u8_add(30);
            b.write_u8_neg(40);
            b.write_u16(90);
            b.write_i32((50 << 16) | 4);
            b.write_u16(32768 + 12);
            b.write_string("Grr!", runewire_codec::STRING_TERMINATOR);
            b.write_u8_neg(7);
            b.write_u8_sub(2);
            b.write_u8_neg(23);
            b.write_u8(40);
            b.write_u16_le_add(40);
            b.write_u16_le(3200);
            b.write_u16_le(3201);
        })
        .finish();
    decode(&mut buf, &mut world, &table).unwrap();

    let actor = world.actors.get(7).unwrap();
    let mobile = &actor.mobile;
    let animation = mobile.animation.unwrap();
    assert_eq!((animation.id, animation.delay), (866, 2));
    let hits: Vec<(u8, u8)> = mobile
        .hits
        .iter()
        .flatten()
        .map(|hit| (hit.damage, hit.kind))
        .collect();
    assert_eq!(hits, vec![(12, 1), (7, 2)]);
    assert_eq!(mobile.health.unwrap().current, 23);
    assert_eq!(mobile.spot.unwrap().height, 50);
    assert_eq!(mobile.speech.as_ref().unwrap().text, "Grr!");
    assert_eq!(actor.descriptor, 40);
    assert_eq!(mobile.size, 3);
    assert_eq!(mobile.facing, Some(Facing::Tile { x: 3200, y: 3201 }));
}

//! Client-side world state kept in step with the server: player and actor
//! sync frames, the per-entity update masks they carry, and the handlers for
//! every scalar field the server pushes.
//!
//! [`handlers::dispatcher`] wires all of it onto a
//! [`runewire_net::Dispatcher`] so a [`runewire_net::ConnectionEngine`] can
//! drive a [`SyncContext`] one tick at a time.

pub mod actor_sync;
pub mod appearance;
pub mod chat;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod player_sync;
pub mod roster;
pub(crate) mod sync;
pub mod world;

#[cfg(test)]
mod test_support;


pub use appearance::{Appearance, AppearanceCache, Equipment};
pub use chat::{ChatKind, ChatLog, ChatMessage};
pub use descriptor::{ActorDescriptor, DescriptorLookup, DescriptorTable, SequenceDescriptor};
pub use entity::{Actor, Direction, Entity, EntityRef, Facing, Mobile, Player, Tile};
pub use error::{DescriptorError, SyncError};
pub use handlers::{SyncContext, dispatcher};
pub use roster::{LOCAL_PLAYER_INDEX, ROSTER_CAPACITY, Roster};
pub use world::{EntityKind, WorldEvent, WorldState};

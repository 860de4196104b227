//! Read-only descriptor metadata consulted while decoding sync frames.
//!
//! Actor descriptors supply the footprint and idle animations applied when
//! an actor is admitted or transformed. Sequence descriptors supply the
//! priority rules phase 3 needs to decide whether a new animation may
//! interrupt the current one.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::entity::IdleAnimations;
use crate::error::DescriptorError;

/// Static data for one actor type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorDescriptor {
    pub name: String,
    /// Footprint in tiles.
    pub size: u8,
    pub combat_level: u16,
    pub idle: IdleAnimations,
}

impl Default for ActorDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 1,
            combat_level: 0,
            idle: IdleAnimations::default(),
        }
    }
}

/// Interrupt rules for one animation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceDescriptor {
    pub priority: u8,
    /// Requesting the playing sequence again restarts it.
    pub restart_on_repeat: bool,
    /// Length in ticks; `0` finishes as soon as the delay elapses.
    pub duration_ticks: u32,
}

impl Default for SequenceDescriptor {
    fn default() -> Self {
        Self {
            priority: 5,
            restart_on_repeat: false,
            duration_ticks: 0,
        }
    }
}

/// Lookup-by-id service for descriptor metadata.
pub trait DescriptorLookup {
    fn actor(&self, id: u32) -> Option<&ActorDescriptor>;
    fn sequence(&self, id: u16) -> Option<&SequenceDescriptor>;
}

/// In-memory descriptor tables, loadable from RON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorTable {
    pub actors: FxHashMap<u32, ActorDescriptor>,
    pub sequences: FxHashMap<u16, SequenceDescriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ron(source: &str) -> Result<Self, DescriptorError> {
        ron::from_str(source).map_err(DescriptorError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_ron(&contents)?;
        tracing::debug!(
            path = %path.display(),
            actors = table.actors.len(),
            sequences = table.sequences.len(),
            "loaded descriptor table"
        );
        Ok(table)
    }

    pub fn insert_actor(&mut self, id: u32, descriptor: ActorDescriptor) {
        self.actors.insert(id, descriptor);
    }

    pub fn insert_sequence(&mut self, id: u16, descriptor: SequenceDescriptor) {
        self.sequences.insert(id, descriptor);
    }
}

impl DescriptorLookup for DescriptorTable {
    fn actor(&self, id: u32) -> Option<&ActorDescriptor> {
        self.actors.get(&id)
    }

    fn sequence(&self, id: u16) -> Option<&SequenceDescriptor> {
        self.sequences.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"(
        actors: {
            5: (
                name: "Guard",
                size: 1,
                combat_level: 21,
                idle: (stand: Some(808), walk: Some(819)),
            ),
            7: (name: "Dragon", size: 4),
        },
        sequences: {
            422: (priority: 8, restart_on_repeat: true, duration_ticks: 3),
        },
    )"#;

    #[test]
    fn test_parse_table() {
        let table = DescriptorTable::from_ron(TABLE).unwrap();
        let guard = table.actor(5).unwrap();
        assert_eq!(guard.name, "Guard");
        assert_eq!(guard.idle.stand, Some(808));
        assert_eq!(guard.idle.run, None);
        assert_eq!(table.actor(7).unwrap().size, 4);
        assert!(table.actor(8).is_none());

        let punch = table.sequence(422).unwrap();
        assert_eq!(punch.priority, 8);
        assert!(punch.restart_on_repeat);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let table = DescriptorTable::from_ron("(sequences: { 1: () })").unwrap();
        assert_eq!(*table.sequence(1).unwrap(), SequenceDescriptor::default());
        assert!(table.actors.is_empty());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        assert!(matches!(
            DescriptorTable::from_ron("{{nope"),
            Err(DescriptorError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptors.ron");
        std::fs::write(&path, TABLE).unwrap();
        let table = DescriptorTable::load(&path).unwrap();
        assert_eq!(table.actors.len(), 2);

        let missing = DescriptorTable::load(&dir.path().join("absent.ron"));
        assert!(matches!(missing, Err(DescriptorError::Read { .. })));
    }
}

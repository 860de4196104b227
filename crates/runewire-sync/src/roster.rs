//! Fixed-capacity entity slot tables.

use crate::entity::Entity;
use crate::error::SyncError;

/// Slots per roster. Player indices are 11 bits wide; actor indices are
/// 14 bits on the wire but bounded by the same table size.
pub const ROSTER_CAPACITY: usize = 2048;
/// Player slot reserved for the local player.
pub const LOCAL_PLAYER_INDEX: u16 = 2047;

/// Slot table plus the ordered list of indices the server considers in view.
///
/// The tracked order is the order phase 1 of the next sync frame walks the
/// roster in, so it is preserved exactly as admissions happened.
#[derive(Debug, Clone)]
pub struct Roster<T> {
    slots: Vec<Option<T>>,
    tracked: Vec<u16>,
}

impl<T> Default for Roster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Roster<T> {
    pub fn new() -> Self {
        Self::with_capacity(ROSTER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            tracked: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Tracked indices in wire order.
    pub fn tracked(&self) -> &[u16] {
        &self.tracked
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn get(&self, index: u16) -> Option<&T> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut T> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, index: u16) -> bool {
        self.get(index).is_some()
    }

    /// Number of occupied slots, including untracked ones such as the local
    /// player.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Empties a slot and returns what it held. Does not touch the tracked
    /// list.
    pub fn remove(&mut self, index: u16) -> Option<T> {
        self.slots.get_mut(index as usize).and_then(Option::take)
    }

    /// Tracked entities in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &T)> {
        self.tracked
            .iter()
            .filter_map(|&index| self.get(index).map(|entity| (index, entity)))
    }

    pub(crate) fn set_tracked(&mut self, tracked: Vec<u16>) {
        self.tracked = tracked;
    }

    /// Visits every occupied slot, tracked or not.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(u16, &mut T)) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entity) = slot.as_mut() {
                f(index as u16, entity);
            }
        }
    }

    /// Drops every entity and forgets the tracked list.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.tracked.clear();
    }
}

impl<T: Entity + Default> Roster<T> {
    /// Returns the entity at `index`, allocating a default one if the slot
    /// is empty. The flag is `true` when the slot was allocated.
    pub fn get_or_insert(&mut self, index: u16) -> Result<(&mut T, bool), SyncError> {
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(SyncError::IndexOutOfRange(u32::from(index)))?;
        let created = slot.is_none();
        Ok((slot.get_or_insert_with(T::default), created))
    }
}

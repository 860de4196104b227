//! The world-state sink every inbound frame is applied to.
//!
//! Rendering and UI code reads this struct and drains its event queue; this
//! crate never reads anything back from them.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::appearance::AppearanceCache;
use crate::chat::{ChatKind, ChatLog, ChatMessage};
use crate::entity::{Actor, Entity, Player, Tile};
use crate::roster::{LOCAL_PLAYER_INDEX, Roster};

pub const SETTING_COUNT: usize = 2000;
pub const SKILL_COUNT: usize = 25;
pub const PLAYER_OPTION_COUNT: usize = 5;
pub const TAB_COUNT: usize = 15;

/// Regions are 8 tiles wide; the scene starts 6 regions before the one
/// the server names.
const REGION_TILES: i32 = 8;
const SCENE_REGION_OFFSET: i32 = 6;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Actor,
}

/// A mutation downstream consumers may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    Spawned { kind: EntityKind, index: u16 },
    Despawned { kind: EntityKind, index: u16 },
    AppearanceChanged { index: u16 },
    SettingChanged { id: u16, value: i32 },
    SkillChanged { skill: u8 },
    WidgetItemsChanged { widget: u16 },
    RegionChanged { x: u16, y: u16 },
}

// ---------------------------------------------------------------------------
// Field state
// ---------------------------------------------------------------------------

/// Friends-list server connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SocialStatus {
    #[default]
    Loading,
    Connecting,
    Online,
}

impl SocialStatus {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Loading),
            1 => Some(Self::Connecting),
            2 => Some(Self::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skill {
    pub experience: i32,
    /// Current, possibly boosted or drained, level.
    pub level: u8,
    /// Level implied by the experience.
    pub max_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetItem {
    pub id: u16,
    pub amount: i32,
}

/// Right-click option offered on other players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOption {
    pub text: String,
    /// Shown above the default walk option.
    pub top: bool,
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorldState {
    tick: u64,
    pub players: Roster<Player>,
    pub actors: Roster<Actor>,
    pub appearances: AppearanceCache,
    pub plane: u8,
    /// Region coordinates from the last map-region frame.
    pub region: Option<(u16, u16)>,
    pub rights: u8,
    pub settings: Vec<i32>,
    pub skills: [Skill; SKILL_COUNT],
    pub widget_items: FxHashMap<u16, Vec<Option<WidgetItem>>>,
    pub player_options: [Option<PlayerOption>; PLAYER_OPTION_COUNT],
    pub tab_widgets: [Option<u16>; TAB_COUNT],
    pub active_tab: u8,
    pub chat_overlay: Option<u16>,
    pub chat_underlay: Option<u16>,
    pub target_region: (u8, u8),
    pub social_status: SocialStatus,
    pub run_energy: u8,
    pub chat: ChatLog,
    pub(crate) events: VecDeque<WorldEvent>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    pub fn new() -> Self {
        let mut world = Self {
            tick: 0,
            players: Roster::new(),
            actors: Roster::new(),
            appearances: AppearanceCache::new(),
            plane: 0,
            region: None,
            rights: 0,
            settings: vec![0; SETTING_COUNT],
            skills: [Skill::default(); SKILL_COUNT],
            widget_items: FxHashMap::default(),
            player_options: Default::default(),
            tab_widgets: [None; TAB_COUNT],
            active_tab: 0,
            chat_overlay: None,
            chat_underlay: None,
            target_region: (0, 0),
            social_status: SocialStatus::default(),
            run_energy: 100,
            chat: ChatLog::new(),
            events: VecDeque::new(),
        };
        world.spawn_local_player();
        world
    }

    fn spawn_local_player(&mut self) {
        if let Ok((_, true)) = self.players.get_or_insert(LOCAL_PLAYER_INDEX) {
            tracing::debug!("local player slot allocated");
        }
    }

    /// Drops all session state, keeping an empty local player.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Ticks elapsed since the world was created.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(LOCAL_PLAYER_INDEX)
    }

    pub fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(LOCAL_PLAYER_INDEX)
    }

    /// The local player's scene tile; relative coordinates in sync frames
    /// are resolved against it.
    pub fn local_tile(&self) -> Tile {
        self.local_player()
            .map(|player| player.mobile.head())
            .unwrap_or_default()
    }

    /// Absolute tile of the scene origin, once a region is known.
    pub fn region_base(&self) -> Option<Tile> {
        self.region.map(|(x, y)| {
            Tile::new(
                (i32::from(x) - SCENE_REGION_OFFSET) * REGION_TILES,
                (i32::from(y) - SCENE_REGION_OFFSET) * REGION_TILES,
            )
        })
    }

    /// The local player's absolute tile, once a region is known.
    pub fn local_absolute(&self) -> Option<Tile> {
        let local = self.local_tile();
        self.region_base()
            .map(|base| base.offset(local.x, local.y))
    }

    /// Moves the scene to a new region. Entities keep their absolute
    /// positions, so their scene tiles shift by the change of base.
    pub fn set_region(&mut self, x: u16, y: u16) {
        let previous = self.region_base();
        self.region = Some((x, y));
        if let (Some(previous), Some(next)) = (previous, self.region_base()) {
            let dx = previous.x - next.x;
            let dy = previous.y - next.y;
            if dx != 0 || dy != 0 {
                self.players
                    .for_each_mut(|_, player| player.mobile_mut().shift(dx, dy));
                self.actors
                    .for_each_mut(|_, actor| actor.mobile_mut().shift(dx, dy));
            }
        }
        tracing::debug!(x, y, "region changed");
        self.push_event(WorldEvent::RegionChanged { x, y });
    }

    /// Advances one tick: counts down speech and expires overlays.
    pub fn end_tick(&mut self) {
        self.tick += 1;
        let tick = self.tick;
        self.players
            .for_each_mut(|_, player| player.mobile_mut().advance(tick));
        self.actors
            .for_each_mut(|_, actor| actor.mobile_mut().advance(tick));
    }

    pub fn push_event(&mut self, event: WorldEvent) {
        self.events.push_back(event);
    }

    /// Pending events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = WorldEvent> + '_ {
        self.events.drain(..)
    }

    pub fn system_message(&mut self, text: String) {
        self.chat.push(ChatMessage {
            kind: ChatKind::System,
            sender: None,
            text,
            tick: self.tick,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world_has_local_player() {
        let world = WorldState::new();
        assert!(world.local_player().is_some());
        assert!(world.players.tracked().is_empty());
        assert_eq!(world.settings.len(), SETTING_COUNT);
    }

    #[test]
    fn test_region_base_and_absolute_position() {
        let mut world = WorldState::new();
        assert_eq!(world.local_absolute(), None);
        let local = world.local_player_mut().unwrap();
        local.mobile.teleport(50, 50, true);
        world.set_region(400, 400);
        assert_eq!(world.region_base(), Some(Tile::new(3152, 3152)));
        assert_eq!(world.local_absolute(), Some(Tile::new(3202, 3202)));
    }

    #[test]
    fn test_region_change_shifts_entities() {
        let mut world = WorldState::new();
        world.set_region(400, 400);
        let local = world.local_player_mut().unwrap();
        local.mobile.teleport(50, 50, true);
        let (actor, _) = world.actors.get_or_insert(3).unwrap();
        actor.mobile.teleport(60, 40, true);

        world.set_region(402, 399);
        assert_eq!(world.local_tile(), Tile::new(34, 58));
        let actor = world.actors.get(3).unwrap();
        assert_eq!(actor.mobile.head(), Tile::new(44, 48));
        assert_eq!(world.local_absolute(), Some(Tile::new(3202, 3202)));
    }

    #[test]
    fn test_end_tick_advances_and_expires() {
        let mut world = WorldState::new();
        let (actor, _) = world.actors.get_or_insert(1).unwrap();
        actor.mobile.add_hit(3, 0, 0);
        for _ in 0..70 {
            world.end_tick();
        }
        assert_eq!(world.tick(), 70);
        assert!(world.actors.get(1).unwrap().mobile.hits[0].is_none());
    }

    #[test]
    fn test_events_drain_in_order() {
        let mut world = WorldState::new();
        world.push_event(WorldEvent::SkillChanged { skill: 1 });
        world.set_region(10, 10);
        let drained: Vec<WorldEvent> = world.drain_events().collect();
        assert_eq!(
            drained,
            vec![
                WorldEvent::SkillChanged { skill: 1 },
                WorldEvent::RegionChanged { x: 10, y: 10 },
            ]
        );
        assert_eq!(world.events().count(), 0);
    }

    #[test]
    fn test_social_status_wire_values() {
        assert_eq!(SocialStatus::from_wire(2), Some(SocialStatus::Online));
        assert_eq!(SocialStatus::from_wire(9), None);
    }
}

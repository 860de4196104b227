//! Per-entity state shared by players and actors.
//!
//! Positions are scene-local tiles (relative to the current region base),
//! matching what the sync frames transmit. A [`Mobile`] keeps the last
//! [`MAX_PATH`] tiles it was moved to, newest first; the renderer walks the
//! fine position towards `path[0]` through the queue.

use serde::{Deserialize, Serialize};

/// Depth of the movement queue.
pub const MAX_PATH: usize = 10;
/// Concurrent hit splats per entity.
pub const MAX_HITS: usize = 4;
/// Ticks a hit splat stays visible.
pub const HIT_TICKS: u64 = 70;
/// Ticks the health bar stays visible after a hit.
pub const HEALTH_BAR_TICKS: u64 = 300;
/// Ticks overhead text stays visible.
pub const SPEECH_TICKS: u32 = 5;
/// Fine units per tile.
pub const TILE_UNITS: i32 = 128;

/// Teleports at most this far (on both axes) join the movement queue.
const INTERPOLATE_WINDOW: i32 = 8;

// ---------------------------------------------------------------------------
// Tile / Direction
// ---------------------------------------------------------------------------

/// A scene-local tile coordinate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// One of the eight step directions, as sent in 3 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Direction {
    /// Maps the 3-bit wire value.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => Self::NorthWest,
            1 => Self::North,
            2 => Self::NorthEast,
            3 => Self::West,
            4 => Self::East,
            5 => Self::SouthWest,
            6 => Self::South,
            _ => Self::SouthEast,
        }
    }

    pub fn to_bits(self) -> u32 {
        self as u32
    }

    /// Tile delta, north being `+y`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::NorthWest => (-1, 1),
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, -1),
            Self::South => (0, -1),
            Self::SouthEast => (1, -1),
        }
    }
}

// ---------------------------------------------------------------------------
// Update blocks
// ---------------------------------------------------------------------------

/// Stand/walk/turn sequence ids used when no explicit animation plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleAnimations {
    pub stand: Option<u16>,
    pub stand_turn: Option<u16>,
    pub walk: Option<u16>,
    pub turn_180: Option<u16>,
    pub turn_90_cw: Option<u16>,
    pub turn_90_ccw: Option<u16>,
    pub run: Option<u16>,
}

/// An explicitly requested sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub id: u16,
    pub delay: u8,
    /// Tick the request arrived.
    pub start_tick: u64,
}

/// A graphic played on top of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotAnimation {
    pub id: u16,
    pub height: u16,
    pub delay: u16,
    pub start_tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitSplat {
    pub damage: u8,
    pub kind: u8,
    pub begin_tick: u64,
    pub expire_tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthBar {
    pub current: u8,
    pub max: u8,
    pub until_tick: u64,
}

/// Overhead text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speech {
    pub text: String,
    pub color: u8,
    pub effect: u8,
    pub remaining_ticks: u32,
}

/// Entity reference carried by face-entity updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Player(u16),
    Actor(u16),
}

impl EntityRef {
    /// Decodes a face-entity index. `65535` clears, values from `32768` up
    /// are players.
    pub fn from_wire(index: u16) -> Option<Self> {
        match index {
            u16::MAX => None,
            32768.. => Some(Self::Player(index - 32768)),
            _ => Some(Self::Actor(index)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Entity(EntityRef),
    Tile { x: u16, y: u16 },
}

/// Scripted movement between two tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedMovement {
    pub start: Tile,
    pub end: Tile,
    pub start_delay: u16,
    pub end_delay: u16,
    pub direction: u8,
}

// ---------------------------------------------------------------------------
// Mobile
// ---------------------------------------------------------------------------

/// Movement, animation and overlay state of one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mobile {
    pub path: [Tile; MAX_PATH],
    pub path_run: [bool; MAX_PATH],
    pub path_len: usize,
    /// Footprint in tiles.
    pub size: i32,
    pub fine_x: i32,
    pub fine_y: i32,
    pub still_ticks: u32,
    pub resync_ticks: u32,
    pub idle: IdleAnimations,
    pub animation: Option<Animation>,
    pub spot: Option<SpotAnimation>,
    pub hits: [Option<HitSplat>; MAX_HITS],
    pub health: Option<HealthBar>,
    pub speech: Option<Speech>,
    pub facing: Option<Facing>,
    pub forced_movement: Option<ForcedMovement>,
    /// Set by every sync pass that mentions the entity.
    pub updated: bool,
}

impl Default for Mobile {
    fn default() -> Self {
        Self {
            path: [Tile::default(); MAX_PATH],
            path_run: [false; MAX_PATH],
            path_len: 0,
            size: 1,
            fine_x: 0,
            fine_y: 0,
            still_ticks: 0,
            resync_ticks: 0,
            idle: IdleAnimations::default(),
            animation: None,
            spot: None,
            hits: [None; MAX_HITS],
            health: None,
            speech: None,
            facing: None,
            forced_movement: None,
            updated: false,
        }
    }
}

impl Mobile {
    /// Newest queued tile.
    pub fn head(&self) -> Tile {
        self.path[0]
    }

    /// Queued tiles, newest first.
    pub fn queued(&self) -> &[Tile] {
        &self.path[..self.path_len]
    }

    fn push_front(&mut self, tile: Tile, run: bool) {
        if self.path_len < MAX_PATH {
            self.path_len += 1;
        }
        for i in (1..self.path_len).rev() {
            self.path[i] = self.path[i - 1];
            self.path_run[i] = self.path_run[i - 1];
        }
        self.path[0] = tile;
        self.path_run[0] = run;
    }

    /// Places the entity at `(x, y)`.
    ///
    /// A short hop (8 tiles or fewer on both axes from the head of the queue)
    /// with `discard_queue` unset is queued like a step so it can be
    /// interpolated. Anything else resets the queue and the still/resync
    /// counters and snaps the fine position.
    pub fn teleport(&mut self, x: i32, y: i32, discard_queue: bool) {
        let target = Tile::new(x, y);
        if !discard_queue && self.path_len > 0 {
            let dx = x - self.path[0].x;
            let dy = y - self.path[0].y;
            if dx.abs() <= INTERPOLATE_WINDOW && dy.abs() <= INTERPOLATE_WINDOW {
                self.push_front(target, false);
                return;
            }
        }

        self.path[0] = target;
        self.path_run[0] = false;
        self.path_len = 1;
        self.still_ticks = 0;
        self.resync_ticks = 0;
        self.fine_x = x * TILE_UNITS + self.size * TILE_UNITS / 2;
        self.fine_y = y * TILE_UNITS + self.size * TILE_UNITS / 2;
    }

    /// Queues a one-tile step from the head of the queue.
    pub fn step(&mut self, direction: Direction, run: bool) {
        let (dx, dy) = direction.delta();
        let next = self.path[0].offset(dx, dy);
        self.push_front(next, run);
    }

    /// Moves every queued tile and the fine position by a tile delta. Used
    /// when the scene base moves.
    pub fn shift(&mut self, dx: i32, dy: i32) {
        for tile in &mut self.path {
            *tile = tile.offset(dx, dy);
        }
        self.fine_x += dx * TILE_UNITS;
        self.fine_y += dy * TILE_UNITS;
    }

    /// Records a hit. Takes the first free or expired slot, else replaces
    /// the splat closest to expiry.
    pub fn add_hit(&mut self, damage: u8, kind: u8, tick: u64) {
        let splat = HitSplat {
            damage,
            kind,
            begin_tick: tick,
            expire_tick: tick + HIT_TICKS,
        };
        let slot = self
            .hits
            .iter()
            .position(|hit| hit.is_none_or(|hit| hit.expire_tick <= tick))
            .or_else(|| {
                self.hits
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, hit)| hit.map_or(0, |hit| hit.expire_tick))
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);
        self.hits[slot] = Some(splat);
    }

    pub fn set_health(&mut self, current: u8, max: u8, tick: u64) {
        self.health = Some(HealthBar {
            current,
            max,
            until_tick: tick + HEALTH_BAR_TICKS,
        });
    }

    pub fn say(&mut self, text: String, color: u8, effect: u8) {
        self.speech = Some(Speech {
            text,
            color,
            effect,
            remaining_ticks: SPEECH_TICKS,
        });
    }

    /// Advances timers to `tick`: counts down speech, drops expired hits,
    /// health bars and finished forced movement.
    pub fn advance(&mut self, tick: u64) {
        if let Some(speech) = self.speech.as_mut() {
            speech.remaining_ticks = speech.remaining_ticks.saturating_sub(1);
            if speech.remaining_ticks == 0 {
                self.speech = None;
            }
        }
        for hit in &mut self.hits {
            if hit.is_some_and(|h| h.expire_tick <= tick) {
                *hit = None;
            }
        }
        if self.health.is_some_and(|bar| bar.until_tick <= tick) {
            self.health = None;
        }
        if self.path_len <= 1 {
            self.still_ticks += 1;
        } else {
            self.still_ticks = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Access to the [`Mobile`] part of a roster entry.
pub trait Entity {
    fn mobile(&self) -> &Mobile;
    fn mobile_mut(&mut self) -> &mut Mobile;
}

/// Another player, or the local player in slot 2047.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub mobile: Mobile,
    pub name: Option<String>,
    pub combat_level: u8,
    pub skill_total: u16,
    pub head_icon: u8,
}

impl Entity for Player {
    fn mobile(&self) -> &Mobile {
        &self.mobile
    }

    fn mobile_mut(&mut self) -> &mut Mobile {
        &mut self.mobile
    }
}

/// A non-player character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub mobile: Mobile,
    /// Descriptor id from the sync frame or the last transform.
    pub descriptor: u32,
}

impl Entity for Actor {
    fn mobile(&self) -> &Mobile {
        &self.mobile
    }

    fn mobile_mut(&mut self) -> &mut Mobile {
        &mut self.mobile
    }
}

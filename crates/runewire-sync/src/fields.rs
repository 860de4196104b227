//! Single-opcode decoders that mutate scalar world state.
//!
//! Each takes the frame payload and the world and nothing else; none of
//! them keeps state between frames.

use std::sync::LazyLock;

use runewire_codec::{Buffer, STRING_TERMINATOR};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::world::{
    PLAYER_OPTION_COUNT, PlayerOption, SocialStatus, TAB_COUNT, WidgetItem, WorldEvent, WorldState,
};

pub const MAX_LEVEL: u8 = 99;

const CLEAR_WIDGET: u16 = u16::MAX;
const INLINE_AMOUNT_LIMIT: u8 = 255;
const CLEAR_OPTION: &str = "null";

/// Experience needed for levels 2 through 99.
pub static EXPERIENCE_TABLE: LazyLock<[i32; MAX_LEVEL as usize - 1]> = LazyLock::new(|| {
    let mut table = [0; MAX_LEVEL as usize - 1];
    let mut points = 0.0_f64;
    for (i, threshold) in table.iter_mut().enumerate() {
        let level = (i + 1) as f64;
        points += (level + 300.0 * 2f64.powf(level / 7.0)).floor();
        *threshold = (points / 4.0).floor() as i32;
    }
    table
});

/// Level reached with `experience`.
pub fn level_for_experience(experience: i32) -> u8 {
    let mut level = 1;
    for (i, &threshold) in EXPERIENCE_TABLE.iter().enumerate() {
        if experience >= threshold {
            level = i as u8 + 2;
        }
    }
    level
}

fn set_setting(world: &mut WorldState, id: u16, value: i32) -> Result<(), SyncError> {
    let slot = world
        .settings
        .get_mut(usize::from(id))
        .ok_or(SyncError::IndexOutOfRange(u32::from(id)))?;
    if *slot != value {
        *slot = value;
        world.push_event(WorldEvent::SettingChanged { id, value });
    }
    Ok(())
}

/// Byte-valued setting: `[id: LE u16][value: u8]`.
pub fn setting_byte(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let id = buf.read_u16_le()?;
    let value = buf.read_u8()?;
    set_setting(world, id, i32::from(value))
}

/// Int-valued setting: `[id: LE u16][value: ME i32]`.
pub fn setting_int(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let id = buf.read_u16_le()?;
    let value = buf.read_i32_me()?;
    set_setting(world, id, value)
}

/// `[skill: u8][experience: ME i32][level: u8]`.
pub fn skill(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let id = buf.read_u8()?;
    let experience = buf.read_i32_me()?;
    let level = buf.read_u8()?;
    let skill = world
        .skills
        .get_mut(usize::from(id))
        .ok_or(SyncError::IndexOutOfRange(u32::from(id)))?;
    skill.experience = experience;
    skill.level = level;
    skill.max_level = level_for_experience(experience);
    world.push_event(WorldEvent::SkillChanged { skill: id });
    Ok(())
}

/// Replaces a widget's item slots: `[widget: u16][count: u16]`, then per
/// slot an amount byte (255 escapes to an IME i32) and `item + 1` as LE-add
/// u16, zero meaning empty.
pub fn widget_items(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let widget = buf.read_u16()?;
    let count = buf.read_u16()?;
    let mut items = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let amount = match buf.read_u8()? {
            INLINE_AMOUNT_LIMIT => buf.read_i32_ime()?,
            amount => i32::from(amount),
        };
        let id = buf.read_u16_le_add()?;
        items.push(id.checked_sub(1).map(|id| WidgetItem { id, amount }));
    }
    world.widget_items.insert(widget, items);
    world.push_event(WorldEvent::WidgetItemsChanged { widget });
    Ok(())
}

/// `[index: neg u8][top: add u8][text]`. Indices are 1-based; `"null"`
/// removes the option.
pub fn player_option(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let index = buf.read_u8_neg()?;
    let top = buf.read_u8_add()? == 1;
    let text = buf.read_string(STRING_TERMINATOR)?;
    if !(1..=PLAYER_OPTION_COUNT).contains(&usize::from(index)) {
        return Err(SyncError::IndexOutOfRange(u32::from(index)));
    }
    let option = (!text.eq_ignore_ascii_case(CLEAR_OPTION)).then_some(PlayerOption { text, top });
    world.player_options[usize::from(index) - 1] = option;
    Ok(())
}

/// `[widget: u16][tab: add u8]`; widget 65535 clears the tab.
pub fn tab_widget(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let widget = buf.read_u16()?;
    let tab = buf.read_u8_add()?;
    let slot = world
        .tab_widgets
        .get_mut(usize::from(tab))
        .ok_or(SyncError::IndexOutOfRange(u32::from(tab)))?;
    *slot = (widget != CLEAR_WIDGET).then_some(widget);
    Ok(())
}

/// `[tab: neg u8]`.
pub fn active_tab(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let tab = buf.read_u8_neg()?;
    if usize::from(tab) >= TAB_COUNT {
        return Err(SyncError::IndexOutOfRange(u32::from(tab)));
    }
    world.active_tab = tab;
    Ok(())
}

/// `[widget: LE u16]`; 65535 closes the overlay.
pub fn chat_overlay(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let widget = buf.read_u16_le()?;
    world.chat_overlay = (widget != CLEAR_WIDGET).then_some(widget);
    Ok(())
}

/// `[widget: LE-add u16]`; 65535 closes the underlay.
pub fn chat_underlay(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let widget = buf.read_u16_le_add()?;
    world.chat_underlay = (widget != CLEAR_WIDGET).then_some(widget);
    Ok(())
}

/// `[y: neg u8][x: neg u8]`.
pub fn target_region(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let y = buf.read_u8_neg()?;
    let x = buf.read_u8_neg()?;
    world.target_region = (x, y);
    Ok(())
}

pub fn social_status(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let value = buf.read_u8()?;
    match SocialStatus::from_wire(value) {
        Some(status) => world.social_status = status,
        None => warn!(value, "unknown social status ignored"),
    }
    Ok(())
}

/// `[region x: add u16][region y: u16]`.
pub fn map_region(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let x = buf.read_u16_add()?;
    let y = buf.read_u16()?;
    world.set_region(x, y);
    Ok(())
}

pub fn run_energy(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    world.run_energy = buf.read_u8()?;
    Ok(())
}

pub fn close_widgets(_buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    world.chat_overlay = None;
    world.chat_underlay = None;
    debug!("widgets closed");
    Ok(())
}

pub fn system_message(buf: &mut Buffer, world: &mut WorldState) -> Result<(), SyncError> {
    let text = buf.read_string(STRING_TERMINATOR)?;
    world.system_message(text);
    Ok(())
}

//! Opcode numbers and the inbound frame size table.
//!
//! Inbound frames are `[opcode][size prefix][payload]` where the prefix is
//! absent for fixed-size opcodes, one byte for [`FrameSize::VariableByte`]
//! and a big-endian short for [`FrameSize::VariableShort`].

/// Server-to-client opcodes.
pub mod server {
    pub const SETTING_BYTE: u8 = 36;
    pub const WIDGET_ITEMS: u8 = 53;
    pub const ACTOR_SYNC: u8 = 65;
    pub const TAB_WIDGET: u8 = 71;
    pub const MAP_REGION: u8 = 73;
    pub const PLAYER_SYNC: u8 = 81;
    pub const TARGET_REGION: u8 = 85;
    pub const SETTING_INT: u8 = 87;
    pub const PLAYER_OPTION: u8 = 104;
    pub const ACTIVE_TAB: u8 = 106;
    pub const LOGOUT: u8 = 109;
    pub const RUN_ENERGY: u8 = 110;
    pub const SKILL: u8 = 134;
    pub const CHAT_OVERLAY: u8 = 164;
    pub const CHAT_UNDERLAY: u8 = 218;
    pub const CLOSE_WIDGETS: u8 = 219;
    pub const SOCIAL_STATUS: u8 = 221;
    pub const SYSTEM_MESSAGE: u8 = 253;
}

/// Client-to-server opcodes.
pub mod client {
    pub const KEEPALIVE: u8 = 0;
    pub const PUBLIC_CHAT: u8 = 4;
    pub const COMMAND: u8 = 103;
}

/// Table marker for a one-byte size prefix.
pub const VARIABLE_BYTE: i16 = -1;
/// Table marker for a two-byte size prefix.
pub const VARIABLE_SHORT: i16 = -2;

/// How the payload size of an inbound opcode is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    Fixed(usize),
    VariableByte,
    VariableShort,
}

impl FrameSize {
    /// Interprets a raw size table entry.
    pub const fn from_table(entry: i16) -> Self {
        match entry {
            VARIABLE_BYTE => Self::VariableByte,
            VARIABLE_SHORT => Self::VariableShort,
            // Other negative entries do not occur in the table.
            n if n < 0 => Self::Fixed(0),
            n => Self::Fixed(n as usize),
        }
    }
}

/// Inbound payload sizes indexed by opcode. Unlisted opcodes are empty.
pub const FRAME_SIZES: [i16; 256] = {
    let mut sizes = [0i16; 256];
    sizes[server::SETTING_BYTE as usize] = 3;
    sizes[server::WIDGET_ITEMS as usize] = VARIABLE_SHORT;
    sizes[server::ACTOR_SYNC as usize] = VARIABLE_SHORT;
    sizes[server::TAB_WIDGET as usize] = 3;
    sizes[server::MAP_REGION as usize] = 4;
    sizes[server::PLAYER_SYNC as usize] = VARIABLE_SHORT;
    sizes[server::TARGET_REGION as usize] = 2;
    sizes[server::SETTING_INT as usize] = 6;
    sizes[server::PLAYER_OPTION as usize] = VARIABLE_BYTE;
    sizes[server::ACTIVE_TAB as usize] = 1;
    sizes[server::LOGOUT as usize] = 0;
    sizes[server::RUN_ENERGY as usize] = 1;
    sizes[server::SKILL as usize] = 6;
    sizes[server::CHAT_OVERLAY as usize] = 2;
    sizes[server::CHAT_UNDERLAY as usize] = 2;
    sizes[server::CLOSE_WIDGETS as usize] = 0;
    sizes[server::SOCIAL_STATUS as usize] = 1;
    sizes[server::SYSTEM_MESSAGE as usize] = VARIABLE_BYTE;
    sizes
};

/// Size rule for an inbound opcode.
pub fn frame_size(opcode: u8) -> FrameSize {
    FrameSize::from_table(FRAME_SIZES[opcode as usize])
}

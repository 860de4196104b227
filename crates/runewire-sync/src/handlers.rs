//! Dispatch wiring from server opcodes to the decoders in this crate.

use runewire_net::Dispatcher;
use runewire_net::protocol::server;

use crate::descriptor::{DescriptorLookup, DescriptorTable};
use crate::error::SyncError;
use crate::world::WorldState;
use crate::{actor_sync, fields, player_sync};

/// Context every handler runs against.
pub struct SyncContext {
    pub world: WorldState,
    pub descriptors: Box<dyn DescriptorLookup>,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(DescriptorTable::default())
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("tick", &self.world.tick())
            .field("players", &self.world.players.tracked_len())
            .field("actors", &self.world.actors.tracked_len())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn new(descriptors: impl DescriptorLookup + 'static) -> Self {
        Self {
            world: WorldState::new(),
            descriptors: Box::new(descriptors),
        }
    }
}

/// Dispatcher with a handler for every server opcode except logout, which
/// the connection engine consumes itself.
pub fn dispatcher() -> Dispatcher<SyncContext, SyncError> {
    Dispatcher::<SyncContext, SyncError>::new()
        .with(server::PLAYER_SYNC, |frame, ctx| {
            player_sync::decode(&mut frame.payload, &mut ctx.world, ctx.descriptors.as_ref())
        })
        .with(server::ACTOR_SYNC, |frame, ctx| {
            actor_sync::decode(&mut frame.payload, &mut ctx.world, ctx.descriptors.as_ref())
        })
        .with(server::SETTING_BYTE, |frame, ctx| {
            fields::setting_byte(&mut frame.payload, &mut ctx.world)
        })
        .with(server::SETTING_INT, |frame, ctx| {
            fields::setting_int(&mut frame.payload, &mut ctx.world)
        })
        .with(server::SKILL, |frame, ctx| {
            fields::skill(&mut frame.payload, &mut ctx.world)
        })
        .with(server::WIDGET_ITEMS, |frame, ctx| {
            fields::widget_items(&mut frame.payload, &mut ctx.world)
        })
        .with(server::PLAYER_OPTION, |frame, ctx| {
            fields::player_option(&mut frame.payload, &mut ctx.world)
        })
        .with(server::TAB_WIDGET, |frame, ctx| {
            fields::tab_widget(&mut frame.payload, &mut ctx.world)
        })
        .with(server::ACTIVE_TAB, |frame, ctx| {
            fields::active_tab(&mut frame.payload, &mut ctx.world)
        })
        .with(server::CHAT_OVERLAY, |frame, ctx| {
            fields::chat_overlay(&mut frame.payload, &mut ctx.world)
        })
        .with(server::CHAT_UNDERLAY, |frame, ctx| {
            fields::chat_underlay(&mut frame.payload, &mut ctx.world)
        })
        .with(server::TARGET_REGION, |frame, ctx| {
            fields::target_region(&mut frame.payload, &mut ctx.world)
        })
        .with(server::SOCIAL_STATUS, |frame, ctx| {
            fields::social_status(&mut frame.payload, &mut ctx.world)
        })
        .with(server::MAP_REGION, |frame, ctx| {
            fields::map_region(&mut frame.payload, &mut ctx.world)
        })
        .with(server::RUN_ENERGY, |frame, ctx| {
            fields::run_energy(&mut frame.payload, &mut ctx.world)
        })
        .with(server::CLOSE_WIDGETS, |frame, ctx| {
            fields::close_widgets(&mut frame.payload, &mut ctx.world)
        })
        .with(server::SYSTEM_MESSAGE, |frame, ctx| {
            fields::system_message(&mut frame.payload, &mut ctx.world)
        })
}

#[cfg(test)]
mod tests {
    use runewire_codec::{Buffer, Frame};

    use super::*;

    #[test]
    fn test_every_server_opcode_but_logout_is_registered() {
        let dispatcher = dispatcher();
        for opcode in [
            server::SETTING_BYTE,
            server::WIDGET_ITEMS,
            server::ACTOR_SYNC,
            server::TAB_WIDGET,
            server::MAP_REGION,
            server::PLAYER_SYNC,
            server::TARGET_REGION,
            server::SETTING_INT,
            server::PLAYER_OPTION,
            server::ACTIVE_TAB,
            server::RUN_ENERGY,
            server::SKILL,
            server::CHAT_OVERLAY,
            server::CHAT_UNDERLAY,
            server::CLOSE_WIDGETS,
            server::SOCIAL_STATUS,
            server::SYSTEM_MESSAGE,
        ] {
            assert!(dispatcher.is_registered(opcode), "opcode {opcode}");
        }
        assert!(!dispatcher.is_registered(server::LOGOUT));
    }

    #[test]
    fn test_dispatch_reaches_world() {
        let dispatcher = dispatcher();
        let mut ctx = SyncContext::default();
        let mut payload = Buffer::new();
        payload.write_u8(55);
        payload.set_position(0);
        let mut frame = Frame::with_payload(server::RUN_ENERGY, payload);

        assert_eq!(dispatcher.dispatch(&mut frame, &mut ctx), Ok(true));
        assert_eq!(ctx.world.run_energy, 55);
    }

    #[test]
    fn test_handler_error_surfaces() {
        let dispatcher = dispatcher();
        let mut ctx = SyncContext::default();
        let mut frame = Frame::new(server::SKILL);
        assert!(matches!(
            dispatcher.dispatch(&mut frame, &mut ctx),
            Err(SyncError::Codec(_))
        ));
    }
}

//! Opcode routing.
//!
//! The [`Dispatcher`] maps each opcode to its handler and turns handler
//! failures into replies. A failure that knows its request becomes an `ER#`
//! packet; one that does not (the ids themselves were unreadable) can only be
//! logged.

use super::handlers::{
    battle, delivery, diagnostics, inventory, progress, session, spells, world,
};
use super::{HandlerError, OpcodeHandler, Reply};
use crate::context::ServerContext;
use bitrealm_protocol::Frame;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes decoded frames to opcode handlers.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<&'static str, Arc<dyn OpcodeHandler>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher serving every opcode the game client speaks.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(session::LOGIN, session::LoginHandler);
        dispatcher.register(battle::REQUEST, battle::BattleRequestHandler);
        dispatcher.register(battle::FINISH, battle::BattleFinishHandler);
        dispatcher.register(progress::LEVEL_UP, progress::LevelUpHandler);
        dispatcher.register(progress::HEARTBEAT, progress::HeartbeatHandler);
        dispatcher.register(world::PROFILE, world::ProfileHandler);
        dispatcher.register(world::LEVEL, world::LevelHandler);
        dispatcher.register(world::REGION, world::RegionHandler);
        dispatcher.register(inventory::ADD, inventory::InventoryHandler(inventory::ADD));
        dispatcher.register(inventory::UPDATE, inventory::InventoryHandler(inventory::UPDATE));
        dispatcher.register(inventory::EQUIP, inventory::EquipHandler);
        dispatcher.register(inventory::UNEQUIP, inventory::UnequipHandler);
        dispatcher.register(spells::LEARN, spells::LearnSpellHandler);
        dispatcher.register(delivery::ACKNOWLEDGE, delivery::AcknowledgeHandler);
        dispatcher.register(delivery::RESEND, delivery::ResendHandler);
        dispatcher.register(diagnostics::ECHO, diagnostics::EchoHandler);
        dispatcher.register(diagnostics::HELLO, diagnostics::HelloHandler);
        dispatcher
    }

    /// Registers `handler` for `opcode`, replacing any previous handler.
    pub fn register<H>(&mut self, opcode: &'static str, handler: H)
    where
        H: OpcodeHandler + 'static,
    {
        if self.handlers.insert(opcode, Arc::new(handler)).is_some() {
            warn!("⚠️ Replaced handler for opcode {}", opcode);
        }
    }

    pub fn handles(&self, opcode: &str) -> bool {
        self.handlers.contains_key(opcode)
    }

    pub fn opcode_count(&self) -> usize {
        self.handlers.len()
    }

    /// Serves one frame.
    ///
    /// Unknown opcodes are ignored. Failures tied to a request come back as
    /// an error packet reply; all others are logged and yield
    /// [`Reply::Nothing`].
    pub async fn dispatch(&self, frame: Frame<'_>, ctx: &ServerContext) -> Reply {
        let Some(handler) = self.handlers.get(frame.opcode) else {
            debug!("🤷 Ignoring unknown opcode {}", frame.opcode);
            return Reply::Nothing;
        };

        let error = match handler.handle(frame.payload, ctx).await {
            Ok(reply) => return reply,
            Err(error) => error,
        };

        if let HandlerError::Request { envelope, source } = &error {
            warn!(
                "❌ {} request {} failed: {}",
                frame.opcode, envelope.request_id, source
            );
            return envelope.failure(&error);
        }

        warn!("❌ Dropping {} packet: {}", frame.opcode, error);
        Reply::Nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::handlers::tests::test_context;
    use crate::messaging::{Envelope, ERROR_OPCODE, ERROR_SERVICE};
    use async_trait::async_trait;
    use bitrealm_protocol::{decode, split_fields, AccountId, RequestId};

    struct Failing;

    #[async_trait]
    impl OpcodeHandler for Failing {
        async fn handle(&self, payload: &str, _ctx: &ServerContext) -> Result<Reply, HandlerError> {
            let [request, account] = split_fields::<2>(payload)?;
            let envelope = Envelope::parse(request, account)?;
            Err(HandlerError::NotFound("nothing here".to_string()).for_request(envelope))
        }
    }

    #[test]
    fn test_default_handlers_cover_every_opcode() {
        let dispatcher = Dispatcher::with_default_handlers();
        for opcode in [
            "L0#", "BR#", "BF#", "LU#", "HB#", "PR#", "LL#", "RLL#", "IA#", "IU#", "LE#", "LUE#",
            "SU#", "OK#", "SOS#", "TT#", "XX#",
        ] {
            assert!(dispatcher.handles(opcode), "missing handler for {opcode}");
        }
        assert_eq!(dispatcher.opcode_count(), 17);
    }

    #[tokio::test]
    async fn test_unknown_opcode_is_ignored() {
        let (ctx, _) = test_context().await;
        let dispatcher = Dispatcher::with_default_handlers();
        let reply = dispatcher.dispatch(decode("ZZ#a?b").unwrap(), &ctx).await;
        assert_eq!(reply, Reply::Nothing);
    }

    #[tokio::test]
    async fn test_request_failure_becomes_error_packet() {
        let (ctx, _) = test_context().await;
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("FX#", Failing);

        let request = RequestId::new();
        let account = AccountId::new();
        let line = format!("FX#{request}?{account}");
        let reply = dispatcher.dispatch(decode(&line).unwrap(), &ctx).await;

        match reply {
            Reply::Deliver { account_id, packet } => {
                assert_eq!(account_id, account);
                assert_eq!(packet.request_id, request);
                assert_eq!(packet.opcode, ERROR_OPCODE);
                assert_eq!(packet.service_tag, ERROR_SERVICE);
                assert_eq!(packet.content, "nothing here");
            }
            other => panic!("expected an error delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_ids_are_dropped() {
        let (ctx, _) = test_context().await;
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("FX#", Failing);

        let reply = dispatcher
            .dispatch(decode("FX#not-a-uuid?also-not").unwrap(), &ctx)
            .await;
        assert_eq!(reply, Reply::Nothing);
    }
}

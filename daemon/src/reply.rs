use async_trait::async_trait;
use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};

use crate::cache::ReplyAction;
use crate::service::{self, ShadeService};

/// Capability that carries a reply back to the notification's sender.
/// An error from `deliver` means the target is stale; the bridge maps
/// it to a plain `false`, never an error response.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn deliver(&self, action: &ReplyAction, message: &str) -> Result<(), BridgeError>;
}

/// Production transport: emits the action-invoked and replied signals
/// on the served notification interface, which is how senders observe
/// inline replies.
pub struct SignalReplyTransport {
    connection: Option<zbus::Connection>,
}

impl SignalReplyTransport {
    pub fn new(connection: Option<zbus::Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ReplyTransport for SignalReplyTransport {
    async fn deliver(&self, action: &ReplyAction, message: &str) -> Result<(), BridgeError> {
        let Some(connection) = &self.connection else {
            return Err(bridge_err!(
                BridgeErrorKind::BusRequest,
                "no bus connection to deliver the reply on"
            ));
        };

        let iface = connection
            .object_server()
            .interface::<_, ShadeService>(service::OBJECT_PATH)
            .await
            .map_err(|e| bridge_err!(BridgeErrorKind::BusRequest, e.to_string()))?;
        let emitter = iface.signal_emitter();

        ShadeService::action_invoked(emitter, action.id, &action.action_key)
            .await
            .map_err(|e| bridge_err!(BridgeErrorKind::BusRequest, e.to_string()))?;
        ShadeService::notification_replied(emitter, action.id, message)
            .await
            .map_err(|e| bridge_err!(BridgeErrorKind::BusRequest, e.to_string()))?;
        Ok(())
    }
}

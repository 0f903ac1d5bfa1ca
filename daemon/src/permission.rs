use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use tracing::warn;

use crate::service;

/// Outcome of asking the platform for the notification-service role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Accepted,
    Cancelled,
    Other,
}

/// Capability for checking and requesting the listener role, injected
/// into the bridge so it never talks to the bus directly.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    /// Whether the role is currently held.
    async fn is_granted(&self) -> bool;

    /// Ask the platform for the role. Errors only when there is no
    /// surface to ask on at all.
    async fn request(&self) -> Result<PermissionDecision, BridgeError>;
}

/// Production prompter: the role is ownership of the well-known
/// notification bus name. `connection` is `None` when the session bus
/// was unreachable at startup.
pub struct BusPermission {
    connection: Option<zbus::Connection>,
    granted: AtomicBool,
}

impl BusPermission {
    pub fn new(connection: Option<zbus::Connection>) -> Self {
        Self {
            connection,
            granted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PermissionPrompter for BusPermission {
    async fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Relaxed)
    }

    async fn request(&self) -> Result<PermissionDecision, BridgeError> {
        let Some(connection) = &self.connection else {
            return Err(bridge_err!(
                BridgeErrorKind::ActivityNotFound,
                "No surface found to request the notification listener role"
            ));
        };
        if self.granted.load(Ordering::Relaxed) {
            return Ok(PermissionDecision::Accepted);
        }

        match connection.request_name(service::BUS_NAME).await {
            Ok(()) => {
                self.granted.store(true, Ordering::Relaxed);
                Ok(PermissionDecision::Accepted)
            }
            // Another service holds the name; the user keeps whatever
            // state they already had.
            Err(zbus::Error::NameTaken) => Ok(PermissionDecision::Cancelled),
            Err(e) => {
                warn!(error = %e, "name request failed");
                Ok(PermissionDecision::Other)
            }
        }
    }
}

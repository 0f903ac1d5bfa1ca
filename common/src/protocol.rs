use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{errors::BridgeError, event::NotificationEvent};

pub struct SocketData;
impl SocketData {
    pub const SOCKET_ADDR: &'static str = "/tmp/shade.sock";
}

/// Method calls the host can issue over the bridge socket.
#[derive(Deserialize, Serialize, Debug, Clone, AsRefStr)]
pub enum Request {
    Ping,
    GetStatus,

    IsPermissionGranted,
    RequestPermission,
    SendReply { message: String, notification_id: u32 },
    ActiveNotifications,

    /// Switches the connection into streaming mode; every event the
    /// listener builds afterwards is delivered on it until disconnect.
    Subscribe,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum Response {
    Ok,
    Error(String),
    Pong,
    Status {
        running: bool,
        permission_granted: bool,
    },
    Granted(bool),
    ReplySent(bool),
    Notifications(Vec<NotificationEvent>),
    Event(NotificationEvent),
}

pub trait IntoResponse {
    fn into_response(self) -> Response;
}
impl IntoResponse for Result<Response, BridgeError> {
    fn into_response(self) -> Response {
        match self {
            Ok(resp) => resp,
            Err(e) => Response::Error(e.to_string()),
        }
    }
}

use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use common::event::NotificationEvent;
use common::protocol::{Request, Response, SocketData};
use common::tokio::{AsyncSizedMessage, SizedMessageObj};
use tokio::net::UnixStream;

pub struct ClientConnection {
    stream: UnixStream,
}

impl ClientConnection {
    pub async fn new() -> Result<Self, BridgeError> {
        let path = std::env::var("SHADE_SOCKET")
            .unwrap_or_else(|_| SocketData::SOCKET_ADDR.to_string());
        let stream = UnixStream::connect(&path)
            .await
            .map_err(|e| bridge_err!(BridgeErrorKind::StreamConnect, "{}: {}", path, e))?;

        Ok(Self { stream })
    }

    pub async fn send(&mut self, req: Request) -> Result<Response, BridgeError> {
        self.stream
            .write_sized(SizedMessageObj::from_struct(&req)?)
            .await?;

        let buf = self.stream.read_sized().await?;
        bincode::deserialize(&buf)
            .map_err(|e| bridge_err!(BridgeErrorKind::Deserialize, e.to_string()))
    }

    /// Switches the connection into streaming mode. The daemon relays
    /// every notification event it builds from this point on.
    pub async fn subscribe(mut self) -> Result<EventStream, BridgeError> {
        match self.send(Request::Subscribe).await? {
            Response::Ok => Ok(EventStream {
                stream: self.stream,
            }),
            Response::Error(msg) => Err(bridge_err!(BridgeErrorKind::InvalidData, msg)),
            other => Err(bridge_err!(
                BridgeErrorKind::InvalidData,
                "unexpected subscribe response: {:?}",
                other
            )),
        }
    }
}

pub struct EventStream {
    stream: UnixStream,
}

impl EventStream {
    /// Next relayed event; `None` once the daemon hangs up.
    pub async fn next(&mut self) -> Result<Option<NotificationEvent>, BridgeError> {
        loop {
            let buf = match self.stream.read_sized().await {
                Ok(buf) => buf,
                Err(_) => return Ok(None),
            };
            let resp: Response = bincode::deserialize(&buf)
                .map_err(|e| bridge_err!(BridgeErrorKind::Deserialize, e.to_string()))?;
            if let Response::Event(event) = resp {
                return Ok(Some(event));
            }
        }
    }
}

use std::sync::Arc;

use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use common::protocol::{Request, Response};
use common::tokio::{AsyncSizedMessage, SizedMessageObj};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bridge::Bridge;
use crate::cache::ActionCache;
use crate::config::DaemonConfig;
use crate::icon::IconResolver;
use crate::listener::Listener;
use crate::permission::{BusPermission, PermissionDecision, PermissionPrompter};
use crate::relay::EventRelay;
use crate::reply::{ReplyTransport, SignalReplyTransport};

mod bridge;
mod cache;
mod config;
mod icon;
mod listener;
mod permission;
mod relay;
mod reply;
mod service;

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = DaemonConfig::from_env();
    let cache = Arc::new(ActionCache::new(config.cache_capacity));
    let relay = EventRelay::new();
    let listener = Arc::new(RwLock::new(Listener::new(
        Arc::clone(&cache),
        relay.clone(),
        IconResolver::from_xdg(),
    )));

    // Serve the notification interface; without a session bus the
    // daemon still answers bridge calls, it just cannot listen.
    let connection = match service::attach(Arc::clone(&listener)).await {
        Ok(connection) => Some(connection),
        Err(e) => {
            warn!(error = %e, "session bus unavailable; bridge-only mode");
            None
        }
    };

    let prompter = Arc::new(BusPermission::new(connection.clone()));
    match prompter.request().await {
        Ok(PermissionDecision::Accepted) => info!("listener attached"),
        Ok(decision) => info!(?decision, "listener role not held yet"),
        Err(e) => debug!(error = %e, "no surface to request the listener role"),
    }
    let transport = Arc::new(SignalReplyTransport::new(connection));

    let bridge = Arc::new(Bridge::new(
        listener,
        cache,
        prompter as Arc<dyn PermissionPrompter>,
        transport as Arc<dyn ReplyTransport>,
    ));

    let _ = std::fs::remove_file(&config.socket_path);
    let socket = UnixListener::bind(&config.socket_path)
        .map_err(|e| bridge_err!(BridgeErrorKind::StreamBind, e.to_string()))?;
    info!(path = %config.socket_path.display(), "bridge listening");

    loop {
        let (stream, _) = socket
            .accept()
            .await
            .map_err(|e| bridge_err!(BridgeErrorKind::StreamRead, e.to_string()))?;
        let bridge = Arc::clone(&bridge);
        let relay = relay.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, bridge, relay).await {
                debug!(error = %e, "connection closed");
            }
        });
    }
}

async fn serve_connection(
    mut stream: UnixStream,
    bridge: Arc<Bridge>,
    relay: EventRelay,
) -> Result<(), BridgeError> {
    loop {
        let buf = stream.read_sized().await?;
        let req: Request = bincode::deserialize(&buf)
            .map_err(|e| bridge_err!(BridgeErrorKind::Deserialize, e.to_string()))?;
        debug!(request = req.as_ref(), "bridge call");

        let streaming = matches!(req, Request::Subscribe);
        let resp = bridge.handle(req).await;
        stream.write_sized(SizedMessageObj::from_struct(&resp)?).await?;

        if streaming {
            return stream_events(stream, relay).await;
        }
    }
}

/// Streams every relayed event to the subscriber until it disconnects.
async fn stream_events(mut stream: UnixStream, relay: EventRelay) -> Result<(), BridgeError> {
    let mut events = relay.subscribe();
    info!(subscribers = relay.subscriber_count(), "event subscriber attached");
    loop {
        match events.recv().await {
            Ok(event) => {
                let msg = SizedMessageObj::from_struct(&Response::Event(event))?;
                stream.write_sized(msg).await?;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagging; events dropped");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use tokio::sync::RwLock;
use tracing::info;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::{OwnedValue, Value};

use crate::icon::RawImage;
use crate::listener::{Listener, RawNotification};

pub const BUS_NAME: &str = "org.freedesktop.Notifications";
pub const OBJECT_PATH: &str = "/org/freedesktop/Notifications";

/// Reason code for `NotificationClosed`: closed by a
/// `CloseNotification` call.
const CLOSE_REASON_CALL: u32 = 3;

/// Bus-facing adapter: translates notification interface calls into
/// listener callbacks. All normalization lives in [`Listener`].
pub struct ShadeService {
    listener: Arc<RwLock<Listener>>,
}

impl ShadeService {
    pub fn new(listener: Arc<RwLock<Listener>>) -> Self {
        Self { listener }
    }
}

#[interface(name = "org.freedesktop.Notifications")]
impl ShadeService {
    async fn notify(
        &self,
        app_name: String,
        replaces_id: u32,
        app_icon: String,
        summary: String,
        body: String,
        actions: Vec<String>,
        hints: HashMap<String, OwnedValue>,
        _expire_timeout: i32,
    ) -> u32 {
        let raw = raw_from_wire(
            app_name,
            replaces_id,
            app_icon,
            summary,
            body,
            actions,
            &hints,
        );
        let mut listener = self.listener.write().await;
        listener.handle_posted(raw)
    }

    async fn close_notification(
        &self,
        id: u32,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) {
        {
            let mut listener = self.listener.write().await;
            listener.handle_removed(id);
        }
        let _ = Self::notification_closed(&emitter, id, CLOSE_REASON_CALL).await;
    }

    fn get_server_information(&self) -> (String, String, String, String) {
        (
            "shade-daemon".into(),
            "shade".into(),
            env!("CARGO_PKG_VERSION").into(),
            "1.2".into(),
        )
    }

    fn get_capabilities(&self) -> Vec<String> {
        vec!["body".into(), "actions".into(), "inline-reply".into()]
    }

    #[zbus(signal)]
    pub async fn notification_closed(
        emitter: &SignalEmitter<'_>,
        id: u32,
        reason: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn action_invoked(
        emitter: &SignalEmitter<'_>,
        id: u32,
        action_key: &str,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn notification_replied(
        emitter: &SignalEmitter<'_>,
        id: u32,
        text: &str,
    ) -> zbus::Result<()>;
}

/// Serves the notification interface on the session bus. Name
/// ownership is requested separately through the permission prompter.
pub async fn attach(listener: Arc<RwLock<Listener>>) -> Result<zbus::Connection, BridgeError> {
    let connection = zbus::connection::Builder::session()
        .map_err(|e| bridge_err!(BridgeErrorKind::BusConnect, e.to_string()))?
        .serve_at(OBJECT_PATH, ShadeService::new(listener))
        .map_err(|e| bridge_err!(BridgeErrorKind::BusConnect, e.to_string()))?
        .build()
        .await
        .map_err(|e| bridge_err!(BridgeErrorKind::BusConnect, e.to_string()))?;
    info!(path = OBJECT_PATH, "notification interface served");
    Ok(connection)
}

fn raw_from_wire(
    app_name: String,
    replaces_id: u32,
    app_icon: String,
    summary: String,
    body: String,
    actions: Vec<String>,
    hints: &HashMap<String, OwnedValue>,
) -> RawNotification {
    RawNotification {
        app_name,
        replaces_id,
        app_icon,
        summary,
        body,
        actions,
        desktop_entry: hints.get("desktop-entry").and_then(string_hint),
        group_key: hints.get("x-shade-group").and_then(string_hint),
        is_group_summary: hints
            .get("x-shade-group-summary")
            .and_then(bool_hint)
            .unwrap_or(false),
        image_path: hints.get("image-path").and_then(string_hint),
        image_data: hints.get("image-data").and_then(image_hint),
    }
}

fn string_hint(value: &OwnedValue) -> Option<String> {
    match value.deref() {
        Value::Str(s) => Some(s.as_str().to_owned()),
        _ => None,
    }
}

fn bool_hint(value: &OwnedValue) -> Option<bool> {
    match value.deref() {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

/// `image-data` arrives as `(iiibiiay)`; any shape mismatch degrades
/// to no picture.
fn image_hint(value: &OwnedValue) -> Option<RawImage> {
    let Value::Structure(st) = value.deref() else {
        return None;
    };
    let fields = st.fields();
    if fields.len() != 7 {
        return None;
    }
    let (
        Value::I32(width),
        Value::I32(height),
        Value::I32(rowstride),
        Value::Bool(has_alpha),
        Value::I32(bits_per_sample),
        Value::I32(channels),
        Value::Array(data),
    ) = (
        &fields[0], &fields[1], &fields[2], &fields[3], &fields[4], &fields[5], &fields[6],
    )
    else {
        return None;
    };

    let bytes: Option<Vec<u8>> = data
        .iter()
        .map(|v| match v {
            Value::U8(b) => Some(*b),
            _ => None,
        })
        .collect();

    Some(RawImage {
        width: *width,
        height: *height,
        rowstride: *rowstride,
        has_alpha: *has_alpha,
        bits_per_sample: *bits_per_sample,
        channels: *channels,
        data: bytes?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(value: Value<'_>) -> OwnedValue {
        value.try_to_owned().unwrap()
    }

    #[test]
    fn string_and_bool_hints_parse() {
        let mut hints = HashMap::new();
        hints.insert(
            "desktop-entry".to_owned(),
            owned(Value::from("org.example.chat")),
        );
        hints.insert("x-shade-group-summary".to_owned(), owned(Value::from(true)));

        let raw = raw_from_wire(
            "Chat".into(),
            0,
            String::new(),
            String::new(),
            String::new(),
            Vec::new(),
            &hints,
        );
        assert_eq!(raw.desktop_entry.as_deref(), Some("org.example.chat"));
        assert!(raw.is_group_summary);
        assert!(raw.group_key.is_none());
    }

    #[test]
    fn mistyped_hints_degrade_to_absent() {
        let mut hints = HashMap::new();
        hints.insert("desktop-entry".to_owned(), owned(Value::from(17_i32)));
        hints.insert("image-data".to_owned(), owned(Value::from("not an image")));

        let raw = raw_from_wire(
            "Chat".into(),
            0,
            String::new(),
            String::new(),
            String::new(),
            Vec::new(),
            &hints,
        );
        assert!(raw.desktop_entry.is_none());
        assert!(raw.image_data.is_none());
    }
}

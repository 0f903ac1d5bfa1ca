use std::collections::HashMap;
use std::sync::Arc;

use common::event::NotificationEvent;
use tracing::debug;

use crate::cache::{ActionCache, ReplyAction};
use crate::icon::{IconResolver, RawImage};
use crate::relay::EventRelay;

/// Notification fields as they arrive from the platform surface,
/// before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawNotification {
    pub app_name: String,
    pub replaces_id: u32,
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<String>,
    pub desktop_entry: Option<String>,
    pub group_key: Option<String>,
    pub is_group_summary: bool,
    pub image_path: Option<String>,
    pub image_data: Option<RawImage>,
}

impl RawNotification {
    /// Whether the action list carries an inline-reply action. Actions
    /// come as key/label pairs.
    pub fn reply_capable(&self) -> bool {
        self.actions
            .chunks(2)
            .any(|pair| pair.first().is_some_and(|key| key == ReplyAction::ACTION_KEY))
    }
}

/// Normalizes platform callbacks into [`NotificationEvent`]s, keeps the
/// active set, and feeds the relay and the action cache.
///
/// Owns no platform state itself; the bus surface adapts its callbacks
/// onto [`handle_posted`](Self::handle_posted) and
/// [`handle_removed`](Self::handle_removed), and tests drive those
/// directly.
pub struct Listener {
    next_id: u32,
    active: HashMap<u32, NotificationEvent>,
    cache: Arc<ActionCache>,
    relay: EventRelay,
    resolver: IconResolver,
}

impl Listener {
    pub fn new(cache: Arc<ActionCache>, relay: EventRelay, resolver: IconResolver) -> Self {
        Self {
            next_id: 0,
            active: HashMap::new(),
            cache,
            relay,
            resolver,
        }
    }

    /// Posted callback: builds the event, registers the reply action
    /// for reply-capable notifications, publishes to the relay.
    /// Returns the id assigned to the notification.
    pub fn handle_posted(&mut self, raw: RawNotification) -> u32 {
        let id = if raw.replaces_id != 0 {
            raw.replaces_id
        } else {
            self.next_id += 1;
            self.next_id
        };

        let event = self.build_event(id, &raw);
        debug!(id, app = %event.app_name, can_reply = event.can_reply, "notification posted");

        if event.can_reply {
            self.cache.insert(id, ReplyAction::new(id));
            debug!(id, cached = self.cache.len(), "reply action cached");
        }
        self.active.insert(id, event.clone());
        self.relay.publish(event);
        id
    }

    /// Removed callback: drops the notification from the active set,
    /// evicts its reply action, and republishes the event flagged as
    /// removed. Unknown ids are ignored.
    pub fn handle_removed(&mut self, id: u32) {
        let Some(mut event) = self.active.remove(&id) else {
            return;
        };
        debug!(id, "notification removed");
        self.cache.evict(id);
        event.is_removed = true;
        self.relay.publish(event);
    }

    /// Snapshot of the currently active notifications, ordered by id.
    /// Reply actions for reply-capable entries are re-registered so a
    /// host that attaches late can still answer them.
    pub fn active(&self) -> Vec<NotificationEvent> {
        let mut events: Vec<NotificationEvent> = self.active.values().cloned().collect();
        events.sort_by_key(|event| event.id);
        for event in &events {
            if event.can_reply {
                self.cache.insert(event.id, ReplyAction::new(event.id));
            }
        }
        events
    }

    fn build_event(&self, id: u32, raw: &RawNotification) -> NotificationEvent {
        let package_name = raw
            .desktop_entry
            .clone()
            .unwrap_or_else(|| raw.app_name.clone());
        // Display-name resolution falls back to whatever the sender
        // gave us, never to an error.
        let app_name = self
            .resolver
            .app_name(&package_name)
            .unwrap_or_else(|| {
                if raw.app_name.is_empty() {
                    package_name.clone()
                } else {
                    raw.app_name.clone()
                }
            });

        let extras_picture = raw.image_data.as_ref().and_then(RawImage::encode_png);

        NotificationEvent {
            id,
            package_name,
            app_name,
            post_time: chrono::Utc::now().timestamp_millis(),
            can_reply: raw.reply_capable(),
            group_key: raw.group_key.clone(),
            is_group_summary: raw.is_group_summary,
            title: non_empty(&raw.summary),
            content: non_empty(&raw.body),
            is_removed: false,
            have_extra_picture: raw.image_data.is_some(),
            app_icon: self.resolver.app_icon(&raw.app_icon),
            large_icon: raw
                .image_path
                .as_deref()
                .and_then(|path| self.resolver.picture_from_path(path)),
            extras_picture,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_owned()) }
}

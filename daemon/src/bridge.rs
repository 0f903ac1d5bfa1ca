use std::sync::Arc;

use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use common::protocol::{IntoResponse, Request, Response};
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::ActionCache;
use crate::listener::Listener;
use crate::permission::{PermissionDecision, PermissionPrompter};
use crate::reply::ReplyTransport;

/// Dispatches host method calls onto the injected capabilities and the
/// listener handle.
pub struct Bridge {
    listener: Arc<RwLock<Listener>>,
    cache: Arc<ActionCache>,
    prompter: Arc<dyn PermissionPrompter>,
    transport: Arc<dyn ReplyTransport>,
}

impl Bridge {
    pub fn new(
        listener: Arc<RwLock<Listener>>,
        cache: Arc<ActionCache>,
        prompter: Arc<dyn PermissionPrompter>,
        transport: Arc<dyn ReplyTransport>,
    ) -> Self {
        Self {
            listener,
            cache,
            prompter,
            transport,
        }
    }

    pub async fn handle(&self, req: Request) -> Response {
        match req {
            Request::Ping => Response::Pong,
            Request::GetStatus => Response::Status {
                running: true,
                permission_granted: self.prompter.is_granted().await,
            },
            Request::IsPermissionGranted => Response::Granted(self.prompter.is_granted().await),
            Request::RequestPermission => self.request_permission().await.into_response(),
            Request::SendReply {
                message,
                notification_id,
            } => self.send_reply(&message, notification_id).await.into_response(),
            Request::ActiveNotifications => self.active_notifications().await.into_response(),
            // Streaming is wired up by the connection loop.
            Request::Subscribe => Response::Ok,
        }
    }

    async fn request_permission(&self) -> Result<Response, BridgeError> {
        let granted = match self.prompter.request().await? {
            PermissionDecision::Accepted => true,
            // Cancelling keeps whatever state the user already had.
            PermissionDecision::Cancelled => self.prompter.is_granted().await,
            PermissionDecision::Other => false,
        };
        Ok(Response::Granted(granted))
    }

    async fn send_reply(&self, message: &str, id: u32) -> Result<Response, BridgeError> {
        let Some(action) = self.cache.get(id) else {
            return Err(bridge_err!(
                BridgeErrorKind::NotificationNotFound,
                "Can't find this cached notification"
            ));
        };

        match self.transport.deliver(&action, message).await {
            Ok(()) => Ok(Response::ReplySent(true)),
            // A stale target reports false, it does not raise.
            Err(e) => {
                warn!(id, error = %e, "reply delivery failed");
                Ok(Response::ReplySent(false))
            }
        }
    }

    async fn active_notifications(&self) -> Result<Response, BridgeError> {
        if !self.prompter.is_granted().await {
            return Err(bridge_err!(
                BridgeErrorKind::ServiceUnavailable,
                "NotificationService not running"
            ));
        }
        let listener = self.listener.read().await;
        Ok(Response::Notifications(listener.active()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_CACHE_CAPACITY, ReplyAction};
    use crate::icon::IconResolver;
    use crate::listener::RawNotification;
    use crate::relay::EventRelay;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakePrompter {
        granted: AtomicBool,
        decision: PermissionDecision,
        available: bool,
    }

    impl FakePrompter {
        fn new(granted: bool, decision: PermissionDecision) -> Self {
            Self {
                granted: AtomicBool::new(granted),
                decision,
                available: true,
            }
        }

        fn unavailable() -> Self {
            Self {
                granted: AtomicBool::new(false),
                decision: PermissionDecision::Other,
                available: false,
            }
        }
    }

    #[async_trait]
    impl PermissionPrompter for FakePrompter {
        async fn is_granted(&self) -> bool {
            self.granted.load(Ordering::Relaxed)
        }
        async fn request(&self) -> Result<PermissionDecision, BridgeError> {
            if !self.available {
                return Err(bridge_err!(
                    BridgeErrorKind::ActivityNotFound,
                    "No surface found to request the notification listener role"
                ));
            }
            if self.decision == PermissionDecision::Accepted {
                self.granted.store(true, Ordering::Relaxed);
            }
            Ok(self.decision)
        }
    }

    struct FakeTransport {
        fail: bool,
        delivered: Mutex<Vec<(u32, String)>>,
    }

    impl FakeTransport {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReplyTransport for FakeTransport {
        async fn deliver(&self, action: &ReplyAction, message: &str) -> Result<(), BridgeError> {
            if self.fail {
                return Err(bridge_err!(BridgeErrorKind::BusRequest, "target expired"));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((action.id, message.to_owned()));
            Ok(())
        }
    }

    struct Fixture {
        bridge: Bridge,
        listener: Arc<RwLock<Listener>>,
        transport: Arc<FakeTransport>,
    }

    fn fixture(prompter: FakePrompter, failing_transport: bool) -> Fixture {
        let cache = Arc::new(ActionCache::new(DEFAULT_CACHE_CAPACITY));
        let relay = EventRelay::new();
        let listener = Arc::new(RwLock::new(Listener::new(
            Arc::clone(&cache),
            relay,
            IconResolver::empty(),
        )));
        let transport = Arc::new(FakeTransport::new(failing_transport));
        let bridge = Bridge::new(
            Arc::clone(&listener),
            cache,
            Arc::new(prompter),
            Arc::clone(&transport) as Arc<dyn ReplyTransport>,
        );
        Fixture {
            bridge,
            listener,
            transport,
        }
    }

    fn replyable_raw() -> RawNotification {
        RawNotification {
            app_name: "Chat".into(),
            summary: "ping".into(),
            actions: vec![ReplyAction::ACTION_KEY.into(), "Reply".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reply_to_unknown_id_is_the_not_found_error() {
        let fx = fixture(
            FakePrompter::new(true, PermissionDecision::Accepted),
            false,
        );
        let resp = fx
            .bridge
            .handle(Request::SendReply {
                message: "hi".into(),
                notification_id: 4242,
            })
            .await;
        match resp {
            Response::Error(msg) => {
                assert_eq!(msg, "Notification: Can't find this cached notification")
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_to_cached_id_goes_through_the_transport() {
        let fx = fixture(
            FakePrompter::new(true, PermissionDecision::Accepted),
            false,
        );
        let id = fx.listener.write().await.handle_posted(replyable_raw());

        let resp = fx
            .bridge
            .handle(Request::SendReply {
                message: "on my way".into(),
                notification_id: id,
            })
            .await;
        assert!(matches!(resp, Response::ReplySent(true)));
        assert_eq!(
            fx.transport.delivered.lock().unwrap().as_slice(),
            &[(id, "on my way".to_owned())]
        );
    }

    #[tokio::test]
    async fn stale_reply_target_reports_false_not_error() {
        let fx = fixture(FakePrompter::new(true, PermissionDecision::Accepted), true);
        let id = fx.listener.write().await.handle_posted(replyable_raw());

        let resp = fx
            .bridge
            .handle(Request::SendReply {
                message: "hi".into(),
                notification_id: id,
            })
            .await;
        assert!(matches!(resp, Response::ReplySent(false)));
    }

    #[tokio::test]
    async fn active_query_before_attach_is_service_unavailable() {
        let fx = fixture(
            FakePrompter::new(false, PermissionDecision::Accepted),
            false,
        );
        let resp = fx.bridge.handle(Request::ActiveNotifications).await;
        match resp {
            Response::Error(msg) => {
                assert_eq!(msg, "ServiceUnavailable: NotificationService not running")
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn active_query_returns_the_snapshot_once_attached() {
        let fx = fixture(
            FakePrompter::new(true, PermissionDecision::Accepted),
            false,
        );
        fx.listener.write().await.handle_posted(replyable_raw());

        let first = fx.bridge.handle(Request::ActiveNotifications).await;
        let second = fx.bridge.handle(Request::ActiveNotifications).await;
        match (first, second) {
            (Response::Notifications(a), Response::Notifications(b)) => {
                assert_eq!(a.len(), 1);
                assert_eq!(a, b);
            }
            other => panic!("expected Notifications, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_permission_request_falls_back_to_granted_state() {
        let fx = fixture(FakePrompter::new(true, PermissionDecision::Cancelled), false);
        let resp = fx.bridge.handle(Request::RequestPermission).await;
        assert!(matches!(resp, Response::Granted(true)));

        let fx = fixture(
            FakePrompter::new(false, PermissionDecision::Cancelled),
            false,
        );
        let resp = fx.bridge.handle(Request::RequestPermission).await;
        assert!(matches!(resp, Response::Granted(false)));
    }

    #[tokio::test]
    async fn permission_request_without_a_surface_is_activity_not_found() {
        let fx = fixture(FakePrompter::unavailable(), false);
        let resp = fx.bridge.handle(Request::RequestPermission).await;
        match resp {
            Response::Error(msg) => assert!(msg.starts_with("ACTIVITY_NOT_FOUND: ")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_reflects_the_granted_state() {
        let fx = fixture(
            FakePrompter::new(false, PermissionDecision::Accepted),
            false,
        );
        let resp = fx.bridge.handle(Request::GetStatus).await;
        match resp {
            Response::Status {
                running,
                permission_granted,
            } => {
                assert!(running);
                assert!(!permission_granted);
            }
            other => panic!("expected Status, got {other:?}"),
        }

        let resp = fx.bridge.handle(Request::IsPermissionGranted).await;
        assert!(matches!(resp, Response::Granted(false)));
    }
}

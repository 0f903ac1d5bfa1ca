use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Deferred handle for replying to a single notification without
/// reopening it. Created when a reply-capable notification arrives,
/// consumed by the bridge's send-reply call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAction {
    pub id: u32,
    pub action_key: String,
}

impl ReplyAction {
    /// Action key senders attach when a notification accepts an inline
    /// reply.
    pub const ACTION_KEY: &'static str = "inline-reply";

    pub fn new(id: u32) -> Self {
        Self {
            id,
            action_key: Self::ACTION_KEY.into(),
        }
    }
}

/// Bounded id -> [`ReplyAction`] mapping shared between the listener
/// callback task (writer) and the bridge tasks (readers).
///
/// Entries leave the cache when the notification is removed or when the
/// capacity bound pushes out the oldest insertion.
pub struct ActionCache {
    entries: DashMap<u32, ReplyAction>,
    order: Mutex<VecDeque<u32>>,
    capacity: usize,
}

impl ActionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, id: u32, action: ReplyAction) {
        let mut order = self.order_guard();
        if self.entries.insert(id, action).is_none() {
            order.push_back(id);
        }
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<ReplyAction> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Drops the entry for a removed notification, if one exists.
    pub fn evict(&self, id: u32) {
        if self.entries.remove(&id).is_some() {
            self.order_guard().retain(|key| *key != id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn order_guard(&self) -> MutexGuard<'_, VecDeque<u32>> {
        match self.order.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

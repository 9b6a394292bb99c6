//! # Message Pool
//!
//! Recycles boxed [`Message`]s so that a busy actor does not allocate for every request. The
//! pool is an explicit handle: every mailbox is given one at construction, and tests can hand
//! each actor its own pool (or a disabled one) for isolation.
//!
//! The free list is a lock-free bounded queue, so producers on any thread can acquire and
//! consumers can release concurrently. When the free list is full, released messages are
//! simply dropped.

use crate::config::PoolConfig;
use crate::message::{ActorKey, Message, MsgId, MsgKind, Payload};
use crate::sender::SenderRef;
use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::sync::Arc;

/// A shareable pool of reusable messages.
pub struct MessagePool<K: ActorKey> {
    free: Option<Arc<ArrayQueue<Box<Message<K>>>>>,
}

impl<K: ActorKey> Clone for MessagePool<K> {
    fn clone(&self) -> Self {
        Self {
            free: self.free.clone(),
        }
    }
}

impl<K: ActorKey> Default for MessagePool<K> {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl<K: ActorKey> MessagePool<K> {
    pub fn new(config: &PoolConfig) -> Self {
        if config.enabled && config.capacity > 0 {
            Self {
                free: Some(Arc::new(ArrayQueue::new(config.capacity))),
            }
        } else {
            Self::disabled()
        }
    }

    /// A pool that always allocates and never keeps released messages.
    pub fn disabled() -> Self {
        Self { free: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.free.is_some()
    }

    /// Number of messages currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.as_ref().map_or(0, |free| free.len())
    }

    /// Returns a message with every field at its default value.
    pub fn acquire(&self) -> Box<Message<K>> {
        self.free
            .as_ref()
            .and_then(|free| free.pop())
            .unwrap_or_default()
    }

    /// Resets `msg` and makes it available for reuse.
    pub fn release(&self, mut msg: Box<Message<K>>) {
        msg.reset();
        if let Some(free) = &self.free {
            // a full free list just lets the box drop
            let _ = free.push(msg);
        }
    }

    fn compose(
        &self,
        kind: MsgKind,
        sender: Option<SenderRef<K>>,
        from_key: Option<K>,
        to_key: Option<K>,
        id: MsgId,
        payload: Option<Payload>,
    ) -> Box<Message<K>> {
        let mut msg = self.acquire();
        msg.kind = kind;
        msg.sender = sender;
        msg.from_key = from_key;
        msg.to_key = to_key;
        msg.id = id;
        msg.payload = payload;
        msg
    }

    /// A request or reply. `sender` is the reply surface, if the consumer should answer.
    pub fn normal(&self, sender: Option<SenderRef<K>>, id: MsgId, payload: Payload) -> Box<Message<K>> {
        self.compose(MsgKind::Normal, sender, None, None, id, Some(payload))
    }

    pub fn signup(&self, key: K, sender: SenderRef<K>) -> Box<Message<K>> {
        self.compose(MsgKind::Signup, Some(sender), Some(key), None, MsgId::default(), None)
    }

    /// Withdraws the signup of `key`. `sender` must be the surface the key signed up with.
    pub fn signoff(&self, key: K, sender: SenderRef<K>) -> Box<Message<K>> {
        self.compose(MsgKind::Signoff, Some(sender), Some(key), None, MsgId::default(), None)
    }

    /// A relay request: "deliver this to `to_key` on behalf of `from_key`".
    pub fn forward_request(
        &self,
        sender: SenderRef<K>,
        from_key: K,
        to_key: K,
        id: MsgId,
        payload: Payload,
    ) -> Box<Message<K>> {
        self.compose(
            MsgKind::Forward,
            Some(sender),
            Some(from_key),
            Some(to_key),
            id,
            Some(payload),
        )
    }

    /// A relayed forward arriving at the target's owner.
    pub fn forward_delivery(
        &self,
        from_sender: SenderRef<K>,
        from_key: K,
        id: MsgId,
        payload: Payload,
    ) -> Box<Message<K>> {
        self.compose(
            MsgKind::Forward,
            Some(from_sender),
            Some(from_key),
            None,
            id,
            Some(payload),
        )
    }

    pub fn notify(&self, to_key: K, id: MsgId, payload: Payload) -> Box<Message<K>> {
        self.compose(MsgKind::Notify, None, None, Some(to_key), id, Some(payload))
    }
}

impl<K: ActorKey> fmt::Debug for MessagePool<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePool")
            .field("enabled", &self.is_enabled())
            .field("idle", &self.idle())
            .finish()
    }
}

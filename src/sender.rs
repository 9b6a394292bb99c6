//! # Capabilities
//!
//! Actors never hold references to each other, only to capabilities:
//!
//! - [`MessageSender`] is the reply surface of a response handler. A request handler receives
//!   it with every request and stores it on signup, and uses it to answer, relay forwards and
//!   push notifications.
//! - [`RequestTarget`] is the intake of a request handler. Requesters bind to it.
//!
//! Both are implemented by [`Inlet`], the producer half of a mailbox, so a capability stays
//! valid after the actor that owns the mailbox has moved onto its own thread.

use crate::error::ActorError;
use crate::mailbox::Inlet;
use crate::message::{ActorKey, Message, MsgId, Payload};
use std::sync::Arc;

/// The reply surface of an actor.
pub trait MessageSender<K: ActorKey>: Send + Sync {
    /// Enqueues a reply (or unsolicited push) with no sender attached.
    fn send(&self, id: MsgId, payload: Payload) -> Result<(), ActorError>;

    /// Enqueues a relayed forward that originated from `from_key`, whose owner is `from_sender`.
    fn forward(
        &self,
        from_sender: SenderRef<K>,
        from_key: K,
        id: MsgId,
        payload: Payload,
    ) -> Result<(), ActorError>;

    /// Enqueues a notification for the requester identified by `to_key`.
    fn notify(&self, to_key: K, id: MsgId, payload: Payload) -> Result<(), ActorError>;
}

/// Shared handle to a reply surface, as carried in messages and signup tables.
pub type SenderRef<K> = Arc<dyn MessageSender<K>>;

impl<K: ActorKey> MessageSender<K> for Inlet<K> {
    fn send(&self, id: MsgId, payload: Payload) -> Result<(), ActorError> {
        self.enqueue(self.pool().normal(None, id, payload))
    }

    fn forward(
        &self,
        from_sender: SenderRef<K>,
        from_key: K,
        id: MsgId,
        payload: Payload,
    ) -> Result<(), ActorError> {
        self.enqueue(self.pool().forward_delivery(from_sender, from_key, id, payload))
    }

    fn notify(&self, to_key: K, id: MsgId, payload: Payload) -> Result<(), ActorError> {
        self.enqueue(self.pool().notify(to_key, id, payload))
    }
}

/// The intake of a request handler.
pub trait RequestTarget<K: ActorKey> {
    fn inlet(&self) -> &Inlet<K>;

    /// Hands a message to the target's mailbox.
    fn recv(&self, msg: Box<Message<K>>) -> Result<(), ActorError> {
        self.inlet().enqueue(msg)
    }
}

impl<K: ActorKey> RequestTarget<K> for Inlet<K> {
    fn inlet(&self) -> &Inlet<K> {
        self
    }
}

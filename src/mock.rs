//! # Test Doubles
//!
//! [`RecordingSender`] implements [`MessageSender`] without a mailbox: every send, forward and
//! notify is captured in memory so a test can drive a [`Dispatcher`](crate::Dispatcher) or a
//! [`RequestHandler`](crate::RequestHandler) directly and inspect what it answered.
//!
//! | | RecordingSender | Real response handler |
//! |---|---|---|
//! | **Threads** | none | the caller's poll loop |
//! | **Determinism** | full | FIFO per producer |
//! | **Error injection** | [`RecordingSender::failing`] | close the mailbox |
//!
//! ```rust
//! use actor_mailbox::mock::RecordingSender;
//! use actor_mailbox::{Dispatcher, MessagePool, MessageSender, MsgId};
//! use std::sync::Arc;
//!
//! let mut dispatcher = Dispatcher::<u32>::default();
//! dispatcher.register_handle("ping", |_, sender, _| {
//!     if let Some(sender) = sender {
//!         let _ = sender.send(MsgId::new("pong"), Box::new(()));
//!     }
//! });
//!
//! let reply = Arc::new(RecordingSender::<u32>::new());
//! let pool = MessagePool::default();
//! let mut msg = pool.normal(Some(reply.clone()), MsgId::new("ping"), Box::new(()));
//! dispatcher.dispatch(&mut msg).unwrap();
//! assert_eq!(reply.sent_ids(), vec![MsgId::new("pong")]);
//! ```

use crate::error::ActorError;
use crate::message::{ActorKey, MsgId, MsgKind, Payload};
use crate::sender::{MessageSender, SenderRef};
use parking_lot::Mutex;

/// One captured call on a [`RecordingSender`].
pub struct Recorded<K: ActorKey> {
    pub kind: MsgKind,
    pub id: MsgId,
    /// Origin key of a forward.
    pub from_key: Option<K>,
    /// Target key of a notify.
    pub to_key: Option<K>,
    /// Origin reply surface of a forward.
    pub from_sender: Option<SenderRef<K>>,
    pub payload: Payload,
}

/// A reply surface that records instead of delivering.
pub struct RecordingSender<K: ActorKey> {
    records: Mutex<Vec<Recorded<K>>>,
    fail_with: Option<ActorError>,
}

impl<K: ActorKey> Default for RecordingSender<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ActorKey> RecordingSender<K> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A sender whose every call fails with `error` and records nothing.
    pub fn failing(error: ActorError) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    fn record(&self, recorded: Recorded<K>) -> Result<(), ActorError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.records.lock().push(recorded);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Recorded<K>> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Ids of plain sends, in call order.
    pub fn sent_ids(&self) -> Vec<MsgId> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == MsgKind::Normal)
            .map(|r| r.id.clone())
            .collect()
    }

    /// `(from_key, id)` of every forward, in call order.
    pub fn forwarded(&self) -> Vec<(K, MsgId)> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == MsgKind::Forward)
            .filter_map(|r| r.from_key.clone().map(|key| (key, r.id.clone())))
            .collect()
    }

    /// `(to_key, id)` of every notify, in call order.
    pub fn notified(&self) -> Vec<(K, MsgId)> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == MsgKind::Notify)
            .filter_map(|r| r.to_key.clone().map(|key| (key, r.id.clone())))
            .collect()
    }
}

impl<K: ActorKey> MessageSender<K> for RecordingSender<K> {
    fn send(&self, id: MsgId, payload: Payload) -> Result<(), ActorError> {
        self.record(Recorded {
            kind: MsgKind::Normal,
            id,
            from_key: None,
            to_key: None,
            from_sender: None,
            payload,
        })
    }

    fn forward(
        &self,
        from_sender: SenderRef<K>,
        from_key: K,
        id: MsgId,
        payload: Payload,
    ) -> Result<(), ActorError> {
        self.record(Recorded {
            kind: MsgKind::Forward,
            id,
            from_key: Some(from_key),
            to_key: None,
            from_sender: Some(from_sender),
            payload,
        })
    }

    fn notify(&self, to_key: K, id: MsgId, payload: Payload) -> Result<(), ActorError> {
        self.record(Recorded {
            kind: MsgKind::Notify,
            id,
            from_key: None,
            to_key: Some(to_key),
            from_sender: None,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let sender = RecordingSender::<u32>::new();
        sender.send(MsgId::new("a"), Box::new(1)).unwrap();
        sender.notify(7, MsgId::new("b"), Box::new(2)).unwrap();
        sender.send(MsgId::new("c"), Box::new(3)).unwrap();

        assert_eq!(sender.sent_ids(), vec![MsgId::new("a"), MsgId::new("c")]);
        assert_eq!(sender.notified(), vec![(7, MsgId::new("b"))]);

        let records = sender.take();
        assert_eq!(records.len(), 3);
        assert_eq!(*records[2].payload.downcast_ref::<i32>().unwrap(), 3);
        assert!(sender.is_empty());
    }

    #[test]
    fn failing_sender_records_nothing() {
        let sender = RecordingSender::<u32>::failing(ActorError::Closed);
        assert_eq!(sender.send(MsgId::new("a"), Box::new(())), Err(ActorError::Closed));
        assert!(sender.is_empty());
    }
}

//! # Messages
//!
//! This module defines the unit of communication between actors. A [`Message`] is leased from a
//! [`MessagePool`](crate::pool::MessagePool), filled by the producer, moved into a mailbox and
//! handed back to the pool by the consuming loop once it has been dispatched.
//!
//! Ownership moves with the `Box`: once a producer has enqueued a message it no longer holds a
//! reference to it, so "never touch a message after send" is enforced by the borrow checker.

use crate::sender::SenderRef;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Opaque application data carried by a message. The runtime never looks inside.
pub type Payload = Box<dyn Any + Send>;

/// Identity of a requester, chosen by the application.
///
/// Blanket-implemented for every type that can key a `HashMap` and cross threads.
pub trait ActorKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> ActorKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Message identifier used as the key of every dispatch and routing table.
///
/// Static names cost nothing to build (`MsgId::new` is `const`), so services usually declare
/// their identifiers as constants:
///
/// ```rust
/// use actor_mailbox::MsgId;
///
/// const BUY_ITEM: MsgId = MsgId::new("buy_item");
/// assert_eq!(BUY_ITEM, MsgId::from(String::from("buy_item")));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MsgId(Cow<'static, str>);

impl MsgId {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&'static str> for MsgId {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MsgId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// What a message asks its consumer to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgKind {
    /// A request (into a request handler) or a reply (into a response handler).
    #[default]
    Normal,
    /// A requester advertising its key and reply capability to a request handler.
    Signup,
    /// A requester withdrawing its signup.
    Signoff,
    /// With `to_key` set: a relay request. Without: a relayed delivery to the target's owner.
    Forward,
    /// A one-shot push to a single signed-up requester.
    Notify,
}

/// The unit of communication between actors.
///
/// Fields are filled by the pool constructors (see [`MessagePool`](crate::pool::MessagePool))
/// and read by the consuming loop through the accessors below.
pub struct Message<K: ActorKey> {
    pub(crate) kind: MsgKind,
    pub(crate) sender: Option<SenderRef<K>>,
    pub(crate) from_key: Option<K>,
    pub(crate) to_key: Option<K>,
    pub(crate) id: MsgId,
    pub(crate) payload: Option<Payload>,
}

impl<K: ActorKey> Default for Message<K> {
    fn default() -> Self {
        Self {
            kind: MsgKind::Normal,
            sender: None,
            from_key: None,
            to_key: None,
            id: MsgId::default(),
            payload: None,
        }
    }
}

impl<K: ActorKey> Message<K> {
    pub fn kind(&self) -> MsgKind {
        self.kind
    }

    pub fn id(&self) -> &MsgId {
        &self.id
    }

    pub fn sender(&self) -> Option<&SenderRef<K>> {
        self.sender.as_ref()
    }

    pub fn from_key(&self) -> Option<&K> {
        self.from_key.as_ref()
    }

    pub fn to_key(&self) -> Option<&K> {
        self.to_key.as_ref()
    }

    pub fn payload(&self) -> Option<&(dyn Any + Send)> {
        self.payload.as_deref()
    }

    /// A forward that still has to be relayed, as opposed to one already delivered.
    pub fn is_relay_request(&self) -> bool {
        self.kind == MsgKind::Forward && self.to_key.is_some()
    }

    /// True when every field holds its default value.
    pub fn is_reset(&self) -> bool {
        self.kind == MsgKind::Normal
            && self.sender.is_none()
            && self.from_key.is_none()
            && self.to_key.is_none()
            && self.id.is_empty()
            && self.payload.is_none()
    }

    /// Clears every field, dropping the payload and any sender reference.
    pub(crate) fn reset(&mut self) {
        self.kind = MsgKind::Normal;
        self.sender = None;
        self.from_key = None;
        self.to_key = None;
        self.id = MsgId::default();
        self.payload = None;
    }

    pub(crate) fn take_payload(&mut self) -> Payload {
        self.payload.take().unwrap_or_else(|| Box::new(()))
    }
}

impl<K: ActorKey> Debug for Message<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("from_key", &self.from_key)
            .field("to_key", &self.to_key)
            .field("has_sender", &self.sender.is_some())
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

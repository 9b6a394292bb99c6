//! # Runtime Errors
//!
//! Every fallible operation in the runtime returns [`ActorError`]. Errors are surfaced to the
//! immediate caller and never retried; retry policy belongs to the application.

use crate::message::{MsgId, MsgKind};

/// Errors that can occur within the actor runtime itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    /// The mailbox (and therefore the actor owning it) has been closed.
    #[error("mailbox closed")]
    Closed,
    /// A forward or notify referenced a requester key with no signup entry.
    #[error("requester key not signed up: {0}")]
    NotFoundRequesterKey(String),
    /// A forward target is not signed up and no fallback is registered for the message.
    #[error("no forward target and no fallback handler for message {0}")]
    NotFoundNoTargetForwardHandle(MsgId),
    /// Another requester on the same owner already claims this route.
    #[error("{kind:?} route for message {id} is already claimed by requester {owner}")]
    DuplicateRoute {
        kind: MsgKind,
        id: MsgId,
        owner: String,
    },
    /// The owner already has a requester with this key talking to the same target.
    #[error("requester key {0} is already signed up with this target by this owner")]
    DuplicateRequesterKey(String),
}

impl ActorError {
    pub(crate) fn requester_key(key: &impl std::fmt::Debug) -> Self {
        ActorError::NotFoundRequesterKey(format!("{key:?}"))
    }
}

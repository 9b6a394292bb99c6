//! # Requester
//!
//! A client-side proxy bound to one owner (where replies land) and one target (where requests
//! go). It registers the callbacks that handle what comes back.

use crate::error::ActorError;
use crate::mailbox::Inlet;
use crate::message::{ActorKey, MsgId, MsgKind, Payload};
use crate::response_handler::RequesterOwner;
use crate::router::{Callback, RouterHandle, Slot};
use crate::sender::{RequestTarget, SenderRef};
use tracing::debug;

/// Issues requests to a target on behalf of its owner.
///
/// Construction attaches the requester to its owner under `key` and signs it up with the
/// target, so the target can relay forwards and push notifications to it. Clones share the key
/// and the routes; they exist so that callbacks can answer through their own requester.
///
/// A requester lives on its owner's thread. Once the owner is dropped, registration fails
/// with [`ActorError::Closed`].
pub struct Requester<K: ActorKey> {
    key: K,
    slot: Slot,
    target: Inlet<K>,
    owner: SenderRef<K>,
    router: RouterHandle<K>,
}

impl<K: ActorKey> Clone for Requester<K> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: self.slot,
            target: self.target.clone(),
            owner: self.owner.clone(),
            router: self.router.clone(),
        }
    }
}

impl<K: ActorKey> Requester<K> {
    /// Attaches a requester with identity `key` to `owner` and signs it up with `target`.
    ///
    /// # Errors
    ///
    /// * [`ActorError::Closed`] if either side is already closed.
    /// * [`ActorError::DuplicateRequesterKey`] if `owner` already has a requester with this key
    ///   signed up with the same target.
    pub fn new(
        owner: &impl RequesterOwner<K>,
        target: &impl RequestTarget<K>,
        key: K,
    ) -> Result<Self, ActorError> {
        let inlet = target.inlet();
        if owner.is_closed() || inlet.is_closed() {
            return Err(ActorError::Closed);
        }
        let router = owner.router().handle();
        let slot = router.attach(key.clone(), inlet)?;

        let reply_to = owner.reply_to();
        if let Err(e) = inlet.enqueue(inlet.pool().signup(key.clone(), reply_to.clone())) {
            router.detach(slot);
            return Err(e);
        }
        debug!(key = ?key, "Requester signed up");
        Ok(Self {
            key,
            slot,
            target: inlet.clone(),
            owner: reply_to,
            router,
        })
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// The intake this requester sends to.
    pub fn target(&self) -> &Inlet<K> {
        &self.target
    }

    /// Sends a normal request; the reply comes back to the owner.
    pub fn request(&self, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        let pool = self.target.pool();
        self.target
            .enqueue(pool.normal(Some(self.owner.clone()), id.into(), payload))
    }

    /// Asks the target to relay `payload` to the requester signed up as `to_key`.
    pub fn request_forward(&self, to_key: K, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        let pool = self.target.pool();
        self.target.enqueue(pool.forward_request(
            self.owner.clone(),
            self.key.clone(),
            to_key,
            id.into(),
            payload,
        ))
    }

    /// Handles normal replies with this id.
    pub fn register_callback<F>(&self, id: impl Into<MsgId>, callback: F) -> Result<(), ActorError>
    where
        F: FnMut(Payload) + 'static,
    {
        self.router
            .register(self.slot, id.into(), Callback::Reply(Box::new(callback)))
    }

    /// Handles forwards with this id relayed to this requester, given the origin key.
    pub fn register_forward<F>(&self, id: impl Into<MsgId>, callback: F) -> Result<(), ActorError>
    where
        F: FnMut(K, Payload) + 'static,
    {
        self.router
            .register(self.slot, id.into(), Callback::Forward(Box::new(callback)))
    }

    /// Handles notifications with this id pushed to this requester.
    pub fn register_notify<F>(&self, id: impl Into<MsgId>, callback: F) -> Result<(), ActorError>
    where
        F: FnMut(Payload) + 'static,
    {
        self.router
            .register(self.slot, id.into(), Callback::Notify(Box::new(callback)))
    }

    /// Whether this requester claims messages of `kind` with `id`.
    pub fn handles(&self, kind: MsgKind, id: &MsgId) -> bool {
        self.router.claims(self.slot, kind, id)
    }

    /// Detaches from the owner and tells the target to forget the signup.
    ///
    /// The owner side is cleaned up even when the target is already closed.
    pub fn signoff(&self) -> Result<(), ActorError> {
        self.router.detach(self.slot);
        self.target
            .enqueue(self.target.pool().signoff(self.key.clone(), self.owner.clone()))
    }
}

impl<K: ActorKey> std::fmt::Debug for Requester<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::{RequestHandler, ResponseHandler};

    fn pair() -> (RequestHandler<u32>, ResponseHandler<u32>) {
        let config = RuntimeConfig::named("t").with_mailbox_capacity(8);
        (RequestHandler::new(&config), ResponseHandler::new(&config))
    }

    #[test]
    fn construction_signs_up_with_target() {
        let (mut target, owner) = pair();
        let requester = Requester::new(&owner, &target, 1).unwrap();
        assert_eq!(requester.key(), &1);
        assert!(!target.is_signed_up(&1));
        target.update().unwrap();
        assert!(target.is_signed_up(&1));
    }

    #[test]
    fn closed_owner_or_target_is_rejected() {
        let (target, owner) = pair();
        owner.close();
        assert_eq!(Requester::new(&owner, &target, 1).unwrap_err(), ActorError::Closed);

        let (target, owner) = pair();
        target.close();
        assert_eq!(Requester::new(&owner, &target, 1).unwrap_err(), ActorError::Closed);
        assert_eq!(owner.requester_count(), 0);
    }

    #[test]
    fn duplicate_key_per_target_is_rejected() {
        let (target, owner) = pair();
        let _first = Requester::new(&owner, &target, 1).unwrap();
        assert_eq!(
            Requester::new(&owner, &target, 1).unwrap_err(),
            ActorError::DuplicateRequesterKey("1".to_string())
        );

        let other = RequestHandler::<u32>::new(&RuntimeConfig::named("other"));
        let second = Requester::new(&owner, &other, 1).unwrap();
        assert_eq!(second.key(), &1);
        assert_eq!(owner.requester_count(), 2);
    }

    #[test]
    fn routes_are_exclusive_per_kind() {
        let (target, owner) = pair();
        let a = Requester::new(&owner, &target, 1).unwrap();
        let b = Requester::new(&owner, &target, 2).unwrap();
        a.register_callback("buy", |_| {}).unwrap();
        assert!(matches!(
            b.register_callback("buy", |_| {}),
            Err(ActorError::DuplicateRoute { .. })
        ));
        b.register_notify("buy", |_| {}).unwrap();
        assert!(a.handles(MsgKind::Normal, &MsgId::new("buy")));
        assert!(b.handles(MsgKind::Notify, &MsgId::new("buy")));
        assert!(!b.handles(MsgKind::Normal, &MsgId::new("buy")));
    }

    #[test]
    fn signoff_cleans_both_sides() {
        let (mut target, owner) = pair();
        let requester = Requester::new(&owner, &target, 3).unwrap();
        requester.register_callback("x", |_| {}).unwrap();
        target.update().unwrap();

        requester.signoff().unwrap();
        assert_eq!(owner.requester_count(), 0);
        assert!(!requester.handles(MsgKind::Normal, &MsgId::new("x")));
        target.update().unwrap();
        assert!(!target.is_signed_up(&3));
    }

    #[test]
    fn stale_signoff_leaves_reconnected_requester_signed_up() {
        let (mut target, old_owner) = pair();
        let old = Requester::new(&old_owner, &target, 1).unwrap();
        target.update().unwrap();

        let new_owner = ResponseHandler::<u32>::new(&RuntimeConfig::named("reconnected"));
        let _new = Requester::new(&new_owner, &target, 1).unwrap();
        target.update().unwrap();

        old.signoff().unwrap();
        target.update().unwrap();
        assert!(target.is_signed_up(&1));
    }

    #[test]
    fn registration_fails_once_owner_is_gone() {
        let (target, owner) = pair();
        let requester = Requester::new(&owner, &target, 1).unwrap();
        drop(owner);
        assert_eq!(requester.register_callback("x", |_| {}), Err(ActorError::Closed));
    }
}

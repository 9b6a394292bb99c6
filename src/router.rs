//! # Response Routing
//!
//! Maps `(kind, message id)` to the single requester that claimed it, together with that
//! requester's callback. A response handler owns the [`Router`]; its requesters hold a weak
//! reference and register their callbacks through it.
//!
//! Routing state is confined to the thread that drives the response handler. It is shared
//! through `Rc<RefCell<_>>`, so neither the router nor a requester can be sent to another
//! thread by accident.

use crate::error::ActorError;
use crate::mailbox::Inlet;
use crate::message::{ActorKey, Message, MsgId, MsgKind, Payload};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Identifies one requester within its owner. Keys alone are not unique: a player may talk to
/// several services under the same key.
pub(crate) type Slot = u64;

pub(crate) enum Callback<K> {
    Reply(Box<dyn FnMut(Payload)>),
    Forward(Box<dyn FnMut(K, Payload)>),
    Notify(Box<dyn FnMut(Payload)>),
}

impl<K> Callback<K> {
    fn kind(&self) -> MsgKind {
        match self {
            Callback::Reply(_) => MsgKind::Normal,
            Callback::Forward(_) => MsgKind::Forward,
            Callback::Notify(_) => MsgKind::Notify,
        }
    }
}

struct Route<K> {
    slot: Slot,
    key: K,
    // `None` while the callback is running
    callback: Option<Callback<K>>,
}

struct Attached<K: ActorKey> {
    key: K,
    target: Inlet<K>,
}

struct Routes<K: ActorKey> {
    routes: HashMap<(MsgKind, MsgId), Route<K>>,
    requesters: HashMap<Slot, Attached<K>>,
    next_slot: Slot,
}

impl<K: ActorKey> Routes<K> {
    fn detach(&mut self, slot: Slot) -> usize {
        if let Some(attached) = self.requesters.remove(&slot) {
            debug!(key = ?attached.key, "Requester detached");
        }
        let before = self.routes.len();
        self.routes.retain(|_, route| route.slot != slot);
        before - self.routes.len()
    }
}

/// Response routing table of one owner.
pub struct Router<K: ActorKey> {
    inner: Rc<RefCell<Routes<K>>>,
}

impl<K: ActorKey> Default for Router<K> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Routes {
                routes: HashMap::new(),
                requesters: HashMap::new(),
                next_slot: 0,
            })),
        }
    }
}

impl<K: ActorKey> Router<K> {
    pub fn requester_count(&self) -> usize {
        self.inner.borrow().requesters.len()
    }

    pub fn route_count(&self) -> usize {
        self.inner.borrow().routes.len()
    }

    /// Whether some requester with this key is attached.
    pub fn is_attached(&self, key: &K) -> bool {
        self.inner
            .borrow()
            .requesters
            .values()
            .any(|attached| attached.key == *key)
    }

    /// Key of the requester that claims `(kind, id)`, if any.
    pub fn claimant(&self, kind: MsgKind, id: &MsgId) -> Option<K> {
        self.inner
            .borrow()
            .routes
            .get(&(kind, id.clone()))
            .map(|route| route.key.clone())
    }

    pub(crate) fn handle(&self) -> RouterHandle<K> {
        RouterHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Detaches every requester with this key. Returns how many routes went with them.
    pub(crate) fn detach_key(&self, key: &K) -> usize {
        let mut inner = self.inner.borrow_mut();
        let slots: Vec<Slot> = inner
            .requesters
            .iter()
            .filter(|(_, attached)| attached.key == *key)
            .map(|(slot, _)| *slot)
            .collect();
        slots.into_iter().map(|slot| inner.detach(slot)).sum()
    }

    /// Hands `msg` to the requester that claims its kind and id. Returns `false` when nobody
    /// does, so the caller can drop it.
    pub fn route(&self, msg: &mut Message<K>) -> bool {
        let route_key = (msg.kind, msg.id.clone());
        let taken = {
            let mut inner = self.inner.borrow_mut();
            match inner.routes.get_mut(&route_key) {
                Some(route) if msg.kind == MsgKind::Notify && msg.to_key.as_ref().is_some_and(|to| *to != route.key) => None,
                Some(route) => route.callback.take().map(|callback| (route.slot, callback)),
                None => None,
            }
        };
        let Some((slot, mut callback)) = taken else {
            return false;
        };

        let delivered = match &mut callback {
            Callback::Reply(f) | Callback::Notify(f) => {
                f(msg.take_payload());
                true
            }
            Callback::Forward(f) => match msg.from_key.take() {
                Some(from_key) => {
                    f(from_key, msg.take_payload());
                    true
                }
                None => false,
            },
        };

        // the callback may have replaced or removed its own route meanwhile
        let mut inner = self.inner.borrow_mut();
        if let Some(route) = inner.routes.get_mut(&route_key) {
            if route.slot == slot && route.callback.is_none() {
                route.callback = Some(callback);
            }
        }
        delivered
    }
}

/// A requester's weak view of its owner's router.
pub(crate) struct RouterHandle<K: ActorKey> {
    inner: Weak<RefCell<Routes<K>>>,
}

impl<K: ActorKey> Clone for RouterHandle<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: ActorKey> RouterHandle<K> {
    fn upgrade(&self) -> Result<Rc<RefCell<Routes<K>>>, ActorError> {
        self.inner.upgrade().ok_or(ActorError::Closed)
    }

    /// Attaches a requester that talks to `target` under `key`. Two requesters of one owner
    /// may share a key only if they talk to different targets, since the target keeps one
    /// signup per key.
    pub(crate) fn attach(&self, key: K, target: &Inlet<K>) -> Result<Slot, ActorError> {
        let inner = self.upgrade()?;
        let mut inner = inner.borrow_mut();
        if inner
            .requesters
            .values()
            .any(|attached| attached.key == key && attached.target.same_mailbox(target))
        {
            return Err(ActorError::DuplicateRequesterKey(format!("{key:?}")));
        }
        let slot = inner.next_slot;
        inner.next_slot += 1;
        inner.requesters.insert(
            slot,
            Attached {
                key,
                target: target.clone(),
            },
        );
        Ok(slot)
    }

    pub(crate) fn detach(&self, slot: Slot) -> usize {
        self.inner
            .upgrade()
            .map_or(0, |inner| inner.borrow_mut().detach(slot))
    }

    /// Claims `(kind, id)` for the requester in `slot`. A claim by the same requester replaces
    /// the callback; a claim held by another requester is rejected.
    pub(crate) fn register(&self, slot: Slot, id: MsgId, callback: Callback<K>) -> Result<(), ActorError> {
        let inner = self.upgrade()?;
        let mut inner = inner.borrow_mut();
        let key = match inner.requesters.get(&slot) {
            Some(attached) => attached.key.clone(),
            None => return Err(ActorError::Closed),
        };
        let kind = callback.kind();
        match inner.routes.get_mut(&(kind, id.clone())) {
            Some(route) if route.slot != slot => Err(ActorError::DuplicateRoute {
                kind,
                id,
                owner: format!("{:?}", route.key),
            }),
            Some(route) => {
                route.callback = Some(callback);
                Ok(())
            }
            None => {
                inner.routes.insert(
                    (kind, id),
                    Route {
                        slot,
                        key,
                        callback: Some(callback),
                    },
                );
                Ok(())
            }
        }
    }

    pub(crate) fn claims(&self, slot: Slot, kind: MsgKind, id: &MsgId) -> bool {
        self.inner.upgrade().is_some_and(|inner| {
            inner
                .borrow()
                .routes
                .get(&(kind, id.clone()))
                .is_some_and(|route| route.slot == slot)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::Mailbox;
    use crate::pool::MessagePool;
    use std::cell::Cell;

    fn target() -> Mailbox<u32> {
        Mailbox::new(4, MessagePool::default())
    }

    #[test]
    fn second_claimant_is_rejected() {
        let shop = target();
        let router = Router::<u32>::default();
        let handle = router.handle();
        let one = handle.attach(1, shop.inlet()).unwrap();
        let two = handle.attach(2, shop.inlet()).unwrap();
        handle
            .register(one, MsgId::new("buy"), Callback::Reply(Box::new(|_| {})))
            .unwrap();

        let err = handle
            .register(two, MsgId::new("buy"), Callback::Reply(Box::new(|_| {})))
            .unwrap_err();
        assert!(matches!(err, ActorError::DuplicateRoute { kind: MsgKind::Normal, .. }));

        // same id, different kind, is a different route
        handle
            .register(two, MsgId::new("buy"), Callback::Notify(Box::new(|_| {})))
            .unwrap();
        assert_eq!(router.claimant(MsgKind::Notify, &MsgId::new("buy")), Some(2));
    }

    #[test]
    fn key_is_unique_per_target() {
        let (shop, chat) = (target(), target());
        let router = Router::<u32>::default();
        let handle = router.handle();
        handle.attach(1, shop.inlet()).unwrap();
        handle.attach(1, chat.inlet()).unwrap();
        assert_eq!(
            handle.attach(1, shop.inlet()),
            Err(ActorError::DuplicateRequesterKey("1".to_string()))
        );
        assert_eq!(router.requester_count(), 2);
    }

    #[test]
    fn routes_to_exactly_one_callback() {
        let shop = target();
        let router = Router::<u32>::default();
        let handle = router.handle();
        let hits = Rc::new(Cell::new(0));
        let one = handle.attach(1, shop.inlet()).unwrap();
        handle.attach(2, shop.inlet()).unwrap();
        let counter = hits.clone();
        handle
            .register(one, MsgId::new("pong"), Callback::Reply(Box::new(move |_| counter.set(counter.get() + 1))))
            .unwrap();

        let pool = MessagePool::<u32>::default();
        let mut msg = pool.normal(None, MsgId::new("pong"), Box::new(()));
        assert!(router.route(&mut msg));
        let mut msg = pool.normal(None, MsgId::new("unknown"), Box::new(()));
        assert!(!router.route(&mut msg));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn notify_for_another_key_is_not_routed() {
        let shop = target();
        let router = Router::<u32>::default();
        let handle = router.handle();
        let one = handle.attach(1, shop.inlet()).unwrap();
        handle
            .register(one, MsgId::new("sale"), Callback::Notify(Box::new(|_| {})))
            .unwrap();

        let pool = MessagePool::<u32>::default();
        let mut msg = pool.notify(2, MsgId::new("sale"), Box::new(()));
        assert!(!router.route(&mut msg));
        let mut msg = pool.notify(1, MsgId::new("sale"), Box::new(()));
        assert!(router.route(&mut msg));
    }

    #[test]
    fn detach_removes_routes_and_weak_handles_fail_after_drop() {
        let shop = target();
        let router = Router::<u32>::default();
        let handle = router.handle();
        let one = handle.attach(1, shop.inlet()).unwrap();
        handle
            .register(one, MsgId::new("a"), Callback::Forward(Box::new(|_, _| {})))
            .unwrap();
        assert_eq!(router.detach_key(&1), 1);
        assert_eq!(router.route_count(), 0);
        assert!(!router.is_attached(&1));
        assert_eq!(
            handle.register(one, MsgId::new("a"), Callback::Reply(Box::new(|_| {}))),
            Err(ActorError::Closed)
        );

        drop(router);
        assert_eq!(handle.attach(3, shop.inlet()), Err(ActorError::Closed));
    }
}

//! # Response Handler
//!
//! The "client" half of an actor. It owns a mailbox and the [`Router`] of its requesters, and
//! is driven in poll mode by whoever owns it (a game loop, a test, a local service).

use crate::config::RuntimeConfig;
use crate::dispatch::{self, Consume};
use crate::error::ActorError;
use crate::mailbox::{Inlet, Mailbox};
use crate::message::{ActorKey, Message, MsgId, Payload};
use crate::pool::MessagePool;
use crate::router::Router;
use crate::sender::{MessageSender, SenderRef};
use crossbeam::channel::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Something [`Requester`](crate::Requester)s can attach to: it owns a router and a mailbox
/// that replies come back to.
///
/// Implemented by [`ResponseHandler`] and [`LocalService`](crate::LocalService).
pub trait RequesterOwner<K: ActorKey> {
    /// The reply surface handed to request handlers with every request and signup.
    fn reply_to(&self) -> SenderRef<K>;

    fn router(&self) -> &Router<K>;

    fn is_closed(&self) -> bool;
}

/// Routes replies, forwards and notifications to the requesters attached to it.
///
/// A response handler is confined to the thread that created it: it cannot be sent, and its
/// requesters cannot either. Request handlers on other threads reach it only through
/// [`reply_to`](RequesterOwner::reply_to).
///
/// ```rust
/// use actor_mailbox::{MessageSender, MsgId, RequestHandler, Requester, ResponseHandler, RuntimeConfig};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let mut shop = RequestHandler::<u32>::new(&RuntimeConfig::named("shop"));
/// shop.register_handle("ping", |_, sender, _| {
///     if let Some(sender) = sender {
///         let _ = sender.send(MsgId::new("ping"), Box::new("pong"));
///     }
/// });
///
/// let mut player = ResponseHandler::new(&RuntimeConfig::named("player"));
/// let requester = Requester::new(&player, &shop, 1).unwrap();
/// let answered = Rc::new(Cell::new(false));
/// let flag = answered.clone();
/// requester
///     .register_callback("ping", move |payload| {
///         flag.set(*payload.downcast::<&str>().unwrap() == "pong");
///     })
///     .unwrap();
///
/// requester.request("ping", Box::new(())).unwrap();
/// shop.update().unwrap();
/// player.update().unwrap();
/// assert!(answered.get());
/// ```
pub struct ResponseHandler<K: ActorKey> {
    name: String,
    mailbox: Mailbox<K>,
    router: Router<K>,
    reply_to: SenderRef<K>,
}

impl<K: ActorKey> ResponseHandler<K> {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_mailbox(&config.name, Mailbox::from_config(config))
    }

    pub fn with_pool(config: &RuntimeConfig, pool: MessagePool<K>) -> Self {
        Self::with_mailbox(&config.name, Mailbox::with_pool(config, pool))
    }

    /// Wraps a mailbox created elsewhere, for instance on the thread that will drive it.
    pub fn with_mailbox(name: &str, mailbox: Mailbox<K>) -> Self {
        let reply_to: SenderRef<K> = Arc::new(mailbox.inlet().clone());
        Self {
            name: name.to_string(),
            mailbox,
            router: Router::default(),
            reply_to,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inlet(&self) -> &Inlet<K> {
        self.mailbox.inlet()
    }

    pub fn mailbox(&self) -> &Mailbox<K> {
        &self.mailbox
    }

    /// Enqueues a normal message into this handler's own mailbox.
    pub fn send(&self, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        self.mailbox.inlet().send(id.into(), payload)
    }

    /// Enqueues a relayed forward into this handler's own mailbox.
    pub fn forward(
        &self,
        from_sender: SenderRef<K>,
        from_key: K,
        id: impl Into<MsgId>,
        payload: Payload,
    ) -> Result<(), ActorError> {
        self.mailbox.inlet().forward(from_sender, from_key, id.into(), payload)
    }

    pub fn requester_count(&self) -> usize {
        self.router.requester_count()
    }

    /// Detaches requester `key` and drops its routes. Its target is not told; use
    /// [`Requester::signoff`](crate::Requester::signoff) for that.
    pub fn remove_requester(&self, key: &K) -> usize {
        self.router.detach_key(key)
    }

    /// Routes one message synchronously. Returns whether a requester claimed it.
    pub fn dispatch(&mut self, mut msg: Box<Message<K>>) -> bool {
        let routed = self.router.route(&mut msg);
        self.mailbox.pool().release(msg);
        routed
    }

    /// Routes every message buffered right now; never waits.
    ///
    /// Returns how many messages were handled, or `Closed` once the handler is closed.
    pub fn update(&mut self) -> Result<usize, ActorError> {
        dispatch::poll_available(&self.name, &self.mailbox, &mut self.router)
    }

    pub fn close(&self) {
        self.mailbox.close();
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<K: ActorKey> RequesterOwner<K> for ResponseHandler<K> {
    fn reply_to(&self) -> SenderRef<K> {
        self.reply_to.clone()
    }

    fn router(&self) -> &Router<K> {
        &self.router
    }

    fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<K: ActorKey> Consume<K> for Router<K> {
    fn consume(&mut self, msg: &mut Message<K>) -> Result<(), ActorError> {
        if !self.route(msg) {
            debug!(kind = ?msg.kind(), id = %msg.id(), "Unrouted response dropped");
        }
        Ok(())
    }

    fn tick(&mut self, _elapsed: Duration) {}

    fn ticker(&self) -> Receiver<Instant> {
        channel::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requester::Requester;
    use crate::RequestHandler;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(name: &str) -> RuntimeConfig {
        RuntimeConfig::named(name).with_mailbox_capacity(8)
    }

    #[test]
    fn update_routes_replies_in_fifo_order() {
        let target = RequestHandler::<u32>::new(&config("target"));
        let mut owner = ResponseHandler::new(&config("owner"));
        let requester = Requester::new(&owner, &target, 1).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        requester
            .register_callback("n", move |payload| log.borrow_mut().push(*payload.downcast::<u32>().unwrap()))
            .unwrap();

        for n in 0..5u32 {
            owner.send("n", Box::new(n)).unwrap();
        }
        owner.send("nobody", Box::new(())).unwrap();
        assert_eq!(owner.update(), Ok(6));
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3, 4]);
        assert_eq!(owner.update(), Ok(0));
    }

    #[test]
    fn closed_handler_reports_closed() {
        let mut owner = ResponseHandler::<u32>::new(&config("owner"));
        owner.close();
        owner.close();
        assert!(owner.is_closed());
        assert_eq!(owner.update(), Err(ActorError::Closed));
        assert_eq!(owner.send("n", Box::new(())), Err(ActorError::Closed));
    }

    #[test]
    fn remove_requester_drops_its_routes() {
        let target = RequestHandler::<u32>::new(&config("target"));
        let mut owner = ResponseHandler::new(&config("owner"));
        let requester = Requester::new(&owner, &target, 7).unwrap();
        requester.register_callback("n", |_| panic!("route should be gone")).unwrap();
        assert_eq!(owner.requester_count(), 1);

        assert_eq!(owner.remove_requester(&7), 1);
        assert_eq!(owner.requester_count(), 0);
        owner.send("n", Box::new(())).unwrap();
        assert_eq!(owner.update(), Ok(1));
    }

    #[test]
    fn forward_reaches_forward_route_with_origin_key() {
        let target = RequestHandler::<u32>::new(&config("target"));
        let mut owner = ResponseHandler::new(&config("owner"));
        let requester = Requester::new(&owner, &target, 2).unwrap();
        let seen = Rc::new(RefCell::new(None));
        let log = seen.clone();
        requester
            .register_forward("ping", move |from, payload| {
                *log.borrow_mut() = Some((from, *payload.downcast::<&str>().unwrap()));
            })
            .unwrap();

        owner.forward(owner.reply_to(), 1, "ping", Box::new("hello")).unwrap();
        owner.update().unwrap();
        assert_eq!(*seen.borrow(), Some((1, "hello")));
    }
}

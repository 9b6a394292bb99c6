//! # Local Service
//!
//! An actor with both halves on one mailbox: it answers requests through its dispatch table
//! and issues requests of its own through requesters attached to it.
//!
//! Because requesters are thread-confined, a service is built on the thread that runs it. Its
//! handlers and tick stay on that thread too, so they may capture the service's own requesters
//! and issue requests while reacting to a request or a tick.
//! Create the [`Mailbox`] first, keep a clone of its inlet for the outside world, and move the
//! mailbox into the worker:
//!
//! ```rust
//! use actor_mailbox::{LocalService, Mailbox, MessageSender, MsgId, RuntimeConfig};
//! use std::thread;
//!
//! let config = RuntimeConfig::named("chat");
//! let mailbox = Mailbox::<u32>::from_config(&config);
//! let inlet = mailbox.inlet().clone();
//!
//! let worker = thread::spawn(move || {
//!     let mut chat = LocalService::with_mailbox(&config, mailbox);
//!     chat.register_handle("say", |_, _, _| {});
//!     chat.run()
//! });
//!
//! inlet.send(MsgId::new("say"), Box::new("hi")).unwrap();
//! inlet.close();
//! assert!(worker.join().unwrap().is_ok());
//! ```

use crate::config::{ClosePolicy, RuntimeConfig};
use crate::dispatch::{self, Consume, Context, Dispatcher, ThreadLocal};
use crate::error::ActorError;
use crate::mailbox::{Inlet, Mailbox};
use crate::message::{ActorKey, Message, MsgId, MsgKind, Payload};
use crate::pool::MessagePool;
use crate::response_handler::RequesterOwner;
use crate::router::Router;
use crate::sender::{RequestTarget, SenderRef};
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct ServiceCore<K: ActorKey> {
    dispatcher: Dispatcher<K, ThreadLocal>,
    router: Router<K>,
}

impl<K: ActorKey> Consume<K> for ServiceCore<K> {
    fn consume(&mut self, msg: &mut Message<K>) -> Result<(), ActorError> {
        let handled = match msg.kind() {
            MsgKind::Signup | MsgKind::Signoff => self.dispatcher.dispatch(msg)?,
            MsgKind::Forward if msg.is_relay_request() => self.dispatcher.dispatch(msg)?,
            MsgKind::Normal => self.dispatcher.dispatch(msg)? || self.router.route(msg),
            MsgKind::Forward | MsgKind::Notify => self.router.route(msg),
        };
        if !handled {
            debug!(kind = ?msg.kind(), id = %msg.id(), "Unhandled message dropped");
        }
        Ok(())
    }

    fn tick(&mut self, elapsed: Duration) {
        self.dispatcher.on_tick(elapsed);
    }

    fn ticker(&self) -> Receiver<Instant> {
        self.dispatcher.ticker()
    }
}

/// A request handler and a response handler sharing one mailbox.
///
/// Normal messages go to the dispatch table first; a normal message no handler claims is
/// offered to the requester routes, which is how replies to the service's own requests land.
pub struct LocalService<K: ActorKey> {
    name: String,
    mailbox: Mailbox<K>,
    core: ServiceCore<K>,
    reply_to: SenderRef<K>,
    close_policy: ClosePolicy,
}

impl<K: ActorKey> LocalService<K> {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_mailbox(config, Mailbox::from_config(config))
    }

    pub fn with_pool(config: &RuntimeConfig, pool: MessagePool<K>) -> Self {
        Self::with_mailbox(config, Mailbox::with_pool(config, pool))
    }

    pub fn with_mailbox(config: &RuntimeConfig, mailbox: Mailbox<K>) -> Self {
        let reply_to: SenderRef<K> = Arc::new(mailbox.inlet().clone());
        Self {
            name: config.name.clone(),
            mailbox,
            core: ServiceCore {
                dispatcher: Dispatcher::default(),
                router: Router::default(),
            },
            reply_to,
            close_policy: config.close_policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inlet(&self) -> &Inlet<K> {
        self.mailbox.inlet()
    }

    pub fn register_handle<F>(&mut self, id: impl Into<MsgId>, handle: F)
    where
        F: FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload) + 'static,
    {
        self.core.dispatcher.register_handle(id, handle);
    }

    pub fn register_forward_fallback<F>(&mut self, id: impl Into<MsgId>, fallback: F)
    where
        F: FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload) + 'static,
    {
        self.core.dispatcher.register_forward_fallback(id, fallback);
    }

    pub fn set_tick_handle<F>(&mut self, handle: F, interval: Duration)
    where
        F: FnMut(&Context<'_, K>, Duration) + 'static,
    {
        self.core.dispatcher.set_tick_handle(handle, interval);
    }

    pub fn notify(&self, to_key: K, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        self.core.dispatcher.notify(to_key, id, payload)
    }

    pub fn is_signed_up(&self, key: &K) -> bool {
        self.core.dispatcher.is_signed_up(key)
    }

    pub fn signup_count(&self) -> usize {
        self.core.dispatcher.signup_count()
    }

    pub fn requester_count(&self) -> usize {
        self.core.router.requester_count()
    }

    pub fn remove_requester(&self, key: &K) -> usize {
        self.core.router.detach_key(key)
    }

    /// Closes the shared mailbox, stopping both halves at once.
    pub fn close(&self) {
        self.mailbox.close();
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Dispatches one message synchronously, surfacing dispatch errors.
    pub fn dispatch(&mut self, mut msg: Box<Message<K>>) -> Result<(), ActorError> {
        let result = self.core.consume(&mut msg);
        self.mailbox.pool().release(msg);
        result
    }

    /// Poll mode: handles whatever is buffered right now.
    pub fn update(&mut self) -> Result<usize, ActorError> {
        dispatch::poll_available(&self.name, &self.mailbox, &mut self.core)
    }

    /// Runs the event loop until the mailbox is closed. Ticks are only scheduled when a tick
    /// handle is installed.
    pub fn run(mut self) -> Result<(), ActorError> {
        dispatch::run_loop(&self.name, &self.mailbox, self.close_policy, &mut self.core)
    }
}

impl<K: ActorKey> RequesterOwner<K> for LocalService<K> {
    fn reply_to(&self) -> SenderRef<K> {
        self.reply_to.clone()
    }

    fn router(&self) -> &Router<K> {
        &self.core.router
    }

    fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<K: ActorKey> RequestTarget<K> for LocalService<K> {
    fn inlet(&self) -> &Inlet<K> {
        self.mailbox.inlet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requester::Requester;
    use crate::sender::MessageSender;
    use crate::RequestHandler;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(name: &str) -> RuntimeConfig {
        RuntimeConfig::named(name).with_mailbox_capacity(16)
    }

    #[test]
    fn service_answers_and_requests_on_one_mailbox() {
        let mut store = RequestHandler::<u32>::new(&config("store"));
        store.register_handle("price", |_, sender, _| {
            sender.unwrap().send(MsgId::new("price"), Box::new(42u32)).unwrap();
        });

        let mut service = LocalService::new(&config("svc"));
        service.register_handle("hello", |_, sender, _| {
            sender.unwrap().send(MsgId::new("hello"), Box::new("hi")).unwrap();
        });
        let to_store = Requester::new(&service, &store, 100).unwrap();
        let price = Rc::new(RefCell::new(None));
        let seen = price.clone();
        to_store
            .register_callback("price", move |payload| *seen.borrow_mut() = Some(*payload.downcast::<u32>().unwrap()))
            .unwrap();

        let mut client = crate::ResponseHandler::new(&config("client"));
        let to_service = Requester::new(&client, &service, 1).unwrap();
        let greeting = Rc::new(RefCell::new(None));
        let seen = greeting.clone();
        to_service
            .register_callback("hello", move |payload| *seen.borrow_mut() = Some(*payload.downcast::<&str>().unwrap()))
            .unwrap();

        to_store.request("price", Box::new(())).unwrap();
        to_service.request("hello", Box::new(())).unwrap();
        store.update().unwrap();
        // signup from the client, the hello request, the price reply
        assert_eq!(service.update(), Ok(3));
        client.update().unwrap();

        assert!(service.is_signed_up(&1));
        assert_eq!(*price.borrow(), Some(42));
        assert_eq!(*greeting.borrow(), Some("hi"));
    }

    #[test]
    fn delivered_forward_goes_to_requester_routes() {
        let store = RequestHandler::<u32>::new(&config("store"));
        let mut service = LocalService::new(&config("svc"));
        let requester = Requester::new(&service, &store, 5).unwrap();
        let from = Rc::new(RefCell::new(None));
        let seen = from.clone();
        requester
            .register_forward("ping", move |key, _| *seen.borrow_mut() = Some(key))
            .unwrap();

        let origin = service.reply_to();
        service
            .inlet()
            .forward(origin, 9, MsgId::new("ping"), Box::new(()))
            .unwrap();
        assert_eq!(service.update(), Ok(1));
        assert_eq!(*from.borrow(), Some(9));
    }

    #[test]
    fn relay_request_goes_to_dispatch_tables() {
        let mut service = LocalService::<u32>::new(&config("svc"));
        let origin = service.reply_to();
        let msg = service
            .inlet()
            .pool()
            .forward_request(origin, 1, 2, MsgId::new("chat"), Box::new(()));
        assert_eq!(
            service.dispatch(msg),
            Err(ActorError::NotFoundRequesterKey("1".to_string()))
        );
    }

    #[test]
    fn close_stops_both_halves() {
        let mut service = LocalService::<u32>::new(&config("svc"));
        service.close();
        service.close();
        assert_eq!(service.update(), Err(ActorError::Closed));
        assert_eq!(service.inlet().send(MsgId::new("x"), Box::new(())), Err(ActorError::Closed));
    }

    /// Pumps `owner` until `done` holds, for at most two seconds.
    fn pump(owner: &mut crate::ResponseHandler<u32>, done: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            owner.update().unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn running_service_answers_through_its_own_requester() {
        use std::thread;

        let mut store = RequestHandler::<u32>::new(&config("store"));
        store.register_handle("price", |_, sender, payload| {
            let item = *payload.downcast::<u32>().unwrap();
            sender.unwrap().send(MsgId::new("price"), Box::new(item * 10)).unwrap();
        });
        let store_inlet = store.inlet().clone();
        let store_worker = thread::spawn(move || store.run());

        let svc_config = config("svc");
        let mailbox = Mailbox::<u32>::from_config(&svc_config);
        let svc_inlet = mailbox.inlet().clone();
        let target = store_inlet.clone();
        let svc_worker = thread::spawn(move || {
            let mut service = LocalService::with_mailbox(&svc_config, mailbox);
            let to_store = Requester::new(&service, &target, 100)?;
            let waiting: Rc<RefCell<Vec<SenderRef<u32>>>> = Rc::default();

            let pending = waiting.clone();
            to_store.register_callback("price", move |payload| {
                if let Some(client) = pending.borrow_mut().pop() {
                    let _ = client.send(MsgId::new("quote"), payload);
                }
            })?;
            let pending = waiting.clone();
            service.register_handle("quote", move |_, sender, payload| {
                if let Some(sender) = sender {
                    pending.borrow_mut().push(sender.clone());
                    let _ = to_store.request("price", payload);
                }
            });
            service.run()
        });

        let mut client = crate::ResponseHandler::<u32>::new(&config("client"));
        let to_service = Requester::new(&client, &svc_inlet, 1).unwrap();
        let quote = Rc::new(RefCell::new(None));
        let seen = quote.clone();
        to_service
            .register_callback("quote", move |payload| *seen.borrow_mut() = Some(*payload.downcast::<u32>().unwrap()))
            .unwrap();
        to_service.request("quote", Box::new(7u32)).unwrap();

        pump(&mut client, || quote.borrow().is_some());
        svc_inlet.close();
        store_inlet.close();
        assert_eq!(svc_worker.join().unwrap(), Ok(()));
        assert_eq!(store_worker.join().unwrap(), Ok(()));
        assert_eq!(*quote.borrow(), Some(70));
    }

    #[test]
    fn running_service_ticks_until_closed() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let svc_config = config("ticking");
        let mailbox = Mailbox::<u32>::from_config(&svc_config);
        let inlet = mailbox.inlet().clone();
        let ticks = Arc::new(AtomicUsize::new(0));
        let count = ticks.clone();
        let worker = thread::spawn(move || {
            let mut service = LocalService::with_mailbox(&svc_config, mailbox);
            service.set_tick_handle(
                move |_, _| {
                    count.fetch_add(1, Ordering::SeqCst);
                },
                Duration::from_millis(1),
            );
            service.run()
        });

        let deadline = Instant::now() + Duration::from_secs(2);
        while ticks.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(ticks.load(Ordering::SeqCst) >= 3);

        inlet.close();
        assert_eq!(worker.join().unwrap(), Ok(()));
        let after_close = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks.load(Ordering::SeqCst), after_close);
        assert_eq!(inlet.send(MsgId::new("x"), Box::new(())), Err(ActorError::Closed));
    }
}

//! # Request Handler
//!
//! The "server" half of an actor. It owns a mailbox and a [`Dispatcher`], and runs the event
//! loop that interprets every dequeued message by kind.

use crate::config::{ClosePolicy, RuntimeConfig};
use crate::dispatch::{self, Callbacks, Consume, Context, Dispatcher};
use crate::error::ActorError;
use crate::mailbox::{Inlet, Mailbox};
use crate::message::{ActorKey, Message, MsgId, Payload};
use crate::pool::MessagePool;
use crate::sender::{RequestTarget, SenderRef};
use crossbeam::channel::Receiver;
use std::time::{Duration, Instant};
use tracing::debug;

/// An actor that answers requests.
///
/// **Concurrency model**: the handler is built and wired on one thread, then moved into
/// [`run`](Self::run) on its own thread. From then on only the loop touches the dispatch,
/// signup and fallback tables, so none of them needs a lock. Other threads talk to it through
/// its [`Inlet`], which stays usable after the handler has been moved.
///
/// # Usage Pattern
///
/// 1. **Create** with [`RequestHandler::new`].
/// 2. **Register** handlers, fallbacks and the tick before the loop starts.
/// 3. **Keep** a clone of [`inlet`](Self::inlet) to bind requesters and to close the actor.
/// 4. **Run** the loop on a dedicated thread.
///
/// ```rust
/// use actor_mailbox::{MessageSender, MsgId, RequestHandler, RuntimeConfig};
/// use std::thread;
///
/// let mut shop = RequestHandler::<u32>::new(&RuntimeConfig::named("shop"));
/// shop.register_handle("buy_item", |_, sender, payload| {
///     let count = *payload.downcast::<u32>().unwrap();
///     if let Some(sender) = sender {
///         let _ = sender.send(MsgId::new("buy_item"), Box::new(count));
///     }
/// });
///
/// let inlet = shop.inlet().clone();
/// let worker = thread::spawn(move || shop.run());
/// inlet.close();
/// assert!(worker.join().unwrap().is_ok());
/// ```
///
/// # Dispatch
///
/// * **Normal**: looks the id up in the dispatch table and calls the handler with the
///   requester's reply surface. Unregistered ids are dropped silently.
/// * **Signup**: records `key -> reply surface`. No reply.
/// * **Signoff**: forgets the key.
/// * **Forward**: the origin key must be signed up. A signed-up target gets the message
///   relayed to its owner with the origin key preserved; otherwise the fallback for the id
///   runs, and without one the forward fails.
///
/// Once dispatched, every message goes back to the pool.
pub struct RequestHandler<K: ActorKey> {
    name: String,
    mailbox: Mailbox<K>,
    dispatcher: Dispatcher<K>,
    close_policy: ClosePolicy,
}

impl<K: ActorKey> RequestHandler<K> {
    /// Creates a handler with a mailbox and message pool of its own.
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_pool(config, MessagePool::new(&config.pool))
    }

    /// Creates a handler whose mailbox recycles messages through `pool`.
    pub fn with_pool(config: &RuntimeConfig, pool: MessagePool<K>) -> Self {
        Self {
            name: config.name.clone(),
            mailbox: Mailbox::with_pool(config, pool),
            dispatcher: Dispatcher::default(),
            close_policy: config.close_policy,
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

    /// Binds `handle` to normal messages with this id. Must happen before the loop starts.
    pub fn register_handle<F>(&mut self, id: impl Into<MsgId>, handle: F)
    where
        F: FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload) + Send + 'static,
    {
        self.dispatcher.register_handle(id, handle);
    }

    /// Binds the handler for forwards with this id whose target is not signed up.
    pub fn register_forward_fallback<F>(&mut self, id: impl Into<MsgId>, fallback: F)
    where
        F: FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload) + Send + 'static,
    {
        self.dispatcher.register_forward_fallback(id, fallback);
    }

    /// Installs a periodic callback, called with the time elapsed since the previous call.
    ///
    /// Through its [`Context`] the tick can notify signed-up requesters while the loop runs.
    pub fn set_tick_handle<F>(&mut self, handle: F, interval: Duration)
    where
        F: FnMut(&Context<'_, K>, Duration) + Send + 'static,
    {
        self.dispatcher.set_tick_handle(handle, interval);
    }

    /// Pushes a one-shot notification to the signed-up requester `to_key`.
    pub fn notify(&self, to_key: K, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        self.dispatcher.notify(to_key, id, payload)
    }

    pub fn is_signed_up(&self, key: &K) -> bool {
        self.dispatcher.is_signed_up(key)
    }

    pub fn signup_count(&self) -> usize {
        self.dispatcher.signup_count()
    }

    pub fn close(&self) {
        self.mailbox.close();
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Dispatches one message synchronously and returns it to the pool.
    ///
    /// This is what the loop does for every message, except that errors come back to the
    /// caller instead of being logged.
    pub fn dispatch(&mut self, mut msg: Box<Message<K>>) -> Result<(), ActorError> {
        let result = self.dispatcher.consume(&mut msg);
        self.mailbox.pool().release(msg);
        result
    }

    /// Poll mode: dispatches whatever is buffered right now and returns without waiting.
    pub fn update(&mut self) -> Result<usize, ActorError> {
        dispatch::poll_available(&self.name, &self.mailbox, &mut self.dispatcher)
    }

    /// Runs the event loop until the mailbox is closed.
    ///
    /// Waits on new messages, the close signal and the tick (if one is installed). Dispatch
    /// errors are logged and do not stop the loop. Consumes the handler: a closed actor cannot
    /// be restarted.
    pub fn run(mut self) -> Result<(), ActorError> {
        dispatch::run_loop(&self.name, &self.mailbox, self.close_policy, &mut self.dispatcher)
    }
}

impl<K: ActorKey, C: Callbacks<K>> Consume<K> for Dispatcher<K, C> {
    fn consume(&mut self, msg: &mut Message<K>) -> Result<(), ActorError> {
        if !self.dispatch(msg)? {
            debug!(kind = ?msg.kind(), id = %msg.id(), "Unhandled message dropped");
        }
        Ok(())
    }

    fn tick(&mut self, elapsed: Duration) {
        self.on_tick(elapsed);
    }

    fn ticker(&self) -> Receiver<Instant> {
        Dispatcher::ticker(self)
    }
}

impl<K: ActorKey> RequestTarget<K> for RequestHandler<K> {
    fn inlet(&self) -> &Inlet<K> {
        self.mailbox.inlet()
    }
}

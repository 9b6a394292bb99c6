//! # Request Dispatch
//!
//! The request side of an actor: the dispatch table (message id to handler), the signup table
//! (requester key to reply surface), forward fallbacks and the optional tick. [`Dispatcher`] is
//! shared by [`RequestHandler`](crate::RequestHandler) and [`LocalService`](crate::LocalService);
//! the blocking event loop both of them run lives here too.
//!
//! Tables are filled before the loop starts and are only touched by the loop afterwards, so
//! none of them is synchronized.

use crate::config::ClosePolicy;
use crate::error::ActorError;
use crate::mailbox::{Event, Mailbox};
use crate::message::{ActorKey, Message, MsgId, MsgKind, Payload};
use crate::sender::SenderRef;
use crossbeam::channel::{self, Receiver};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a callback sees of the actor it runs in: the live signup table.
///
/// Handles, fallbacks and ticks get one on every call, so a running actor can still push
/// notifications to its signed-up requesters.
pub struct Context<'a, K: ActorKey> {
    signups: &'a HashMap<K, SenderRef<K>>,
}

impl<K: ActorKey> Context<'_, K> {
    /// Pushes a one-shot notification to the owner of the signed-up requester `to_key`.
    pub fn notify(&self, to_key: K, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        let sender = self
            .signups
            .get(&to_key)
            .ok_or_else(|| ActorError::requester_key(&to_key))?;
        sender.notify(to_key, id.into(), payload)
    }

    pub fn is_signed_up(&self, key: &K) -> bool {
        self.signups.contains_key(key)
    }

    pub fn signup_count(&self) -> usize {
        self.signups.len()
    }
}

/// How a [`Dispatcher`] stores its callbacks.
pub trait Callbacks<K: ActorKey> {
    /// Handles a normal request. The sender is the requester's reply surface, if it sent one.
    type Handle: FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload);
    /// Handles a forward whose target is not signed up: `(origin sender, to_key, payload)`.
    type Fallback: FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload);
    /// Periodic callback, given the time since the previous tick (or since the loop started).
    type Tick: FnMut(&Context<'_, K>, Duration);
}

/// Callbacks that can move to another thread, for actors that run on their own thread.
#[derive(Debug)]
pub enum Threaded {}

/// Callbacks confined to the thread that built them. They may capture requesters.
#[derive(Debug)]
pub enum ThreadLocal {}

impl<K: ActorKey> Callbacks<K> for Threaded {
    type Handle = Box<dyn FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload) + Send>;
    type Fallback = Box<dyn FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload) + Send>;
    type Tick = Box<dyn FnMut(&Context<'_, K>, Duration) + Send>;
}

impl<K: ActorKey> Callbacks<K> for ThreadLocal {
    type Handle = Box<dyn FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload)>;
    type Fallback = Box<dyn FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload)>;
    type Tick = Box<dyn FnMut(&Context<'_, K>, Duration)>;
}

struct Tick<T> {
    handle: T,
    interval: Duration,
}

/// Request-side tables of one actor.
pub struct Dispatcher<K: ActorKey, C: Callbacks<K> = Threaded> {
    handles: HashMap<MsgId, C::Handle>,
    fallbacks: HashMap<MsgId, C::Fallback>,
    signups: HashMap<K, SenderRef<K>>,
    tick: Option<Tick<C::Tick>>,
    _callbacks: PhantomData<fn() -> C>,
}

impl<K: ActorKey, C: Callbacks<K>> Default for Dispatcher<K, C> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            fallbacks: HashMap::new(),
            signups: HashMap::new(),
            tick: None,
            _callbacks: PhantomData,
        }
    }
}

impl<K: ActorKey> Dispatcher<K, Threaded> {
    pub fn register_handle<F>(&mut self, id: impl Into<MsgId>, handle: F)
    where
        F: FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload) + Send + 'static,
    {
        self.handles.insert(id.into(), Box::new(handle));
    }

    pub fn register_forward_fallback<F>(&mut self, id: impl Into<MsgId>, fallback: F)
    where
        F: FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload) + Send + 'static,
    {
        self.fallbacks.insert(id.into(), Box::new(fallback));
    }

    pub fn set_tick_handle<F>(&mut self, handle: F, interval: Duration)
    where
        F: FnMut(&Context<'_, K>, Duration) + Send + 'static,
    {
        self.tick = Some(Tick {
            handle: Box::new(handle),
            interval,
        });
    }
}

impl<K: ActorKey> Dispatcher<K, ThreadLocal> {
    pub fn register_handle<F>(&mut self, id: impl Into<MsgId>, handle: F)
    where
        F: FnMut(&Context<'_, K>, Option<&SenderRef<K>>, Payload) + 'static,
    {
        self.handles.insert(id.into(), Box::new(handle));
    }

    pub fn register_forward_fallback<F>(&mut self, id: impl Into<MsgId>, fallback: F)
    where
        F: FnMut(&Context<'_, K>, &SenderRef<K>, &K, Payload) + 'static,
    {
        self.fallbacks.insert(id.into(), Box::new(fallback));
    }

    pub fn set_tick_handle<F>(&mut self, handle: F, interval: Duration)
    where
        F: FnMut(&Context<'_, K>, Duration) + 'static,
    {
        self.tick = Some(Tick {
            handle: Box::new(handle),
            interval,
        });
    }
}

impl<K: ActorKey, C: Callbacks<K>> Dispatcher<K, C> {
    pub fn has_handle(&self, id: &MsgId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn has_tick(&self) -> bool {
        self.tick.is_some()
    }

    pub fn is_signed_up(&self, key: &K) -> bool {
        self.signups.contains_key(key)
    }

    pub fn signup_count(&self) -> usize {
        self.signups.len()
    }

    /// View of the signup table, as handed to callbacks.
    pub fn context(&self) -> Context<'_, K> {
        Context { signups: &self.signups }
    }

    /// Pushes a one-shot notification to the owner of the signed-up requester `to_key`.
    pub fn notify(&self, to_key: K, id: impl Into<MsgId>, payload: Payload) -> Result<(), ActorError> {
        self.context().notify(to_key, id, payload)
    }

    /// Channel the event loop waits on for ticks; never fires when no tick is installed.
    pub(crate) fn ticker(&self) -> Receiver<Instant> {
        match &self.tick {
            Some(tick) => channel::tick(tick.interval),
            None => channel::never(),
        }
    }

    pub(crate) fn on_tick(&mut self, elapsed: Duration) {
        if let Some(tick) = self.tick.as_mut() {
            let ctx = Context { signups: &self.signups };
            (tick.handle)(&ctx, elapsed);
        }
    }

    /// Interprets `msg` by kind. Returns `Ok(false)` when the message is not a request this
    /// side handles: an unregistered normal message, a delivered forward or a notification.
    pub fn dispatch(&mut self, msg: &mut Message<K>) -> Result<bool, ActorError> {
        match msg.kind {
            MsgKind::Normal => match self.handles.get_mut(&msg.id) {
                Some(handle) => {
                    let payload = msg.take_payload();
                    let ctx = Context { signups: &self.signups };
                    handle(&ctx, msg.sender.as_ref(), payload);
                    Ok(true)
                }
                None => Ok(false),
            },
            MsgKind::Signup => {
                if let (Some(key), Some(sender)) = (msg.from_key.take(), msg.sender.take()) {
                    debug!(key = ?key, "Signup");
                    self.signups.insert(key, sender);
                }
                Ok(true)
            }
            MsgKind::Signoff => {
                if let (Some(key), Some(sender)) = (msg.from_key.take(), msg.sender.take()) {
                    // a key signed up again by another owner keeps its new entry
                    let owned = self
                        .signups
                        .get(&key)
                        .is_some_and(|current| Arc::ptr_eq(current, &sender));
                    if owned {
                        self.signups.remove(&key);
                    }
                    debug!(key = ?key, removed = owned, "Signoff");
                }
                Ok(true)
            }
            MsgKind::Forward if msg.to_key.is_some() => self.relay(msg).map(|()| true),
            MsgKind::Forward | MsgKind::Notify => Ok(false),
        }
    }

    fn relay(&mut self, msg: &mut Message<K>) -> Result<(), ActorError> {
        let (Some(from_key), Some(to_key)) = (msg.from_key.take(), msg.to_key.take()) else {
            return Err(ActorError::NotFoundRequesterKey("<missing>".to_string()));
        };
        let from_sender = self
            .signups
            .get(&from_key)
            .cloned()
            .ok_or_else(|| ActorError::requester_key(&from_key))?;
        let id = std::mem::take(&mut msg.id);
        let payload = msg.take_payload();

        if let Some(target) = self.signups.get(&to_key) {
            return target.forward(from_sender, from_key, id, payload);
        }
        match self.fallbacks.get_mut(&id) {
            Some(fallback) => {
                debug!(from = ?from_key, to = ?to_key, %id, "Forward target offline, using fallback");
                let ctx = Context { signups: &self.signups };
                fallback(&ctx, &from_sender, &to_key, payload);
                Ok(())
            }
            None => Err(ActorError::NotFoundNoTargetForwardHandle(id)),
        }
    }
}

/// Something the blocking event loop can feed.
pub(crate) trait Consume<K: ActorKey> {
    fn consume(&mut self, msg: &mut Message<K>) -> Result<(), ActorError>;
    fn tick(&mut self, elapsed: Duration);
    fn ticker(&self) -> Receiver<Instant>;
}

/// The blocking actor loop: waits on messages, ticks and the close signal until closed.
pub(crate) fn run_loop<K, C>(
    name: &str,
    mailbox: &Mailbox<K>,
    policy: ClosePolicy,
    consumer: &mut C,
) -> Result<(), ActorError>
where
    K: ActorKey,
    C: Consume<K>,
{
    let ticker = consumer.ticker();
    let mut last_tick = Instant::now();
    let mut processed: u64 = 0;
    info!(actor = name, capacity = mailbox.capacity(), "Actor started");

    loop {
        match mailbox.receive(&ticker) {
            Ok(Event::Message(msg)) => {
                deliver(name, mailbox, consumer, msg);
                processed += 1;
            }
            Ok(Event::Tick(now)) => {
                consumer.tick(now.saturating_duration_since(last_tick));
                last_tick = now;
            }
            Ok(Event::Closed) => break,
            Err(e) => {
                warn!(actor = name, error = %e, "Mailbox disconnected");
                return Err(e);
            }
        }
    }

    match policy {
        ClosePolicy::Drain => {
            let mut drained: u64 = 0;
            for msg in mailbox.drain() {
                deliver(name, mailbox, consumer, msg);
                drained += 1;
            }
            info!(actor = name, processed, drained, "Shutdown");
        }
        ClosePolicy::Discard => {
            let discarded = mailbox.discard_pending();
            info!(actor = name, processed, discarded, "Shutdown");
        }
    }
    Ok(())
}

/// Poll mode: dispatches the messages buffered at the time of the call, never waits.
///
/// Returns how many were dispatched. A close observed mid-drain stops the drain; the next
/// call reports it.
pub(crate) fn poll_available<K, C>(name: &str, mailbox: &Mailbox<K>, consumer: &mut C) -> Result<usize, ActorError>
where
    K: ActorKey,
    C: Consume<K>,
{
    if mailbox.is_closed() {
        return Err(ActorError::Closed);
    }
    let available = mailbox.len();
    let mut handled = 0;
    while handled < available {
        match mailbox.try_receive() {
            Ok(Some(msg)) => {
                deliver(name, mailbox, consumer, msg);
                handled += 1;
            }
            Ok(None) | Err(_) => break,
        }
    }
    Ok(handled)
}

pub(crate) fn deliver<K, C>(name: &str, mailbox: &Mailbox<K>, consumer: &mut C, mut msg: Box<Message<K>>)
where
    K: ActorKey,
    C: Consume<K>,
{
    debug!(actor = name, kind = ?msg.kind(), id = %msg.id(), "Dispatch");
    if let Err(e) = consumer.consume(&mut msg) {
        warn!(actor = name, error = %e, "Dispatch failed");
    }
    mailbox.pool().release(msg);
}

//! # Mailbox
//!
//! A bounded FIFO of boxed [`Message`]s plus a close signal. The mailbox is the only structure
//! shared across threads: any number of producers enqueue through cloned [`Inlet`]s while a
//! single consumer (the actor loop or a poll-mode `update`) owns the [`Mailbox`].
//!
//! Closing does not close the data channel. It drops the only sender of a separate signal
//! channel, which wakes a consumer blocked in [`Mailbox::receive`] and any producer blocked on
//! a full queue, and flips an atomic flag that makes later sends fail with
//! [`ActorError::Closed`]. Closing twice is a no-op.

use crate::config::RuntimeConfig;
use crate::error::ActorError;
use crate::message::{ActorKey, Message};
use crate::pool::MessagePool;
use crossbeam::channel::{self, Receiver, Select, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

struct CloseSignal {
    closed: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
}

impl CloseSignal {
    /// Returns `true` for the call that actually closed.
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.trigger.lock().take();
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// The producer half of a mailbox. Cheap to clone and safe to share between threads.
pub struct Inlet<K: ActorKey> {
    tx: Sender<Box<Message<K>>>,
    close_rx: Receiver<()>,
    signal: Arc<CloseSignal>,
    pool: MessagePool<K>,
}

impl<K: ActorKey> Clone for Inlet<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            close_rx: self.close_rx.clone(),
            signal: self.signal.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<K: ActorKey> Inlet<K> {
    /// Moves `msg` into the mailbox, blocking while the queue is full.
    ///
    /// Fails with [`ActorError::Closed`] if the mailbox is (or becomes, while waiting) closed;
    /// the message is then returned to the pool.
    pub fn enqueue(&self, msg: Box<Message<K>>) -> Result<(), ActorError> {
        if self.signal.is_closed() {
            self.pool.release(msg);
            return Err(ActorError::Closed);
        }
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) => self.enqueue_blocking(msg),
            Err(TrySendError::Disconnected(msg)) => {
                self.pool.release(msg);
                Err(ActorError::Closed)
            }
        }
    }

    fn enqueue_blocking(&self, msg: Box<Message<K>>) -> Result<(), ActorError> {
        let mut sel = Select::new();
        let send = sel.send(&self.tx);
        sel.recv(&self.close_rx);
        let oper = sel.select();
        if oper.index() == send {
            oper.send(&self.tx, msg).map_err(|channel::SendError(msg)| {
                self.pool.release(msg);
                ActorError::Closed
            })
        } else {
            let _ = oper.recv(&self.close_rx);
            self.pool.release(msg);
            Err(ActorError::Closed)
        }
    }

    /// Non-blocking variant of [`enqueue`](Self::enqueue). A full queue hands the message back.
    pub fn try_enqueue(&self, msg: Box<Message<K>>) -> Result<(), TrySendError<Box<Message<K>>>> {
        if self.signal.is_closed() {
            return Err(TrySendError::Disconnected(msg));
        }
        self.tx.try_send(msg)
    }

    pub fn close(&self) {
        self.signal.close();
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    pub fn pool(&self) -> &MessagePool<K> {
        &self.pool
    }

    /// Messages waiting in the queue.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// True when both inlets feed the same mailbox.
    pub fn same_mailbox(&self, other: &Inlet<K>) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

impl<K: ActorKey> fmt::Debug for Inlet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inlet")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// What a blocking receive woke up for.
#[derive(Debug)]
pub enum Event<K: ActorKey> {
    Message(Box<Message<K>>),
    Tick(Instant),
    Closed,
}

/// The consumer half of a mailbox, owned by exactly one actor.
pub struct Mailbox<K: ActorKey> {
    inlet: Inlet<K>,
    rx: Receiver<Box<Message<K>>>,
    close_rx: Receiver<()>,
    capacity: usize,
}

impl<K: ActorKey> Mailbox<K> {
    pub fn new(capacity: usize, pool: MessagePool<K>) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        let (trigger, close_rx) = channel::bounded(0);
        let signal = Arc::new(CloseSignal {
            closed: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
        });
        Self {
            inlet: Inlet {
                tx,
                close_rx: close_rx.clone(),
                signal,
                pool,
            },
            rx,
            close_rx,
            capacity,
        }
    }

    /// Builds a mailbox sized by `config` with a pool of its own.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.effective_capacity(), MessagePool::new(&config.pool))
    }

    /// Builds a mailbox sized by `config` that recycles through a shared `pool`.
    pub fn with_pool(config: &RuntimeConfig, pool: MessagePool<K>) -> Self {
        Self::new(config.effective_capacity(), pool)
    }

    pub fn inlet(&self) -> &Inlet<K> {
        &self.inlet
    }

    pub fn pool(&self) -> &MessagePool<K> {
        &self.inlet.pool
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn close(&self) {
        self.inlet.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inlet.is_closed()
    }

    /// Poll mode: dequeues one message if one is ready, never waits.
    ///
    /// Returns `Err(Closed)` once the close signal has fired, even if messages are still
    /// buffered.
    pub fn try_receive(&self) -> Result<Option<Box<Message<K>>>, ActorError> {
        if self.is_closed() {
            return Err(ActorError::Closed);
        }
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ActorError::Closed),
        }
    }

    /// Blocking mode: waits for a message, the close signal or a tick from `ticker`.
    ///
    /// Pass [`crossbeam::channel::never`] when the actor has no tick.
    pub fn receive(&self, ticker: &Receiver<Instant>) -> Result<Event<K>, ActorError> {
        if self.is_closed() {
            return Ok(Event::Closed);
        }
        let mut sel = Select::new();
        let data = sel.recv(&self.rx);
        let close = sel.recv(&self.close_rx);
        let tick = sel.recv(ticker);
        let oper = sel.select();
        match oper.index() {
            i if i == data => oper
                .recv(&self.rx)
                .map(Event::Message)
                .map_err(|_| ActorError::Closed),
            i if i == close => {
                let _ = oper.recv(&self.close_rx);
                Ok(Event::Closed)
            }
            i if i == tick => Ok(oper.recv(ticker).map_or(Event::Closed, Event::Tick)),
            _ => unreachable!("select returned an operation that was never registered"),
        }
    }

    /// Takes every message buffered right now, without waiting and ignoring the close flag.
    pub fn drain(&self) -> impl Iterator<Item = Box<Message<K>>> + '_ {
        self.rx.try_iter()
    }

    /// Returns every buffered message to the pool undelivered. Returns how many there were.
    pub fn discard_pending(&self) -> usize {
        let mut count = 0;
        for msg in self.rx.try_iter() {
            self.inlet.pool.release(msg);
            count += 1;
        }
        count
    }
}

impl<K: ActorKey> Drop for Mailbox<K> {
    fn drop(&mut self) {
        self.inlet.close();
    }
}

impl<K: ActorKey> fmt::Debug for Mailbox<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

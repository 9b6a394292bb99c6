#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Actor Mailbox
//!
//! > **In-process actors built from bounded mailboxes, dispatch tables and requesters.**
//!
//! Each actor owns one mailbox and is driven by exactly one consuming loop. Actors never
//! reference each other; they hold capabilities (an intake to send requests to, a reply
//! surface to answer through) and exchange opaque payloads keyed by a message id.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Two halves of an actor
//!
//! - **[`RequestHandler`]**: the server half. A dispatch table maps message ids to handlers;
//!   a signup table maps requester keys to their reply surfaces so the handler can relay
//!   forwards and push notifications between requesters.
//! - **[`ResponseHandler`]**: the client half. It owns the [`Requester`]s that talk to other
//!   actors and routes every reply, forward and notification to the one requester that
//!   claimed it.
//! - **[`LocalService`]**: both halves on one mailbox.
//!
//! ### Backpressure, not buffering
//! Mailboxes are bounded. A producer facing a full mailbox blocks until the consumer catches up
//! or the mailbox is closed. Closing is the only cancellation primitive, and it is idempotent.
//!
//! ## 🚀 Core Concepts
//!
//! ### Generics: the requester key `K`
//! Every table is keyed by `K: `[`ActorKey`], blanket-implemented for any hashable, cloneable,
//! debuggable, thread-safe type. Message ids are a dedicated [`MsgId`] type, and payloads are
//! `Box<dyn Any + Send>` that only the handlers downcast.
//!
//! ### Mocking: testing without threads
//! [`mock::RecordingSender`] stands in for a reply surface, so a [`Dispatcher`] or a
//! [`RequestHandler`] can be driven message by message and its answers inspected.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Every fallible call returns [`ActorError`]. Errors go to the immediate caller and are never
//! retried. Inside a run loop there is no caller left, so dispatch errors are logged instead;
//! [`RequestHandler::dispatch`] surfaces them synchronously.
//!
//! ### 2. Concurrency Model
//! - Request handlers are `Send`: build and wire them on one thread, run them on another.
//! - Response handlers, local services and requesters are `!Send`: they live on the thread
//!   that drives them.
//! - Mailbox intakes ([`Inlet`]) and the [`MessagePool`] are shared freely between threads.
//!
//! ### 3. Observability
//! Actors log their lifecycle and every dispatch through `tracing`. See the [`tracing`](crate::tracing)
//! module.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Plumbing ([`mailbox`], [`pool`], [`message`])
//! Bounded queue plus close signal, recycled messages, and the message envelope.
//!
//! ### 2. Capabilities ([`sender`])
//! [`MessageSender`] and [`RequestTarget`], the only way actors reach each other.
//!
//! ### 3. Actors ([`request_handler`], [`response_handler`], [`requester`], [`service`])
//! The dispatch and routing logic, and the loops that drive it.
//!
//! ### 4. Setup ([`config`], [`tracing`](crate::tracing))
//! Serde-loadable runtime configuration and the subscriber setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the game server demo with info logs
//! RUST_LOG=info cargo run -p mailbox-sample
//!
//! # Run every test
//! cargo test --workspace
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod pool;
pub mod request_handler;
pub mod requester;
pub mod response_handler;
pub mod router;
pub mod sender;
pub mod service;
pub mod tracing;

pub use config::{ClosePolicy, PoolConfig, RuntimeConfig};
pub use dispatch::{Context, Dispatcher};
pub use error::ActorError;
pub use mailbox::{Event, Inlet, Mailbox};
pub use message::{ActorKey, Message, MsgId, MsgKind, Payload};
pub use pool::MessagePool;
pub use request_handler::RequestHandler;
pub use requester::Requester;
pub use response_handler::{RequesterOwner, ResponseHandler};
pub use router::Router;
pub use sender::{MessageSender, RequestTarget, SenderRef};
pub use service::LocalService;
pub use crate::tracing::{setup_tracing, try_setup_tracing};

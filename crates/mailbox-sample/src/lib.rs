//! # Mailbox Sample Library
//!
//! A small game server built on `actor_mailbox`: a shop that sells items, a chat service
//! that relays lines between players, and players that drive both in poll mode.
//!
//! - **[model]**: payloads and message ids.
//! - **[shop_service]**, **[chat_service]**: request handlers, one per service.
//! - **[player]**: a response handler owning one requester per service.
//! - **[lifecycle]**: starts the services on blocking tasks and shuts them down.

pub mod chat_service;
pub mod lifecycle;
pub mod model;
pub mod player;
pub mod shop_service;

use actor_mailbox::{MessageSender, MsgId, SenderRef};
use model::PlayerId;
use tracing::{debug, warn};

/// Answers through the requester's reply surface, if the request carried one.
pub(crate) fn reply<T: Send + 'static>(sender: Option<&SenderRef<PlayerId>>, id: MsgId, payload: T) {
    match sender {
        Some(sender) => {
            if let Err(e) = sender.send(id.clone(), Box::new(payload)) {
                warn!(id = %id, error = %e, "Reply failed");
            }
        }
        None => debug!(id = %id, "Request without reply surface"),
    }
}

//! # Chat Service
//!
//! Relays chat lines between signed-up players. The runtime does the relaying: a player asks
//! for [`CHAT`] to be forwarded to another key, and the service hands it to that player's
//! owner with the author's key attached.
//!
//! When the recipient is not signed up, the forward fallback keeps the line on the
//! [`ChatBoard`] and notifies the author with [`CHAT_OFFLINE`]. The recipient collects stored
//! lines later with [`OFFLINE_MESSAGES`].

use crate::model::{
    ChatLine, ChatOffline, OfflineMessagesReq, OfflineMessagesResp, PlayerId, CHAT, CHAT_OFFLINE,
    OFFLINE_MESSAGES, OFFLINE_MESSAGES_RESP,
};
use crate::reply;
use actor_mailbox::{RequestHandler, RuntimeConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// State the chat service shares with whoever started it.
#[derive(Debug, Default)]
pub struct ChatBoard {
    ticks: AtomicU64,
    offline: Mutex<HashMap<PlayerId, Vec<ChatLine>>>,
}

impl ChatBoard {
    /// Ticks observed since the service started.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn store(&self, to: PlayerId, line: ChatLine) {
        self.offline.lock().entry(to).or_default().push(line);
    }

    /// Number of lines waiting for `player`.
    pub fn pending(&self, player: PlayerId) -> usize {
        self.offline.lock().get(&player).map_or(0, Vec::len)
    }

    pub fn take(&self, player: PlayerId) -> Vec<ChatLine> {
        self.offline.lock().remove(&player).unwrap_or_default()
    }
}

/// Creates the chat actor. Ticks at the configured interval.
pub fn new(config: &RuntimeConfig, board: Arc<ChatBoard>) -> RequestHandler<PlayerId> {
    let mut handler = RequestHandler::new(config);

    let ticks = board.clone();
    handler.set_tick_handle(
        move |_, _| {
            ticks.ticks.fetch_add(1, Ordering::Relaxed);
        },
        config.tick_interval(),
    );

    let shelf = board.clone();
    handler.register_forward_fallback(CHAT, move |ctx, _, to, payload| {
        let line = match payload.downcast::<ChatLine>() {
            Ok(line) => *line,
            Err(_) => {
                warn!("Malformed chat payload");
                return;
            }
        };
        debug!(from = %line.from, to = %to, "Recipient offline, storing line");
        let author = line.from;
        let notice = ChatOffline {
            to: *to,
            text: line.text.clone(),
        };
        shelf.store(*to, line);
        if let Err(e) = ctx.notify(author, CHAT_OFFLINE, Box::new(notice)) {
            warn!(player = %author, error = %e, "Offline notice failed");
        }
    });

    handler.register_handle(OFFLINE_MESSAGES, move |_, sender, payload| {
        let lines = match payload.downcast::<OfflineMessagesReq>() {
            Ok(req) => board.take(req.player),
            Err(_) => {
                warn!("Malformed offline_messages payload");
                return;
            }
        };
        reply(sender, OFFLINE_MESSAGES_RESP, OfflineMessagesResp { lines });
    });

    handler
}

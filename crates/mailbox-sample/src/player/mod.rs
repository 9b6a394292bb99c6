//! # Player
//!
//! A response handler with one requester for the shop and one for the chat, both keyed by the
//! player's id. Whatever comes back is folded into [`PlayerState`].
//!
//! A player lives on the thread that created it and makes progress only when that thread
//! calls [`Player::update`], typically once per frame.

use crate::model::{
    BuyError, BuyItemReq, BuyItemResp, ChatAck, ChatLine, ChatOffline, GetItemListResp, OfflineMessagesReq,
    OfflineMessagesResp, PlayerId, ShopItem, BUY_ITEM, BUY_ITEM_RESP, CHAT, CHAT_ACK, CHAT_OFFLINE,
    GET_ITEM_LIST, GET_ITEM_LIST_RESP, OFFLINE_MESSAGES, OFFLINE_MESSAGES_RESP,
};
use actor_mailbox::{ActorError, Inlet, Payload, Requester, ResponseHandler, RuntimeConfig};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Errors a player can run into.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] ActorError),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

/// What a player knows, as built up from replies, forwards and notifications.
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub money: u64,
    /// Owned items, by shop stack.
    pub items: HashMap<u32, u32>,
    /// Last item list received from the shop.
    pub catalog: Vec<ShopItem>,
    pub failed_buys: Vec<BuyError>,
    /// Lines received live.
    pub inbox: Vec<ChatLine>,
    /// Lines collected from the offline store.
    pub recovered: Vec<ChatLine>,
    /// Players who acknowledged one of our lines.
    pub acks: Vec<PlayerId>,
    pub offline_notices: Vec<ChatOffline>,
}

pub struct Player {
    id: PlayerId,
    handler: ResponseHandler<PlayerId>,
    shop: Requester<PlayerId>,
    chat: Requester<PlayerId>,
    state: Rc<RefCell<PlayerState>>,
}

impl Player {
    /// Creates a player and signs it up with both services.
    pub fn new(
        id: PlayerId,
        money: u64,
        config: &RuntimeConfig,
        shop: &Inlet<PlayerId>,
        chat: &Inlet<PlayerId>,
    ) -> Result<Self, PlayerError> {
        let handler = ResponseHandler::new(config);
        let shop = Requester::new(&handler, shop, id)?;
        let chat = Requester::new(&handler, chat, id)?;
        let player = Self {
            id,
            handler,
            shop,
            chat,
            state: Rc::new(RefCell::new(PlayerState {
                money,
                ..PlayerState::default()
            })),
        };
        player.register_shop_handlers()?;
        player.register_chat_handlers()?;
        debug!(player = %id, "Player joined");
        Ok(player)
    }

    fn register_shop_handlers(&self) -> Result<(), ActorError> {
        let state = self.state.clone();
        self.shop.register_callback(GET_ITEM_LIST_RESP, move |payload| {
            if let Some(resp) = downcast::<GetItemListResp>(payload, GET_ITEM_LIST_RESP.as_str()) {
                state.borrow_mut().catalog = resp.items;
            }
        })?;

        let state = self.state.clone();
        self.shop.register_callback(BUY_ITEM_RESP, move |payload| {
            let Some(resp) = downcast::<BuyItemResp>(payload, BUY_ITEM_RESP.as_str()) else {
                return;
            };
            let mut state = state.borrow_mut();
            match resp.result {
                Ok(purchase) => {
                    state.money = state.money.saturating_sub(purchase.cost);
                    *state.items.entry(purchase.inst_id).or_default() += purchase.count;
                }
                Err(e) => {
                    debug!(inst_id = resp.inst_id, count = resp.count, error = %e, "Buy failed");
                    state.failed_buys.push(e);
                }
            }
        })?;
        Ok(())
    }

    fn register_chat_handlers(&self) -> Result<(), ActorError> {
        let state = self.state.clone();
        let chat = self.chat.clone();
        self.chat.register_forward(CHAT, move |from, payload| {
            let Some(line) = downcast::<ChatLine>(payload, CHAT.as_str()) else {
                return;
            };
            let ack = ChatAck {
                text: line.text.clone(),
            };
            state.borrow_mut().inbox.push(line);
            if let Err(e) = chat.request_forward(from, CHAT_ACK, Box::new(ack)) {
                warn!(to = %from, error = %e, "Chat ack failed");
            }
        })?;

        let state = self.state.clone();
        self.chat.register_forward(CHAT_ACK, move |from, _| {
            state.borrow_mut().acks.push(from);
        })?;

        let state = self.state.clone();
        self.chat.register_notify(CHAT_OFFLINE, move |payload| {
            if let Some(notice) = downcast::<ChatOffline>(payload, CHAT_OFFLINE.as_str()) {
                state.borrow_mut().offline_notices.push(notice);
            }
        })?;

        let state = self.state.clone();
        self.chat.register_callback(OFFLINE_MESSAGES_RESP, move |payload| {
            if let Some(resp) = downcast::<OfflineMessagesResp>(payload, OFFLINE_MESSAGES_RESP.as_str()) {
                state.borrow_mut().recovered.extend(resp.lines);
            }
        })?;
        Ok(())
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn money(&self) -> u64 {
        self.state.borrow().money
    }

    /// Snapshot of the player's state.
    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    pub fn get_item_list(&self) -> Result<(), PlayerError> {
        self.shop.request(GET_ITEM_LIST, Box::new(()))?;
        Ok(())
    }

    /// Offers all of the player's money; the shop charges only the price.
    pub fn buy_item(&self, inst_id: u32, count: u32) -> Result<(), PlayerError> {
        let req = BuyItemReq {
            inst_id,
            count,
            total_money: self.money(),
        };
        self.shop.request(BUY_ITEM, Box::new(req))?;
        Ok(())
    }

    pub fn chat_to(&self, to: PlayerId, text: impl Into<String>) -> Result<(), PlayerError> {
        let line = ChatLine {
            from: self.id,
            text: text.into(),
        };
        self.chat.request_forward(to, CHAT, Box::new(line))?;
        Ok(())
    }

    pub fn fetch_offline_messages(&self) -> Result<(), PlayerError> {
        self.chat
            .request(OFFLINE_MESSAGES, Box::new(OfflineMessagesReq { player: self.id }))?;
        Ok(())
    }

    /// Handles everything that has arrived since the last call.
    pub fn update(&mut self) -> Result<usize, PlayerError> {
        Ok(self.handler.update()?)
    }

    /// Calls [`update`](Self::update) every millisecond until `done` holds or `timeout` runs out.
    pub fn pump_until(
        &mut self,
        what: &'static str,
        timeout: Duration,
        done: impl Fn(&PlayerState) -> bool,
    ) -> Result<(), PlayerError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.update()?;
            if done(&self.state.borrow()) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PlayerError::Timeout(what));
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Signs off from both services and closes the player's mailbox.
    pub fn leave(self) -> Result<(), PlayerError> {
        let shop = self.shop.signoff();
        let chat = self.chat.signoff();
        self.handler.close();
        info!(player = %self.id, money = self.money(), "Player left");
        shop?;
        chat?;
        Ok(())
    }
}

fn downcast<T: 'static>(payload: Payload, id: &str) -> Option<T> {
    match payload.downcast::<T>() {
        Ok(value) => Some(*value),
        Err(_) => {
            warn!(id, "Unexpected payload type");
            None
        }
    }
}

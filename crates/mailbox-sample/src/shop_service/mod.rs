//! # Shop Service
//!
//! A request handler selling items from an [`Inventory`].
//!
//! | Request | Payload | Reply |
//! |---|---|---|
//! | [`GET_ITEM_LIST`] | any | [`GET_ITEM_LIST_RESP`] with [`GetItemListResp`] |
//! | [`BUY_ITEM`] | [`BuyItemReq`] | [`BUY_ITEM_RESP`] with [`BuyItemResp`] |
//!
//! Refused purchases still get a reply; the [`BuyError`] says why.

use crate::model::{
    BuyError, BuyItemReq, BuyItemResp, GetItemListResp, PlayerId, Purchase, ShopItem, BUY_ITEM,
    BUY_ITEM_RESP, GET_ITEM_LIST, GET_ITEM_LIST_RESP,
};
use crate::reply;
use actor_mailbox::{RequestHandler, RuntimeConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stock on sale. Cheap to clone; clones share the same shelves.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Arc<Mutex<Vec<ShopItem>>>,
}

impl Inventory {
    pub fn new(items: Vec<ShopItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
        }
    }

    pub fn add_item(&self, item: ShopItem) {
        self.items.lock().push(item);
    }

    /// Snapshot of everything on sale.
    pub fn items(&self) -> Vec<ShopItem> {
        self.items.lock().clone()
    }

    pub fn stock(&self, inst_id: u32) -> Option<u32> {
        self.items
            .lock()
            .iter()
            .find(|item| item.inst_id == inst_id)
            .map(|item| item.count)
    }

    /// Takes `count` items off the `inst_id` stack. Returns false if there are not enough.
    pub fn remove_item(&self, inst_id: u32, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        let mut items = self.items.lock();
        match items.iter_mut().find(|item| item.inst_id == inst_id && item.count >= count) {
            Some(item) => {
                item.count -= count;
                true
            }
            None => false,
        }
    }

    /// Sells `req.count` items if the buyer can pay for them and they are in stock.
    pub fn buy(&self, req: &BuyItemReq) -> Result<Purchase, BuyError> {
        if req.inst_id == 0 || req.count == 0 {
            return Err(BuyError::InvalidArgs);
        }
        let mut items = self.items.lock();
        let item = items
            .iter_mut()
            .find(|item| item.inst_id == req.inst_id)
            .ok_or(BuyError::NotFound)?;

        let need = item.price.saturating_mul(u64::from(req.count));
        if need > req.total_money {
            return Err(BuyError::NotEnoughMoney {
                need,
                have: req.total_money,
            });
        }
        if item.count < req.count {
            return Err(BuyError::NotEnoughStock { available: item.count });
        }
        item.count -= req.count;
        Ok(Purchase {
            inst_id: item.inst_id,
            item_id: item.item_id,
            count: req.count,
            cost: need,
        })
    }
}

/// Creates the shop actor. Run it with [`RequestHandler::run`] on a thread of its own.
pub fn new(config: &RuntimeConfig, inventory: Inventory) -> RequestHandler<PlayerId> {
    let mut handler = RequestHandler::new(config);

    let shelves = inventory.clone();
    handler.register_handle(GET_ITEM_LIST, move |_, sender, _| {
        reply(sender, GET_ITEM_LIST_RESP, GetItemListResp { items: shelves.items() });
    });

    handler.register_handle(BUY_ITEM, move |_, sender, payload| {
        let req = match payload.downcast::<BuyItemReq>() {
            Ok(req) => req,
            Err(_) => {
                warn!("Malformed buy_item payload");
                return;
            }
        };
        let result = inventory.buy(&req);
        match &result {
            Ok(purchase) => debug!(inst_id = purchase.inst_id, count = purchase.count, cost = purchase.cost, "Sold"),
            Err(e) => debug!(inst_id = req.inst_id, code = e.code(), "Purchase refused"),
        }
        reply(
            sender,
            BUY_ITEM_RESP,
            BuyItemResp {
                inst_id: req.inst_id,
                count: req.count,
                result,
            },
        );
    });

    handler
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Inventory {
        Inventory::new(vec![ShopItem::new(1, 10, 5, 20), ShopItem::new(2, 20, 1, 1_000)])
    }

    fn req(inst_id: u32, count: u32, total_money: u64) -> BuyItemReq {
        BuyItemReq {
            inst_id,
            count,
            total_money,
        }
    }

    #[test]
    fn buy_takes_stock_and_charges() {
        let shop = inventory();
        let purchase = shop.buy(&req(1, 2, 100)).unwrap();
        assert_eq!(purchase.cost, 40);
        assert_eq!(purchase.item_id, 10);
        assert_eq!(shop.stock(1), Some(3));
    }

    #[test]
    fn refusals_carry_their_codes() {
        let shop = inventory();
        assert_eq!(shop.buy(&req(0, 1, 100)).unwrap_err().code(), -99);
        assert_eq!(shop.buy(&req(1, 0, 100)).unwrap_err().code(), -99);
        assert_eq!(shop.buy(&req(9, 1, 100)), Err(BuyError::NotFound));
        assert_eq!(
            shop.buy(&req(2, 1, 10)),
            Err(BuyError::NotEnoughMoney { need: 1_000, have: 10 })
        );
        assert_eq!(
            shop.buy(&req(1, 6, 10_000)),
            Err(BuyError::NotEnoughStock { available: 5 })
        );
        assert_eq!(shop.stock(1), Some(5));
    }

    #[test]
    fn remove_item_needs_enough_stock() {
        let shop = inventory();
        assert!(!shop.remove_item(2, 2));
        assert!(!shop.remove_item(1, 0));
        assert!(shop.remove_item(1, 5));
        assert_eq!(shop.stock(1), Some(0));
    }
}

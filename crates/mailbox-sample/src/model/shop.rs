use actor_mailbox::MsgId;
use serde::{Deserialize, Serialize};

pub const GET_ITEM_LIST: MsgId = MsgId::new("get_item_list");
pub const GET_ITEM_LIST_RESP: MsgId = MsgId::new("get_item_list_resp");
pub const BUY_ITEM: MsgId = MsgId::new("buy_item");
pub const BUY_ITEM_RESP: MsgId = MsgId::new("buy_item_resp");

/// A stack of items on sale. `inst_id` identifies the stack, `item_id` the kind of item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub inst_id: u32,
    pub item_id: u32,
    pub count: u32,
    pub price: u64,
}

impl ShopItem {
    pub fn new(inst_id: u32, item_id: u32, count: u32, price: u64) -> Self {
        Self {
            inst_id,
            item_id,
            count,
            price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetItemListResp {
    pub items: Vec<ShopItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyItemReq {
    pub inst_id: u32,
    pub count: u32,
    /// Money the buyer is willing to spend.
    pub total_money: u64,
}

/// A successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub inst_id: u32,
    pub item_id: u32,
    pub count: u32,
    pub cost: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyItemResp {
    pub inst_id: u32,
    pub count: u32,
    pub result: Result<Purchase, BuyError>,
}

/// Why a purchase was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum BuyError {
    #[error("invalid item or count")]
    InvalidArgs,
    #[error("item not on sale")]
    NotFound,
    #[error("not enough money: need {need}, have {have}")]
    NotEnoughMoney { need: u64, have: u64 },
    #[error("not enough stock: {available} left")]
    NotEnoughStock { available: u32 },
}

impl BuyError {
    /// Wire error code, as shown to game clients.
    pub fn code(&self) -> i32 {
        match self {
            BuyError::InvalidArgs => -99,
            BuyError::NotFound => -1,
            BuyError::NotEnoughMoney { .. } => -2,
            BuyError::NotEnoughStock { .. } => -3,
        }
    }
}

use super::PlayerId;
use actor_mailbox::MsgId;
use serde::{Deserialize, Serialize};

/// Relayed player to player.
pub const CHAT: MsgId = MsgId::new("chat");
/// Relayed back to the author once a line is read.
pub const CHAT_ACK: MsgId = MsgId::new("chat_ack");
/// Pushed to the author when the recipient is offline.
pub const CHAT_OFFLINE: MsgId = MsgId::new("chat_offline");
pub const OFFLINE_MESSAGES: MsgId = MsgId::new("offline_messages");
pub const OFFLINE_MESSAGES_RESP: MsgId = MsgId::new("offline_messages_resp");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub from: PlayerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAck {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOffline {
    pub to: PlayerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineMessagesReq {
    pub player: PlayerId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineMessagesResp {
    pub lines: Vec<ChatLine>,
}

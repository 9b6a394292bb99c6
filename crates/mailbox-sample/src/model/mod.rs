//! # Payloads
//!
//! Plain data exchanged between players and services. The runtime never looks inside; each
//! handler downcasts the payload it expects for its message id.

mod chat;
mod shop;

pub use chat::*;
pub use shop::*;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for players, used as the requester key everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl From<u32> for PlayerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player_{}", self.0)
    }
}

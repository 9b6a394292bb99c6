//! # Mailbox Sample
//!
//! A small game server on top of `actor_mailbox`.
//!
//! ## 🚀 Core Components
//!
//! - **[shop_service](mailbox_sample::shop_service)**: sells items, answers with error codes.
//! - **[chat_service](mailbox_sample::chat_service)**: relays chat lines between players and
//!   keeps lines for players who are offline.
//! - **[player](mailbox_sample::player)**: a response handler polled once per frame.
//! - **[lifecycle](mailbox_sample::lifecycle)**: starts and stops everything.
//!
//! ## 📚 Quick Start
//!
//! The demo below:
//! 1. Starts the [`GameSystem`].
//! 2. Has Alice browse the shop and buy, while Bob waits for her message.
//! 3. Has Alice write to Carol, who is offline, and Carol collect the line later.

use actor_mailbox::setup_tracing;
use mailbox_sample::lifecycle::{GameConfig, GameSystem};
use mailbox_sample::model::{PlayerId, ShopItem};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tracing::{error, info};

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);
const CAROL: PlayerId = PlayerId(3);
const WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting game server");

    let items = vec![
        ShopItem::new(1, 101, 10, 15),
        ShopItem::new(2, 102, 3, 40),
        ShopItem::new(3, 103, 1, 5_000),
    ];
    let system = GameSystem::new(GameConfig::default(), items);

    // both players signed up before anyone chats
    let online = Arc::new(Barrier::new(2));

    let ready = online.clone();
    let alice = system.spawn_player(ALICE, 200, move |player| {
        ready.wait();
        player.get_item_list()?;
        player.pump_until("catalog", WAIT, |s| !s.catalog.is_empty())?;

        player.buy_item(1, 4)?;
        player.buy_item(3, 1)?;
        player.pump_until("purchases", WAIT, |s| s.items.len() + s.failed_buys.len() == 2)?;

        player.chat_to(BOB, "hi bob")?;
        player.chat_to(CAROL, "see you later, carol")?;
        player.pump_until("chat", WAIT, |s| !s.acks.is_empty() && !s.offline_notices.is_empty())?;
        Ok(player.state())
    });

    let ready = online.clone();
    let bob = system.spawn_player(BOB, 50, move |player| {
        ready.wait();
        player.pump_until("a chat line", WAIT, |s| !s.inbox.is_empty())?;
        Ok(player.state())
    });

    let alice = alice.await.map_err(|e| e.to_string())?.map_err(|e| e.to_string())?;
    let bob = bob.await.map_err(|e| e.to_string())?.map_err(|e| e.to_string())?;
    info!(
        money = alice.money,
        items = ?alice.items,
        refused = alice.failed_buys.len(),
        acked_by = ?alice.acks,
        "Alice is done"
    );
    info!(inbox = bob.inbox.len(), "Bob is done");

    let carol = system.spawn_player(CAROL, 0, |player| {
        player.fetch_offline_messages()?;
        player.pump_until("offline messages", WAIT, |s| !s.recovered.is_empty())?;
        Ok(player.state().recovered)
    });
    match carol.await.map_err(|e| e.to_string())? {
        Ok(lines) => info!(lines = lines.len(), "Carol caught up"),
        Err(e) => error!(error = %e, "Carol could not catch up"),
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}

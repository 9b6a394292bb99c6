use mailbox_sample::lifecycle::{GameConfig, GameSystem};
use mailbox_sample::model::{BuyError, PlayerId, ShopItem};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn items() -> Vec<ShopItem> {
    vec![
        ShopItem::new(1, 101, 10, 10),
        ShopItem::new(2, 102, 2, 30),
        ShopItem::new(3, 103, 5, 1_000),
    ]
}

/// Full end-to-end purchase through the running shop.
#[tokio::test]
async fn test_player_buys_from_shop() {
    let system = GameSystem::new(GameConfig::default(), items());

    let player = system.spawn_player(PlayerId(1), 100, |player| {
        player.get_item_list()?;
        player.pump_until("catalog", WAIT, |s| s.catalog.len() == 3)?;
        player.buy_item(1, 3)?;
        player.pump_until("purchase", WAIT, |s| !s.items.is_empty())?;
        Ok(player.state())
    });
    let state = player.await.expect("player task").expect("player script");

    assert_eq!(state.money, 70);
    assert_eq!(state.items.get(&1), Some(&3));
    assert_eq!(system.inventory.stock(1), Some(7));

    system.shutdown().await.expect("Shutdown failed");
}

/// Refused purchases come back with the reason and leave money and stock alone.
#[tokio::test]
async fn test_refused_purchases_report_errors() {
    let system = GameSystem::new(GameConfig::default(), items());

    let player = system.spawn_player(PlayerId(1), 100, |player| {
        player.buy_item(0, 1)?;
        player.buy_item(9, 1)?;
        player.buy_item(3, 1)?;
        player.buy_item(2, 3)?;
        player.pump_until("refusals", WAIT, |s| s.failed_buys.len() == 4)?;
        Ok(player.state())
    });
    let state = player.await.expect("player task").expect("player script");

    let codes: Vec<i32> = state.failed_buys.iter().map(BuyError::code).collect();
    assert_eq!(codes, vec![-99, -1, -2, -3]);
    assert_eq!(state.money, 100);
    assert_eq!(system.inventory.stock(2), Some(2));

    system.shutdown().await.expect("Shutdown failed");
}

/// A chat line is relayed to an online player, who acknowledges it.
#[tokio::test]
async fn test_chat_between_online_players() {
    let system = GameSystem::new(GameConfig::default(), items());
    let online = Arc::new(Barrier::new(2));

    let ready = online.clone();
    let alice = system.spawn_player(PlayerId(1), 0, move |player| {
        ready.wait();
        player.chat_to(PlayerId(2), "hello")?;
        player.pump_until("ack", WAIT, |s| !s.acks.is_empty())?;
        Ok(player.state())
    });
    let ready = online.clone();
    let bob = system.spawn_player(PlayerId(2), 0, move |player| {
        ready.wait();
        player.pump_until("line", WAIT, |s| !s.inbox.is_empty())?;
        Ok(player.state())
    });

    let alice = alice.await.expect("alice task").expect("alice script");
    let bob = bob.await.expect("bob task").expect("bob script");
    assert_eq!(alice.acks, vec![PlayerId(2)]);
    assert_eq!(bob.inbox.len(), 1);
    assert_eq!(bob.inbox[0].from, PlayerId(1));
    assert_eq!(bob.inbox[0].text, "hello");

    system.shutdown().await.expect("Shutdown failed");
}

/// A line for an offline player is stored, the author notified, and the line collected later.
#[tokio::test]
async fn test_offline_chat_is_stored_and_collected() {
    let system = GameSystem::new(GameConfig::default(), items());

    let alice = system.spawn_player(PlayerId(1), 0, |player| {
        player.chat_to(PlayerId(3), "are you there?")?;
        player.pump_until("offline notice", WAIT, |s| !s.offline_notices.is_empty())?;
        Ok(player.state())
    });
    let alice = alice.await.expect("alice task").expect("alice script");
    assert_eq!(alice.offline_notices[0].to, PlayerId(3));
    assert_eq!(system.board.pending(PlayerId(3)), 1);

    let carol = system.spawn_player(PlayerId(3), 0, |player| {
        player.fetch_offline_messages()?;
        player.pump_until("stored lines", WAIT, |s| !s.recovered.is_empty())?;
        Ok(player.state())
    });
    let carol = carol.await.expect("carol task").expect("carol script");
    assert_eq!(carol.recovered[0].text, "are you there?");
    assert_eq!(system.board.pending(PlayerId(3)), 0);

    system.shutdown().await.expect("Shutdown failed");
}

/// The chat service ticks while it runs, and shutdown stops it cleanly.
#[tokio::test]
async fn test_chat_ticks_until_shutdown() {
    let mut config = GameConfig::default();
    config.chat.tick_interval_us = 1_000;
    let system = GameSystem::new(config, Vec::new());

    let board = system.board.clone();
    tokio::time::timeout(WAIT, async {
        while board.ticks() < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("chat never ticked");

    system.shutdown().await.expect("Shutdown failed");
}

/// Game configuration can be loaded from JSON, with defaults for what is missing.
#[test]
fn test_game_config_from_json() {
    let config: GameConfig =
        serde_json::from_str(r#"{ "shop": { "name": "shop", "mailbox_capacity": 50 } }"#).unwrap();
    assert_eq!(config.shop.mailbox_capacity, 50);
    assert_eq!(config.chat, GameConfig::default().chat);
}

//! # System Lifecycle & Orchestration
//!
//! Starts the services, hands out their inlets, hosts players and shuts everything down.
//!
//! ## Hosting
//!
//! Actors here are blocking loops, so each one gets a `tokio::task::spawn_blocking` task:
//!
//! - **Services** run [`RequestHandler::run`](actor_mailbox::RequestHandler::run) until their
//!   mailbox is closed.
//! - **Players** are built inside their task, since a response handler cannot move between
//!   threads, and run a script that polls them.
//!
//! ## Graceful Shutdown
//!
//! 1. **Close every service mailbox**. Producers blocked on a full mailbox are released and
//!    the loops observe the close signal.
//! 2. **Await every task**. A loop that ended with an error or a task that panicked fails the
//!    shutdown.
//!
//! ```rust,no_run
//! use mailbox_sample::lifecycle::{GameConfig, GameSystem};
//! use mailbox_sample::model::{PlayerId, ShopItem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let system = GameSystem::new(GameConfig::default(), vec![ShopItem::new(1, 1, 10, 5)]);
//!     let player = system.spawn_player(PlayerId(1), 100, |player| {
//!         player.buy_item(1, 2)?;
//!         player.pump_until("purchase", std::time::Duration::from_secs(1), |s| s.money < 100)?;
//!         Ok(player.money())
//!     });
//!     let money = player.await.map_err(|e| e.to_string())?.map_err(|e| e.to_string())?;
//!     assert_eq!(money, 90);
//!     system.shutdown().await
//! }
//! ```

pub mod game_system;

pub use game_system::*;

use crate::chat_service::{self, ChatBoard};
use crate::model::{PlayerId, ShopItem};
use crate::player::{Player, PlayerError};
use crate::shop_service::{self, Inventory};
use actor_mailbox::{ActorError, Inlet, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Settings for every actor in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub shop: RuntimeConfig,
    pub chat: RuntimeConfig,
    /// Template for every player's response handler.
    pub player: RuntimeConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            shop: RuntimeConfig::named("shop"),
            chat: RuntimeConfig::named("chat"),
            player: RuntimeConfig::named("player").with_mailbox_capacity(100),
        }
    }
}

/// The running game: a shop and a chat service, plus whatever players are hosted.
///
/// # Example
///
/// ```ignore
/// let system = GameSystem::new(GameConfig::default(), items);
/// let alice = system.spawn_player(PlayerId(1), 500, |player| {
///     player.get_item_list()?;
///     player.pump_until("catalog", Duration::from_secs(1), |s| !s.catalog.is_empty())
/// });
/// alice.await??;
/// system.shutdown().await?;
/// ```
pub struct GameSystem {
    /// Intake of the shop service.
    pub shop: Inlet<PlayerId>,
    /// Intake of the chat service.
    pub chat: Inlet<PlayerId>,
    pub inventory: Inventory,
    pub board: Arc<ChatBoard>,
    player_config: RuntimeConfig,
    handles: Vec<JoinHandle<Result<(), ActorError>>>,
}

impl GameSystem {
    /// Builds both services and starts each on a blocking task.
    pub fn new(config: GameConfig, items: Vec<ShopItem>) -> Self {
        let inventory = Inventory::new(items);
        let board = Arc::new(ChatBoard::default());

        let shop = shop_service::new(&config.shop, inventory.clone());
        let chat = chat_service::new(&config.chat, board.clone());
        let shop_inlet = shop.inlet().clone();
        let chat_inlet = chat.inlet().clone();

        let shop_handle = tokio::task::spawn_blocking(move || shop.run());
        let chat_handle = tokio::task::spawn_blocking(move || chat.run());
        info!("Game services started");

        Self {
            shop: shop_inlet,
            chat: chat_inlet,
            inventory,
            board,
            player_config: config.player,
            handles: vec![shop_handle, chat_handle],
        }
    }

    /// Hosts a player on a blocking task and runs `script` against it.
    ///
    /// The player signs off from both services once the script returns, whatever its outcome.
    pub fn spawn_player<T, F>(&self, id: PlayerId, money: u64, script: F) -> JoinHandle<Result<T, PlayerError>>
    where
        T: Send + 'static,
        F: FnOnce(&mut Player) -> Result<T, PlayerError> + Send + 'static,
    {
        let config = self.player_config.clone();
        let (shop, chat) = (self.shop.clone(), self.chat.clone());
        tokio::task::spawn_blocking(move || {
            let config = RuntimeConfig {
                name: id.to_string(),
                ..config
            };
            let mut player = Player::new(id, money, &config, &shop, &chat)?;
            let outcome = script(&mut player);
            let left = player.leave();
            let value = outcome?;
            left?;
            Ok(value)
        })
    }

    /// Closes both services and waits for their loops to finish.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        self.shop.close();
        self.chat.close();

        for handle in self.handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Actor loop failed");
                    return Err(format!("Actor loop failed: {e}"));
                }
                Err(e) => {
                    error!("Actor task failed: {:?}", e);
                    return Err(format!("Actor task failed: {:?}", e));
                }
            }
        }

        info!(ticks = self.board.ticks(), "System shutdown complete.");
        Ok(())
    }
}

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use teloxide::dispatching::UpdateHandler;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::dialogue::RedisStorage;
use teloxide::dispatching::dialogue::Storage;
use teloxide::dispatching::dialogue::serializer::Json;
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::debug;
use tracing::info;

use crate::bot;
use crate::bot::Command;
use crate::bot::DialogueStorage;
use crate::bot::SharedEngine;
use crate::config::Config;
use crate::config::RedisConfig;
use crate::dialog::DialogEngine;
use crate::dialog::DialogStack;
use crate::dialog::DialogTree;
use crate::dialog::FuncsRegistry;
use crate::functions;

pub struct App {
  bot: Bot,
  engine: SharedEngine,
  storage: Arc<DialogueStorage>,
  handler: UpdateHandler<anyhow::Error>,
}

impl App {
  pub async fn build(bot: Bot, config: &Config) -> Result<Self> {
    let engine = Arc::new(build_engine(config)?);
    info!(
      windows = engine.tree().window_count(),
      functions = engine.registry().len(),
      "dialogs built and validated"
    );
    let storage = open_storage(config.redis.as_ref()).await?;
    let handler = bot::build_schema();
    Ok(Self {
      bot,
      engine,
      storage,
      handler,
    })
  }

  pub async fn run(self) -> Result<()> {
    on_startup(&self.bot).await?;
    let me = self.bot.get_me().await.context("failed to reach Telegram API")?;
    info!(username = me.username(), bot_id = %me.id, "bot startup complete");

    Dispatcher::builder(self.bot.clone(), self.handler)
      .dependencies(dptree::deps![self.engine.clone(), self.storage.clone(), me])
      .default_handler(|update: Arc<Update>| async move {
        debug!(update_id = ?update.id, "unhandled update");
      })
      .error_handler(LoggingErrorHandler::with_custom_text("an error has occurred in the dispatcher"))
      .enable_ctrlc_handler()
      .build()
      .dispatch()
      .await;

    info!("bot shutdown complete");
    Ok(())
  }
}

fn build_engine(config: &Config) -> Result<DialogEngine> {
  let mut registry = FuncsRegistry::new();
  functions::register_dialog_funcs(&mut registry);
  let tree = DialogTree::from_path(&config.dialogs_path)
    .with_context(|| format!("failed to load dialogs from {}", config.dialogs_path.display()))?;
  DialogEngine::new(tree, registry).context("dialog description failed validation")
}

async fn on_startup(bot: &Bot) -> Result<()> {
  info!("executing startup tasks");
  bot
    .delete_webhook()
    .drop_pending_updates(true)
    .await
    .context("failed to drop pending updates")?;
  bot
    .set_my_commands(Command::bot_commands())
    .await
    .context("failed to register bot commands")?;
  Ok(())
}

async fn open_storage(redis: Option<&RedisConfig>) -> Result<Arc<DialogueStorage>> {
  match redis {
    Some(redis) => {
      info!(host = %redis.host, port = redis.port, db = redis.db, "using redis session storage");
      let storage = RedisStorage::open(&redis.url(), Json)
        .await
        .context("failed to connect to redis")?;
      Ok(storage.erase())
    },
    None => {
      info!("REDIS_HOST not set, using in-memory session storage");
      Ok(InMemStorage::<DialogStack>::new().erase())
    },
  }
}

use anyhow::Result;
use dialog_menu_bot::app::App;
use dialog_menu_bot::config::Config;
use dialog_menu_bot::telemetry;
use teloxide::prelude::Bot;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
  dotenv::dotenv().ok();
  let config = Config::from_env()?;
  telemetry::init(&config.log)?;
  info!(
    log_dir = %config.log.dir.display(),
    dialogs = %config.dialogs_path.display(),
    redis = config.redis.is_some(),
    "starting bot"
  );

  let bot = Bot::new(config.bot_token.clone());
  let app = App::build(bot, &config).await?;
  app.run().await
}

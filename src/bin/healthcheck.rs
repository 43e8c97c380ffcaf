use std::process::ExitCode;

use dialog_menu_bot::config;
use dialog_menu_bot::healthcheck;
use dialog_menu_bot::healthcheck::HealthError;
use dialog_menu_bot::telemetry;
use teloxide::prelude::Bot;

#[tokio::main]
async fn main() -> ExitCode {
  dotenv::dotenv().ok();
  if let Err(err) = telemetry::init_console("info") {
    eprintln!("failed to initialise logging: {err:#}");
  }

  let result = match config::bot_token_from_env() {
    Ok(token) => healthcheck::check_connection(&Bot::new(token)).await,
    Err(err) => Err(HealthError::Unexpected(err)),
  };
  ExitCode::from(healthcheck::report(&result))
}

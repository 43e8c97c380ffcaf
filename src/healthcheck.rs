use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::Me;
use thiserror::Error;
use tracing::error;
use tracing::info;

#[derive(Debug, Error)]
pub enum HealthError {
  #[error("bot token is invalid")]
  InvalidToken,
  #[error("Telegram API error: {0}")]
  Api(ApiError),
  #[error("unexpected error: {0}")]
  Unexpected(anyhow::Error),
}

impl From<RequestError> for HealthError {
  fn from(err: RequestError) -> Self {
    match err {
      RequestError::Api(ApiError::InvalidToken) => Self::InvalidToken,
      RequestError::Api(api) => Self::Api(api),
      other => Self::Unexpected(other.into()),
    }
  }
}

/// One `getMe` round trip.
pub async fn check_connection(bot: &Bot) -> Result<Me, HealthError> {
  Ok(bot.get_me().await?)
}

/// Logs the result and maps it to a process exit status.
pub fn report<T>(result: &Result<T, HealthError>) -> u8 {
  match result {
    Ok(_) => {
      info!("healthcheck successful: connection to Telegram API is OK");
      0
    },
    Err(HealthError::InvalidToken) => {
      error!("healthcheck failed: bot token is invalid");
      1
    },
    Err(HealthError::Api(err)) => {
      error!(error = %err, "healthcheck failed: Telegram API error");
      1
    },
    Err(HealthError::Unexpected(err)) => {
      error!(error = %err, "healthcheck failed: unexpected error");
      1
    },
  }
}

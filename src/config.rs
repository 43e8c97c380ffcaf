use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_DIALOGS_PATH: &str = "data/main.yaml";
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Clone)]
pub struct Config {
  pub bot_token: String,
  pub log: LogConfig,
  pub redis: Option<RedisConfig>,
  pub dialogs_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
  pub level: String,
  pub dir: PathBuf,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RedisConfig {
  pub host: String,
  pub port: u16,
  pub password: Option<String>,
  pub db: i64,
}

impl RedisConfig {
  pub fn url(&self) -> String {
    match &self.password {
      Some(password) => format!("redis://:{password}@{}:{}/{}", self.host, self.port, self.db),
      None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
    }
  }
}

impl fmt::Debug for RedisConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RedisConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("password", &self.password.as_ref().map(|_| "<redacted>"))
      .field("db", &self.db)
      .finish()
  }
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let bot_token = bot_token_from(&lookup)?;
    let log = LogConfig {
      level: non_empty(lookup("LOG_LEVEL")).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
      dir: non_empty(lookup("LOG_DIR")).unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()).into(),
    };
    let redis = redis_from(&lookup)?;
    let dialogs_path = non_empty(lookup("DIALOGS_PATH"))
      .unwrap_or_else(|| DEFAULT_DIALOGS_PATH.to_string())
      .into();
    Ok(Self {
      bot_token,
      log,
      redis,
      dialogs_path,
    })
  }
}

/// Token lookup shared with the health check, which needs nothing else.
pub fn bot_token_from_env() -> Result<String> {
  bot_token_from(&|key: &str| env::var(key).ok())
}

fn bot_token_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
  non_empty(lookup("BOT_TOKEN"))
    .or_else(|| non_empty(lookup("TELOXIDE_TOKEN")))
    .context("BOT_TOKEN or TELOXIDE_TOKEN must be set")
}

fn redis_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<RedisConfig>> {
  let Some(host) = non_empty(lookup("REDIS_HOST")) else {
    return Ok(None);
  };
  let port = match non_empty(lookup("REDIS_PORT")) {
    Some(raw) => raw
      .parse::<u16>()
      .with_context(|| format!("REDIS_PORT must be a port number, got {raw:?}"))?,
    None => DEFAULT_REDIS_PORT,
  };
  let db = match non_empty(lookup("REDIS_DB")) {
    Some(raw) => raw
      .parse::<i64>()
      .with_context(|| format!("REDIS_DB must be an integer, got {raw:?}"))?,
    None => 0,
  };
  Ok(Some(RedisConfig {
    host,
    port,
    password: non_empty(lookup("REDIS_PASSWORD")),
    db,
  }))
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
}

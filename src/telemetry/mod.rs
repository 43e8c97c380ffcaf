mod rotating;

use std::fmt;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use rotating::RotatingFileWriter;

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "app";
const MAX_LOG_FILE_BYTES: u64 = 50 * 1024 * 1024;

struct ClockTime;

impl FormatTime for ClockTime {
  fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
    write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
  }
}

/// Console output for people plus JSON lines in `LOG_DIR` for machines.
pub fn init(config: &LogConfig) -> Result<()> {
  let writer = RotatingFileWriter::new(&config.dir, LOG_FILE_PREFIX, MAX_LOG_FILE_BYTES)
    .with_context(|| format!("failed to open log directory {}", config.dir.display()))?;

  let console = tracing_subscriber::fmt::layer()
    .with_timer(ClockTime)
    .with_target(true)
    .with_ansi(true);

  let file = tracing_subscriber::fmt::layer()
    .json()
    .with_writer(writer)
    .with_ansi(false)
    .with_file(true)
    .with_line_number(true)
    .with_current_span(true)
    .with_span_list(false);

  Registry::default()
    .with(env_filter(&config.level))
    .with(console)
    .with(file)
    .try_init()
    .map_err(|err| anyhow!("failed to set global subscriber: {err}"))
}

/// Console-only logging for short-lived tools such as the health check.
pub fn init_console(level: &str) -> Result<()> {
  let console = tracing_subscriber::fmt::layer().with_timer(ClockTime).with_target(true);
  Registry::default()
    .with(env_filter(level))
    .with(console)
    .try_init()
    .map_err(|err| anyhow!("failed to set global subscriber: {err}"))
}

fn env_filter(level: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: &str) -> String {
  format!("{},teloxide::dispatching=warn", level.to_lowercase())
}

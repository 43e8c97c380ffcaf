use thiserror::Error;

use crate::dialog::model::ModelError;
use crate::dialog::model::StateId;
use crate::dialog::registry::RegistryError;

#[derive(Debug, Error)]
pub enum DialogError {
  #[error("callback refers to unknown intent {0}")]
  UnknownIntent(String),
  #[error("callback refers to intent {0} that is no longer on top of the stack")]
  OutdatedIntent(String),
  #[error("malformed callback data {0:?}")]
  MalformedCallback(String),
  #[error("no dialog is open")]
  NoActiveDialog,
  #[error("state {0} does not exist")]
  UnknownState(StateId),
  #[error("state {target} belongs to another dialog than {current}")]
  ForeignState { current: StateId, target: StateId },
  #[error("widget {0} is not in the current window")]
  UnknownWidget(String),
  #[error("window {0} has no neighbour in that direction")]
  NoNeighbour(StateId),
  #[error("callback data {0:?} is longer than Telegram allows")]
  CallbackDataTooLong(String),
  #[error("function {0} is not registered with the expected kind")]
  UnresolvedFunction(String),
  #[error(transparent)]
  Handler(#[from] anyhow::Error),
}

impl DialogError {
  /// Errors the bot answers by restarting at the root window.
  pub fn is_unknown_intent(&self) -> bool {
    matches!(
      self,
      Self::UnknownIntent(_) | Self::NoActiveDialog | Self::UnknownState(_) | Self::UnknownWidget(_)
    )
  }
}

#[derive(Debug, Error)]
pub enum SetupError {
  #[error(transparent)]
  Model(#[from] ModelError),
  #[error(transparent)]
  Registry(#[from] RegistryError),
}

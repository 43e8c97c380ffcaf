use std::sync::Arc;

use teloxide::dispatching::dialogue::Dialogue;
use teloxide::dispatching::dialogue::ErasedStorage;

use crate::dialog::DialogEngine;
use crate::dialog::DialogStack;

pub mod commands;
pub mod handlers;
pub mod recovery;

pub type HandlerResult = anyhow::Result<()>;
pub type DialogueStorage = ErasedStorage<DialogStack>;
pub type BotDialogue = Dialogue<DialogStack, DialogueStorage>;
pub type SharedEngine = Arc<DialogEngine>;

pub use commands::Command;
pub use handlers::build_schema;

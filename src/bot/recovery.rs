//! Restarting users whose buttons point at dialogs that no longer exist,
//! typically after a redeploy wiped in-memory sessions.

use futures::future::join;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::types::ChatId;
use teloxide::types::MessageId;
use tracing::debug;
use tracing::info;

use crate::bot::BotDialogue;
use crate::bot::HandlerResult;
use crate::bot::handlers::save_stack;
use crate::bot::handlers::show_window;
use crate::dialog::DialogEngine;
use crate::dialog::DialogError;
use crate::dialog::DialogStack;
use crate::dialog::UserInfo;

pub const RECOVERY_NOTICE: &str = "Bot process was restarted due to maintenance.\nRedirecting to main menu.";

pub async fn recover_from_unknown_intent(
  bot: &Bot,
  engine: &DialogEngine,
  dialogue: &BotDialogue,
  query: &CallbackQuery,
  user: &UserInfo,
  mut stack: DialogStack,
) -> HandlerResult {
  bot.answer_callback_query(query.id.clone()).text(RECOVERY_NOTICE).await?;

  let chat = query.message.as_ref().map(|message| {
    let chat_id = message.chat().id;
    (chat_id, message.id())
  });
  if let Some((chat_id, message_id)) = chat {
    discard_stale_message(bot, chat_id, message_id).await;
  }

  reset_to_root(engine, &mut stack, user)?;
  if let Some((chat_id, _)) = chat {
    show_window(bot, engine, &mut stack, user, chat_id, None).await?;
  }
  save_stack(dialogue, stack).await
}

/// Drops every open dialog and opens the root window.
pub fn reset_to_root(engine: &DialogEngine, stack: &mut DialogStack, user: &UserInfo) -> Result<(), DialogError> {
  let dropped = stack.len();
  engine.restart_at_root(stack, user)?;
  info!(user_id = user.id, dropped, root = %engine.root(), "restarted dialogs at root");
  Ok(())
}

/// Deletes the stale message, or blanks it when Telegram refuses the deletion.
/// Failures are logged and otherwise ignored.
async fn discard_stale_message(bot: &Bot, chat: ChatId, message_id: MessageId) {
  let Err(err) = bot.delete_message(chat, message_id).await else {
    debug!(chat_id = %chat, message_id = %message_id, "deleted stale message");
    return;
  };
  debug!(chat_id = %chat, message_id = %message_id, error = %err, "could not delete stale message, blanking it");

  let (caption, text) = join(
    bot.edit_message_caption(chat, message_id).caption(" ").send(),
    bot.edit_message_text(chat, message_id, " ").send(),
  )
  .await;
  if let (Err(caption_err), Err(text_err)) = (caption, text) {
    debug!(
      chat_id = %chat,
      message_id = %message_id,
      caption_error = %caption_err,
      text_error = %text_err,
      "could not blank stale message"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::reset_to_root;
  use crate::dialog::DialogEngine;
  use crate::dialog::DialogStack;
  use crate::dialog::DialogTree;
  use crate::dialog::FuncsRegistry;
  use crate::dialog::StartMode;
  use crate::dialog::StateId;
  use crate::dialog::UserInfo;
  use crate::functions::register_dialog_funcs;

  fn engine() -> DialogEngine {
    let mut registry = FuncsRegistry::new();
    register_dialog_funcs(&mut registry);
    let tree = DialogTree::from_yaml(include_str!("../../data/main.yaml")).expect("shipped yaml parses");
    DialogEngine::new(tree, registry).expect("shipped dialogs are valid")
  }

  #[test]
  fn deep_stack_collapses_to_root() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    engine
      .start(&mut stack, &user, &StateId::from("Switch.NAME"), StartMode::Normal)
      .expect("switch dialog");
    engine
      .start(&mut stack, &user, &StateId::from("Counters.MAIN"), StartMode::Normal)
      .expect("counter dialog");
    stack
      .current_mut()
      .expect("frame")
      .dialog_data
      .insert("name", "stale");

    reset_to_root(&engine, &mut stack, &user).expect("reset");
    assert_eq!(stack.len(), 1);
    let frame = stack.current().expect("root frame");
    assert_eq!(frame.state, StateId::from("Menu.MAIN"));
    assert!(frame.dialog_data.is_empty());
  }

  #[test]
  fn empty_stack_also_lands_on_root() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    reset_to_root(&engine, &mut stack, &user).expect("reset");
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.current().map(|frame| frame.state.as_str()), Some("Menu.MAIN"));
  }
}

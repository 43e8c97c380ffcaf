use anyhow::Context;
use anyhow::anyhow;
use chrono::Local;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::types::ChatId;
use teloxide::types::Message;
use teloxide::types::MessageId;
use teloxide::utils::command::BotCommands;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::bot::BotDialogue;
use crate::bot::Command;
use crate::bot::DialogueStorage;
use crate::bot::HandlerResult;
use crate::bot::SharedEngine;
use crate::bot::recovery;
use crate::dialog::DialogEngine;
use crate::dialog::DialogError;
use crate::dialog::DialogStack;
use crate::dialog::Notification;
use crate::dialog::UserInfo;

pub fn build_schema() -> UpdateHandler<anyhow::Error> {
  let message_handler = Update::filter_message()
    .enter_dialogue::<Message, DialogueStorage, DialogStack>()
    .branch(command_branch())
    .branch(dptree::endpoint(handle_message));

  let callback_handler = Update::filter_callback_query()
    .enter_dialogue::<CallbackQuery, DialogueStorage, DialogStack>()
    .endpoint(handle_callback_query);

  dptree::entry().branch(message_handler).branch(callback_handler)
}

fn command_branch() -> UpdateHandler<anyhow::Error> {
  dptree::entry()
    .filter_command::<Command>()
    .branch(dptree::case![Command::Start].endpoint(handle_start))
    .branch(dptree::case![Command::Help].endpoint(handle_help))
}

#[instrument(skip(bot, engine, dialogue, msg))]
async fn handle_start(bot: Bot, engine: SharedEngine, dialogue: BotDialogue, msg: Message) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let user = UserInfo::from(user);
  info!(user_id = user.id, chat_id = %msg.chat.id, "received /start command");

  let mut stack = load_stack(&dialogue).await?;
  engine.restart_at_root(&mut stack, &user)?;
  show_window(&bot, &engine, &mut stack, &user, msg.chat.id, None).await?;
  save_stack(&dialogue, stack).await
}

#[instrument(skip(bot, msg))]
async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
  info!(chat_id = %msg.chat.id, "received /help command");
  let mut text = Command::descriptions().to_string();
  text.push_str("\n\nEverything else happens through the on-screen buttons. Use /start to open the main menu again.");
  bot.send_message(msg.chat.id, text).await?;
  Ok(())
}

#[instrument(skip(bot, engine, dialogue, msg))]
async fn handle_message(bot: Bot, engine: SharedEngine, dialogue: BotDialogue, msg: Message) -> HandlerResult {
  let Some(user) = msg.from.as_ref() else {
    return Ok(());
  };
  let user = UserInfo::from(user);
  let chat = msg.chat.id;

  let mut stack = load_stack(&dialogue).await?;
  if stack.is_empty() {
    debug!(user_id = user.id, chat_id = %chat, "message outside of any dialog");
    return Ok(());
  }

  let outcome = match engine.process_message(&mut stack, &user, msg.text()) {
    Ok(outcome) => outcome,
    Err(err) if err.is_unknown_intent() => {
      warn!(user_id = user.id, chat_id = %chat, error = %err, "dialog state is gone, restarting at root");
      engine.restart_at_root(&mut stack, &user)?;
      show_window(&bot, &engine, &mut stack, &user, chat, None).await?;
      return save_stack(&dialogue, stack).await;
    },
    Err(err) => return Err(err.into()),
  };
  if !outcome.handled {
    debug!(user_id = user.id, chat_id = %chat, "window does not take text input");
    return Ok(());
  }

  info!(user_id = user.id, chat_id = %chat, "handled dialog input");
  for reply in outcome.replies {
    bot.send_message(chat, reply).await?;
  }
  show_window(&bot, &engine, &mut stack, &user, chat, None).await?;
  save_stack(&dialogue, stack).await
}

#[instrument(skip(bot, engine, dialogue, query))]
async fn handle_callback_query(
  bot: Bot,
  engine: SharedEngine,
  dialogue: BotDialogue,
  query: CallbackQuery,
) -> HandlerResult {
  let user = UserInfo::from(&query.from);
  let message_ctx = query.message.as_ref().map(|message| (message.chat().id, message.id()));
  let callback_data = query.data.as_deref().unwrap_or_default();
  info!(user_id = user.id, callback = callback_data, "handling callback query");

  let mut stack = load_stack(&dialogue).await?;
  let outcome = match engine.process_callback(&mut stack, &user, callback_data) {
    Ok(outcome) => outcome,
    Err(DialogError::OutdatedIntent(intent_id)) => {
      info!(user_id = user.id, intent_id = %intent_id, "ignoring callback from an outdated window");
      bot.answer_callback_query(query.id).await?;
      return Ok(());
    },
    Err(err) if err.is_unknown_intent() || matches!(err, DialogError::MalformedCallback(_)) => {
      warn!(user_id = user.id, error = %err, "callback does not match any open dialog");
      return recovery::recover_from_unknown_intent(&bot, &engine, &dialogue, &query, &user, stack).await;
    },
    Err(err) => return Err(err.into()),
  };

  answer_callback(&bot, &query, outcome.answer).await?;
  if let Some((chat_id, message_id)) = message_ctx {
    for reply in outcome.replies {
      bot.send_message(chat_id, reply).await?;
    }
    show_window(&bot, &engine, &mut stack, &user, chat_id, Some(message_id)).await?;
  }
  save_stack(&dialogue, stack).await
}

async fn answer_callback(bot: &Bot, query: &CallbackQuery, answer: Option<Notification>) -> HandlerResult {
  let mut request = bot.answer_callback_query(query.id.clone());
  if let Some(notification) = answer {
    if let Some(text) = notification.text {
      request = request.text(text);
    }
    request = request.show_alert(notification.show_alert);
    if let Some(url) = notification.url {
      match url.parse() {
        Ok(url) => request = request.url(url),
        Err(err) => warn!(url = %url, error = %err, "ignoring invalid callback answer url"),
      }
    }
    if let Some(cache_time) = notification.cache_time {
      request = request.cache_time(cache_time);
    }
  }
  request.await?;
  Ok(())
}

/// Renders the top window, editing `edit` in place or sending a new message.
pub(crate) async fn show_window(
  bot: &Bot,
  engine: &DialogEngine,
  stack: &mut DialogStack,
  user: &UserInfo,
  chat: ChatId,
  edit: Option<MessageId>,
) -> HandlerResult {
  let Some(window) = engine.render(stack, user, Local::now().date_naive())? else {
    if let Some(message_id) = edit {
      match bot.edit_message_reply_markup(chat, message_id).await {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => {},
        Err(err) => return Err(err.into()),
      }
    }
    info!(user_id = user.id, chat_id = %chat, "all dialogs closed");
    return Ok(());
  };

  match edit {
    Some(message_id) => {
      let request = bot
        .edit_message_text(chat, message_id, window.text)
        .reply_markup(window.keyboard);
      match request.await {
        Ok(_) => debug!(user_id = user.id, chat_id = %chat, message_id = %message_id, "updated dialog window"),
        Err(RequestError::Api(ApiError::MessageNotModified)) => {
          debug!(user_id = user.id, chat_id = %chat, message_id = %message_id, "dialog window already current");
        },
        Err(err) => return Err(err.into()),
      }
    },
    None => {
      bot.send_message(chat, window.text).reply_markup(window.keyboard).await?;
      debug!(user_id = user.id, chat_id = %chat, "sent dialog window");
    },
  }
  Ok(())
}

pub(crate) async fn load_stack(dialogue: &BotDialogue) -> anyhow::Result<DialogStack> {
  dialogue.get_or_default().await.map_err(|err| anyhow!(err))
}

pub(crate) async fn save_stack(dialogue: &BotDialogue, stack: DialogStack) -> HandlerResult {
  let result = if stack.is_empty() {
    dialogue.exit().await
  } else {
    dialogue.update(stack).await
  };
  result.map_err(|err| anyhow!(err))
}

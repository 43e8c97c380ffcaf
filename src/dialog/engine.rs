use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::Value;
use teloxide::types::InlineKeyboardMarkup;
use tracing::debug;
use tracing::instrument;

use crate::dialog::calendar;
use crate::dialog::calendar::CalendarAction;
use crate::dialog::context::DialogStack;
use crate::dialog::context::IntentLookup;
use crate::dialog::context::StartMode;
use crate::dialog::context::WidgetData;
use crate::dialog::error::DialogError;
use crate::dialog::error::SetupError;
use crate::dialog::event::CallbackEvent;
use crate::dialog::event::MessageEvent;
use crate::dialog::event::Notification;
use crate::dialog::event::UserInfo;
use crate::dialog::manager::DialogManager;
use crate::dialog::model::DialogTree;
use crate::dialog::model::Items;
use crate::dialog::model::StateId;
use crate::dialog::model::ToggleItemsModel;
use crate::dialog::model::WidgetModel;
use crate::dialog::model::WindowModel;
use crate::dialog::registry::DisplayData;
use crate::dialog::registry::Func;
use crate::dialog::registry::FuncsRegistry;
use crate::dialog::render::CallbackPayload;
use crate::dialog::render::KeyboardRenderer;
use crate::dialog::render::Scope;
use crate::dialog::render::format_template;
use crate::dialog::widgets::ManagedWidget;

/// How the bot should present the window after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowMode {
  /// Edit the message the callback came from.
  Edit,
  /// Send a fresh message.
  Send,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
  pub answer: Option<Notification>,
  pub replies: Vec<String>,
  pub show_mode: ShowMode,
  pub handled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedWindow {
  pub text: String,
  pub keyboard: InlineKeyboardMarkup,
}

/// Validated dialog description plus the functions it refers to.
pub struct DialogEngine {
  tree: DialogTree,
  registry: FuncsRegistry,
}

impl DialogEngine {
  pub fn new(tree: DialogTree, registry: FuncsRegistry) -> Result<Self, SetupError> {
    tree.validate()?;
    registry.validate(&tree)?;
    Ok(Self { tree, registry })
  }

  pub fn tree(&self) -> &DialogTree {
    &self.tree
  }

  pub fn registry(&self) -> &FuncsRegistry {
    &self.registry
  }

  pub fn root(&self) -> &StateId {
    self.tree.root()
  }

  pub fn start(&self, stack: &mut DialogStack, user: &UserInfo, state: &StateId, mode: StartMode) -> Result<(), DialogError> {
    DialogManager::new(&self.tree, stack, user).start(state, mode)
  }

  /// Clears every open dialog and opens the root window.
  pub fn restart_at_root(&self, stack: &mut DialogStack, user: &UserInfo) -> Result<(), DialogError> {
    self.start(stack, user, self.tree.root(), StartMode::ResetStack)
  }

  #[instrument(skip(self, stack, user), fields(user_id = user.id))]
  pub fn process_callback(
    &self,
    stack: &mut DialogStack,
    user: &UserInfo,
    raw: &str,
  ) -> Result<Outcome, DialogError> {
    let payload = CallbackPayload::parse(raw).ok_or_else(|| DialogError::MalformedCallback(raw.to_string()))?;
    match stack.locate(payload.intent_id) {
      IntentLookup::Current => {},
      IntentLookup::Outdated => return Err(DialogError::OutdatedIntent(payload.intent_id.to_string())),
      IntentLookup::Unknown => return Err(DialogError::UnknownIntent(payload.intent_id.to_string())),
    }
    let state = stack.current().map(|frame| frame.state.clone()).ok_or(DialogError::NoActiveDialog)?;
    let window = self
      .tree
      .window(&state)
      .ok_or_else(|| DialogError::UnknownState(state.clone()))?;
    let widget = window
      .find_widget(payload.widget_id)
      .ok_or_else(|| DialogError::UnknownWidget(payload.widget_id.to_string()))?;

    let mut event = CallbackEvent::new(user.clone(), payload.widget_id);
    if payload.action != calendar::NOOP {
      let mut manager = DialogManager::new(&self.tree, stack, user);
      self.dispatch_click(window, widget, payload.action, &mut event, &mut manager)?;
    }
    debug!(state = %state, widget_id = payload.widget_id, action = payload.action, "processed callback");

    let (answer, replies) = event.into_effects();
    Ok(Outcome {
      answer,
      replies,
      show_mode: ShowMode::Edit,
      handled: true,
    })
  }

  fn dispatch_click(
    &self,
    window: &WindowModel,
    widget: &WidgetModel,
    action: &str,
    event: &mut CallbackEvent,
    manager: &mut DialogManager<'_>,
  ) -> Result<(), DialogError> {
    match widget {
      WidgetModel::Button(model) => {
        if let Some(notify) = &model.notify {
          let Some(Func::Notify(func)) = self.registry.get(notify.name()) else {
            return Err(DialogError::UnresolvedFunction(notify.name().to_string()));
          };
          func(event, manager, notify.data())?;
        } else if let Some(on_click) = &model.on_click {
          let Some(Func::Click(func)) = self.registry.get(on_click.name()) else {
            return Err(DialogError::UnresolvedFunction(on_click.name().to_string()));
          };
          func(event, manager, &on_click.data())?;
        }
      },
      WidgetModel::SwitchTo(model) => manager.switch_to(&model.state)?,
      WidgetModel::Start(model) => manager.start(&model.state, StartMode::Normal)?,
      WidgetModel::Next(_) => manager.next()?,
      WidgetModel::Back(_) => manager.back()?,
      WidgetModel::Cancel(_) => manager.done()?,
      WidgetModel::Counter(model) => {
        let Some(ManagedWidget::Counter(counter)) = manager.find(&model.id) else {
          return Err(DialogError::UnknownWidget(model.id.clone()));
        };
        let value = match action {
          "-" => counter.value().saturating_sub(model.increment).max(model.min),
          "+" => counter.value().saturating_add(model.increment).min(model.max),
          "=" => {
            if let Some(name) = &model.on_text_click {
              let Some(Func::CounterClick(func)) = self.registry.get(name) else {
                return Err(DialogError::UnresolvedFunction(name.clone()));
              };
              func(event, &counter, manager)?;
            }
            return Ok(());
          },
          _ => return Ok(()),
        };
        store(manager, &model.id, WidgetData::Counter(value))?;
      },
      WidgetModel::Checkbox(model) => {
        let checked = matches!(manager.find(&model.id), Some(ManagedWidget::Checkbox(checkbox)) if checkbox.is_checked());
        store(manager, &model.id, WidgetData::Checkbox(!checked))?;
      },
      WidgetModel::Radio(model) => {
        if !self.offers_item(window, model, action, manager)? {
          return Ok(());
        }
        store(manager, &model.id, WidgetData::Radio(Some(action.to_string())))?;
      },
      WidgetModel::Multiselect(model) => {
        if !self.offers_item(window, model, action, manager)? {
          return Ok(());
        }
        let mut checked: BTreeSet<String> = match manager.find(&model.id) {
          Some(ManagedWidget::Multiselect(multiselect)) => multiselect.checked().map(str::to_string).collect(),
          _ => BTreeSet::new(),
        };
        if !checked.remove(action) {
          checked.insert(action.to_string());
        }
        store(manager, &model.id, WidgetData::Multiselect(checked))?;
      },
      WidgetModel::Select(model) => {
        if let Some(name) = &model.on_click {
          let Some(Func::ItemSelected(func)) = self.registry.get(name) else {
            return Err(DialogError::UnresolvedFunction(name.clone()));
          };
          func(event, manager, action)?;
        }
      },
      WidgetModel::ScrollingGroup(model) => {
        if let Ok(page) = action.parse::<usize>() {
          store(manager, &model.id, WidgetData::Scroll(page))?;
        }
      },
      WidgetModel::NumberedPager(model) => {
        if let Ok(page) = action.parse::<usize>() {
          store(manager, &model.scroll, WidgetData::Scroll(page))?;
        }
      },
      WidgetModel::Calendar(model) | WidgetModel::LocalizedCalendar(model) => match calendar::apply(action) {
        CalendarAction::Select(date) => {
          if let Some(name) = &model.on_click {
            let Some(Func::DateSelected(func)) = self.registry.get(name) else {
              return Err(DialogError::UnresolvedFunction(name.clone()));
            };
            func(event, manager, date)?;
          }
        },
        CalendarAction::Show(view) => store(manager, &model.id, WidgetData::Calendar(view))?,
        CalendarAction::Ignore => {},
      },
      WidgetModel::StubScroll(_) | WidgetModel::Row(_) | WidgetModel::Column(_) | WidgetModel::Group(_) => {},
    }
    Ok(())
  }

  /// Whether `item_id` is one of the items the toggle widget currently shows.
  fn offers_item(
    &self,
    window: &WindowModel,
    model: &ToggleItemsModel,
    item_id: &str,
    manager: &DialogManager<'_>,
  ) -> Result<bool, DialogError> {
    let Some(Func::ItemId(id_of)) = self.registry.get(&model.item_id_getter) else {
      return Err(DialogError::UnresolvedFunction(model.item_id_getter.clone()));
    };
    let items = match &model.items {
      Items::Static(values) => values.clone(),
      Items::Key(key) => match self.getter_data(window, manager)?.remove(key) {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
      },
    };
    let offered = items.iter().any(|item| id_of(item) == item_id);
    if !offered {
      debug!(widget_id = %model.id, item_id = %item_id, "ignoring item that is not offered");
    }
    Ok(offered)
  }

  fn getter_data(&self, window: &WindowModel, manager: &DialogManager<'_>) -> Result<DisplayData, DialogError> {
    let Some(name) = &window.getter else {
      return Ok(DisplayData::new());
    };
    let Some(Func::Getter(getter)) = self.registry.get(name) else {
      return Err(DialogError::UnresolvedFunction(name.clone()));
    };
    Ok(getter(manager)?)
  }

  #[instrument(skip(self, stack, user, text), fields(user_id = user.id))]
  pub fn process_message(&self, stack: &mut DialogStack, user: &UserInfo, text: Option<&str>) -> Result<Outcome, DialogError> {
    let state = stack.current().map(|frame| frame.state.clone()).ok_or(DialogError::NoActiveDialog)?;
    let window = self
      .tree
      .window(&state)
      .ok_or_else(|| DialogError::UnknownState(state.clone()))?;
    let Some(name) = &window.on_message else {
      debug!(state = %state, "window does not accept messages");
      return Ok(Outcome {
        answer: None,
        replies: Vec::new(),
        show_mode: ShowMode::Send,
        handled: false,
      });
    };
    let Some(Func::Input(func)) = self.registry.get(name) else {
      return Err(DialogError::UnresolvedFunction(name.clone()));
    };

    let mut event = MessageEvent::new(user.clone(), text.map(str::to_string));
    let mut manager = DialogManager::new(&self.tree, stack, user);
    func(&mut event, &mut manager)?;
    Ok(Outcome {
      answer: None,
      replies: event.into_replies(),
      show_mode: ShowMode::Send,
      handled: true,
    })
  }

  /// Renders the window on top of the stack, or `None` when every dialog is closed.
  pub fn render(&self, stack: &mut DialogStack, user: &UserInfo, today: NaiveDate) -> Result<Option<RenderedWindow>, DialogError> {
    let Some(state) = stack.current().map(|frame| frame.state.clone()) else {
      return Ok(None);
    };
    let window = self
      .tree
      .window(&state)
      .ok_or_else(|| DialogError::UnknownState(state.clone()))?;

    let mut data = self.getter_data(window, &DialogManager::new(&self.tree, stack, user))?;
    let frame = stack.current().ok_or(DialogError::NoActiveDialog)?;
    data
      .entry("dialog_data")
      .or_insert_with(|| Value::Object(frame.dialog_data.as_map().clone()));

    let text = format_template(&window.text, &Scope::new(&data));
    let keyboard = KeyboardRenderer {
      registry: &self.registry,
      window,
      frame,
      data: &data,
      user,
      today,
    }
    .keyboard()?;
    Ok(Some(RenderedWindow { text, keyboard }))
  }
}

fn store(manager: &mut DialogManager<'_>, widget_id: &str, data: WidgetData) -> Result<(), DialogError> {
  manager.frame_mut()?.widget_data.insert(widget_id.to_string(), data);
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use serde_json::Value;
  use serde_json::json;
  use teloxide::types::InlineKeyboardButtonKind;

  use super::DialogEngine;
  use super::RenderedWindow;
  use super::ShowMode;
  use crate::dialog::context::DialogStack;
  use crate::dialog::error::DialogError;
  use crate::dialog::event::CallbackEvent;
  use crate::dialog::event::MessageEvent;
  use crate::dialog::event::UserInfo;
  use crate::dialog::manager::DialogManager;
  use crate::dialog::model::DialogTree;
  use crate::dialog::model::StateId;
  use crate::dialog::registry::DisplayData;
  use crate::dialog::registry::FuncsRegistry;
  use crate::dialog::registry::HandlerResult;
  use crate::dialog::render::display_value;

  const TREE: &str = r#"
root: Menu.MAIN
dialogs:
  - group: Menu
    windows:
      - state: MAIN
        text: "Hello {who}"
        getter: greeting
        widgets:
          - start: { id: open, text: "Open", state: Form.EDIT }
          - select:
              id: pick
              text: "{item}"
              items: [red, green]
              item_id_getter: plain_id
              on_click: picked
  - group: Form
    windows:
      - state: EDIT
        text: "Name: {dialog_data.name}"
        on_message: remember
        widgets:
          - counter: { id: qty, min: 1, max: 3, default: 1 }
          - checkbox: { id: flag, checked_text: "[x]", unchecked_text: "[ ]" }
          - cancel: { id: close, text: "Close" }
"#;

  fn greeting(_: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
    let mut data = DisplayData::new();
    data.insert("who".into(), json!("world"));
    Ok(data)
  }

  fn plain_id(item: &Value) -> String {
    display_value(item)
  }

  fn picked(event: &mut CallbackEvent, _: &mut DialogManager<'_>, item_id: &str) -> HandlerResult {
    event.answer(format!("picked {item_id}"));
    Ok(())
  }

  fn remember(event: &mut MessageEvent, manager: &mut DialogManager<'_>) -> HandlerResult {
    let text = event.text().unwrap_or_default().to_string();
    manager.dialog_data_mut()?.insert("name", text);
    Ok(())
  }

  fn engine() -> DialogEngine {
    let mut registry = FuncsRegistry::new();
    registry
      .getter("greeting", greeting)
      .item_id("plain_id", plain_id)
      .item_selected("picked", picked)
      .input("remember", remember);
    DialogEngine::new(DialogTree::from_yaml(TREE).expect("valid yaml"), registry).expect("valid engine")
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).expect("valid date")
  }

  fn callback(window: &RenderedWindow, text: &str) -> String {
    window
      .keyboard
      .inline_keyboard
      .iter()
      .flatten()
      .find(|button| button.text == text)
      .and_then(|button| match &button.kind {
        InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
        _ => None,
      })
      .unwrap_or_else(|| panic!("no button {text}"))
  }

  #[test]
  fn renders_getter_data_and_dispatches_selection() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");

    let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    assert_eq!(window.text, "Hello world");

    let outcome = engine
      .process_callback(&mut stack, &user, &callback(&window, "green"))
      .expect("selection");
    assert_eq!(outcome.show_mode, ShowMode::Edit);
    assert_eq!(outcome.answer.and_then(|answer| answer.text).as_deref(), Some("picked green"));
  }

  #[test]
  fn counter_checkbox_and_message_input() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    engine
      .process_callback(&mut stack, &user, &callback(&window, "Open"))
      .expect("open form");
    assert_eq!(stack.len(), 2);

    for _ in 0..5 {
      let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
      engine
        .process_callback(&mut stack, &user, &callback(&window, "➕"))
        .expect("increment");
    }
    let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    assert!(window.keyboard.inline_keyboard[0].iter().any(|button| button.text == "3"));

    engine
      .process_callback(&mut stack, &user, &callback(&window, "[ ]"))
      .expect("toggle");
    let outcome = engine.process_message(&mut stack, &user, Some("Ada")).expect("input");
    assert!(outcome.handled);
    let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    assert_eq!(window.text, "Name: Ada");
    assert!(window.keyboard.inline_keyboard.iter().flatten().any(|button| button.text == "[x]"));

    engine
      .process_callback(&mut stack, &user, &callback(&window, "Close"))
      .expect("close");
    assert_eq!(stack.current().map(|frame| frame.state.clone()), Some(StateId::from("Menu.MAIN")));
  }

  #[test]
  fn stale_and_foreign_intents_are_rejected() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    let root_window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    engine
      .process_callback(&mut stack, &user, &callback(&root_window, "Open"))
      .expect("open form");

    let stale = engine.process_callback(&mut stack, &user, &callback(&root_window, "red"));
    assert!(matches!(stale, Err(DialogError::OutdatedIntent(_))));

    let unknown = engine.process_callback(&mut stack, &user, "ffff|pick|red");
    assert!(matches!(&unknown, Err(err) if err.is_unknown_intent()));

    let mut empty = DialogStack::default();
    let unknown = engine.process_callback(&mut empty, &user, "ffff|pick|red");
    assert!(matches!(unknown, Err(DialogError::UnknownIntent(_))));
  }

  const TOGGLES: &str = r#"
root: Prefs.MAIN
dialogs:
  - group: Prefs
    windows:
      - state: MAIN
        text: "Prefs"
        widgets:
          - radio:
              id: color
              checked_text: "* {item}"
              unchecked_text: "{item}"
              items: [red, green]
              item_id_getter: plain_id
          - multiselect:
              id: tags
              checked_text: "+ {item}"
              unchecked_text: "{item}"
              items: [a, b]
              item_id_getter: plain_id
"#;

  #[test]
  fn toggles_ignore_items_they_do_not_offer() {
    let mut registry = FuncsRegistry::new();
    registry.item_id("plain_id", plain_id);
    let engine = DialogEngine::new(DialogTree::from_yaml(TOGGLES).expect("valid yaml"), registry).expect("valid engine");
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    let intent = stack.current().map(|frame| frame.intent_id.clone()).expect("open dialog");

    engine
      .process_callback(&mut stack, &user, &format!("{intent}|color|purple"))
      .expect("ignored");
    engine
      .process_callback(&mut stack, &user, &format!("{intent}|tags|zzz"))
      .expect("ignored");
    assert!(stack.current().expect("open dialog").widget_data.is_empty());

    engine
      .process_callback(&mut stack, &user, &format!("{intent}|color|green"))
      .expect("radio");
    let window = engine.render(&mut stack, &user, today()).expect("render").expect("window");
    assert!(window.keyboard.inline_keyboard.iter().flatten().any(|button| button.text == "* green"));
  }

  #[test]
  fn oversized_callback_data_is_rejected() {
    let long_item = "x".repeat(60);
    let yaml = format!(
      r#"
root: Menu.MAIN
dialogs:
  - group: Menu
    windows:
      - state: MAIN
        text: "Menu"
        widgets:
          - select:
              id: pick
              text: "{{item}}"
              items: [short, {long_item}]
              item_id_getter: plain_id
"#
    );
    let mut registry = FuncsRegistry::new();
    registry.item_id("plain_id", plain_id);
    let engine = DialogEngine::new(DialogTree::from_yaml(&yaml).expect("valid yaml"), registry).expect("valid engine");
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    let rendered = engine.render(&mut stack, &user, today());
    assert!(matches!(rendered, Err(DialogError::CallbackDataTooLong(data)) if data.ends_with(&long_item)));
  }

  #[test]
  fn messages_without_input_handler_are_ignored() {
    let engine = engine();
    let user = UserInfo::default();
    let mut stack = DialogStack::default();
    engine.restart_at_root(&mut stack, &user).expect("root");
    let outcome = engine.process_message(&mut stack, &user, Some("hi")).expect("ignored");
    assert!(!outcome.handled);
  }
}

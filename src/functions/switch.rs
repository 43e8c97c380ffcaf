use serde_json::Value;
use serde_json::json;

use crate::dialog::DialogManager;
use crate::dialog::DisplayData;
use crate::dialog::FuncsRegistry;
use crate::dialog::HandlerResult;
use crate::dialog::ManagedWidget;
use crate::dialog::MessageEvent;

pub fn register(registry: &mut FuncsRegistry) {
  registry.getter("data_getter", data_getter).input("set_name", set_name);
}

/// Summary of the wizard: entered name, checkbox state and picked emoji.
pub fn data_getter(manager: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
  let name = manager.dialog_data().get_str("name").unwrap_or_default();
  let option = matches!(manager.find("chk"), Some(ManagedWidget::Checkbox(chk)) if chk.is_checked());
  let emoji = match manager.find("emoji") {
    Some(ManagedWidget::Radio(radio)) => radio.checked().unwrap_or_default().to_string(),
    _ => String::new(),
  };

  let mut data = DisplayData::new();
  data.insert("name".into(), json!(name));
  data.insert("option".into(), json!(option));
  data.insert("emoji".into(), json!(emoji));
  Ok(data)
}

pub fn set_name(message: &mut MessageEvent, manager: &mut DialogManager<'_>) -> HandlerResult {
  let name = message.text().map_or(Value::Null, Value::from);
  manager.dialog_data_mut()?.insert("name", name);
  manager.next()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::data_getter;
  use super::set_name;
  use crate::dialog::DialogManager;
  use crate::dialog::MessageEvent;
  use crate::dialog::StateId;
  use crate::dialog::UserInfo;
  use crate::dialog::context::WidgetData;
  use crate::functions::fixtures::stack_at;
  use crate::functions::fixtures::tree;

  const TREE: &str = r#"
root: Switch.NAME
dialogs:
  - group: Switch
    windows:
      - state: NAME
        text: "Name?"
        on_message: set_name
      - state: OPTIONS
        text: "Options"
        widgets:
          - checkbox: { id: chk, checked_text: "on", unchecked_text: "off" }
          - radio:
              id: emoji
              checked_text: "* {item}"
              unchecked_text: "{item}"
              items: ["😀", "😎"]
              item_id_getter: item_id_getter
      - state: SUMMARY
        text: "{name}"
        getter: data_getter
"#;

  #[test]
  fn missing_widgets_fall_back_to_defaults() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Switch.SUMMARY");
    let data = data_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
    assert_eq!(data["name"], json!(""));
    assert_eq!(data["option"], json!(false));
    assert_eq!(data["emoji"], json!(""));
  }

  #[test]
  fn reads_widget_state_of_current_window() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Switch.OPTIONS");
    let frame = stack.current_mut().expect("frame");
    frame.dialog_data.insert("name", "Ada");
    frame.widget_data.insert("chk".into(), WidgetData::Checkbox(true));
    frame.widget_data.insert("emoji".into(), WidgetData::Radio(Some("😎".into())));

    let data = data_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
    assert_eq!(data["name"], json!("Ada"));
    assert_eq!(data["option"], json!(true));
    assert_eq!(data["emoji"], json!("😎"));
  }

  #[test]
  fn set_name_stores_text_and_advances_once() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Switch.NAME");
    let mut message = MessageEvent::new(user.clone(), Some("  Grace Hopper ".into()));
    set_name(&mut message, &mut DialogManager::new(&tree, &mut stack, &user)).expect("handler");

    let frame = stack.current().expect("frame");
    assert_eq!(frame.dialog_data.get_str("name"), Some("  Grace Hopper "));
    assert_eq!(frame.state, StateId::from("Switch.OPTIONS"));
    assert_eq!(stack.len(), 1);
  }
}

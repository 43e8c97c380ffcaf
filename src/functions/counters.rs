use serde_json::json;

use crate::dialog::CallbackEvent;
use crate::dialog::DialogManager;
use crate::dialog::DisplayData;
use crate::dialog::FuncsRegistry;
use crate::dialog::HandlerResult;
use crate::dialog::ManagedWidget;
use crate::dialog::widgets::ManagedCounter;

pub fn register(registry: &mut FuncsRegistry) {
  registry
    .getter("counter_getter", counter_getter)
    .counter_click("on_text_click", on_text_click);
}

/// Progress of the `counter` widget in percent of 10.
pub fn counter_getter(manager: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
  let value = match manager.find("counter") {
    Some(ManagedWidget::Counter(counter)) => counter.value(),
    _ => 0,
  };
  let mut data = DisplayData::new();
  data.insert("progress".into(), json!(value.saturating_mul(10)));
  Ok(data)
}

pub fn on_text_click(event: &mut CallbackEvent, counter: &ManagedCounter, _manager: &mut DialogManager<'_>) -> HandlerResult {
  event.answer(format!("Value: {}", counter.value()));
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::counter_getter;
  use super::on_text_click;
  use crate::dialog::CallbackEvent;
  use crate::dialog::DialogManager;
  use crate::dialog::ManagedWidget;
  use crate::dialog::UserInfo;
  use crate::dialog::context::WidgetData;
  use crate::functions::fixtures::stack_at;
  use crate::functions::fixtures::tree;

  const TREE: &str = r#"
root: Counters.MAIN
dialogs:
  - group: Counters
    windows:
      - state: MAIN
        text: "{progress}"
        getter: counter_getter
        widgets:
          - counter: { id: counter, max: 10 }
      - state: EMPTY
        text: "no counter"
"#;

  #[test]
  fn progress_is_ten_percent_per_step() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    for value in 0..=10 {
      let mut stack = stack_at("Counters.MAIN");
      stack
        .current_mut()
        .expect("frame")
        .widget_data
        .insert("counter".into(), WidgetData::Counter(value));
      let data = counter_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
      assert_eq!(data["progress"], json!(value * 10));
    }
  }

  #[test]
  fn missing_counter_reports_zero() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Counters.EMPTY");
    let data = counter_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
    assert_eq!(data["progress"], json!(0));
  }

  #[test]
  fn text_click_answers_value() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Counters.MAIN");
    stack
      .current_mut()
      .expect("frame")
      .widget_data
      .insert("counter".into(), WidgetData::Counter(4));
    let mut manager = DialogManager::new(&tree, &mut stack, &user);
    let Some(ManagedWidget::Counter(counter)) = manager.find("counter") else {
      panic!("counter missing");
    };
    let mut event = CallbackEvent::new(user.clone(), "counter");
    on_text_click(&mut event, &counter, &mut manager).expect("handler");
    assert_eq!(event.answered().and_then(|answer| answer.text.as_deref()), Some("Value: 4"));
  }
}

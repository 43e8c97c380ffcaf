use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::dialog::CallbackEvent;
use crate::dialog::DialogManager;
use crate::dialog::FuncData;
use crate::dialog::FuncsRegistry;
use crate::dialog::HandlerResult;
use crate::dialog::Notification;
use crate::dialog::render::display_value;

const EXTRA_KEY: &str = "extra_data";

pub fn register(registry: &mut FuncsRegistry) {
  registry
    .notify("notify_extra", notify_extra)
    .click("on_click_simple", on_click_simple)
    .click("on_click_with_data", on_click_with_data);
}

/// Answers the callback with the button payload, appending `extra_data` to the text.
pub fn notify_extra(event: &mut CallbackEvent, _manager: &mut DialogManager<'_>, data: FuncData) -> HandlerResult {
  let notification = Notification::from_data(merge_extra_data(data))?;
  event.notify(notification);
  Ok(())
}

pub fn merge_extra_data(mut data: FuncData) -> FuncData {
  let Some(extra) = data.remove(EXTRA_KEY) else {
    return data;
  };
  if is_truthy(&extra) {
    let text = data.get("text").map(display_value).unwrap_or_default();
    data.insert("text".into(), Value::String(format!("{text}\n\n{}", display_value(&extra))));
  }
  data
}

fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(flag) => *flag,
    Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
    Value::String(text) => !text.is_empty(),
    Value::Array(items) => !items.is_empty(),
    Value::Object(map) => !map.is_empty(),
  }
}

pub fn on_click_simple(event: &mut CallbackEvent, _manager: &mut DialogManager<'_>, _data: &FuncData) -> HandlerResult {
  event.reply("Clicked!");
  Ok(())
}

pub fn on_click_with_data(event: &mut CallbackEvent, _manager: &mut DialogManager<'_>, data: &FuncData) -> HandlerResult {
  let mut buf = Vec::new();
  let mut serializer = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
  data.serialize(&mut serializer)?;
  event.reply(String::from_utf8(buf)?);
  Ok(())
}

use serde::Serialize;
use serde_json::Value;

use crate::dialog::CallbackEvent;
use crate::dialog::DialogManager;
use crate::dialog::DisplayData;
use crate::dialog::FuncsRegistry;
use crate::dialog::HandlerResult;
use crate::dialog::render::display_value;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Fruit {
  pub id: &'static str,
  pub name: &'static str,
}

pub const FRUITS: [Fruit; 4] = [
  Fruit { id: "1", name: "Apple" },
  Fruit { id: "2", name: "Banana" },
  Fruit { id: "3", name: "Orange" },
  Fruit { id: "4", name: "Pear" },
];

pub fn register(registry: &mut FuncsRegistry) {
  registry
    .getter("getter", getter)
    .item_id("fruit_id_getter", fruit_id_getter)
    .item_selected("on_item_selected", on_item_selected);
}

pub fn getter(_manager: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
  let mut data = DisplayData::new();
  data.insert("fruits".into(), serde_json::to_value(FRUITS)?);
  Ok(data)
}

pub fn fruit_id_getter(fruit: &Value) -> String {
  fruit.get("id").map(display_value).unwrap_or_default()
}

pub fn on_item_selected(event: &mut CallbackEvent, _manager: &mut DialogManager<'_>, item_id: &str) -> HandlerResult {
  event.answer(format!("item id: {item_id}"));
  Ok(())
}

use serde_json::Value;

use crate::dialog::FuncsRegistry;
use crate::dialog::render::display_value;

pub fn register(registry: &mut FuncsRegistry) {
  registry.item_id("get_fruit_item", get_fruit_item);
}

pub fn get_fruit_item(item: &Value) -> String {
  display_value(item)
}

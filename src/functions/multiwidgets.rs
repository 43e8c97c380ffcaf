use serde_json::Value;

use crate::dialog::FuncsRegistry;
use crate::dialog::render::display_value;

pub fn register(registry: &mut FuncsRegistry) {
  registry.item_id("item_id_getter", item_id_getter);
}

/// Items of the multi-widget demo are their own ids.
pub fn item_id_getter(item: &Value) -> String {
  display_value(item)
}

use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::dialog::DialogManager;
use crate::dialog::DisplayData;
use crate::dialog::FuncsRegistry;
use crate::dialog::ManagedWidget;
use crate::dialog::render::display_value;

pub const PAGES: usize = 7;
const PRODUCT_COUNT: u32 = 29;
const DAY_NAMES: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

#[derive(Debug, Clone, Serialize)]
pub struct Product {
  pub id: u32,
  pub name: String,
}

pub fn register(registry: &mut FuncsRegistry) {
  registry
    .getter("product_getter", product_getter)
    .getter("paging_getter", paging_getter)
    .item_id("product_id_getter", product_id_getter);
}

pub fn products() -> Vec<Product> {
  (1..=PRODUCT_COUNT)
    .map(|id| Product {
      id,
      name: format!("Product {id}"),
    })
    .collect()
}

pub fn product_getter(_manager: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
  let mut data = DisplayData::new();
  data.insert("products".into(), serde_json::to_value(products())?);
  Ok(data)
}

pub fn product_id_getter(product: &Value) -> String {
  product.get("id").map(display_value).unwrap_or_default()
}

/// Page counter for the stub scroll; each page shows a weekday.
pub fn paging_getter(manager: &DialogManager<'_>) -> anyhow::Result<DisplayData> {
  let page = match manager.find("stub_scroll") {
    Some(ManagedWidget::Scroll(scroll)) => scroll.page(),
    _ => 0,
  };
  let mut data = DisplayData::new();
  data.insert("pages".into(), json!(PAGES));
  data.insert("current_page".into(), json!(page + 1));
  data.insert("day".into(), json!(day_name(page)));
  Ok(data)
}

pub fn day_name(page: usize) -> &'static str {
  DAY_NAMES[page % DAY_NAMES.len()]
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::day_name;
  use super::paging_getter;
  use super::product_id_getter;
  use super::products;
  use crate::dialog::DialogManager;
  use crate::dialog::UserInfo;
  use crate::dialog::context::WidgetData;
  use crate::functions::fixtures::stack_at;
  use crate::functions::fixtures::tree;

  const TREE: &str = r#"
root: Scrolls.PAGING
dialogs:
  - group: Scrolls
    windows:
      - state: PAGING
        text: "{day}"
        getter: paging_getter
        widgets:
          - stub_scroll: { id: stub_scroll, pages: pages }
      - state: PLAIN
        text: "nothing here"
"#;

  #[test]
  fn day_wraps_around_the_week() {
    assert_eq!(day_name(0), "Monday");
    assert_eq!(day_name(6), "Sunday");
    for page in 0..100 {
      assert_eq!(day_name(page), day_name(page % 7));
    }
  }

  #[test]
  fn reports_current_page_from_scroll() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Scrolls.PAGING");
    stack
      .current_mut()
      .expect("frame")
      .widget_data
      .insert("stub_scroll".into(), WidgetData::Scroll(9));
    let data = paging_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
    assert_eq!(data["pages"], json!(7));
    assert_eq!(data["current_page"], json!(10));
    assert_eq!(data["day"], json!("Wednesday"));
  }

  #[test]
  fn missing_scroll_means_first_page() {
    let tree = tree(TREE);
    let user = UserInfo::default();
    let mut stack = stack_at("Scrolls.PLAIN");
    let data = paging_getter(&DialogManager::new(&tree, &mut stack, &user)).expect("getter");
    assert_eq!(data["current_page"], json!(1));
    assert_eq!(data["day"], json!("Monday"));
  }

  #[test]
  fn products_are_numbered_from_one() {
    let products = products();
    assert_eq!(products.len(), 29);
    assert_eq!(products[0].name, "Product 1");
    assert_eq!(product_id_getter(&json!({ "id": 29, "name": "Product 29" })), "29");
  }
}

use chrono::NaiveDate;
use serde_json::Map;
use serde_json::Value;
use teloxide::types::InlineKeyboardButton;
use teloxide::types::InlineKeyboardButtonKind;
use teloxide::types::InlineKeyboardMarkup;
use tracing::debug;

use crate::dialog::calendar;
use crate::dialog::calendar::CalendarLabels;
use crate::dialog::calendar::LocalizedLabels;
use crate::dialog::calendar::PlainLabels;
use crate::dialog::context::Frame;
use crate::dialog::error::DialogError;
use crate::dialog::event::UserInfo;
use crate::dialog::model::Items;
use crate::dialog::model::WidgetModel;
use crate::dialog::model::WindowModel;
use crate::dialog::registry::Func;
use crate::dialog::registry::FuncsRegistry;
use crate::dialog::registry::ItemIdFn;
use crate::dialog::widgets::ManagedWidget;

const SEPARATOR: char = '|';
/// Telegram rejects inline keyboards whose callback data exceeds this many bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

/// Decoded `intent|widget|action` callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload<'a> {
  pub intent_id: &'a str,
  pub widget_id: &'a str,
  pub action: &'a str,
}

impl<'a> CallbackPayload<'a> {
  pub fn parse(raw: &'a str) -> Option<Self> {
    let mut parts = raw.splitn(3, SEPARATOR);
    let intent_id = parts.next().filter(|part| !part.is_empty())?;
    let widget_id = parts.next().filter(|part| !part.is_empty())?;
    let action = parts.next()?;
    Some(Self {
      intent_id,
      widget_id,
      action,
    })
  }

  pub fn encode(intent_id: &str, widget_id: &str, action: &str) -> String {
    format!("{intent_id}{SEPARATOR}{widget_id}{SEPARATOR}{action}")
  }
}

/// Text shown for a JSON value inside templates and item ids.
pub fn display_value(value: &Value) -> String {
  match value {
    Value::String(text) => text.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// Template lookup context: local names (`item`, `value`) shadow window data.
pub struct Scope<'a> {
  locals: Vec<(&'a str, Value)>,
  data: &'a Map<String, Value>,
}

impl<'a> Scope<'a> {
  pub fn new(data: &'a Map<String, Value>) -> Self {
    Self {
      locals: Vec::new(),
      data,
    }
  }

  pub fn with(mut self, name: &'a str, value: Value) -> Self {
    self.locals.push((name, value));
    self
  }

  fn lookup(&self, path: &str) -> Option<&Value> {
    let mut segments = path.split('.');
    let head = segments.next()?;
    let mut current = self
      .locals
      .iter()
      .rev()
      .find(|(name, _)| *name == head)
      .map(|(_, value)| value)
      .or_else(|| self.data.get(head))?;
    for segment in segments {
      current = match current {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
        _ => return None,
      };
    }
    Some(current)
  }
}

/// Substitutes `{path.to.value}` placeholders. `{{` and `}}` are literal braces
/// and placeholders that do not resolve are kept verbatim.
pub fn format_template(template: &str, scope: &Scope<'_>) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;
  while let Some(position) = rest.find(['{', '}']) {
    out.push_str(&rest[..position]);
    let tail = &rest[position..];
    if tail.starts_with("{{") || tail.starts_with("}}") {
      out.push_str(&tail[..1]);
      rest = &tail[2..];
      continue;
    }
    if tail.starts_with('}') {
      out.push('}');
      rest = &tail[1..];
      continue;
    }
    match tail.find('}') {
      Some(end) => {
        let path = tail[1..end].trim();
        match scope.lookup(path) {
          Some(value) => out.push_str(&display_value(value)),
          None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
      },
      None => {
        out.push_str(tail);
        rest = "";
      },
    }
  }
  out.push_str(rest);
  out
}

type Row = Vec<InlineKeyboardButton>;

/// Builds the inline keyboard of one window.
pub(crate) struct KeyboardRenderer<'a> {
  pub registry: &'a FuncsRegistry,
  pub window: &'a WindowModel,
  pub frame: &'a Frame,
  pub data: &'a Map<String, Value>,
  pub user: &'a UserInfo,
  pub today: NaiveDate,
}

impl KeyboardRenderer<'_> {
  pub fn keyboard(&self) -> Result<InlineKeyboardMarkup, DialogError> {
    let mut rows = Vec::new();
    for widget in &self.window.widgets {
      rows.extend(self.rows(widget)?);
    }
    rows.retain(|row: &Row| !row.is_empty());
    for button in rows.iter().flatten() {
      if let InlineKeyboardButtonKind::CallbackData(data) = &button.kind {
        if data.len() > MAX_CALLBACK_DATA {
          return Err(DialogError::CallbackDataTooLong(data.clone()));
        }
      }
    }
    Ok(InlineKeyboardMarkup::new(rows))
  }

  fn rows(&self, widget: &WidgetModel) -> Result<Vec<Row>, DialogError> {
    let scope = Scope::new(self.data);
    let rows: Vec<Row> = match widget {
      WidgetModel::Button(model) => vec![vec![self.button(&model.id, format_template(&model.text, &scope), "")]],
      WidgetModel::SwitchTo(model) | WidgetModel::Start(model) => {
        vec![vec![self.button(&model.id, format_template(&model.text, &scope), "")]]
      },
      WidgetModel::Next(model) | WidgetModel::Back(model) | WidgetModel::Cancel(model) => {
        vec![vec![self.button(&model.id, format_template(&model.text, &scope), "")]]
      },
      WidgetModel::Counter(model) => {
        let value = match self.managed(widget) {
          Some(ManagedWidget::Counter(counter)) => counter.value(),
          _ => model.default,
        };
        let text = format_template(&model.text, &Scope::new(self.data).with("value", Value::from(value)));
        vec![vec![
          self.button(&model.id, "➖", "-"),
          self.button(&model.id, text, "="),
          self.button(&model.id, "➕", "+"),
        ]]
      },
      WidgetModel::Checkbox(model) => {
        let checked = matches!(self.managed(widget), Some(ManagedWidget::Checkbox(checkbox)) if checkbox.is_checked());
        let template = if checked { &model.checked_text } else { &model.unchecked_text };
        vec![vec![self.button(&model.id, format_template(template, &scope), "")]]
      },
      WidgetModel::Radio(model) | WidgetModel::Multiselect(model) => {
        let item_id = self.item_id_fn(&model.item_id_getter)?;
        let managed = self.managed(widget);
        let row: Row = self
          .items(&model.items)
          .into_iter()
          .map(|item| {
            let id = item_id(&item);
            let checked = match &managed {
              Some(ManagedWidget::Radio(radio)) => radio.checked() == Some(id.as_str()),
              Some(ManagedWidget::Multiselect(multiselect)) => multiselect.is_checked(&id),
              _ => false,
            };
            let template = if checked { &model.checked_text } else { &model.unchecked_text };
            let text = format_template(template, &Scope::new(self.data).with("item", item));
            self.button(&model.id, text, &id)
          })
          .collect();
        vec![row]
      },
      WidgetModel::Select(model) => {
        let item_id = self.item_id_fn(&model.item_id_getter)?;
        let row: Row = self
          .items(&model.items)
          .into_iter()
          .map(|item| {
            let id = item_id(&item);
            let text = format_template(&model.text, &Scope::new(self.data).with("item", item));
            self.button(&model.id, text, &id)
          })
          .collect();
        vec![row]
      },
      WidgetModel::Row(model) => vec![self.flatten(&model.widgets)?],
      WidgetModel::Column(model) => self
        .flatten(&model.widgets)?
        .into_iter()
        .map(|button| vec![button])
        .collect(),
      WidgetModel::Group(model) => chunk(self.flatten(&model.widgets)?, model.width),
      WidgetModel::ScrollingGroup(model) => {
        let rows = chunk(self.flatten(&model.widgets)?, model.width);
        let pages = rows.len().div_ceil(model.height).max(1);
        let page = self.scroll_page(widget).min(pages - 1);
        let mut visible: Vec<Row> = rows.into_iter().skip(page * model.height).take(model.height).collect();
        if pages > 1 {
          visible.push(vec![
            self.button(&model.id, "<", &page.saturating_sub(1).to_string()),
            self.button(&model.id, format!("{}/{}", page + 1, pages), calendar::NOOP),
            self.button(&model.id, ">", &(page + 1).min(pages - 1).to_string()),
          ]);
        }
        visible
      },
      WidgetModel::StubScroll(_) => Vec::new(),
      WidgetModel::NumberedPager(model) => {
        let Some(scroll) = self.window.find_widget(&model.scroll) else {
          return Ok(Vec::new());
        };
        let pages = self.page_count(scroll);
        if pages <= 1 {
          return Ok(Vec::new());
        }
        let current = self.scroll_page(scroll).min(pages - 1);
        let row: Row = (0..pages)
          .map(|page| {
            let text = if page == current {
              format!("[ {} ]", page + 1)
            } else {
              (page + 1).to_string()
            };
            self.button(&model.id, text, &page.to_string())
          })
          .collect();
        vec![row]
      },
      WidgetModel::Calendar(model) | WidgetModel::LocalizedCalendar(model) => {
        let view = match self.managed(widget) {
          Some(ManagedWidget::Calendar(managed)) => managed.view(self.today),
          _ => calendar::CalendarView::new(self.today),
        };
        let labels: &dyn CalendarLabels = if matches!(widget, WidgetModel::LocalizedCalendar(_)) {
          &LocalizedLabels
        } else {
          &PlainLabels
        };
        calendar::render(view, labels, self.user.language(), self.today)
          .into_iter()
          .map(|row| {
            row
              .into_iter()
              .map(|cell| self.button(&model.id, cell.text, &cell.action))
              .collect::<Row>()
          })
          .collect()
      },
    };
    Ok(rows)
  }

  fn flatten(&self, widgets: &[WidgetModel]) -> Result<Row, DialogError> {
    let mut buttons = Vec::new();
    for widget in widgets {
      buttons.extend(self.rows(widget)?.into_iter().flatten());
    }
    Ok(buttons)
  }

  fn button(&self, widget_id: &str, text: impl Into<String>, action: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
      text,
      CallbackPayload::encode(&self.frame.intent_id, widget_id, action),
    )
  }

  fn managed(&self, widget: &WidgetModel) -> Option<ManagedWidget> {
    let id = widget.id()?;
    ManagedWidget::resolve(widget, self.frame.widget_data.get(id))
  }

  fn scroll_page(&self, widget: &WidgetModel) -> usize {
    match self.managed(widget) {
      Some(ManagedWidget::Scroll(scroll)) => scroll.page(),
      _ => 0,
    }
  }

  fn page_count(&self, scroll: &WidgetModel) -> usize {
    let WidgetModel::StubScroll(stub) = scroll else {
      return 0;
    };
    self
      .data
      .get(&stub.pages)
      .and_then(Value::as_u64)
      .and_then(|pages| usize::try_from(pages).ok())
      .unwrap_or(0)
  }

  fn items(&self, items: &Items) -> Vec<Value> {
    match items {
      Items::Static(values) => values.clone(),
      Items::Key(key) => match self.data.get(key) {
        Some(Value::Array(values)) => values.clone(),
        _ => {
          debug!(key = %key, "items key missing from getter data");
          Vec::new()
        },
      },
    }
  }

  fn item_id_fn(&self, name: &str) -> Result<ItemIdFn, DialogError> {
    match self.registry.get(name) {
      Some(Func::ItemId(func)) => Ok(func),
      _ => Err(DialogError::UnresolvedFunction(name.to_string())),
    }
  }
}

fn chunk(buttons: Row, width: usize) -> Vec<Row> {
  buttons.chunks(width.max(1)).map(<[InlineKeyboardButton]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::CallbackPayload;
  use super::Scope;
  use super::format_template;

  #[test]
  fn formats_nested_values() {
    let data = json!({
      "name": "Ada",
      "fruit": { "name": "Apple", "id": 1 },
      "pair": ["left", "right"],
      "progress": 40,
    });
    let data = data.as_object().expect("object");
    let scope = Scope::new(data);
    assert_eq!(format_template("Hi {name}!", &scope), "Hi Ada!");
    assert_eq!(format_template("{fruit.name} #{fruit.id}", &scope), "Apple #1");
    assert_eq!(format_template("{pair.1}", &scope), "right");
    assert_eq!(format_template("{progress}% {{done}}", &scope), "40% {done}");
    assert_eq!(format_template("{missing} stays", &scope), "{missing} stays");
    assert_eq!(format_template("open { brace", &scope), "open { brace");
  }

  #[test]
  fn locals_shadow_window_data() {
    let data = json!({ "item": "outer" });
    let data = data.as_object().expect("object");
    let scope = Scope::new(data).with("item", json!(["Banana", "2"]));
    assert_eq!(format_template("{item.0} ({item.1})", &scope), "Banana (2)");
  }

  #[test]
  fn callback_payload_keeps_action_separators() {
    let encoded = CallbackPayload::encode("abc1", "calendar", "d20240101");
    let payload = CallbackPayload::parse(&encoded).expect("valid payload");
    assert_eq!(payload.intent_id, "abc1");
    assert_eq!(payload.widget_id, "calendar");
    assert_eq!(payload.action, "d20240101");

    let payload = CallbackPayload::parse("abc1|btn|").expect("empty action");
    assert_eq!(payload.action, "");
    assert!(CallbackPayload::parse("abc1|btn").is_none());
    assert!(CallbackPayload::parse("|btn|x").is_none());
  }
}

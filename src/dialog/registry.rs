//! Name-to-function registry used to resolve handler references in the
//! dialog description.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::dialog::event::CallbackEvent;
use crate::dialog::event::MessageEvent;
use crate::dialog::manager::DialogManager;
use crate::dialog::model::DialogTree;
use crate::dialog::model::StateId;
use crate::dialog::model::WidgetModel;
use crate::dialog::widgets::ManagedCounter;

pub type DisplayData = Map<String, Value>;
pub type FuncData = Map<String, Value>;
pub type HandlerResult = anyhow::Result<()>;

pub type GetterFn = fn(&DialogManager<'_>) -> anyhow::Result<DisplayData>;
pub type ClickFn = fn(&mut CallbackEvent, &mut DialogManager<'_>, &FuncData) -> HandlerResult;
pub type NotifyFn = fn(&mut CallbackEvent, &mut DialogManager<'_>, FuncData) -> HandlerResult;
pub type CounterClickFn = fn(&mut CallbackEvent, &ManagedCounter, &mut DialogManager<'_>) -> HandlerResult;
pub type ItemSelectedFn = fn(&mut CallbackEvent, &mut DialogManager<'_>, &str) -> HandlerResult;
pub type DateSelectedFn = fn(&mut CallbackEvent, &mut DialogManager<'_>, NaiveDate) -> HandlerResult;
pub type InputFn = fn(&mut MessageEvent, &mut DialogManager<'_>) -> HandlerResult;
pub type ItemIdFn = fn(&Value) -> String;

#[derive(Clone, Copy)]
pub enum Func {
  Getter(GetterFn),
  Click(ClickFn),
  Notify(NotifyFn),
  CounterClick(CounterClickFn),
  ItemSelected(ItemSelectedFn),
  DateSelected(DateSelectedFn),
  Input(InputFn),
  ItemId(ItemIdFn),
}

impl Func {
  pub fn kind(&self) -> FuncKind {
    match self {
      Self::Getter(_) => FuncKind::Getter,
      Self::Click(_) => FuncKind::Click,
      Self::Notify(_) => FuncKind::Notify,
      Self::CounterClick(_) => FuncKind::CounterClick,
      Self::ItemSelected(_) => FuncKind::ItemSelected,
      Self::DateSelected(_) => FuncKind::DateSelected,
      Self::Input(_) => FuncKind::Input,
      Self::ItemId(_) => FuncKind::ItemId,
    }
  }
}

impl fmt::Debug for Func {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Func::{}", self.kind())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
  Getter,
  Click,
  Notify,
  CounterClick,
  ItemSelected,
  DateSelected,
  Input,
  ItemId,
}

impl fmt::Display for FuncKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Getter => "getter",
      Self::Click => "click handler",
      Self::Notify => "notification handler",
      Self::CounterClick => "counter click handler",
      Self::ItemSelected => "item selection handler",
      Self::DateSelected => "date selection handler",
      Self::Input => "message handler",
      Self::ItemId => "item id getter",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
  pub location: String,
  pub name: String,
  pub expected: FuncKind,
  pub found: Option<FuncKind>,
}

impl fmt::Display for Unresolved {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.found {
      Some(found) => write!(
        f,
        "{}: '{}' is a {found}, expected a {}",
        self.location, self.name, self.expected
      ),
      None => write!(f, "{}: '{}' is not registered ({} expected)", self.location, self.name, self.expected),
    }
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("dialog description references unresolved functions: {}", format_unresolved(.0))]
  Unresolved(Vec<Unresolved>),
}

fn format_unresolved(entries: &[Unresolved]) -> String {
  entries.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Default)]
pub struct FuncsRegistry {
  funcs: HashMap<String, Func>,
}

impl FuncsRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `func` under `name`. A later registration under the same name wins.
  pub fn register(&mut self, name: impl Into<String>, func: Func) -> &mut Self {
    let name = name.into();
    if let Some(previous) = self.funcs.insert(name.clone(), func) {
      debug!(name = %name, previous = %previous.kind(), replacement = %func.kind(), "replaced registered function");
    }
    self
  }

  pub fn getter(&mut self, name: &str, func: GetterFn) -> &mut Self {
    self.register(name, Func::Getter(func))
  }

  pub fn click(&mut self, name: &str, func: ClickFn) -> &mut Self {
    self.register(name, Func::Click(func))
  }

  pub fn notify(&mut self, name: &str, func: NotifyFn) -> &mut Self {
    self.register(name, Func::Notify(func))
  }

  pub fn counter_click(&mut self, name: &str, func: CounterClickFn) -> &mut Self {
    self.register(name, Func::CounterClick(func))
  }

  pub fn item_selected(&mut self, name: &str, func: ItemSelectedFn) -> &mut Self {
    self.register(name, Func::ItemSelected(func))
  }

  pub fn date_selected(&mut self, name: &str, func: DateSelectedFn) -> &mut Self {
    self.register(name, Func::DateSelected(func))
  }

  pub fn input(&mut self, name: &str, func: InputFn) -> &mut Self {
    self.register(name, Func::Input(func))
  }

  pub fn item_id(&mut self, name: &str, func: ItemIdFn) -> &mut Self {
    self.register(name, Func::ItemId(func))
  }

  pub fn get(&self, name: &str) -> Option<Func> {
    self.funcs.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.funcs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.funcs.is_empty()
  }

  /// Checks every function reference in `tree` against the registry and
  /// reports all missing or mistyped entries at once.
  pub fn validate(&self, tree: &DialogTree) -> Result<(), RegistryError> {
    let mut unresolved = Vec::new();
    for dialog in &tree.dialogs {
      for window in &dialog.windows {
        let state = StateId::new(&dialog.group, &window.state);
        let mut check = |location: String, name: &str, expected: FuncKind| {
          let found = self.get(name).map(|func| func.kind());
          if found != Some(expected) {
            unresolved.push(Unresolved {
              location,
              name: name.to_string(),
              expected,
              found,
            });
          }
        };

        if let Some(getter) = &window.getter {
          check(format!("{state} getter"), getter, FuncKind::Getter);
        }
        if let Some(on_message) = &window.on_message {
          check(format!("{state} on_message"), on_message, FuncKind::Input);
        }
        window.visit_widgets(&mut |widget| {
          let at = |id: &str| format!("{state}/{id}");
          match widget {
            WidgetModel::Button(button) => {
              if let Some(on_click) = &button.on_click {
                check(at(&button.id), on_click.name(), FuncKind::Click);
              }
              if let Some(notify) = &button.notify {
                check(at(&button.id), notify.name(), FuncKind::Notify);
              }
            },
            WidgetModel::Counter(counter) => {
              if let Some(on_text_click) = &counter.on_text_click {
                check(at(&counter.id), on_text_click, FuncKind::CounterClick);
              }
            },
            WidgetModel::Radio(model) | WidgetModel::Multiselect(model) => {
              check(at(&model.id), &model.item_id_getter, FuncKind::ItemId);
            },
            WidgetModel::Select(select) => {
              check(at(&select.id), &select.item_id_getter, FuncKind::ItemId);
              if let Some(on_click) = &select.on_click {
                check(at(&select.id), on_click, FuncKind::ItemSelected);
              }
            },
            WidgetModel::Calendar(calendar) | WidgetModel::LocalizedCalendar(calendar) => {
              if let Some(on_click) = &calendar.on_click {
                check(at(&calendar.id), on_click, FuncKind::DateSelected);
              }
            },
            _ => {},
          }
        });
      }
    }

    if unresolved.is_empty() {
      Ok(())
    } else {
      Err(RegistryError::Unresolved(unresolved))
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::Value;

  use super::FuncKind;
  use super::FuncsRegistry;
  use super::RegistryError;
  use crate::dialog::model::DialogTree;

  fn first_id(_: &Value) -> String {
    "first".into()
  }

  fn second_id(_: &Value) -> String {
    "second".into()
  }

  #[test]
  fn last_registration_wins() {
    let mut registry = FuncsRegistry::new();
    registry.item_id("id", first_id).item_id("id", second_id);
    assert_eq!(registry.len(), 1);
    let Some(super::Func::ItemId(func)) = registry.get("id") else {
      panic!("expected item id getter");
    };
    assert_eq!(func(&Value::Null), "second");
  }

  #[test]
  fn validation_reports_missing_and_mistyped_functions() {
    let tree = DialogTree::from_yaml(
      r#"
root: Menu.MAIN
dialogs:
  - group: Menu
    windows:
      - state: MAIN
        text: "Pick"
        getter: id
        widgets:
          - select:
              id: fruits
              text: "{item}"
              items: [a, b]
              item_id_getter: id
              on_click: chosen
"#,
    )
    .expect("valid yaml");
    let mut registry = FuncsRegistry::new();
    registry.item_id("id", first_id);

    let Err(RegistryError::Unresolved(entries)) = registry.validate(&tree) else {
      panic!("expected unresolved functions");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].expected, FuncKind::Getter);
    assert_eq!(entries[0].found, Some(FuncKind::ItemId));
    assert_eq!(entries[1].name, "chosen");
    assert_eq!(entries[1].found, None);
  }
}

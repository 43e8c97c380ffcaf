use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,31}$").expect("valid regex"));

/// Fully qualified window name, `Group.STATE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
  pub fn new(group: &str, state: &str) -> Self {
    Self(format!("{group}.{state}"))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn group(&self) -> &str {
    self.0.split_once('.').map(|(group, _)| group).unwrap_or(&self.0)
  }
}

impl fmt::Display for StateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for StateId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("failed to read dialog description {path}: {source}")]
  Io { path: PathBuf, source: std::io::Error },
  #[error("malformed dialog description: {0}")]
  Yaml(#[from] serde_yaml::Error),
  #[error("invalid dialog tree: {}", .0.join("; "))]
  Invalid(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialogTree {
  pub root: StateId,
  pub dialogs: Vec<DialogModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialogModel {
  pub group: String,
  pub windows: Vec<WindowModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowModel {
  pub state: String,
  pub text: String,
  #[serde(default)]
  pub getter: Option<String>,
  #[serde(default)]
  pub on_message: Option<String>,
  #[serde(default)]
  pub widgets: Vec<WidgetModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetModel {
  Button(ButtonModel),
  SwitchTo(NavButtonModel),
  Next(PlainButtonModel),
  Back(PlainButtonModel),
  Start(NavButtonModel),
  Cancel(PlainButtonModel),
  Counter(CounterModel),
  Checkbox(CheckboxModel),
  Radio(ToggleItemsModel),
  Multiselect(ToggleItemsModel),
  Select(SelectModel),
  Row(LayoutModel),
  Column(LayoutModel),
  Group(GroupModel),
  ScrollingGroup(ScrollingGroupModel),
  StubScroll(StubScrollModel),
  NumberedPager(PagerModel),
  Calendar(CalendarModel),
  LocalizedCalendar(CalendarModel),
}

/// A function reference from the dialog description, optionally carrying a payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FuncRef {
  Name(String),
  WithData {
    func: String,
    #[serde(default)]
    data: Map<String, Value>,
  },
}

impl FuncRef {
  pub fn name(&self) -> &str {
    match self {
      Self::Name(name) => name,
      Self::WithData { func, .. } => func,
    }
  }

  pub fn data(&self) -> Map<String, Value> {
    match self {
      Self::Name(_) => Map::new(),
      Self::WithData { data, .. } => data.clone(),
    }
  }
}

/// Items are either a key into the getter data or an inline list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Items {
  Key(String),
  Static(Vec<Value>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonModel {
  pub id: String,
  pub text: String,
  #[serde(default)]
  pub on_click: Option<FuncRef>,
  #[serde(default)]
  pub notify: Option<FuncRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavButtonModel {
  pub id: String,
  pub text: String,
  pub state: StateId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlainButtonModel {
  pub id: String,
  pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterModel {
  pub id: String,
  #[serde(default = "default_counter_text")]
  pub text: String,
  #[serde(default)]
  pub min: i64,
  #[serde(default = "default_counter_max")]
  pub max: i64,
  #[serde(default = "default_increment")]
  pub increment: i64,
  #[serde(default)]
  pub default: i64,
  #[serde(default)]
  pub on_text_click: Option<String>,
}

fn default_counter_text() -> String {
  "{value}".to_string()
}

fn default_counter_max() -> i64 {
  999_999
}

fn default_increment() -> i64 {
  1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckboxModel {
  pub id: String,
  pub checked_text: String,
  pub unchecked_text: String,
  #[serde(default)]
  pub default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleItemsModel {
  pub id: String,
  pub checked_text: String,
  pub unchecked_text: String,
  pub items: Items,
  pub item_id_getter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectModel {
  pub id: String,
  pub text: String,
  pub items: Items,
  pub item_id_getter: String,
  #[serde(default)]
  pub on_click: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutModel {
  pub widgets: Vec<WidgetModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupModel {
  pub width: usize,
  pub widgets: Vec<WidgetModel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollingGroupModel {
  pub id: String,
  #[serde(default = "default_width")]
  pub width: usize,
  #[serde(default = "default_height")]
  pub height: usize,
  pub widgets: Vec<WidgetModel>,
}

fn default_width() -> usize {
  1
}

fn default_height() -> usize {
  5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubScrollModel {
  pub id: String,
  /// Getter data key holding the page count.
  pub pages: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagerModel {
  pub id: String,
  pub scroll: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarModel {
  pub id: String,
  #[serde(default)]
  pub on_click: Option<String>,
}

impl WidgetModel {
  pub fn id(&self) -> Option<&str> {
    match self {
      Self::Button(model) => Some(&model.id),
      Self::SwitchTo(model) | Self::Start(model) => Some(&model.id),
      Self::Next(model) | Self::Back(model) | Self::Cancel(model) => Some(&model.id),
      Self::Counter(model) => Some(&model.id),
      Self::Checkbox(model) => Some(&model.id),
      Self::Radio(model) | Self::Multiselect(model) => Some(&model.id),
      Self::Select(model) => Some(&model.id),
      Self::ScrollingGroup(model) => Some(&model.id),
      Self::StubScroll(model) => Some(&model.id),
      Self::NumberedPager(model) => Some(&model.id),
      Self::Calendar(model) | Self::LocalizedCalendar(model) => Some(&model.id),
      Self::Row(_) | Self::Column(_) | Self::Group(_) => None,
    }
  }

  pub fn children(&self) -> &[WidgetModel] {
    match self {
      Self::Row(model) | Self::Column(model) => &model.widgets,
      Self::Group(model) => &model.widgets,
      Self::ScrollingGroup(model) => &model.widgets,
      _ => &[],
    }
  }

  /// Depth-first walk over this widget and everything nested in it.
  pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a WidgetModel)) {
    f(self);
    for child in self.children() {
      child.visit(f);
    }
  }
}

impl WindowModel {
  pub fn visit_widgets<'a>(&'a self, f: &mut impl FnMut(&'a WidgetModel)) {
    for widget in &self.widgets {
      widget.visit(f);
    }
  }

  pub fn find_widget(&self, id: &str) -> Option<&WidgetModel> {
    let mut found = None;
    self.visit_widgets(&mut |widget| {
      if found.is_none() && widget.id() == Some(id) {
        found = Some(widget);
      }
    });
    found
  }
}

impl DialogTree {
  pub fn from_yaml(source: &str) -> Result<Self, ModelError> {
    let deserializer = serde_yaml::Deserializer::from_str(source);
    let tree: Self = serde_yaml::with::singleton_map_recursive::deserialize(deserializer)?;
    Ok(tree)
  }

  pub fn from_path(path: &Path) -> Result<Self, ModelError> {
    let source = fs::read_to_string(path).map_err(|source| ModelError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_yaml(&source)
  }

  pub fn root(&self) -> &StateId {
    &self.root
  }

  pub fn window(&self, state: &StateId) -> Option<&WindowModel> {
    let (group, name) = state.as_str().split_once('.')?;
    self
      .dialog(group)?
      .windows
      .iter()
      .find(|window| window.state == name)
  }

  pub fn dialog(&self, group: &str) -> Option<&DialogModel> {
    self.dialogs.iter().find(|dialog| dialog.group == group)
  }

  /// Widget `id` of the window at `state`, or of any other window in its dialog.
  pub fn find_dialog_widget(&self, state: &StateId, id: &str) -> Option<&WidgetModel> {
    if let Some(widget) = self.window(state).and_then(|window| window.find_widget(id)) {
      return Some(widget);
    }
    self
      .dialog(state.group())?
      .windows
      .iter()
      .find_map(|window| window.find_widget(id))
  }

  pub fn window_count(&self) -> usize {
    self.dialogs.iter().map(|dialog| dialog.windows.len()).sum()
  }

  /// Window `offset` positions away from `state` inside the same dialog.
  pub fn neighbour(&self, state: &StateId, offset: isize) -> Option<StateId> {
    let dialog = self.dialog(state.group())?;
    let position = dialog
      .windows
      .iter()
      .position(|window| StateId::new(&dialog.group, &window.state) == *state)?;
    let target = position.checked_add_signed(offset)?;
    dialog
      .windows
      .get(target)
      .map(|window| StateId::new(&dialog.group, &window.state))
  }

  /// Structural checks that do not need the function registry.
  pub fn validate(&self) -> Result<(), ModelError> {
    let mut issues = Vec::new();
    let mut groups = HashSet::new();
    let mut states = HashSet::new();

    for dialog in &self.dialogs {
      if !ID_PATTERN.is_match(&dialog.group) {
        issues.push(format!("dialog group '{}' is not a valid identifier", dialog.group));
      }
      if !groups.insert(dialog.group.as_str()) {
        issues.push(format!("dialog group '{}' is declared twice", dialog.group));
      }
      if dialog.windows.is_empty() {
        issues.push(format!("dialog group '{}' has no windows", dialog.group));
      }
      for window in &dialog.windows {
        let state = StateId::new(&dialog.group, &window.state);
        if !ID_PATTERN.is_match(&window.state) {
          issues.push(format!("state '{state}' is not a valid identifier"));
        }
        if !states.insert(state.clone()) {
          issues.push(format!("state '{state}' is declared twice"));
        }
      }
    }

    if !states.contains(&self.root) {
      issues.push(format!("root state '{}' does not exist", self.root));
    }

    for dialog in &self.dialogs {
      for window in &dialog.windows {
        let state = StateId::new(&dialog.group, &window.state);
        validate_window(&state, window, &states, &mut issues);
      }
    }

    if issues.is_empty() {
      Ok(())
    } else {
      Err(ModelError::Invalid(issues))
    }
  }
}

fn validate_window(state: &StateId, window: &WindowModel, states: &HashSet<StateId>, issues: &mut Vec<String>) {
  let mut ids = HashSet::new();
  let mut stub_scrolls = HashSet::new();
  window.visit_widgets(&mut |widget| {
    if let WidgetModel::StubScroll(model) = widget {
      stub_scrolls.insert(model.id.as_str());
    }
  });

  window.visit_widgets(&mut |widget| {
    if let Some(id) = widget.id() {
      if !ID_PATTERN.is_match(id) {
        issues.push(format!("{state}: widget id '{id}' is not a valid identifier"));
      }
      if !ids.insert(id) {
        issues.push(format!("{state}: widget id '{id}' is used twice"));
      }
    }
    match widget {
      WidgetModel::SwitchTo(model) | WidgetModel::Start(model) if !states.contains(&model.state) => {
        issues.push(format!("{state}: widget '{}' targets unknown state '{}'", model.id, model.state));
      },
      WidgetModel::SwitchTo(model) if model.state.group() != state.group() => {
        issues.push(format!(
          "{state}: switch_to '{}' leaves the dialog, use start instead",
          model.id
        ));
      },
      WidgetModel::Group(model) if model.width == 0 => {
        issues.push(format!("{state}: group width must be positive"));
      },
      WidgetModel::ScrollingGroup(model) if model.width == 0 || model.height == 0 => {
        issues.push(format!("{state}: scrolling group '{}' needs positive width and height", model.id));
      },
      WidgetModel::Counter(model) if model.min > model.max || model.increment <= 0 => {
        issues.push(format!("{state}: counter '{}' has an empty range or bad increment", model.id));
      },
      WidgetModel::NumberedPager(model) if !stub_scrolls.contains(model.scroll.as_str()) => {
        issues.push(format!(
          "{state}: pager '{}' references unknown stub scroll '{}'",
          model.id, model.scroll
        ));
      },
      _ => {},
    }
  });
}

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::dialog::calendar::CalendarView;
use crate::dialog::model::StateId;

/// Free-form per-dialog storage shared by every window of one dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogData(Map<String, Value>);

impl DialogData {
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.0.get(key).and_then(Value::as_str)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.0.insert(key.into(), value.into())
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.0.remove(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.0
  }
}

/// Persisted state of one stateful widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetData {
  Counter(i64),
  Checkbox(bool),
  Radio(Option<String>),
  Multiselect(BTreeSet<String>),
  Scroll(usize),
  Calendar(CalendarView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
  pub intent_id: String,
  pub state: StateId,
  #[serde(default)]
  pub dialog_data: DialogData,
  #[serde(default)]
  pub widget_data: BTreeMap<String, WidgetData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
  /// Push the new dialog on top of the current one.
  Normal,
  /// Drop every open dialog first.
  ResetStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentLookup {
  Current,
  Outdated,
  Unknown,
}

/// Per-user stack of open dialogs. This is what the session storage persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogStack {
  frames: Vec<Frame>,
  #[serde(default)]
  issued: u64,
}

impl DialogStack {
  pub fn is_empty(&self) -> bool {
    self.frames.is_empty()
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  pub fn frames(&self) -> &[Frame] {
    &self.frames
  }

  pub fn current(&self) -> Option<&Frame> {
    self.frames.last()
  }

  pub fn current_mut(&mut self) -> Option<&mut Frame> {
    self.frames.last_mut()
  }

  pub fn locate(&self, intent_id: &str) -> IntentLookup {
    match self.frames.iter().rposition(|frame| frame.intent_id == intent_id) {
      Some(position) if position + 1 == self.frames.len() => IntentLookup::Current,
      Some(_) => IntentLookup::Outdated,
      None => IntentLookup::Unknown,
    }
  }

  pub(crate) fn push(&mut self, state: StateId) -> &mut Frame {
    self.issued += 1;
    let intent_id = format!("{:x}{:x}", Utc::now().timestamp_micros() & 0xffff_ffff_ffff, self.issued);
    self.frames.push(Frame {
      intent_id,
      state,
      dialog_data: DialogData::default(),
      widget_data: BTreeMap::new(),
    });
    let last = self.frames.len() - 1;
    &mut self.frames[last]
  }

  pub(crate) fn pop(&mut self) -> Option<Frame> {
    self.frames.pop()
  }

  pub(crate) fn clear(&mut self) {
    self.frames.clear();
  }
}

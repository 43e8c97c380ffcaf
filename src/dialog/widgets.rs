use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::dialog::calendar::CalendarView;
use crate::dialog::context::WidgetData;
use crate::dialog::model::WidgetModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedCounter {
  id: String,
  value: i64,
  min: i64,
  max: i64,
}

impl ManagedCounter {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn value(&self) -> i64 {
    self.value
  }

  pub fn min(&self) -> i64 {
    self.min
  }

  pub fn max(&self) -> i64 {
    self.max
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedCheckbox {
  id: String,
  checked: bool,
}

impl ManagedCheckbox {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn is_checked(&self) -> bool {
    self.checked
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRadio {
  id: String,
  checked: Option<String>,
}

impl ManagedRadio {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn checked(&self) -> Option<&str> {
    self.checked.as_deref()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedMultiselect {
  id: String,
  checked: BTreeSet<String>,
}

impl ManagedMultiselect {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn is_checked(&self, item_id: &str) -> bool {
    self.checked.contains(item_id)
  }

  pub fn checked(&self) -> impl Iterator<Item = &str> {
    self.checked.iter().map(String::as_str)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedScroll {
  id: String,
  page: usize,
}

impl ManagedScroll {
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Zero-based page index.
  pub fn page(&self) -> usize {
    self.page
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedCalendar {
  id: String,
  view: Option<CalendarView>,
}

impl ManagedCalendar {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn view(&self, today: NaiveDate) -> CalendarView {
    self.view.unwrap_or_else(|| CalendarView::new(today))
  }
}

/// Read-only snapshot of a stateful widget in the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedWidget {
  Counter(ManagedCounter),
  Checkbox(ManagedCheckbox),
  Radio(ManagedRadio),
  Multiselect(ManagedMultiselect),
  Scroll(ManagedScroll),
  Calendar(ManagedCalendar),
}

impl ManagedWidget {
  /// Combines the declared widget with its stored state, falling back to
  /// declared defaults when nothing (or something of another kind) is stored.
  /// Stateless widgets such as buttons resolve to `None`.
  pub fn resolve(model: &WidgetModel, data: Option<&WidgetData>) -> Option<Self> {
    let widget = match model {
      WidgetModel::Counter(counter) => {
        let value = match data {
          Some(WidgetData::Counter(value)) => (*value).clamp(counter.min, counter.max),
          _ => counter.default.clamp(counter.min, counter.max),
        };
        Self::Counter(ManagedCounter {
          id: counter.id.clone(),
          value,
          min: counter.min,
          max: counter.max,
        })
      },
      WidgetModel::Checkbox(checkbox) => Self::Checkbox(ManagedCheckbox {
        id: checkbox.id.clone(),
        checked: match data {
          Some(WidgetData::Checkbox(checked)) => *checked,
          _ => checkbox.default,
        },
      }),
      WidgetModel::Radio(radio) => Self::Radio(ManagedRadio {
        id: radio.id.clone(),
        checked: match data {
          Some(WidgetData::Radio(checked)) => checked.clone(),
          _ => None,
        },
      }),
      WidgetModel::Multiselect(multiselect) => Self::Multiselect(ManagedMultiselect {
        id: multiselect.id.clone(),
        checked: match data {
          Some(WidgetData::Multiselect(checked)) => checked.clone(),
          _ => BTreeSet::new(),
        },
      }),
      WidgetModel::ScrollingGroup(_) | WidgetModel::StubScroll(_) => {
        let id = model.id().unwrap_or_default().to_string();
        Self::Scroll(ManagedScroll {
          id,
          page: match data {
            Some(WidgetData::Scroll(page)) => *page,
            _ => 0,
          },
        })
      },
      WidgetModel::Calendar(calendar) | WidgetModel::LocalizedCalendar(calendar) => Self::Calendar(ManagedCalendar {
        id: calendar.id.clone(),
        view: match data {
          Some(WidgetData::Calendar(view)) => Some(*view),
          _ => None,
        },
      }),
      _ => return None,
    };
    Some(widget)
  }
}

#[cfg(test)]
mod tests {
  use super::ManagedWidget;
  use crate::dialog::context::WidgetData;
  use crate::dialog::model::CounterModel;
  use crate::dialog::model::WidgetModel;

  fn counter(default: i64) -> WidgetModel {
    WidgetModel::Counter(CounterModel {
      id: "counter".into(),
      text: "{value}".into(),
      min: 0,
      max: 10,
      increment: 1,
      default,
      on_text_click: None,
    })
  }

  #[test]
  fn counter_uses_stored_value_within_bounds() {
    let Some(ManagedWidget::Counter(managed)) = ManagedWidget::resolve(&counter(3), Some(&WidgetData::Counter(7))) else {
      panic!("expected counter");
    };
    assert_eq!(managed.value(), 7);

    let Some(ManagedWidget::Counter(managed)) = ManagedWidget::resolve(&counter(3), Some(&WidgetData::Counter(70))) else {
      panic!("expected counter");
    };
    assert_eq!(managed.value(), 10);
  }

  #[test]
  fn mismatched_data_falls_back_to_default() {
    let Some(ManagedWidget::Counter(managed)) = ManagedWidget::resolve(&counter(3), Some(&WidgetData::Checkbox(true))) else {
      panic!("expected counter");
    };
    assert_eq!(managed.value(), 3);
  }
}

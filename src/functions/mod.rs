//! Getters and handlers referenced by name from `data/main.yaml`.

pub mod calendars;
pub mod callbacks;
pub mod counters;
pub mod layouts;
pub mod multiwidgets;
pub mod scrolls;
pub mod selects;
pub mod switch;

use crate::dialog::FuncsRegistry;

/// Populates `registry` with every function the shipped dialogs refer to.
pub fn register_dialog_funcs(registry: &mut FuncsRegistry) {
  switch::register(registry);
  selects::register(registry);
  scrolls::register(registry);
  counters::register(registry);
  multiwidgets::register(registry);
  layouts::register(registry);
  calendars::register(registry);
  callbacks::register(registry);
}

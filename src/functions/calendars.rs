use chrono::NaiveDate;

use crate::dialog::CallbackEvent;
use crate::dialog::DialogManager;
use crate::dialog::FuncsRegistry;
use crate::dialog::HandlerResult;

pub fn register(registry: &mut FuncsRegistry) {
  registry.date_selected("on_date_selected", on_date_selected);
}

pub fn on_date_selected(event: &mut CallbackEvent, _manager: &mut DialogManager<'_>, date: NaiveDate) -> HandlerResult {
  event.answer(date.to_string());
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::on_date_selected;
  use crate::dialog::CallbackEvent;
  use crate::dialog::DialogManager;
  use crate::dialog::UserInfo;
  use crate::functions::fixtures::stack_at;
  use crate::functions::fixtures::tree;

  #[test]
  fn answers_iso_date() {
    let tree = tree(
      r#"
root: Calendars.MAIN
dialogs:
  - group: Calendars
    windows:
      - state: MAIN
        text: "Pick a date"
"#,
    );
    let user = UserInfo::default();
    let mut stack = stack_at("Calendars.MAIN");
    let mut event = CallbackEvent::new(user.clone(), "calendar");
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
    on_date_selected(&mut event, &mut DialogManager::new(&tree, &mut stack, &user), date).expect("handler");
    assert_eq!(event.answered().and_then(|answer| answer.text.as_deref()), Some("2024-03-09"));
  }
}

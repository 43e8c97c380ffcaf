//! Inline calendar keyboards with day, month and year scopes.
//!
//! Button actions are short strings so they fit into callback data:
//! `d20240131` picks a date, `m202401` opens a month, `y2024` opens the
//! months of a year, `Y2020` opens a page of years and `_` does nothing.

use chrono::Datelike;
use chrono::Locale;
use chrono::Months;
use chrono::NaiveDate;
use chrono::NaiveTime;
use pure_rust_locales::locale_match;
use serde::Deserialize;
use serde::Serialize;

pub const NOOP: &str = "_";
const YEARS_PER_PAGE: i32 = 20;
const YEAR_COLUMNS: usize = 5;
const MONTH_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarScope {
  #[default]
  Days,
  Months,
  Years,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarView {
  pub scope: CalendarScope,
  pub offset: NaiveDate,
}

impl CalendarView {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      scope: CalendarScope::Days,
      offset: today.with_day(1).unwrap_or(today),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarButton {
  pub text: String,
  pub action: String,
}

impl CalendarButton {
  fn new(text: impl Into<String>, action: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      action: action.into(),
    }
  }

  fn blank() -> Self {
    Self::new(" ", NOOP)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
  Select(NaiveDate),
  Show(CalendarView),
  Ignore,
}

/// Text for the calendar header, weekday row and year cells.
pub trait CalendarLabels {
  fn weekday(&self, date: NaiveDate, language: &str) -> String;
  fn month(&self, date: NaiveDate, language: &str) -> String;
  fn year(&self, date: NaiveDate, _language: &str) -> String {
    date.year().to_string()
  }
}

pub struct PlainLabels;

impl CalendarLabels for PlainLabels {
  fn weekday(&self, date: NaiveDate, _language: &str) -> String {
    date.format("%a").to_string()
  }

  fn month(&self, date: NaiveDate, _language: &str) -> String {
    date.format("%B").to_string()
  }
}

/// Labels rendered in the user's locale, falling back to `en_US`.
pub struct LocalizedLabels;

impl CalendarLabels for LocalizedLabels {
  fn weekday(&self, date: NaiveDate, language: &str) -> String {
    title_case(&localized(date, "%a", resolve_locale(language)))
  }

  fn month(&self, date: NaiveDate, language: &str) -> String {
    let locale = resolve_locale(language);
    match standalone_month(date, locale) {
      Some(name) => title_case(name),
      None => title_case(&localized(date, "%B", locale)),
    }
  }
}

/// Nominative month name for locales whose `%B` is the genitive form.
fn standalone_month(date: NaiveDate, locale: Locale) -> Option<&'static str> {
  let names: Option<&'static [&'static str]> = locale_match!(locale => LC_TIME::ALT_MON);
  names?.get(date.month0() as usize).copied()
}

const DEFAULT_REGIONS: &[(&str, &str)] = &[
  ("en", "en_US"),
  ("ar", "ar_SA"),
  ("be", "be_BY"),
  ("cs", "cs_CZ"),
  ("da", "da_DK"),
  ("el", "el_GR"),
  ("fa", "fa_IR"),
  ("he", "he_IL"),
  ("hi", "hi_IN"),
  ("ja", "ja_JP"),
  ("kk", "kk_KZ"),
  ("ko", "ko_KR"),
  ("sr", "sr_RS"),
  ("sv", "sv_SE"),
  ("uk", "uk_UA"),
  ("uz", "uz_UZ"),
  ("zh", "zh_CN"),
];

/// Maps a Telegram language code such as `pt-br` or `de` onto a chrono locale.
pub fn resolve_locale(language: &str) -> Locale {
  let normalized = language.trim().replace('-', "_");
  let (lang, region) = match normalized.split_once('_') {
    Some((lang, region)) => (lang.to_lowercase(), Some(region.to_uppercase())),
    None => (normalized.to_lowercase(), None),
  };
  if lang.is_empty() {
    return Locale::en_US;
  }

  let mut candidates = Vec::with_capacity(3);
  if let Some(region) = region {
    candidates.push(format!("{lang}_{region}"));
  }
  if let Some((_, locale)) = DEFAULT_REGIONS.iter().find(|(code, _)| *code == lang) {
    candidates.push((*locale).to_string());
  }
  candidates.push(format!("{lang}_{}", lang.to_uppercase()));

  candidates
    .iter()
    .find_map(|candidate| Locale::try_from(candidate.as_str()).ok())
    .unwrap_or(Locale::en_US)
}

fn localized(date: NaiveDate, pattern: &str, locale: Locale) -> String {
  date
    .and_time(NaiveTime::MIN)
    .and_utc()
    .format_localized(pattern, locale)
    .to_string()
}

fn title_case(text: &str) -> String {
  let mut chars = text.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

pub fn render(view: CalendarView, labels: &dyn CalendarLabels, language: &str, today: NaiveDate) -> Vec<Vec<CalendarButton>> {
  match view.scope {
    CalendarScope::Days => render_days(view.offset, labels, language, today),
    CalendarScope::Months => render_months(view.offset, labels, language, today),
    CalendarScope::Years => render_years(view.offset, labels, language, today),
  }
}

fn render_days(offset: NaiveDate, labels: &dyn CalendarLabels, language: &str, today: NaiveDate) -> Vec<Vec<CalendarButton>> {
  let Some(first) = offset.with_day(1) else {
    return Vec::new();
  };
  let mut rows = vec![vec![CalendarButton::new(
    format!("{} {}", labels.month(first, language), labels.year(first, language)),
    format!("y{}", first.year()),
  )]];

  let monday = first - chrono::Duration::days(i64::from(first.weekday().num_days_from_monday()));
  rows.push(
    monday
      .iter_days()
      .take(7)
      .map(|day| CalendarButton::new(labels.weekday(day, language), NOOP))
      .collect(),
  );

  let mut week: Vec<CalendarButton> = (0..first.weekday().num_days_from_monday())
    .map(|_| CalendarButton::blank())
    .collect();
  for day in first.iter_days().take_while(|day| day.month() == first.month()) {
    let text = if day == today {
      format!("[{}]", day.day())
    } else {
      day.day().to_string()
    };
    week.push(CalendarButton::new(text, format!("d{}", day.format("%Y%m%d"))));
    if week.len() == 7 {
      rows.push(std::mem::take(&mut week));
    }
  }
  if !week.is_empty() {
    week.resize_with(7, CalendarButton::blank);
    rows.push(week);
  }

  let mut nav = Vec::with_capacity(2);
  if let Some(prev) = first.checked_sub_months(Months::new(1)) {
    nav.push(CalendarButton::new(
      format!("👈🏽 {}", labels.month(prev, language)),
      format!("m{}", prev.format("%Y%m")),
    ));
  }
  if let Some(next) = first.checked_add_months(Months::new(1)) {
    nav.push(CalendarButton::new(
      format!("{} 👉🏽", labels.month(next, language)),
      format!("m{}", next.format("%Y%m")),
    ));
  }
  rows.push(nav);
  rows
}

fn render_months(offset: NaiveDate, labels: &dyn CalendarLabels, language: &str, today: NaiveDate) -> Vec<Vec<CalendarButton>> {
  let year = offset.year();
  let Some(january) = NaiveDate::from_ymd_opt(year, 1, 1) else {
    return Vec::new();
  };
  let mut rows = vec![vec![CalendarButton::new(
    labels.year(january, language),
    format!("Y{}", page_start(year)),
  )]];

  let months: Vec<CalendarButton> = (1..=12)
    .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
    .map(|date| {
      let label = labels.month(date, language);
      let text = if date.year() == today.year() && date.month() == today.month() {
        format!("[{label}]")
      } else {
        label
      };
      CalendarButton::new(text, format!("m{}", date.format("%Y%m")))
    })
    .collect();
  rows.extend(months.chunks(MONTH_COLUMNS).map(<[CalendarButton]>::to_vec));

  let mut nav = Vec::with_capacity(2);
  if let Some(prev) = NaiveDate::from_ymd_opt(year - 1, 1, 1) {
    nav.push(CalendarButton::new(format!("👈🏽 {}", labels.year(prev, language)), format!("y{}", year - 1)));
  }
  if let Some(next) = NaiveDate::from_ymd_opt(year + 1, 1, 1) {
    nav.push(CalendarButton::new(format!("{} 👉🏽", labels.year(next, language)), format!("y{}", year + 1)));
  }
  rows.push(nav);
  rows
}

fn render_years(offset: NaiveDate, labels: &dyn CalendarLabels, language: &str, today: NaiveDate) -> Vec<Vec<CalendarButton>> {
  let start = page_start(offset.year());
  let years: Vec<CalendarButton> = (start..start + YEARS_PER_PAGE)
    .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
    .map(|date| {
      let label = labels.year(date, language);
      let text = if date.year() == today.year() {
        format!("[{label}]")
      } else {
        label
      };
      CalendarButton::new(text, format!("y{}", date.year()))
    })
    .collect();
  let mut rows: Vec<Vec<CalendarButton>> = years.chunks(YEAR_COLUMNS).map(<[CalendarButton]>::to_vec).collect();

  let mut nav = Vec::with_capacity(2);
  if let Some(prev) = NaiveDate::from_ymd_opt(start - YEARS_PER_PAGE, 1, 1) {
    nav.push(CalendarButton::new(
      format!("👈🏽 {}", labels.year(prev, language)),
      format!("Y{}", prev.year()),
    ));
  }
  if let Some(next) = NaiveDate::from_ymd_opt(start + YEARS_PER_PAGE, 1, 1) {
    nav.push(CalendarButton::new(
      format!("{} 👉🏽", labels.year(next, language)),
      format!("Y{}", next.year()),
    ));
  }
  rows.push(nav);
  rows
}

fn page_start(year: i32) -> i32 {
  year - year.rem_euclid(YEARS_PER_PAGE)
}

/// Decodes a button action. Anything unrecognised is ignored.
pub fn apply(action: &str) -> CalendarAction {
  let Some(kind) = action.chars().next() else {
    return CalendarAction::Ignore;
  };
  let rest = &action[kind.len_utf8()..];
  let parsed = match kind {
    'd' => NaiveDate::parse_from_str(rest, "%Y%m%d").ok().map(CalendarAction::Select),
    'm' if rest.len() == 6 && rest.is_ascii() => rest[..4]
      .parse::<i32>()
      .ok()
      .zip(rest[4..].parse::<u32>().ok())
      .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
      .map(|offset| show(CalendarScope::Days, offset)),
    'y' => parse_year(rest).map(|offset| show(CalendarScope::Months, offset)),
    'Y' => parse_year(rest).map(|offset| show(CalendarScope::Years, offset)),
    _ => None,
  };
  parsed.unwrap_or(CalendarAction::Ignore)
}

fn parse_year(raw: &str) -> Option<NaiveDate> {
  raw
    .parse::<i32>()
    .ok()
    .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
}

fn show(scope: CalendarScope, offset: NaiveDate) -> CalendarAction {
  CalendarAction::Show(CalendarView { scope, offset })
}

#[cfg(test)]
mod tests {
  use chrono::Locale;
  use chrono::NaiveDate;

  use super::CalendarAction;
  use super::CalendarLabels;
  use super::CalendarScope;
  use super::CalendarView;
  use super::LocalizedLabels;
  use super::PlainLabels;
  use super::apply;
  use super::render;
  use super::resolve_locale;

  fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
  }

  #[test]
  fn resolves_language_codes() {
    assert_eq!(resolve_locale("ru"), Locale::ru_RU);
    assert_eq!(resolve_locale("de"), Locale::de_DE);
    assert_eq!(resolve_locale("pt-br"), Locale::pt_BR);
    assert_eq!(resolve_locale("en"), Locale::en_US);
    assert_eq!(resolve_locale("uk"), Locale::uk_UA);
    assert_eq!(resolve_locale(""), Locale::en_US);
    assert_eq!(resolve_locale("xx"), Locale::en_US);
  }

  #[test]
  fn localized_labels_follow_user_language() {
    let monday = date(2024, 1, 1);
    assert_eq!(LocalizedLabels.weekday(monday, "en"), "Mon");
    assert_eq!(LocalizedLabels.month(monday, "en"), "January");
    assert_eq!(LocalizedLabels.weekday(monday, "ru"), "Пн");
    assert_eq!(LocalizedLabels.month(monday, "ru"), "Январь");
    assert_eq!(LocalizedLabels.month(date(2024, 3, 1), "uk"), "Березень");
    assert_eq!(LocalizedLabels.month(monday, "de"), "Januar");
    assert_eq!(LocalizedLabels.weekday(monday, "unknown"), "Mon");
  }

  #[test]
  fn day_grid_starts_on_monday() {
    let today = date(2024, 2, 14);
    let rows = render(CalendarView::new(today), &PlainLabels, "en", today);
    assert_eq!(rows[0][0].text, "February 2024");
    assert_eq!(rows[0][0].action, "y2024");
    let weekdays: Vec<&str> = rows[1].iter().map(|button| button.text.as_str()).collect();
    assert_eq!(weekdays, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
    // 2024-02-01 is a Thursday.
    assert_eq!(rows[2][3].text, "1");
    assert_eq!(rows[2][3].action, "d20240201");
    assert!(rows[2..rows.len() - 1].iter().all(|row| row.len() == 7));
    let marked = rows.iter().flatten().filter(|button| button.text == "[14]").count();
    assert_eq!(marked, 1);
    let nav = rows.last().expect("navigation row");
    assert_eq!(nav[0].action, "m202401");
    assert_eq!(nav[1].action, "m202403");
  }

  #[test]
  fn months_and_years_scopes() {
    let today = date(2024, 2, 14);
    let months = render(
      CalendarView {
        scope: CalendarScope::Months,
        offset: date(2024, 1, 1),
      },
      &PlainLabels,
      "en",
      today,
    );
    assert_eq!(months[0][0].action, "Y2020");
    assert_eq!(months[1].len(), 3);
    assert_eq!(months[1][1].text, "[February]");

    let years = render(
      CalendarView {
        scope: CalendarScope::Years,
        offset: date(2024, 1, 1),
      },
      &PlainLabels,
      "en",
      today,
    );
    assert_eq!(years[0][0].text, "2020");
    assert_eq!(years[0][4].text, "[2024]");
    assert_eq!(years.len(), 5);
    let nav = years.last().expect("navigation row");
    assert_eq!(nav[0].action, "Y2000");
    assert_eq!(nav[1].action, "Y2040");
  }

  #[test]
  fn decodes_actions() {
    assert_eq!(apply("d20240229"), CalendarAction::Select(date(2024, 2, 29)));
    assert_eq!(
      apply("m202403"),
      CalendarAction::Show(CalendarView {
        scope: CalendarScope::Days,
        offset: date(2024, 3, 1),
      })
    );
    assert_eq!(
      apply("y1999"),
      CalendarAction::Show(CalendarView {
        scope: CalendarScope::Months,
        offset: date(1999, 1, 1),
      })
    );
    assert_eq!(apply("_"), CalendarAction::Ignore);
    assert_eq!(apply("d20230229"), CalendarAction::Ignore);
    assert_eq!(apply(""), CalendarAction::Ignore);
  }
}

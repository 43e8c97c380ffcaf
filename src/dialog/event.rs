use serde::Deserialize;
use serde::Deserializer;
use serde_json::Map;
use serde_json::Value;
use teloxide::types::User;

/// The parts of the Telegram user the dialogs care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
  pub id: u64,
  pub language_code: Option<String>,
}

impl UserInfo {
  pub fn language(&self) -> &str {
    self.language_code.as_deref().unwrap_or("en")
  }
}

impl From<&User> for UserInfo {
  fn from(user: &User) -> Self {
    Self {
      id: user.id.0,
      language_code: user.language_code.clone(),
    }
  }
}

/// Answer to a callback query: a toast, or a modal alert when `show_alert` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Notification {
  #[serde(default, deserialize_with = "text_from_any")]
  pub text: Option<String>,
  #[serde(default)]
  pub show_alert: bool,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub cache_time: Option<u32>,
}

impl Notification {
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      text: Some(text.into()),
      ..Self::default()
    }
  }

  pub fn from_data(data: Map<String, Value>) -> serde_json::Result<Self> {
    serde_json::from_value(Value::Object(data))
  }
}

fn text_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => None,
    Some(Value::String(text)) => Some(text),
    Some(other) => Some(other.to_string()),
  })
}

/// Side effects a click handler asks for. The bot layer performs them.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
  user: UserInfo,
  widget_id: String,
  answer: Option<Notification>,
  replies: Vec<String>,
}

impl CallbackEvent {
  pub fn new(user: UserInfo, widget_id: impl Into<String>) -> Self {
    Self {
      user,
      widget_id: widget_id.into(),
      answer: None,
      replies: Vec::new(),
    }
  }

  pub fn user(&self) -> &UserInfo {
    &self.user
  }

  pub fn widget_id(&self) -> &str {
    &self.widget_id
  }

  pub fn answer(&mut self, text: impl Into<String>) {
    self.answer = Some(Notification::text(text));
  }

  pub fn notify(&mut self, notification: Notification) {
    self.answer = Some(notification);
  }

  /// Sends a separate chat message in addition to the dialog window.
  pub fn reply(&mut self, text: impl Into<String>) {
    self.replies.push(text.into());
  }

  pub fn answered(&self) -> Option<&Notification> {
    self.answer.as_ref()
  }

  pub fn replies(&self) -> &[String] {
    &self.replies
  }

  pub(crate) fn into_effects(self) -> (Option<Notification>, Vec<String>) {
    (self.answer, self.replies)
  }
}

#[derive(Debug, Clone)]
pub struct MessageEvent {
  user: UserInfo,
  text: Option<String>,
  replies: Vec<String>,
}

impl MessageEvent {
  pub fn new(user: UserInfo, text: Option<String>) -> Self {
    Self {
      user,
      text,
      replies: Vec::new(),
    }
  }

  pub fn user(&self) -> &UserInfo {
    &self.user
  }

  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  pub fn reply(&mut self, text: impl Into<String>) {
    self.replies.push(text.into());
  }

  pub fn replies(&self) -> &[String] {
    &self.replies
  }

  pub(crate) fn into_replies(self) -> Vec<String> {
    self.replies
  }
}

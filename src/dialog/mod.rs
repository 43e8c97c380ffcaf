//! Window/widget dialog engine driven by a YAML description.
//!
//! A [`DialogTree`] declares groups of windows and their widgets. Handler
//! names in it are resolved against a [`FuncsRegistry`] once at startup, and
//! every user carries a [`DialogStack`] of open dialogs in session storage.

pub mod calendar;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod manager;
pub mod model;
pub mod registry;
pub mod render;
pub mod widgets;

pub use context::DialogData;
pub use context::DialogStack;
pub use context::StartMode;
pub use engine::DialogEngine;
pub use engine::Outcome;
pub use engine::RenderedWindow;
pub use engine::ShowMode;
pub use error::DialogError;
pub use error::SetupError;
pub use event::CallbackEvent;
pub use event::MessageEvent;
pub use event::Notification;
pub use event::UserInfo;
pub use manager::DialogManager;
pub use model::DialogTree;
pub use model::StateId;
pub use registry::DisplayData;
pub use registry::FuncData;
pub use registry::FuncsRegistry;
pub use registry::HandlerResult;
pub use widgets::ManagedWidget;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::dialog::context::DialogData;
use crate::dialog::context::DialogStack;
use crate::dialog::context::Frame;
use crate::dialog::context::StartMode;
use crate::dialog::error::DialogError;
use crate::dialog::event::UserInfo;
use crate::dialog::model::DialogTree;
use crate::dialog::model::StateId;
use crate::dialog::widgets::ManagedWidget;

static EMPTY_DIALOG_DATA: Lazy<DialogData> = Lazy::new(DialogData::default);

/// Handle through which getters and handlers inspect and drive the dialog stack
/// of one user.
pub struct DialogManager<'a> {
  tree: &'a DialogTree,
  stack: &'a mut DialogStack,
  user: &'a UserInfo,
}

impl<'a> DialogManager<'a> {
  pub fn new(tree: &'a DialogTree, stack: &'a mut DialogStack, user: &'a UserInfo) -> Self {
    Self { tree, stack, user }
  }

  pub fn user(&self) -> &UserInfo {
    self.user
  }

  pub fn stack(&self) -> &DialogStack {
    self.stack
  }

  pub fn current_state(&self) -> Option<&StateId> {
    self.stack.current().map(|frame| &frame.state)
  }

  /// Data of the current dialog. Empty when no dialog is open.
  pub fn dialog_data(&self) -> &DialogData {
    self
      .stack
      .current()
      .map(|frame| &frame.dialog_data)
      .unwrap_or(&EMPTY_DIALOG_DATA)
  }

  pub fn dialog_data_mut(&mut self) -> Result<&mut DialogData, DialogError> {
    Ok(&mut self.frame_mut()?.dialog_data)
  }

  /// Looks up a stateful widget of the current dialog by id. Widgets of the
  /// current window win over same-named ones elsewhere in the dialog.
  pub fn find(&self, widget_id: &str) -> Option<ManagedWidget> {
    let frame = self.stack.current()?;
    let model = self.tree.find_dialog_widget(&frame.state, widget_id)?;
    ManagedWidget::resolve(model, frame.widget_data.get(widget_id))
  }

  pub fn start(&mut self, state: &StateId, mode: StartMode) -> Result<(), DialogError> {
    if self.tree.window(state).is_none() {
      return Err(DialogError::UnknownState(state.clone()));
    }
    if mode == StartMode::ResetStack {
      self.stack.clear();
    }
    let frame = self.stack.push(state.clone());
    debug!(user_id = self.user.id, state = %state, intent_id = %frame.intent_id, ?mode, "started dialog");
    Ok(())
  }

  /// Moves to another window of the current dialog, keeping its data.
  pub fn switch_to(&mut self, state: &StateId) -> Result<(), DialogError> {
    if self.tree.window(state).is_none() {
      return Err(DialogError::UnknownState(state.clone()));
    }
    let frame = self.frame_mut()?;
    if frame.state.group() != state.group() {
      return Err(DialogError::ForeignState {
        current: frame.state.clone(),
        target: state.clone(),
      });
    }
    frame.state = state.clone();
    Ok(())
  }

  pub fn next(&mut self) -> Result<(), DialogError> {
    self.step(1)
  }

  pub fn back(&mut self) -> Result<(), DialogError> {
    self.step(-1)
  }

  /// Closes the current dialog, returning to the one below it.
  pub fn done(&mut self) -> Result<(), DialogError> {
    let frame = self.stack.pop().ok_or(DialogError::NoActiveDialog)?;
    debug!(user_id = self.user.id, state = %frame.state, "closed dialog");
    Ok(())
  }

  fn step(&mut self, offset: isize) -> Result<(), DialogError> {
    let current = self.current_state().cloned().ok_or(DialogError::NoActiveDialog)?;
    let target = self
      .tree
      .neighbour(&current, offset)
      .ok_or_else(|| DialogError::NoNeighbour(current.clone()))?;
    self.switch_to(&target)
  }

  pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, DialogError> {
    self.stack.current_mut().ok_or(DialogError::NoActiveDialog)
  }
}

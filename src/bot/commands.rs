use teloxide::utils::command::BotCommands;

/// Commands that work in every window, whatever dialog is open.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Dialog menu commands:")]
pub enum Command {
  /// Close every open dialog and show the main menu
  Start,
  /// List commands and how to use the menu
  Help,
}

//! Special commands parser for interactive chat mode
//!
//! Special commands act on the local session instead of being sent to the
//! assistant. They are prefixed with `/` and are case-insensitive; the bare
//! words `exit` and `quit` are accepted as well.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Forget the conversation context but keep the session
    ClearContext,

    /// Show session id, state and context size
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the input goes to the assistant
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` for an unrecognized `/` command and
/// `CommandError::UnsupportedArgument` when a command is given an argument.
///
/// # Examples
///
/// ```
/// use procassist::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/clear").unwrap(), SpecialCommand::ClearContext);
/// assert_eq!(parse_special_command("QUIT").unwrap(), SpecialCommand::Exit);
/// assert_eq!(
///     parse_special_command("What is the cost for procedure TEST001?").unwrap(),
///     SpecialCommand::None
/// );
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = lower.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let parsed = match command {
        "/clear" | "/reset" => SpecialCommand::ClearContext,
        "/status" => SpecialCommand::ShowStatus,
        "/help" | "/?" => SpecialCommand::Help,
        "/exit" | "/quit" | "exit" | "quit" => SpecialCommand::Exit,
        _ => return Err(CommandError::UnknownCommand(trimmed.to_string())),
    };

    if let Some(arg) = arg {
        return Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }

    Ok(parsed)
}

/// Print help for the interactive chat
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CONVERSATION:
  /clear          - Forget earlier messages (the session id is kept)
  /reset          - Same as /clear

SESSION INFORMATION:
  /status         - Show session id, state and context size
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  Ctrl-C          - Cancel the message that is waiting for a reply
  exit            - Exit interactive mode
  quit            - Same as exit

EXAMPLES:
  Show me the history for Dr. Smith
  What is the cost for procedure TEST001?
  Add procedure TEST002 Annual Physical for Dr. Jones at $150

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent to the assistant
  - Only the most recent 40 messages are sent as context
"#
    );
}

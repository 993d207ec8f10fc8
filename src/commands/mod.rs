/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive conversational session
- `procedures`: Direct add / quote / history calls
- `special_commands`: Slash commands understood inside `chat`
*/

use crate::api::ApiClient;
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::{ProcassistError, Result};
use crate::session::{
    DisplayMessage, Notice, RejectReason, Role, SessionController, Submission, Tone, TurnOutcome,
};
use std::sync::Arc;

// Special commands parser for the chat loop
pub mod special_commands;

// Add, quote and history handlers
pub mod procedures;

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Creates a `SessionController` over the configured API client and runs a
    //! readline-based loop. While a message is waiting for its reply, Ctrl-C
    //! cancels that request instead of ending the program.

    use super::*;
    use chrono::Utc;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use procassist::commands::chat;
    /// use procassist::config::Config;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// chat::run_chat(Config::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let client = ApiClient::from_config(&config)?;
        let mut controller = SessionController::new(Arc::new(client));
        let show_timestamps = config.chat.show_timestamps;

        let mut rl = DefaultEditor::new().map_err(ProcassistError::Readline)?;

        print_welcome_banner(&config);
        if config.chat.show_welcome {
            let notice = Notice::welcome(Utc::now());
            render(&DisplayMessage::from_notice(&notice), show_timestamps);
        }

        loop {
            let prompt = format!("{} ", ">>".cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::ClearContext) => {
                            match controller.clear_context() {
                                Some(notice) => {
                                    render(&DisplayMessage::from_notice(&notice), show_timestamps)
                                }
                                None => println!("{}", "Wait for the current reply first.".yellow()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status_display(&controller, &config);
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed).map_err(ProcassistError::Readline)?;

                    if let Submission::Rejected(reason) = controller.submit(trimmed) {
                        let text = match reason {
                            RejectReason::Busy => "Still waiting for the previous reply.",
                            RejectReason::EmptyInput => "Nothing to send.",
                        };
                        println!("{}", text.yellow());
                        continue;
                    }

                    println!("{}", "Thinking... (Ctrl-C to cancel)".dimmed());
                    match wait_for_reply(&mut controller).await {
                        Some(TurnOutcome::Replied(turn)) => {
                            render(&DisplayMessage::from_turn(&turn), show_timestamps);
                        }
                        Some(TurnOutcome::Failed(error)) => {
                            render(&DisplayMessage::from_error(&error, Utc::now()), show_timestamps);
                        }
                        Some(TurnOutcome::Cancelled) | None => {
                            println!("{}\n", "Request cancelled.".yellow());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        controller.shutdown();
        println!("Goodbye!");
        Ok(())
    }

    enum Waited {
        Finished(Option<TurnOutcome>),
        Interrupted,
    }

    /// Wait for the in-flight reply, cancelling it on Ctrl-C
    async fn wait_for_reply(controller: &mut SessionController) -> Option<TurnOutcome> {
        let waited = tokio::select! {
            outcome = controller.resolve() => Waited::Finished(outcome),
            _ = tokio::signal::ctrl_c() => Waited::Interrupted,
        };

        match waited {
            Waited::Finished(outcome) => outcome,
            Waited::Interrupted => {
                controller.cancel();
                Some(TurnOutcome::Cancelled)
            }
        }
    }

    fn print_welcome_banner(config: &Config) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║          Doctor Procedures Assistant - Welcome!              ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Endpoint: {}", config.endpoint_base().cyan());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status_display(controller: &SessionController, config: &Config) {
        let history = controller.history();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                       Session Status                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Session ID:        {}", controller.session_id().cyan());
        println!("State:             {}", controller.state());
        println!(
            "Context Size:      {} / {} messages",
            history.len(),
            history.capacity()
        );
        println!(
            "  User:            {}",
            history.count_role(Role::User)
        );
        println!(
            "  Assistant:       {}",
            history.count_role(Role::Assistant)
        );
        println!("Endpoint:          {}", config.endpoint_base());
        println!();
    }

    /// Print one message with colour by speaker and tone
    pub(crate) fn render(message: &DisplayMessage, show_timestamps: bool) {
        println!("{}\n", format_message(message, show_timestamps));
    }

    pub(crate) fn format_message(message: &DisplayMessage, show_timestamps: bool) -> String {
        let speaker = match message.speaker {
            Role::User => "You".cyan().bold(),
            Role::Assistant => "Assistant".magenta().bold(),
        };
        let content = match message.tone {
            Tone::Success => message.content.green(),
            Tone::Error => message.content.red(),
            Tone::Neutral => message.content.normal(),
        };

        if show_timestamps {
            format!(
                "{} {}\n{}",
                format!("[{}]", message.local_time()).dimmed(),
                speaker,
                content
            )
        } else {
            format!("{}\n{}", speaker, content)
        }
    }

}

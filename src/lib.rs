//! procassist - Doctor procedures assistant library
//!
//! This library provides a conversational session manager and a REST
//! client for a doctor-procedures backend: adding procedure records,
//! quoting procedure costs, listing a doctor's history, and chatting with
//! an intent-mapping agent that carries a bounded conversation context.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: REST client, request/response types, and the `ChatBackend` seam
//! - `session`: Conversation store, session controller, and display projection
//! - `commands`: CLI command handlers (interactive chat and direct forms)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use procassist::{ApiClient, Config, SessionController, TurnOutcome};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = ApiClient::from_config(&config)?;
//!     let mut session = SessionController::new(Arc::new(client));
//!     session.submit("What is the cost for procedure TEST001?");
//!     if let Some(TurnOutcome::Replied(turn)) = session.resolve().await {
//!         println!("{}", turn.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, ChatBackend, HistoryLimit};
pub use config::Config;
pub use error::{ApiError, ApiResult, ProcassistError, Result};
pub use session::{
    ConversationStore, DisplayMessage, Role, SessionController, SessionState, Submission, Turn,
    TurnOutcome,
};

//! Conversational session management
//!
//! This module contains the bounded conversation log, the session
//! controller state machine, and the projection of session output into
//! renderable messages.

pub mod controller;
pub mod conversation;
pub mod display;

pub use controller::{
    reduce, Effect, InFlightRequest, RejectReason, Session, SessionController, SessionEvent,
    SessionState, Submission, Transition, TurnOutcome,
};
pub use conversation::{ConversationStore, Role, Turn, HISTORY_CAPACITY};
pub use display::{DisplayMessage, Notice, Tone};

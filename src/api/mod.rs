//! Backend API module for procassist
//!
//! This module contains the REST client for the procedures backend and the
//! request/response types it exchanges.

pub mod client;
pub mod types;

pub use client::{ApiClient, ChatBackend, DEFAULT_TIMEOUT};
pub use types::{
    parse_instant, AgentReply, ChatRequest, HistoryLimit, HistoryQuery, HistoryRecord,
    HistoryResult, Payload, ProcedureAck, ProcedureRecord, Quote, ReplyBody, WireTurn,
    UNEXPECTED_FORMAT_REPLY,
};

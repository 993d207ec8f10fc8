//! Request and response types for the procedures backend
//!
//! Field names follow the backend's camelCase JSON. Response types are
//! lenient: every field is optional, and a payload counts as recognized when
//! at least one of the operation's known fields is present (see [`Payload`]).

use crate::session::{Role, Turn};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reply text used when the chat backend answers without a usable field
pub const UNEXPECTED_FORMAT_REPLY: &str =
    "I received your request, but got an unexpected response format.";

/// Chat request body for `POST /intent-mapper`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    /// The user's utterance
    pub text: &'a str,
    /// Opaque session identifier
    pub session_id: &'a str,
    /// Context window sent along with the utterance
    pub conversation_history: Vec<WireTurn<'a>>,
}

impl<'a> ChatRequest<'a> {
    /// Builds a request borrowing from a history snapshot
    pub fn new(text: &'a str, session_id: &'a str, history: &'a [Turn]) -> Self {
        Self {
            text,
            session_id,
            conversation_history: history.iter().map(WireTurn::from).collect(),
        }
    }
}

/// One history entry as transmitted: role, content and timestamp only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTurn<'a> {
    pub role: Role,
    pub content: &'a str,
    pub timestamp: DateTime<Utc>,
}

impl<'a> From<&'a Turn> for WireTurn<'a> {
    fn from(turn: &'a Turn) -> Self {
        Self {
            role: turn.role,
            content: &turn.content,
            timestamp: turn.timestamp,
        }
    }
}

/// Body of a successful chat reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    /// The backend supplied readable text
    Text(String),
    /// Neither `response` nor `message` carried usable text
    Unrecognized,
}

/// Result of a chat call
///
/// A chat call whose payload cannot be read is still a success; the
/// [`ReplyBody::Unrecognized`] branch renders as [`UNEXPECTED_FORMAT_REPLY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub body: ReplyBody,
    /// Whether the backend resolved the utterance to a concrete intent
    pub intent_mapped: Option<bool>,
}

impl AgentReply {
    /// Creates a reply with readable text
    pub fn text(text: impl Into<String>, intent_mapped: Option<bool>) -> Self {
        Self {
            body: ReplyBody::Text(text.into()),
            intent_mapped,
        }
    }

    /// Creates a reply for an unreadable payload
    pub fn unrecognized() -> Self {
        Self {
            body: ReplyBody::Unrecognized,
            intent_mapped: None,
        }
    }

    /// Interprets a 2xx response body
    ///
    /// `response` wins over `message`; empty strings count as absent. Bodies
    /// that are not JSON objects are unrecognized.
    ///
    /// # Examples
    ///
    /// ```
    /// use procassist::api::{AgentReply, ReplyBody};
    ///
    /// let reply = AgentReply::from_body(r#"{"response":"Hi","intentMapped":false}"#);
    /// assert_eq!(reply.body, ReplyBody::Text("Hi".to_string()));
    /// assert_eq!(reply.intent_mapped, Some(false));
    ///
    /// let reply = AgentReply::from_body(r#"{"sessionId":"abc"}"#);
    /// assert_eq!(reply.body, ReplyBody::Unrecognized);
    /// ```
    pub fn from_body(body: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Chat reply is not JSON: {}", e);
                return Self::unrecognized();
            }
        };

        let Some(object) = value.as_object() else {
            tracing::warn!("Chat reply is not a JSON object");
            return Self::unrecognized();
        };

        let text_field = |name: &str| {
            object
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let intent_mapped = object.get("intentMapped").and_then(|v| v.as_bool());

        match text_field("response").or_else(|| text_field("message")) {
            Some(text) => Self::text(text, intent_mapped),
            None => {
                tracing::warn!("Chat reply has no response or message field");
                Self {
                    body: ReplyBody::Unrecognized,
                    intent_mapped,
                }
            }
        }
    }

    /// Text shown to the user and stored in the conversation
    pub fn response_text(&self) -> &str {
        match &self.body {
            ReplyBody::Text(text) => text,
            ReplyBody::Unrecognized => UNEXPECTED_FORMAT_REPLY,
        }
    }

    /// True when the payload was readable
    pub fn is_recognized(&self) -> bool {
        matches!(self.body, ReplyBody::Text(_))
    }
}

/// A decoded response payload that can tell whether it carried anything
pub trait Payload {
    /// True when at least one known field is present
    fn is_recognized(&self) -> bool;
}

/// Request body for `POST /add-doctor-procedure`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRecord {
    pub doctor_name: String,
    pub procedure_code: String,
    pub procedure_name: String,
    pub cost: f64,
}

/// Acknowledgement returned by the add-procedure endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureAck {
    #[serde(default)]
    pub message: Option<String>,
}

impl Payload for ProcedureAck {
    fn is_recognized(&self) -> bool {
        self.message.is_some()
    }
}

/// Cost quote returned by `GET /get-quote`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u32>,
    /// Any other quote fields the backend adds
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Payload for Quote {
    fn is_recognized(&self) -> bool {
        self.message.is_some()
            || self.procedure_code.is_some()
            || self.procedure_name.is_some()
            || self.average_cost.is_some()
    }
}

/// Number of history records to request; the backend UI offers 5, 10 or 20
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum HistoryLimit {
    #[default]
    Five,
    Ten,
    Twenty,
}

impl HistoryLimit {
    pub const ALL: [HistoryLimit; 3] = [Self::Five, Self::Ten, Self::Twenty];

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
        }
    }
}

impl TryFrom<u32> for HistoryLimit {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            20 => Ok(Self::Twenty),
            other => Err(format!("limit must be 5, 10 or 20, got {}", other)),
        }
    }
}

impl From<HistoryLimit> for u32 {
    fn from(limit: HistoryLimit) -> Self {
        limit.as_u32()
    }
}

impl FromStr for HistoryLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("limit must be 5, 10 or 20, got {}", s))?;
        Self::try_from(value)
    }
}

impl fmt::Display for HistoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Parameters for `GET /show-history`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub doctor_name: String,
    pub limit: HistoryLimit,
    /// Only include procedures at or after this instant
    pub start_date: Option<DateTime<Utc>>,
    /// Only include procedures at or before this instant
    pub end_date: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn new(doctor_name: impl Into<String>, limit: HistoryLimit) -> Self {
        Self {
            doctor_name: doctor_name.into(),
            limit,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(
        mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Query-string pairs in the order the backend documents them
    ///
    /// # Examples
    ///
    /// ```
    /// use procassist::api::{HistoryLimit, HistoryQuery};
    ///
    /// let pairs = HistoryQuery::new("Smith", HistoryLimit::Ten).query_pairs();
    /// assert_eq!(pairs, vec![
    ///     ("doctorName", "Smith".to_string()),
    ///     ("limit", "10".to_string()),
    /// ]);
    /// ```
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("doctorName", self.doctor_name.clone()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(start) = self.start_date {
            pairs.push(("startDate", format_backend_instant(start)));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", format_backend_instant(end)));
        }
        pairs
    }
}

/// The backend stores instants as `YYYY-MM-DDTHH:MM:SSZ`
fn format_backend_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parses an RFC 3339 instant or a bare `YYYY-MM-DD` date (midnight UTC)
///
/// # Examples
///
/// ```
/// use procassist::api::parse_instant;
///
/// assert!(parse_instant("2024-03-01").is_ok());
/// assert!(parse_instant("2024-03-01T10:30:00Z").is_ok());
/// assert!(parse_instant("yesterday").is_err());
/// ```
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{}'", input))
}

/// One procedure in a doctor's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub procedure: String,
    pub cost: f64,
    /// ISO-8601 timestamp as sent by the backend
    pub time: String,
}

impl HistoryRecord {
    /// The record's time in the local timezone, if it parses
    ///
    /// Times without an offset are taken as local wall-clock time.
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        if let Ok(instant) = DateTime::parse_from_rfc3339(&self.time) {
            return Some(instant.with_timezone(&Local));
        }
        NaiveDateTime::parse_from_str(&self.time, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
    }

    /// Local date/time for display, falling back to the raw string
    pub fn display_time(&self) -> String {
        self.local_time()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.time.clone())
    }
}

/// Response of `GET /show-history`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_count: Option<u32>,
}

impl HistoryResult {
    pub fn records(&self) -> &[HistoryRecord] {
        self.history.as_deref().unwrap_or(&[])
    }

    /// Backend message, or a count summary when it sent none
    pub fn summary(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("Found {} procedures", self.records().len()))
    }
}

impl Payload for HistoryResult {
    fn is_recognized(&self) -> bool {
        self.message.is_some() || self.history.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_prefers_response_over_message() {
        let reply = AgentReply::from_body(r#"{"response":"A","message":"B"}"#);
        assert_eq!(reply.response_text(), "A");
        assert_eq!(reply.intent_mapped, None);
    }

    #[test]
    fn test_reply_falls_back_to_message() {
        let reply = AgentReply::from_body(r#"{"response":"","message":"B","intentMapped":true}"#);
        assert_eq!(reply.response_text(), "B");
        assert_eq!(reply.intent_mapped, Some(true));
    }

    #[test]
    fn test_reply_unrecognized_keeps_intent_flag() {
        let reply = AgentReply::from_body(r#"{"intentMapped":false}"#);
        assert!(!reply.is_recognized());
        assert_eq!(reply.response_text(), UNEXPECTED_FORMAT_REPLY);
        assert_eq!(reply.intent_mapped, Some(false));
    }

    #[test]
    fn test_reply_non_json_and_non_object() {
        assert!(!AgentReply::from_body("<html>gateway</html>").is_recognized());
        assert!(!AgentReply::from_body("[1, 2]").is_recognized());
        assert!(!AgentReply::from_body("").is_recognized());
    }

    #[test]
    fn test_reply_non_string_response_is_ignored() {
        let reply = AgentReply::from_body(r#"{"response":42,"message":"fallback"}"#);
        assert_eq!(reply.response_text(), "fallback");
    }

    #[test]
    fn test_chat_request_serialization() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let history = vec![
            Turn::user("hello", at),
            Turn::assistant("hi there", Some(false), at),
        ];
        let request = ChatRequest::new("next", "session-1", &history);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["text"], "next");
        assert_eq!(value["sessionId"], "session-1");
        let entries = value["conversationHistory"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["role"], "user");
        assert_eq!(entries[1]["role"], "assistant");
        assert_eq!(entries[1]["content"], "hi there");
        assert_eq!(entries[0]["timestamp"], "2025-01-02T03:04:05Z");
        assert!(entries[1].get("intentMapped").is_none());
    }

    #[test]
    fn test_procedure_record_serialization() {
        let record = ProcedureRecord {
            doctor_name: "Dr. Smith".to_string(),
            procedure_code: "TEST001".to_string(),
            procedure_name: "Checkup".to_string(),
            cost: 150.5,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["doctorName"], "Dr. Smith");
        assert_eq!(value["procedureCode"], "TEST001");
        assert_eq!(value["procedureName"], "Checkup");
        assert_eq!(value["cost"], 150.5);
    }

    #[test]
    fn test_quote_keeps_extra_fields() {
        let quote: Quote = serde_json::from_str(
            r#"{"message":"ok","averageCost":12.5,"sampleCount":3,"currency":"USD"}"#,
        )
        .unwrap();
        assert!(quote.is_recognized());
        assert_eq!(quote.average_cost, Some(12.5));
        assert_eq!(quote.sample_count, Some(3));
        assert_eq!(quote.extra.get("currency").unwrap(), "USD");
    }

    #[test]
    fn test_empty_payloads_are_unrecognized() {
        let quote: Quote = serde_json::from_str("{}").unwrap();
        assert!(!quote.is_recognized());
        let history: HistoryResult = serde_json::from_str("{}").unwrap();
        assert!(!history.is_recognized());
        let ack: ProcedureAck = serde_json::from_str("{}").unwrap();
        assert!(!ack.is_recognized());
    }

    #[test]
    fn test_history_limit_parsing() {
        assert_eq!("5".parse::<HistoryLimit>().unwrap(), HistoryLimit::Five);
        assert_eq!(" 20 ".parse::<HistoryLimit>().unwrap(), HistoryLimit::Twenty);
        assert!("15".parse::<HistoryLimit>().is_err());
        assert!("ten".parse::<HistoryLimit>().is_err());
        assert_eq!(HistoryLimit::default(), HistoryLimit::Five);
    }

    #[test]
    fn test_history_query_with_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let pairs = HistoryQuery::new("Smith", HistoryLimit::Five)
            .with_range(Some(start), None)
            .query_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2], ("startDate", "2024-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn test_parse_instant_date_is_midnight_utc() {
        let instant = parse_instant("2024-03-01").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_history_result_summary() {
        let result: HistoryResult = serde_json::from_str(
            r#"{"history":[{"procedure":"X-Ray","cost":100.0,"time":"2024-05-01T10:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(result.summary(), "Found 1 procedures");
        assert_eq!(result.records().len(), 1);
        assert!(result.records()[0].local_time().is_some());
    }

    #[test]
    fn test_history_record_unparseable_time() {
        let record = HistoryRecord {
            procedure: "X".to_string(),
            cost: 1.0,
            time: "last week".to_string(),
        };
        assert_eq!(record.display_time(), "last week");
    }

    #[test]
    fn test_history_record_time_without_offset_is_local() {
        let record = HistoryRecord {
            procedure: "Annual Checkup".to_string(),
            cost: 150.0,
            time: "2024-05-01T10:30:00".to_string(),
        };
        let local = record.local_time().expect("offset-less ISO-8601 parses");
        assert_eq!(
            local.naive_local(),
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
        assert_eq!(record.display_time(), "2024-05-01 10:30");

        let fractional = HistoryRecord {
            time: "2024-05-01T10:30:00.123456".to_string(),
            ..record
        };
        assert_eq!(fractional.display_time(), "2024-05-01 10:30");
    }
}

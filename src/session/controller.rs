//! Conversational session controller
//!
//! The controller drives one conversation: it records the user's turn,
//! sends the utterance with a snapshot of the context window, and either
//! records the assistant's reply or reports the failure without touching the
//! stored context.
//!
//! # State machine
//!
//! ```text
//!            submit(text)                 reply
//!   Idle ------------------> Sending ------------------> Idle
//!    ^                          |
//!    |        (reported)        | failure
//!    +-------- Error <----------+
//! ```
//!
//! Transitions are computed by [`reduce`], a pure function over the current
//! state and an owned [`ConversationStore`]. [`SessionController`] is the
//! only caller; it performs the resulting [`Effect`]s, such as spawning the
//! network request.
//!
//! At most one request is in flight per session. The request runs on a
//! spawned task behind an [`InFlightRequest`] handle, which cancels and aborts
//! the task when dropped, so a reply can never be applied after the
//! controller is gone.

use crate::api::{AgentReply, ChatBackend};
use crate::error::{ApiError, ApiResult};
use crate::session::display::Notice;
use crate::session::{ConversationStore, Turn};

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept a submission
    Idle,
    /// A request is in flight; submissions are rejected
    Sending,
    /// A request just failed; settles to `Idle` once the failure is reported
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why a submission or clear request was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The text was empty or whitespace only
    EmptyInput,
    /// Another request is still in flight
    Busy,
}

/// Result of [`SessionController::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Rejected(RejectReason),
}

/// How an in-flight request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant replied; the turn has been stored
    Replied(Turn),
    /// The request failed; only the user's turn is stored
    Failed(ApiError),
    /// The request was cancelled and its result discarded
    Cancelled,
}

/// Input to the state machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Submit { text: String, at: DateTime<Utc> },
    ReplyReceived { reply: AgentReply, at: DateTime<Utc> },
    RequestFailed(ApiError),
    RequestCancelled,
    ClearRequested { at: DateTime<Utc> },
}

/// Work the controller must carry out after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Rejected(RejectReason),
    /// Send `text` with this context snapshot (which ends with the user turn)
    SendMessage { text: String, history: Vec<Turn> },
    Replied(Turn),
    Failed(ApiError),
    Cancelled,
    Notify(Notice),
}

/// Outcome of [`reduce`]
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub store: ConversationStore,
    pub effect: Effect,
}

/// Computes the next state, store and effect for an event
///
/// Events that do not apply in the current state (a reply arriving while
/// idle, for example) leave everything unchanged and yield [`Effect::None`].
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use procassist::session::controller::{reduce, Effect, SessionEvent, SessionState};
/// use procassist::session::ConversationStore;
///
/// let transition = reduce(
///     SessionState::Idle,
///     ConversationStore::new(),
///     SessionEvent::Submit { text: "hello".to_string(), at: Utc::now() },
/// );
/// assert_eq!(transition.state, SessionState::Sending);
/// assert_eq!(transition.store.len(), 1);
/// assert!(matches!(transition.effect, Effect::SendMessage { .. }));
/// ```
pub fn reduce(
    state: SessionState,
    mut store: ConversationStore,
    event: SessionEvent,
) -> Transition {
    let unchanged = |store, effect| Transition {
        state,
        store,
        effect,
    };

    match event {
        SessionEvent::Submit { text, at } => {
            if state == SessionState::Sending {
                return unchanged(store, Effect::Rejected(RejectReason::Busy));
            }
            if text.trim().is_empty() {
                return unchanged(store, Effect::Rejected(RejectReason::EmptyInput));
            }

            store.append(Turn::user(text.clone(), at));
            let history = store.snapshot();
            Transition {
                state: SessionState::Sending,
                store,
                effect: Effect::SendMessage { text, history },
            }
        }

        SessionEvent::ReplyReceived { reply, at } => {
            if state != SessionState::Sending {
                return unchanged(store, Effect::None);
            }

            store.append(Turn::assistant(
                reply.response_text(),
                reply.intent_mapped,
                at,
            ));
            let effect = match store.last() {
                Some(turn) => Effect::Replied(turn.clone()),
                None => Effect::None,
            };
            Transition {
                state: SessionState::Idle,
                store,
                effect,
            }
        }

        SessionEvent::RequestFailed(error) => {
            if state != SessionState::Sending {
                return unchanged(store, Effect::None);
            }
            Transition {
                state: SessionState::Error,
                store,
                effect: Effect::Failed(error),
            }
        }

        SessionEvent::RequestCancelled => {
            if state != SessionState::Sending {
                return unchanged(store, Effect::None);
            }
            Transition {
                state: SessionState::Idle,
                store,
                effect: Effect::Cancelled,
            }
        }

        SessionEvent::ClearRequested { at } => {
            if state == SessionState::Sending {
                return unchanged(store, Effect::Rejected(RejectReason::Busy));
            }
            store.clear();
            Transition {
                state: SessionState::Idle,
                store,
                effect: Effect::Notify(Notice::context_cleared(at)),
            }
        }
    }
}

/// One continuous conversation
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    store: ConversationStore,
}

impl Session {
    /// Starts a session with a freshly generated id
    pub fn new() -> Self {
        Self::with_id(format!("session-{}", Uuid::new_v4()))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: ConversationStore::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &ConversationStore {
        &self.store
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the single request a session may have in flight
///
/// Dropping the handle cancels the request and aborts its task.
#[derive(Debug)]
pub struct InFlightRequest {
    token: CancellationToken,
    handle: JoinHandle<Option<ApiResult<AgentReply>>>,
}

impl InFlightRequest {
    /// Spawns the chat call on the current Tokio runtime
    fn spawn(
        backend: Arc<dyn ChatBackend>,
        text: String,
        session_id: String,
        history: Vec<Turn>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;

                _ = cancelled.cancelled() => None,
                result = backend.send_message(&text, &session_id, &history) => Some(result),
            }
        });

        Self { token, handle }
    }

    /// Requests cancellation; the result, if it still arrives, is discarded
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task; `None` means it was cancelled or died
    async fn wait(&mut self) -> Option<ApiResult<AgentReply>> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                tracing::error!("Chat request task panicked: {}", e);
                None
            }
            Err(_) => None,
        }
    }
}

impl Drop for InFlightRequest {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Drives one conversational session against a chat backend
///
/// # Examples
///
/// ```no_run
/// use procassist::api::ApiClient;
/// use procassist::session::{SessionController, Submission, TurnOutcome};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> procassist::error::Result<()> {
/// let client = ApiClient::new("http://localhost:3000/dev", Duration::from_secs(30))?;
/// let mut controller = SessionController::new(Arc::new(client));
///
/// assert_eq!(controller.submit("Show me the history for Dr. Smith"), Submission::Accepted);
/// if let Some(TurnOutcome::Replied(turn)) = controller.resolve().await {
///     println!("{}", turn.content);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionController {
    session: Session,
    state: SessionState,
    backend: Arc<dyn ChatBackend>,
    in_flight: Option<InFlightRequest>,
}

impl SessionController {
    /// Creates a controller with a new session
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_session(backend, Session::new())
    }

    pub fn with_session(backend: Arc<dyn ChatBackend>, session: Session) -> Self {
        tracing::debug!(session_id = %session.id(), "Session started");
        Self {
            session,
            state: SessionState::Idle,
            backend,
            in_flight: None,
        }
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Conversation context that will be sent with the next request
    pub fn history(&self) -> &ConversationStore {
        self.session.history()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while a request is in flight
    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Sending
    }

    /// True when a submission would be accepted (given non-empty text)
    pub fn is_available(&self) -> bool {
        !self.is_loading()
    }

    fn dispatch(&mut self, event: SessionEvent) -> Effect {
        let store = std::mem::take(&mut self.session.store);
        let transition = reduce(self.state, store, event);
        if transition.state != self.state {
            tracing::debug!(
                session_id = %self.session.id,
                from = %self.state,
                to = %transition.state,
                "Session state change"
            );
        }
        self.session.store = transition.store;
        self.state = transition.state;
        transition.effect
    }

    /// Error is transient: once reported, the controller is idle again
    fn settle(&mut self) {
        if self.state == SessionState::Error {
            self.state = SessionState::Idle;
        }
    }

    /// Submits user text
    ///
    /// On acceptance the user's turn is stored immediately and the request
    /// starts in the background; call [`resolve`](Self::resolve) to apply its
    /// result. Empty text, or text submitted while a request is in flight,
    /// is rejected without any change.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, text: impl Into<String>) -> Submission {
        let effect = self.dispatch(SessionEvent::Submit {
            text: text.into(),
            at: Utc::now(),
        });

        match effect {
            Effect::SendMessage { text, history } => {
                tracing::info!(
                    session_id = %self.session.id,
                    history_len = history.len(),
                    "Sending message"
                );
                self.in_flight = Some(InFlightRequest::spawn(
                    Arc::clone(&self.backend),
                    text,
                    self.session.id.clone(),
                    history,
                ));
                Submission::Accepted
            }
            Effect::Rejected(reason) => {
                tracing::debug!(session_id = %self.session.id, ?reason, "Submission rejected");
                Submission::Rejected(reason)
            }
            other => unreachable!("Submit produced {:?}", other),
        }
    }

    /// Waits for the in-flight request and applies its result
    ///
    /// Returns `None` when nothing is in flight. Dropping the returned future
    /// before it completes leaves the request in flight.
    pub async fn resolve(&mut self) -> Option<TurnOutcome> {
        let request = self.in_flight.as_mut()?;
        let result = request.wait().await;
        self.in_flight = None;

        let event = match result {
            Some(Ok(reply)) => SessionEvent::ReplyReceived {
                reply,
                at: Utc::now(),
            },
            Some(Err(error)) => SessionEvent::RequestFailed(error),
            None => SessionEvent::RequestCancelled,
        };

        let outcome = match self.dispatch(event) {
            Effect::Replied(turn) => {
                tracing::info!(
                    session_id = %self.session.id,
                    intent_mapped = ?turn.intent_mapped,
                    "Assistant replied"
                );
                TurnOutcome::Replied(turn)
            }
            Effect::Failed(error) => {
                tracing::warn!(
                    session_id = %self.session.id,
                    kind = error.kind(),
                    "Message failed: {}",
                    error
                );
                self.settle();
                TurnOutcome::Failed(error)
            }
            _ => TurnOutcome::Cancelled,
        };

        Some(outcome)
    }

    /// Cancels the in-flight request, if any
    ///
    /// The user's turn stays in the history; no assistant turn is added.
    /// Returns true if a request was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(request) = self.in_flight.take() else {
            return false;
        };
        request.cancel();
        drop(request);

        self.dispatch(SessionEvent::RequestCancelled);
        tracing::info!(session_id = %self.session.id, "Request cancelled");
        true
    }

    /// Clears the conversation context, keeping the session id
    ///
    /// Returns the local notice to display, or `None` while a request is in
    /// flight. The backend is not told about the reset.
    pub fn clear_context(&mut self) -> Option<Notice> {
        match self.dispatch(SessionEvent::ClearRequested { at: Utc::now() }) {
            Effect::Notify(notice) => {
                tracing::info!(session_id = %self.session.id, "Conversation context cleared");
                Some(notice)
            }
            _ => None,
        }
    }

    /// Ends the session, cancelling any in-flight request
    pub fn shutdown(mut self) {
        if self.cancel() {
            tracing::debug!(session_id = %self.session.id, "In-flight request released on shutdown");
        }
        tracing::debug!(session_id = %self.session.id, "Session ended");
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.session.id)
            .field("state", &self.state)
            .field("history_len", &self.session.store.len())
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

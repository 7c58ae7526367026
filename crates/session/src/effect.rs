//! Side-effect commands produced by the session handlers.

use shared::protocol::ClientEvent;
use shared::settings::TutorSettings;

/// Display-target handle for a chat message owned by the presentation
/// layer. Monotonic per session.
pub type MessageId = u64;

/// Level of the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Connecting,
    Online,
    Error,
}

/// Severity of a system notice in the chat log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One side effect for the caller to execute.
///
/// Handlers return these instead of touching the socket or the UI directly,
/// which is what keeps every state transition testable without either.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write an event to the socket immediately.
    Send(ClientEvent),
    /// Write an event to the socket once the settle delay has passed.
    SendAfterSettle(ClientEvent),
    /// Tear the connection down completely and connect fresh.
    Reconnect,
    /// Update the status indicator.
    Status(StatusKind, String),
    /// Append a system notice to the chat log.
    Notice(NoticeLevel, String),
    /// Show or hide the typing indicator.
    ShowTyping(bool),
    /// Append the user's message, with its settings summary, to the chat log.
    AppendUser(String, TutorSettings),
    /// Create an empty assistant message to stream into.
    BeginAssistant(MessageId),
    /// Replace the full content of an assistant message and scroll to it.
    SetAssistantContent(MessageId, String),
    /// The backend started analyzing an image; show the busy affordance.
    ImageAnalysisStarted,
    /// Image analysis finished; show the result in the image panel.
    ImageAnalysisResult(String),
    /// Image analysis failed; surface it in the image panel and reset the
    /// analyze affordance.
    ImageAnalysisError(String),
    /// The backend runs without its image model; disable image features.
    DisableImageFeatures,
}

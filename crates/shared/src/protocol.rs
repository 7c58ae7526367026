//! Wire protocol between the desktop client and the tutoring backend.
//!
//! Every socket frame carries one JSON envelope: `{"event": <name>, "data":
//! {...}}`. Event names and payload field names are the compatibility
//! surface with the backend; the tests below pin them.

use serde::{Deserialize, Serialize};

use crate::settings::TutorSettings;

/// Backend capability value meaning a model is loaded and serving.
pub const STATUS_READY: &str = "ready";
/// Backend capability value meaning a model is still loading.
pub const STATUS_LOADING: &str = "loading";

/// Events the client sends to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Start a text exchange.
    AskAiTutor {
        message: String,
        settings: TutorSettings,
    },
    /// Start an image-analysis exchange. `image_url` is a data URI or a
    /// remote http(s) URL.
    AskImageQuestion { image_url: String, question: String },
    /// Keep-alive; `timestamp` is epoch milliseconds.
    Ping { timestamp: i64 },
}

/// Events the backend sends to the client.
///
/// The backend decorates payloads with timestamps, client ids and a
/// redundant `type` field; unknown fields are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Capability announcement sent right after the socket opens. Statuses
    /// are `"ready"`, `"loading"`, or an arbitrary failure string.
    ConnectionEstablished {
        tutor_status: String,
        image_analyzer_status: String,
    },
    ModelLoadingStatus {
        message: String,
    },
    KeepAlive {
        status: String,
    },
    TextResponseStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    /// `content` is the full response text so far (cumulative, not a delta).
    TextResponseChunk {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    TextResponseComplete {},
    ImageAnalysisStart {},
    ImageAnalysisResult {
        result: String,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    Pong {},
}

/// Where an `error` event should surface, derived from its context tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Belongs in the chat log.
    Tutor,
    /// Belongs in the image panel.
    ImageAnalyzer,
    /// No recognized context; shown as a generic system notice.
    General,
}

impl ErrorScope {
    pub fn from_context(context: Option<&str>) -> Self {
        match context {
            Some("text-tutor") => ErrorScope::Tutor,
            Some("image-analyzer") => ErrorScope::ImageAnalyzer,
            _ => ErrorScope::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_ai_tutor_wire_shape() {
        let event = ClientEvent::AskAiTutor {
            message: "Explain recursion".into(),
            settings: TutorSettings::default(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "ask_ai_tutor");
        assert_eq!(value["data"]["message"], "Explain recursion");
        assert_eq!(value["data"]["settings"]["subject"], "General");
        assert_eq!(value["data"]["settings"]["max_tokens"], 256);
    }

    #[test]
    fn test_ask_image_question_wire_shape() {
        let event = ClientEvent::AskImageQuestion {
            image_url: "data:image/png;base64,AAAA".into(),
            question: "What is this?".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "ask_image_question");
        assert_eq!(value["data"]["image_url"], "data:image/png;base64,AAAA");
        assert_eq!(value["data"]["question"], "What is this?");
    }

    #[test]
    fn test_ping_wire_shape() {
        let value = serde_json::to_value(ClientEvent::Ping { timestamp: 1234 }).unwrap();
        assert_eq!(value["event"], "ping");
        assert_eq!(value["data"]["timestamp"], 1234);
    }

    #[test]
    fn test_chunk_decodes_ignoring_extra_fields() {
        let raw = r#"{"event":"text_response_chunk","data":{"type":"text_response_chunk","message_id":"abc","content":"Hello","timestamp":1700000000.5}}"#;
        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::TextResponseChunk {
                content: "Hello".into(),
                message_id: Some("abc".into()),
            }
        );
    }

    #[test]
    fn test_start_decodes_without_message_id() {
        let raw = r#"{"event":"text_response_start","data":{"timestamp":1.0}}"#;
        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event, ServerEvent::TextResponseStart { message_id: None });
    }

    #[test]
    fn test_connection_established_decodes() {
        let raw = r#"{"event":"connection_established","data":{"tutor_status":"ready","image_analyzer_status":"loading"}}"#;
        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::ConnectionEstablished {
                tutor_status: "ready".into(),
                image_analyzer_status: "loading".into(),
            }
        );
    }

    #[test]
    fn test_error_scope_from_context() {
        assert_eq!(
            ErrorScope::from_context(Some("text-tutor")),
            ErrorScope::Tutor
        );
        assert_eq!(
            ErrorScope::from_context(Some("image-analyzer")),
            ErrorScope::ImageAnalyzer
        );
        assert_eq!(ErrorScope::from_context(Some("other")), ErrorScope::General);
        assert_eq!(ErrorScope::from_context(None), ErrorScope::General);
    }

    #[test]
    fn test_unknown_event_name_fails_decode() {
        let raw = r#"{"event":"image_analysis_progress","data":{}}"#;
        assert!(serde_json::from_str::<ServerEvent>(raw).is_err());
    }
}

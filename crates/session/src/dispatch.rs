//! Typed dispatch of transport events onto the session state.
//!
//! One pure handler per event: `(state, event) -> effects`. The connection
//! lifecycle, capability handling, streaming assembly and error routing all
//! run through here, so the whole thing is testable without a socket.

use shared::protocol::{ClientEvent, ErrorScope, ServerEvent, STATUS_LOADING, STATUS_READY};
use tracing::{debug, warn};
use transport::TransportEvent;

use crate::assembler;
use crate::effect::{Effect, NoticeLevel, StatusKind};
use crate::state::{ConnectionStatus, SessionState};

/// Surface a reconnect notice to the user on every Nth attempt.
const RETRY_NOTICE_EVERY: u32 = 5;

pub fn on_transport_event(state: &mut SessionState, event: TransportEvent) -> Vec<Effect> {
    match event {
        TransportEvent::Connecting { attempt } => on_connecting(state, attempt),
        TransportEvent::Connected => on_connected(state),
        TransportEvent::Dropped { reason } => on_dropped(state, &reason),
        TransportEvent::ClosedByServer => on_closed_by_server(state),
        TransportEvent::ConnectFailed { reason } => on_connect_failed(state, &reason),
        TransportEvent::Server(event) => on_server_event(state, event),
    }
}

fn on_connecting(state: &mut SessionState, attempt: u32) -> Vec<Effect> {
    state.status = ConnectionStatus::Connecting;
    state.retries = attempt;

    let text = if attempt <= 1 {
        "Connecting to AI backend...".to_string()
    } else {
        format!("Reconnecting... ({attempt})")
    };
    let mut effects = vec![Effect::Status(StatusKind::Connecting, text)];
    if attempt > 1 && attempt % RETRY_NOTICE_EVERY == 0 {
        effects.push(Effect::Notice(
            NoticeLevel::Warning,
            format!("Still trying to reconnect... (attempt {attempt})"),
        ));
    }
    effects
}

fn on_connected(state: &mut SessionState) -> Vec<Effect> {
    state.status = ConnectionStatus::Connected;
    state.retries = 0;

    let mut effects = state.reset_response_state();
    effects.push(Effect::Status(
        StatusKind::Online,
        "Connected. Waiting for AI models...".into(),
    ));
    effects.push(Effect::Notice(
        NoticeLevel::Success,
        "Connected to AI backend. Models loading...".into(),
    ));

    // Replay a held-back message exactly once. `take()` makes a duplicate
    // connect event harmless: the second one finds nothing to replay.
    if let Some(pending) = state.pending.take() {
        debug!("replaying pending message after reconnection");
        state.last_used = Some(pending.settings.clone());
        state.waiting_for_response = true;
        effects.push(Effect::AppendUser(
            pending.message.clone(),
            pending.settings.clone(),
        ));
        effects.push(Effect::ShowTyping(true));
        effects.push(Effect::SendAfterSettle(ClientEvent::AskAiTutor {
            message: pending.message,
            settings: pending.settings,
        }));
    }
    effects
}

fn on_dropped(state: &mut SessionState, reason: &str) -> Vec<Effect> {
    debug!(%reason, "transport dropped");
    state.status = ConnectionStatus::Disconnected;

    let mut effects = state.reset_response_state();
    effects.push(Effect::Status(
        StatusKind::Connecting,
        "Connection lost. Reconnecting...".into(),
    ));
    effects.push(Effect::Notice(
        NoticeLevel::Warning,
        "Connection lost. Reconnecting...".into(),
    ));
    effects
}

fn on_closed_by_server(state: &mut SessionState) -> Vec<Effect> {
    state.status = ConnectionStatus::Errored;

    let mut effects = state.reset_response_state();
    effects.push(Effect::Status(
        StatusKind::Error,
        "Disconnected by server".into(),
    ));
    effects.push(Effect::Notice(
        NoticeLevel::Error,
        "Disconnected by server. Please restart the backend.".into(),
    ));
    effects
}

fn on_connect_failed(state: &mut SessionState, reason: &str) -> Vec<Effect> {
    state.status = ConnectionStatus::Errored;
    vec![
        Effect::Status(StatusKind::Error, "Connection failed".into()),
        Effect::Notice(
            NoticeLevel::Error,
            format!("Failed to create connection: {reason}"),
        ),
    ]
}

fn on_server_event(state: &mut SessionState, event: ServerEvent) -> Vec<Effect> {
    match event {
        ServerEvent::ConnectionEstablished {
            tutor_status,
            image_analyzer_status,
        } => on_capabilities(state, &tutor_status, &image_analyzer_status),
        ServerEvent::ModelLoadingStatus { message } => vec![
            Effect::Status(StatusKind::Connecting, "Loading AI models...".into()),
            Effect::Notice(NoticeLevel::Info, message),
        ],
        ServerEvent::KeepAlive { status } => {
            debug!(%status, "keep-alive from backend");
            Vec::new()
        }
        ServerEvent::TextResponseStart { .. } => assembler::on_start(state),
        ServerEvent::TextResponseChunk { content, .. } => assembler::on_chunk(state, content),
        ServerEvent::TextResponseComplete {} => assembler::on_complete(state),
        ServerEvent::ImageAnalysisStart {} => vec![Effect::ImageAnalysisStarted],
        ServerEvent::ImageAnalysisResult { result } => {
            vec![Effect::ImageAnalysisResult(result)]
        }
        ServerEvent::Error { message, context } => on_error_event(state, message, context),
        ServerEvent::Pong {} => {
            debug!("pong from backend");
            Vec::new()
        }
    }
}

fn on_capabilities(
    state: &mut SessionState,
    tutor_status: &str,
    image_status: &str,
) -> Vec<Effect> {
    state.tutor_ready = tutor_status == STATUS_READY;
    state.image_analyzer_ready = image_status == STATUS_READY;

    match (tutor_status, image_status) {
        (STATUS_READY, STATUS_READY) => vec![
            Effect::Status(StatusKind::Online, "AI models ready (text + images)".into()),
            Effect::Notice(
                NoticeLevel::Success,
                "All AI models loaded. Ready for questions!".into(),
            ),
        ],
        (STATUS_READY, _) => vec![
            Effect::Status(StatusKind::Online, "AI models ready (text only)".into()),
            Effect::Notice(
                NoticeLevel::Success,
                "Text model loaded. Image analysis unavailable.".into(),
            ),
            Effect::DisableImageFeatures,
        ],
        (STATUS_LOADING, _) => vec![
            Effect::Status(StatusKind::Connecting, "AI models loading...".into()),
            Effect::Notice(
                NoticeLevel::Info,
                "AI models are still loading. Please wait...".into(),
            ),
        ],
        _ => vec![
            Effect::Status(StatusKind::Error, "AI models failed".into()),
            Effect::Notice(
                NoticeLevel::Error,
                "AI models failed to load. Please restart the backend.".into(),
            ),
        ],
    }
}

/// Route an application-level error by its context tag, then reset any
/// streaming state so the session stays usable.
fn on_error_event(
    state: &mut SessionState,
    message: String,
    context: Option<String>,
) -> Vec<Effect> {
    warn!(
        context = context.as_deref().unwrap_or("none"),
        %message,
        "backend reported an error"
    );
    let mut effects = match ErrorScope::from_context(context.as_deref()) {
        ErrorScope::Tutor => vec![Effect::Notice(
            NoticeLevel::Error,
            format!("❌ Error: {message}"),
        )],
        ErrorScope::ImageAnalyzer => vec![Effect::ImageAnalysisError(message)],
        ErrorScope::General => vec![Effect::Notice(
            NoticeLevel::Error,
            format!("Error: {message}"),
        )],
    };
    effects.extend(state.reset_response_state());
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuity::send_chat_message;
    use crate::state::PendingRequest;
    use shared::settings::TutorSettings;

    fn server(event: ServerEvent) -> TransportEvent {
        TransportEvent::Server(event)
    }

    fn settle_sends(effects: &[Effect]) -> Vec<&ClientEvent> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::SendAfterSettle(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_resets_streaming_state() {
        let mut state = SessionState::new();
        state.waiting_for_response = true;
        state.in_flight = Some(crate::state::InFlightResponse {
            target: 7,
            content: "stale".into(),
        });

        on_transport_event(&mut state, TransportEvent::Connected);

        assert!(state.is_connected());
        assert!(state.in_flight.is_none());
        assert!(!state.waiting_for_response);
    }

    #[test]
    fn test_connect_replays_pending_exactly_once() {
        let mut state = SessionState::new();
        let mut settings = TutorSettings::default();
        settings.subject = "Science".into();
        state.pending = Some(PendingRequest {
            message: "Explain photosynthesis".into(),
            settings: settings.clone(),
        });

        let effects = on_transport_event(&mut state, TransportEvent::Connected);
        let sends = settle_sends(&effects);
        assert_eq!(sends.len(), 1);
        assert_eq!(
            sends[0],
            &ClientEvent::AskAiTutor {
                message: "Explain photosynthesis".into(),
                settings: settings.clone(),
            }
        );
        assert_eq!(state.last_used, Some(settings));
        assert!(state.waiting_for_response);

        // A duplicate connect event finds no pending message to replay.
        let again = on_transport_event(&mut state, TransportEvent::Connected);
        assert!(settle_sends(&again).is_empty());
    }

    #[test]
    fn test_retry_notice_every_fifth_attempt() {
        let mut state = SessionState::new();
        for attempt in 1..=4 {
            let effects =
                on_transport_event(&mut state, TransportEvent::Connecting { attempt });
            assert!(
                !effects
                    .iter()
                    .any(|e| matches!(e, Effect::Notice(_, _))),
                "unexpected notice at attempt {attempt}"
            );
        }
        let effects = on_transport_event(&mut state, TransportEvent::Connecting { attempt: 5 });
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Notice(NoticeLevel::Warning, _))));
    }

    #[test]
    fn test_server_close_is_terminal() {
        let mut state = SessionState::new();
        state.status = ConnectionStatus::Connected;

        let effects = on_transport_event(&mut state, TransportEvent::ClosedByServer);

        assert_eq!(state.status, ConnectionStatus::Errored);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Status(StatusKind::Error, _))));
    }

    #[test]
    fn test_text_only_capabilities_disable_image_features() {
        let mut state = SessionState::new();
        let effects = on_transport_event(
            &mut state,
            server(ServerEvent::ConnectionEstablished {
                tutor_status: "ready".into(),
                image_analyzer_status: "failed".into(),
            }),
        );

        assert!(state.tutor_ready);
        assert!(!state.image_analyzer_ready);
        assert!(effects.contains(&Effect::DisableImageFeatures));
    }

    #[test]
    fn test_image_error_routes_to_image_panel() {
        let mut state = SessionState::new();
        let effects = on_transport_event(
            &mut state,
            server(ServerEvent::Error {
                message: "could not load image".into(),
                context: Some("image-analyzer".into()),
            }),
        );
        assert_eq!(effects[0], Effect::ImageAnalysisError("could not load image".into()));
    }

    #[test]
    fn test_error_resets_waiting_flag() {
        let mut state = SessionState::new();
        state.waiting_for_response = true;
        on_transport_event(
            &mut state,
            server(ServerEvent::Error {
                message: "generation failed".into(),
                context: Some("text-tutor".into()),
            }),
        );
        assert!(!state.waiting_for_response);
    }

    /// The full continuity scenario: first message goes straight out, a
    /// subject change defers the second one through a reconnect, and the
    /// replay happens exactly once with the new settings.
    #[test]
    fn test_settings_change_scenario() {
        let mut state = SessionState::new();
        on_transport_event(&mut state, TransportEvent::Connected);

        let math = TutorSettings {
            subject: "Math".into(),
            language: "English".into(),
            level: "elementary".into(),
            max_tokens: 256,
            response_style: "regular".into(),
        };
        let effects = send_chat_message(&mut state, "Explain recursion", math.clone());
        assert!(effects.contains(&Effect::Send(ClientEvent::AskAiTutor {
            message: "Explain recursion".into(),
            settings: math.clone(),
        })));

        // Answer completes, unlocking the send path.
        on_transport_event(&mut state, server(ServerEvent::TextResponseStart { message_id: None }));
        on_transport_event(
            &mut state,
            server(ServerEvent::TextResponseChunk {
                content: "Recursion is...".into(),
                message_id: None,
            }),
        );
        on_transport_event(&mut state, server(ServerEvent::TextResponseComplete {}));
        assert!(!state.waiting_for_response);

        // Subject changes; the send is deferred behind a reconnect.
        let mut science = math.clone();
        science.subject = "Science".into();
        let effects = send_chat_message(&mut state, "Explain photosynthesis", science.clone());
        assert!(effects.contains(&Effect::Reconnect));
        assert!(state.pending.is_some());

        // The transport tears down and reconnects.
        on_transport_event(
            &mut state,
            TransportEvent::Dropped {
                reason: "connection reset".into(),
            },
        );
        on_transport_event(&mut state, TransportEvent::Connecting { attempt: 1 });
        let effects = on_transport_event(&mut state, TransportEvent::Connected);

        let sends = settle_sends(&effects);
        assert_eq!(sends.len(), 1, "exactly one replayed send");
        assert_eq!(
            sends[0],
            &ClientEvent::AskAiTutor {
                message: "Explain photosynthesis".into(),
                settings: science.clone(),
            }
        );
        assert_eq!(state.last_used, Some(science));
        assert!(state.pending.is_none());
    }
}

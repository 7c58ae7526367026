//! Send-path guards and settings-change continuity.
//!
//! The backend keeps tutoring context per connection, so sending with
//! changed settings over a live connection would mix contexts within one
//! exchange. When the freshly resolved settings differ from the last-used
//! ones, the message is held back as a [`PendingRequest`], the connection is
//! destroyed and recreated, and the connect path replays the held message.

use shared::protocol::ClientEvent;
use shared::settings::TutorSettings;
use tracing::info;

use crate::effect::{Effect, NoticeLevel};
use crate::state::{PendingRequest, SessionState};

/// Try to send a chat message with the given settings snapshot.
///
/// Three unconditional guards run first, regardless of the continuity
/// decision: empty message, no connection, response still in flight. Each
/// produces a warning and no wire traffic.
pub fn send_chat_message(
    state: &mut SessionState,
    message: &str,
    settings: TutorSettings,
) -> Vec<Effect> {
    let message = message.trim();
    if message.is_empty() {
        return vec![Effect::Notice(
            NoticeLevel::Warning,
            "Please enter a message".into(),
        )];
    }
    if !state.is_connected() {
        return vec![Effect::Notice(
            NoticeLevel::Error,
            "Not connected to backend. Please wait for the connection.".into(),
        )];
    }
    if state.waiting_for_response {
        return vec![Effect::Notice(
            NoticeLevel::Warning,
            "Please wait for the current response to complete".into(),
        )];
    }

    if let Some(last) = &state.last_used {
        if !last.same_context(&settings) {
            info!("settings changed since last send; forcing reconnection");
            state.pending = Some(PendingRequest {
                message: message.to_string(),
                settings,
            });
            return vec![
                Effect::Notice(
                    NoticeLevel::Info,
                    "Settings changed. Reconnecting for a clean session...".into(),
                ),
                Effect::Reconnect,
            ];
        }
    }

    state.last_used = Some(settings.clone());
    let mut effects = state.reset_response_state();
    state.waiting_for_response = true;
    effects.push(Effect::AppendUser(message.to_string(), settings.clone()));
    effects.push(Effect::ShowTyping(true));
    effects.push(Effect::Send(ClientEvent::AskAiTutor {
        message: message.to_string(),
        settings,
    }));
    effects
}

/// Try to send an image-analysis request.
///
/// Image exchanges are independent of the chat waiting flag but still need a
/// live connection. The UI already disables the affordance when there is no
/// image or question, so missing inputs are silently ignored here.
pub fn send_image_question(
    state: &SessionState,
    image_url: &str,
    question: &str,
) -> Vec<Effect> {
    let question = question.trim();
    if image_url.is_empty() || question.is_empty() {
        return Vec::new();
    }
    if !state.is_connected() {
        return vec![Effect::Notice(
            NoticeLevel::Error,
            "Not connected to backend. Please wait for the connection.".into(),
        )];
    }
    vec![
        Effect::ImageAnalysisStarted,
        Effect::Send(ClientEvent::AskImageQuestion {
            image_url: image_url.to_string(),
            question: question.to_string(),
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionStatus;

    fn connected_state() -> SessionState {
        let mut state = SessionState::new();
        state.status = ConnectionStatus::Connected;
        state
    }

    fn wire_sends(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Send(_) | Effect::SendAfterSettle(_)))
            .count()
    }

    #[test]
    fn test_empty_message_warns_and_sends_nothing() {
        let mut state = connected_state();
        let effects = send_chat_message(&mut state, "   ", TutorSettings::default());
        assert!(matches!(
            effects[0],
            Effect::Notice(NoticeLevel::Warning, _)
        ));
        assert_eq!(wire_sends(&effects), 0);
    }

    #[test]
    fn test_disconnected_send_warns_and_sends_nothing() {
        let mut state = SessionState::new();
        let effects = send_chat_message(&mut state, "hello", TutorSettings::default());
        assert!(matches!(effects[0], Effect::Notice(NoticeLevel::Error, _)));
        assert_eq!(wire_sends(&effects), 0);
    }

    #[test]
    fn test_send_while_waiting_warns_and_sends_nothing() {
        let mut state = connected_state();
        state.waiting_for_response = true;
        let effects = send_chat_message(&mut state, "hello", TutorSettings::default());
        assert!(matches!(
            effects[0],
            Effect::Notice(NoticeLevel::Warning, _)
        ));
        assert_eq!(wire_sends(&effects), 0);
    }

    #[test]
    fn test_first_send_goes_straight_out() {
        let mut state = connected_state();
        let settings = TutorSettings::default();
        let effects = send_chat_message(&mut state, "Explain recursion", settings.clone());

        assert!(state.waiting_for_response);
        assert_eq!(state.last_used, Some(settings.clone()));
        assert!(state.pending.is_none());
        assert!(effects.contains(&Effect::Send(ClientEvent::AskAiTutor {
            message: "Explain recursion".into(),
            settings,
        })));
    }

    #[test]
    fn test_changed_context_defers_and_reconnects() {
        let mut state = connected_state();
        state.last_used = Some(TutorSettings::default());

        let mut changed = TutorSettings::default();
        changed.subject = "Science".into();
        let effects = send_chat_message(&mut state, "Explain photosynthesis", changed.clone());

        assert_eq!(wire_sends(&effects), 0);
        assert!(effects.contains(&Effect::Reconnect));
        assert_eq!(
            state.pending,
            Some(PendingRequest {
                message: "Explain photosynthesis".into(),
                settings: changed,
            })
        );
        // Not marked waiting: nothing is on the wire yet.
        assert!(!state.waiting_for_response);
    }

    #[test]
    fn test_token_only_change_sends_immediately() {
        let mut state = connected_state();
        state.last_used = Some(TutorSettings::default());

        let mut changed = TutorSettings::default();
        changed.max_tokens = 1024;
        let effects = send_chat_message(&mut state, "More detail please", changed.clone());

        assert!(!effects.contains(&Effect::Reconnect));
        assert!(state.pending.is_none());
        assert_eq!(wire_sends(&effects), 1);
        assert_eq!(state.last_used, Some(changed));
    }

    #[test]
    fn test_image_question_requires_connection() {
        let state = SessionState::new();
        let effects = send_image_question(&state, "data:image/png;base64,AA", "what is it?");
        assert!(matches!(effects[0], Effect::Notice(NoticeLevel::Error, _)));
        assert_eq!(wire_sends(&effects), 0);
    }

    #[test]
    fn test_image_question_sends_when_connected() {
        let state = connected_state();
        let effects = send_image_question(&state, "https://example.com/cat.png", "what is it?");
        assert!(effects.contains(&Effect::ImageAnalysisStarted));
        assert_eq!(wire_sends(&effects), 1);
    }
}

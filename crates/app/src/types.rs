//! Core types for the Tutor Desk app.
//!
//! `AppState` owns everything: the session state machine, the socket
//! handle, the chat log, the settings draft and the image panel. All of it
//! is mutated only from the UI thread; background workers report in over
//! channels polled once per frame.

use std::fs;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use eframe::egui;
use futures::future::AbortHandle;
use tracing::warn;

use session::resolver::{self, FieldChoice, SettingsDraft, CUSTOM};
use session::{
    continuity, dispatch, ConnectionStatus, Effect, MessageId, NoticeLevel, SessionState,
    StatusKind,
};
use shared::settings::TutorSettings;
use transport::{SocketConfig, SocketHandle};

use crate::config::{self, AppConfig};

/// Which tab is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppTab {
    TextTutor,
    ImageAnalyzer,
}

/// Who a chat entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System(NoticeLevel),
}

/// One rendered entry in the chat log.
#[derive(Clone, Debug)]
pub struct ChatEntry {
    /// Set for assistant messages that stream in; lets chunk updates find
    /// their display target.
    pub id: Option<MessageId>,
    pub role: ChatRole,
    pub content: String,
    /// Settings summary line shown under user messages.
    pub settings_line: Option<String>,
    pub timestamp: String,
}

/// Current status indicator content.
#[derive(Clone, Debug)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

/// Result from the background image fetch.
#[derive(Debug)]
pub struct ImageFetchResult {
    pub url: String,
    pub result: Result<Vec<u8>, String>,
}

/// The image currently loaded into the analyzer panel.
#[derive(Clone, Debug)]
pub enum LoadedImage {
    /// Local file, encoded as a data URI for the wire.
    DataUri { data_uri: String, bytes: Vec<u8> },
    /// Remote URL; bytes are only for the preview.
    Remote { url: String, bytes: Vec<u8> },
}

impl LoadedImage {
    /// The value sent as `image_url` on the wire.
    pub fn wire_url(&self) -> &str {
        match self {
            LoadedImage::DataUri { data_uri, .. } => data_uri,
            LoadedImage::Remote { url, .. } => url,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            LoadedImage::DataUri { bytes, .. } => bytes,
            LoadedImage::Remote { bytes, .. } => bytes,
        }
    }
}

/// One completed (or failed) image analysis.
#[derive(Clone, Debug)]
pub struct AnalysisEntry {
    pub question: String,
    pub answer: String,
    pub timestamp: String,
    pub is_error: bool,
}

/// Image analyzer panel state, independent of the chat session.
pub struct ImagePanelState {
    pub url_input: String,
    pub question_input: String,
    pub loaded: Option<LoadedImage>,
    pub texture: Option<egui::TextureHandle>,
    pub analyzing: bool,
    /// Cleared when the backend announces it runs without an image model.
    pub enabled: bool,
    pub results: Vec<AnalysisEntry>,
    /// Question of the in-flight analysis, paired with its result.
    pub pending_question: Option<String>,
    pub fetch_rx: Option<Receiver<ImageFetchResult>>,
    pub fetch_abort: Option<AbortHandle>,
}

impl ImagePanelState {
    fn new() -> Self {
        Self {
            url_input: String::new(),
            question_input: String::new(),
            loaded: None,
            texture: None,
            analyzing: false,
            enabled: true,
            results: Vec::new(),
            pending_question: None,
            fetch_rx: None,
            fetch_abort: None,
        }
    }
}

/// Main application state.
pub struct AppState {
    pub config: AppConfig,
    pub session: SessionState,
    pub socket: SocketHandle,
    pub current_tab: AppTab,
    pub chat: Vec<ChatEntry>,
    pub input_text: String,
    pub show_typing: bool,
    pub status: StatusLine,
    pub draft: SettingsDraft,
    /// Entry-time warning for the custom token field; also keeps focus
    /// pinned there until the value is fixed or cleared.
    pub token_field_error: Option<String>,
    pub image: ImagePanelState,
}

impl AppState {
    pub fn new() -> Self {
        let config = config::load_or_default();
        let socket = transport::spawn(SocketConfig {
            url: config.backend_url.clone(),
            ..SocketConfig::default()
        });
        let draft = config
            .last_settings
            .as_ref()
            .map(draft_from_settings)
            .unwrap_or_default();

        Self {
            config,
            session: SessionState::new(),
            socket,
            current_tab: AppTab::TextTutor,
            chat: Vec::new(),
            input_text: String::new(),
            show_typing: false,
            status: StatusLine {
                kind: StatusKind::Connecting,
                text: "Connecting to AI backend...".into(),
            },
            draft,
            token_field_error: None,
            image: ImagePanelState::new(),
        }
    }

    /// Drain transport events and run their effects.
    pub fn poll_socket(&mut self) {
        while let Some(event) = self.socket.poll() {
            for effect in dispatch::on_transport_event(&mut self.session, event) {
                self.apply_effect(effect);
            }
        }
    }

    /// Execute one side effect from the session core.
    pub fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Send(event) => self.socket.send(event),
            Effect::SendAfterSettle(event) => self.socket.send_after_settle(event),
            Effect::Reconnect => self.socket.reconnect(),
            Effect::Status(kind, text) => self.status = StatusLine { kind, text },
            Effect::Notice(level, text) => self.push_system(level, text),
            Effect::ShowTyping(show) => self.show_typing = show,
            Effect::AppendUser(text, settings) => self.chat.push(ChatEntry {
                id: None,
                role: ChatRole::User,
                content: text,
                settings_line: Some(settings.summary()),
                timestamp: now_timestamp(),
            }),
            Effect::BeginAssistant(id) => self.chat.push(ChatEntry {
                id: Some(id),
                role: ChatRole::Assistant,
                content: String::new(),
                settings_line: None,
                timestamp: now_timestamp(),
            }),
            Effect::SetAssistantContent(id, content) => {
                if let Some(entry) = self
                    .chat
                    .iter_mut()
                    .rev()
                    .find(|entry| entry.id == Some(id))
                {
                    entry.content = content;
                } else {
                    warn!(id, "no chat entry for streaming update");
                }
            }
            Effect::ImageAnalysisStarted => self.image.analyzing = true,
            Effect::ImageAnalysisResult(result) => {
                self.image.analyzing = false;
                let question = self
                    .image
                    .pending_question
                    .take()
                    .unwrap_or_else(|| self.image.question_input.trim().to_string());
                self.image.results.push(AnalysisEntry {
                    question,
                    answer: result,
                    timestamp: now_timestamp(),
                    is_error: false,
                });
                self.image.question_input.clear();
            }
            Effect::ImageAnalysisError(message) => {
                self.image.analyzing = false;
                let question = self.image.pending_question.take().unwrap_or_default();
                self.image.results.push(AnalysisEntry {
                    question,
                    answer: format!("Error: {message}"),
                    timestamp: now_timestamp(),
                    is_error: true,
                });
            }
            Effect::DisableImageFeatures => {
                self.image.enabled = false;
                if self.current_tab == AppTab::ImageAnalyzer {
                    self.current_tab = AppTab::TextTutor;
                }
            }
        }
    }

    pub fn push_system(&mut self, level: NoticeLevel, text: String) {
        self.chat.push(ChatEntry {
            id: None,
            role: ChatRole::System(level),
            content: text,
            settings_line: None,
            timestamp: now_timestamp(),
        });
    }

    /// Resolve the settings draft and try to send the current input.
    pub fn send_message(&mut self) {
        let settings = self.draft.resolve();
        let message = self.input_text.clone();
        let effects = continuity::send_chat_message(&mut self.session, &message, settings.clone());
        let accepted = effects
            .iter()
            .any(|e| matches!(e, Effect::Send(_) | Effect::Reconnect));
        for effect in effects {
            self.apply_effect(effect);
        }
        if accepted {
            self.input_text.clear();
            self.config.last_settings = Some(settings);
            config::save(&self.config);
        }
    }

    /// Kick off an image analysis for the loaded image and current question.
    pub fn analyze_image(&mut self) {
        let Some(loaded) = &self.image.loaded else {
            return;
        };
        let url = loaded.wire_url().to_string();
        let question = self.image.question_input.trim().to_string();
        let effects = continuity::send_image_question(&self.session, &url, &question);
        let sent = effects.iter().any(|e| matches!(e, Effect::Send(_)));
        for effect in effects {
            self.apply_effect(effect);
        }
        if sent {
            self.image.pending_question = Some(question);
        }
    }

    /// Load a local image file, rejecting non-images by extension.
    pub fn load_image_file(&mut self, path: &Path) {
        let Some(mime) = mime_for_extension(path) else {
            self.push_system(
                NoticeLevel::Error,
                "Please select a valid image file.".into(),
            );
            return;
        };
        match fs::read(path) {
            Ok(bytes) => {
                let data_uri = format!("data:{mime};base64,{}", BASE64.encode(&bytes));
                self.set_loaded_image(LoadedImage::DataUri { data_uri, bytes });
            }
            Err(e) => self.push_system(
                NoticeLevel::Error,
                format!("Could not read image file: {e}"),
            ),
        }
    }

    /// Validate the URL field and start a background preview fetch.
    pub fn load_image_from_url(&mut self) {
        let url_text = self.image.url_input.trim().to_string();
        if url_text.is_empty() {
            return;
        }
        match url::Url::parse(&url_text) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                self.abort_image_fetch();
                let (tx, rx) = channel();
                let (abort_handle, abort_reg) = AbortHandle::new_pair();
                self.image.fetch_rx = Some(rx);
                self.image.fetch_abort = Some(abort_handle);
                std::thread::spawn(move || {
                    crate::workers::run_image_fetch(url_text, tx, abort_reg);
                });
            }
            _ => self.push_system(NoticeLevel::Error, "Please enter a valid image URL.".into()),
        }
    }

    /// Poll the background image fetch, if one is running.
    pub fn poll_image_fetch(&mut self) {
        let Some(rx) = &self.image.fetch_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(fetched) => {
                self.image.fetch_rx = None;
                self.image.fetch_abort = None;
                match fetched.result {
                    Ok(bytes) => self.set_loaded_image(LoadedImage::Remote {
                        url: fetched.url,
                        bytes,
                    }),
                    Err(e) => self.push_system(
                        NoticeLevel::Error,
                        format!("Could not load image: {e}"),
                    ),
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.image.fetch_rx = None;
                self.image.fetch_abort = None;
            }
        }
    }

    pub fn remove_image(&mut self) {
        self.abort_image_fetch();
        self.image.loaded = None;
        self.image.texture = None;
        self.image.url_input.clear();
    }

    fn set_loaded_image(&mut self, loaded: LoadedImage) {
        self.image.loaded = Some(loaded);
        // Force a texture re-upload on the next frame.
        self.image.texture = None;
    }

    fn abort_image_fetch(&mut self) {
        if let Some(handle) = self.image.fetch_abort.take() {
            handle.abort();
        }
        self.image.fetch_rx = None;
    }

    /// Whether the analyze button should be clickable right now.
    pub fn can_analyze(&self) -> bool {
        self.image.enabled
            && !self.image.analyzing
            && self.image.loaded.is_some()
            && !self.image.question_input.trim().is_empty()
            && self.session.status == ConnectionStatus::Connected
    }
}

/// Rebuild a settings draft from a saved snapshot. Values that are not in
/// the preset lists come back as custom overrides.
pub fn draft_from_settings(settings: &TutorSettings) -> SettingsDraft {
    fn choice(value: &str, options: &[&str]) -> FieldChoice {
        if options.contains(&value) {
            FieldChoice::preset(value)
        } else {
            FieldChoice {
                selected: CUSTOM.into(),
                custom_text: value.to_string(),
            }
        }
    }
    SettingsDraft {
        subject: choice(&settings.subject, resolver::SUBJECTS),
        language: choice(&settings.language, resolver::LANGUAGES),
        level: choice(&settings.level, resolver::LEVELS),
        max_tokens: choice(&settings.max_tokens.to_string(), resolver::TOKEN_PRESETS),
        response_style: choice(&settings.response_style, resolver::STYLES),
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

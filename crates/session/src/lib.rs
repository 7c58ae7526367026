//! The chat-session core: a state machine over transport events and user
//! actions, expressed as pure handlers that return side-effect commands.
//!
//! Nothing in this crate touches a socket or a widget. The app owns one
//! [`SessionState`], feeds every `TransportEvent` through
//! [`dispatch::on_transport_event`] and every send attempt through
//! [`continuity`], then executes the returned [`Effect`]s. That keeps the
//! whole connection lifecycle deterministic and unit-testable.

pub mod assembler;
pub mod continuity;
pub mod dispatch;
pub mod effect;
pub mod resolver;
pub mod state;

pub use effect::{Effect, MessageId, NoticeLevel, StatusKind};
pub use state::{ConnectionStatus, InFlightResponse, PendingRequest, SessionState};

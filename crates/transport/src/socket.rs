//! The socket worker thread.
//!
//! Owns the WebSocket for its whole lifetime: connecting, retrying with a
//! fixed delay, pinging, and reading frames with a short poll timeout so
//! queued commands are serviced between reads. A server-initiated close is
//! terminal; the worker parks and waits for an explicit `Reconnect` (or
//! `Shutdown`) instead of retrying on its own.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tungstenite::client::connect_with_config;
use tungstenite::protocol::WebSocketConfig;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

use shared::protocol::{ClientEvent, ServerEvent};

use crate::error::TransportError;
use crate::wire;

type WsStream = WebSocket<MaybeTlsStream<TcpStream>>;

/// Connection parameters. All timers the worker uses are named here so they
/// can be tuned per deployment instead of living as magic constants.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Backend address, e.g. `ws://127.0.0.1:5000/ws`.
    pub url: String,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Keep-alive ping cadence while connected.
    pub ping_interval: Duration,
    /// Wait after a (re)connect before a replayed or forced send goes out,
    /// giving the backend a moment to finish its own connection setup.
    pub settle_delay: Duration,
    /// Granularity of the read poll; commands are serviced between polls.
    pub poll_timeout: Duration,
    /// Ceiling on a single inbound message.
    pub max_message_bytes: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".into(),
            reconnect_delay: Duration::from_secs(2),
            ping_interval: Duration::from_secs(15),
            settle_delay: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(200),
            max_message_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Instructions from the app to the worker.
#[derive(Debug)]
enum Command {
    Send(ClientEvent),
    SendAfterSettle(ClientEvent),
    Reconnect,
    Shutdown,
}

/// Everything the worker reports back to the app.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connection attempt is starting. `attempt` counts from 1 and resets
    /// on every successful connect.
    Connecting { attempt: u32 },
    Connected,
    /// The connection dropped at the transport level; the worker retries on
    /// its own.
    Dropped { reason: String },
    /// The server closed the connection deliberately. Terminal until an
    /// explicit reconnect.
    ClosedByServer,
    /// The connection could not be constructed at all (bad URL). Reported
    /// once; no retry.
    ConnectFailed { reason: String },
    /// A decoded application event from the backend.
    Server(ServerEvent),
}

/// Handle kept by the app. Dropping it shuts the worker down.
pub struct SocketHandle {
    commands: Sender<Command>,
    events: Receiver<TransportEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SocketHandle {
    /// Queue an event for immediate delivery.
    pub fn send(&self, event: ClientEvent) {
        let _ = self.commands.send(Command::Send(event));
    }

    /// Queue an event for delivery after the settle delay.
    pub fn send_after_settle(&self, event: ClientEvent) {
        let _ = self.commands.send(Command::SendAfterSettle(event));
    }

    /// Tear the connection down completely and connect fresh.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Non-blocking poll for the next transport event.
    pub fn poll(&self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Start the socket worker thread.
pub fn spawn(config: SocketConfig) -> SocketHandle {
    let (command_tx, command_rx) = channel();
    let (event_tx, event_rx) = channel();

    let worker = thread::Builder::new()
        .name("tutor-socket".into())
        .spawn(move || {
            Worker {
                config,
                commands: command_rx,
                events: event_tx,
            }
            .run();
        })
        .expect("failed to spawn socket worker thread");

    SocketHandle {
        commands: command_tx,
        events: event_rx,
        worker: Some(worker),
    }
}

/// Why the serve loop returned.
enum ServeExit {
    Shutdown,
    Reconnect,
    Dropped(String),
    ClosedByServer,
}

/// What ended a parked (terminal) state.
enum Parked {
    Reconnect,
    Shutdown,
}

struct Worker {
    config: SocketConfig,
    commands: Receiver<Command>,
    events: Sender<TransportEvent>,
}

impl Worker {
    fn run(mut self) {
        // A malformed URL can never connect; report once and park.
        if let Err(e) = url::Url::parse(&self.config.url) {
            let err = TransportError::BadUrl {
                url: self.config.url.clone(),
                reason: e.to_string(),
            };
            let _ = self.events.send(TransportEvent::ConnectFailed {
                reason: err.to_string(),
            });
            if matches!(self.park(), Parked::Shutdown) {
                return;
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let _ = self.events.send(TransportEvent::Connecting { attempt });

            let mut ws = match self.connect_once() {
                Ok(ws) => ws,
                Err(err) if err.is_fatal() => {
                    let _ = self.events.send(TransportEvent::ConnectFailed {
                        reason: err.to_string(),
                    });
                    match self.park() {
                        Parked::Reconnect => {
                            attempt = 0;
                            continue;
                        }
                        Parked::Shutdown => return,
                    }
                }
                Err(err) => {
                    debug!(attempt, error = %err, "connect attempt failed");
                    match self.wait_retry() {
                        Some(()) => continue,
                        None => return,
                    }
                }
            };

            info!(url = %self.config.url, "connected to backend");
            attempt = 0;
            let _ = self.events.send(TransportEvent::Connected);

            match self.serve(&mut ws) {
                ServeExit::Shutdown => {
                    let _ = ws.close(None);
                    return;
                }
                ServeExit::Reconnect => {
                    // Forced teardown: destroy the connection outright, then
                    // give the backend a settle period before reconnecting.
                    let _ = ws.close(None);
                    drop(ws);
                    thread::sleep(self.config.settle_delay);
                    continue;
                }
                ServeExit::Dropped(reason) => {
                    let _ = self.events.send(TransportEvent::Dropped { reason });
                    match self.wait_retry() {
                        Some(()) => continue,
                        None => return,
                    }
                }
                ServeExit::ClosedByServer => {
                    let _ = self.events.send(TransportEvent::ClosedByServer);
                    match self.park() {
                        Parked::Reconnect => {
                            attempt = 0;
                            continue;
                        }
                        Parked::Shutdown => return,
                    }
                }
            }
        }
    }

    fn connect_once(&self) -> Result<WsStream, TransportError> {
        let ws_config = WebSocketConfig {
            max_message_size: Some(self.config.max_message_bytes),
            max_frame_size: Some(self.config.max_message_bytes),
            ..Default::default()
        };
        let (ws, response) =
            connect_with_config(self.config.url.as_str(), Some(ws_config), 3)?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(ws)
    }

    /// Pump one live connection until it ends or a command ends it.
    fn serve(&mut self, ws: &mut WsStream) -> ServeExit {
        set_read_timeout(ws, self.config.poll_timeout);

        // Re-armed on every connect, so a stray duplicate connect can never
        // leave two ping timers running.
        let mut next_ping = Instant::now() + self.config.ping_interval;
        let mut settle_queue: Vec<(Instant, ClientEvent)> = Vec::new();

        loop {
            // Service commands before the next read poll so user sends are
            // not delayed behind idle socket reads.
            loop {
                match self.commands.try_recv() {
                    Ok(Command::Send(event)) => {
                        if let Err(exit) = self.write(ws, &event) {
                            return exit;
                        }
                    }
                    Ok(Command::SendAfterSettle(event)) => {
                        settle_queue.push((Instant::now() + self.config.settle_delay, event));
                    }
                    Ok(Command::Reconnect) => return ServeExit::Reconnect,
                    Ok(Command::Shutdown) => return ServeExit::Shutdown,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return ServeExit::Shutdown,
                }
            }

            let now = Instant::now();

            let due: Vec<ClientEvent> = {
                let mut due = Vec::new();
                settle_queue.retain_mut(|(deadline, event)| {
                    if *deadline <= now {
                        due.push(event.clone());
                        false
                    } else {
                        true
                    }
                });
                due
            };
            for event in due {
                if let Err(exit) = self.write(ws, &event) {
                    return exit;
                }
            }

            if now >= next_ping {
                next_ping = now + self.config.ping_interval;
                let ping = ClientEvent::Ping {
                    timestamp: chrono::Utc::now().timestamp_millis(),
                };
                if let Err(exit) = self.write(ws, &ping) {
                    return exit;
                }
            }

            match ws.read() {
                Ok(Message::Text(raw)) => match wire::decode(&raw) {
                    Ok(event) => {
                        let _ = self.events.send(TransportEvent::Server(event));
                    }
                    Err(err) => warn!(error = %err, "dropping undecodable frame"),
                },
                // The websocket layer answers protocol pings itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server sent close frame");
                    return ServeExit::ClosedByServer;
                }
                Ok(other) => debug!(?other, "ignoring non-text frame"),
                Err(WsError::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                    return ServeExit::ClosedByServer;
                }
                Err(err) => return ServeExit::Dropped(err.to_string()),
            }
        }
    }

    fn write(&self, ws: &mut WsStream, event: &ClientEvent) -> Result<(), ServeExit> {
        let payload = match wire::encode(event) {
            Ok(payload) => payload,
            Err(err) => {
                // An unencodable event is a local bug, not a connection
                // problem; log it and keep the connection.
                warn!(error = %err, "failed to encode outbound event");
                return Ok(());
            }
        };
        match ws.send(Message::Text(payload)) {
            Ok(()) => Ok(()),
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                Err(ServeExit::ClosedByServer)
            }
            Err(err) => Err(ServeExit::Dropped(err.to_string())),
        }
    }

    /// Sleep out the fixed retry delay, staying responsive to shutdown.
    /// Returns `None` when the worker should exit.
    fn wait_retry(&mut self) -> Option<()> {
        let deadline = Instant::now() + self.config.reconnect_delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Some(());
            }
            match self.commands.recv_timeout(remaining) {
                Ok(Command::Shutdown) => return None,
                Ok(Command::Reconnect) => return Some(()),
                // Sends while disconnected are dropped; the session layer
                // refuses them before they get here.
                Ok(other) => debug!(?other, "ignoring command while disconnected"),
                Err(RecvTimeoutError::Timeout) => return Some(()),
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Block in the terminal state until told to reconnect or shut down.
    fn park(&mut self) -> Parked {
        loop {
            match self.commands.recv() {
                Ok(Command::Reconnect) => {
                    thread::sleep(self.config.settle_delay);
                    return Parked::Reconnect;
                }
                Ok(Command::Shutdown) | Err(_) => return Parked::Shutdown,
                Ok(other) => debug!(?other, "ignoring command in terminal state"),
            }
        }
    }
}

fn set_read_timeout(ws: &WsStream, timeout: Duration) {
    if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
        let _ = stream.set_read_timeout(Some(timeout));
    }
}

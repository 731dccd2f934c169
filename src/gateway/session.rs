//! Gateway session lifecycle.
//!
//! One spawned task per session owns the transport, runs the heartbeat
//! timer and reconnects with backoff. It is the only writer of [`Session`].
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Authenticating ──► Ready
//!     ▲                │              │
//!     │                ▼              ▼
//!     └──────── Reconnecting ◄── (connection lost)
//!
//! any state ──► Closing ──► Closed
//! ```
//!
//! # Failure Policy
//!
//! | Failure | Handling |
//! |---------|----------|
//! | Handshake rejected (400/401/403) | fatal, no retry |
//! | Connect error, abnormal close, heartbeat timeout | reconnect after `attempt × base_delay` |
//! | Reconnect budget used up | fatal, surfaced once |
//! | Undecodable frame | logged, dropped |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep, timeout};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::client::GatewayOptions;
use crate::error::{Error, Result};
use crate::identifiers::UserId;
use crate::protocol::{ControlFrame, Frame, HEARTBEAT_PING, ReadyPayload, decode, decode_pong};
use crate::transport::{Connector, Inbound, Transport};

use super::backoff::ReconnectPolicy;
use super::dispatcher::EventDispatcher;
use super::events::Event;
use super::heartbeat::{HeartbeatAction, HeartbeatMonitor};

// ============================================================================
// Types
// ============================================================================

/// Heartbeat state of the current connection; `None` until ready.
type Heartbeat = Option<(HeartbeatMonitor, Interval)>;

// ============================================================================
// SessionStatus
// ============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Opening the socket.
    Connecting,
    /// Socket open, waiting for the ready frame.
    Authenticating,
    /// Ready; heartbeats running.
    Ready,
    /// Waiting before the next connection attempt.
    Reconnecting,
    /// Shutting down.
    Closing,
    /// Terminal.
    Closed,
}

impl SessionStatus {
    /// Returns `true` for the terminal state.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Snapshot of session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Heartbeat period from the last ready frame.
    pub heartbeat_interval: Option<Duration>,
    /// Time of the last ping.
    pub last_heartbeat_sent_at: Option<Instant>,
    /// Time of the last ack.
    pub last_heartbeat_ack_at: Option<Instant>,
    /// Consecutive reconnect attempts since the session was last ready.
    pub reconnect_attempt: u32,
    /// Reconnect budget; `None` is unbounded.
    pub max_reconnect_attempts: Option<u32>,
    /// The bot's own user id.
    pub self_user_id: Option<UserId>,
    /// Time the session last became ready.
    pub ready_at: Option<Instant>,
}

impl Session {
    fn new(max_reconnect_attempts: Option<u32>) -> Self {
        Self {
            status: SessionStatus::Connecting,
            heartbeat_interval: None,
            last_heartbeat_sent_at: None,
            last_heartbeat_ack_at: None,
            reconnect_attempt: 0,
            max_reconnect_attempts,
            self_user_id: None,
            ready_at: None,
        }
    }

    /// Time since the session became ready, while it is ready.
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        match (self.status, self.ready_at) {
            (SessionStatus::Ready, Some(ready_at)) => Some(ready_at.elapsed()),
            _ => None,
        }
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Commands for the session task.
enum SessionCommand {
    Close,
}

/// Handle to a running session.
///
/// Cloning is cheap; all clones control the same session. Dropping the
/// last clone closes the session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    uuid: Uuid,
    state: Arc<RwLock<Session>>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: watch::Receiver<bool>,
}

impl SessionHandle {
    fn new(
        uuid: Uuid,
        state: Arc<RwLock<Session>>,
        command_tx: mpsc::UnboundedSender<SessionCommand>,
        task: JoinHandle<()>,
        closed: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                uuid,
                state,
                command_tx,
                task: Mutex::new(Some(task)),
                closed,
            }),
        }
    }

    /// Returns the session's log tag.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.inner.uuid
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.read().status
    }

    /// Returns a copy of the session state.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.read().clone()
    }

    /// Returns the bot's own user id once ready.
    #[must_use]
    pub fn self_user_id(&self) -> Option<UserId> {
        self.inner.state.read().self_user_id.clone()
    }

    /// Time since the session became ready, while it is ready.
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        self.inner.state.read().uptime()
    }

    /// Returns `true` once the session is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status().is_closed()
    }

    /// Closes the session and waits for the task to finish.
    ///
    /// Cancels the heartbeat timer and any pending reconnect delay, then
    /// closes the socket. Concurrent callers all wait for the same
    /// shutdown; calling it after the session closed returns at once.
    pub async fn close(&self) {
        let _ = self.inner.command_tx.send(SessionCommand::Close);

        let task = self.inner.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(session = %self.inner.uuid, error = %e, "Session task failed");
        }

        // Another caller may hold the task; a dropped sender means it ended.
        let mut closed = self.inner.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("uuid", &self.inner.uuid)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionController
// ============================================================================

/// How a connection ended.
enum DriveOutcome {
    /// Closed on request.
    Closed,
    /// Lost; reconnect.
    Lost(Error),
}

/// Drives one gateway session.
pub struct SessionController {
    uuid: Uuid,
    connector: Arc<dyn Connector>,
    dispatcher: EventDispatcher,
    options: GatewayOptions,
    policy: ReconnectPolicy,
    state: Arc<RwLock<Session>>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    closed: watch::Sender<bool>,
    closing: bool,
}

impl SessionController {
    /// Opens a session and spawns its task.
    ///
    /// The first connection attempt runs before this returns. If it fails
    /// with a retriable error the task starts in the reconnect loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::Authentication`] if the gateway rejected the token
    pub async fn connect(
        connector: Arc<dyn Connector>,
        dispatcher: EventDispatcher,
        options: GatewayOptions,
    ) -> Result<SessionHandle> {
        options.validate()?;

        let uuid = Uuid::new_v4();
        let state = Arc::new(RwLock::new(Session::new(options.max_reconnect_attempts)));
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (closed, closed_rx) = watch::channel(false);

        let mut controller = Self {
            uuid,
            connector,
            dispatcher,
            policy: options.reconnect_policy(),
            options,
            state: Arc::clone(&state),
            commands,
            closed,
            closing: false,
        };

        info!(session = %uuid, "Connecting to gateway");

        let initial = match controller.open().await {
            Ok(transport) => Some(transport),
            Err(e) if e.is_fatal() => {
                error!(session = %uuid, error = %e, "Gateway rejected the session");
                controller.finish();
                return Err(e);
            }
            Err(e) => {
                warn!(session = %uuid, error = %e, "Initial gateway connection failed");
                controller.dispatcher.publish(Event::Disconnected { error: Arc::new(e) });
                None
            }
        };

        let task = tokio::spawn(controller.run(initial));
        Ok(SessionHandle::new(uuid, state, command_tx, task, closed_rx))
    }

    /// Session task body.
    async fn run(mut self, initial: Option<Box<dyn Transport>>) {
        let mut next = initial;

        loop {
            let transport = match next.take() {
                Some(transport) => transport,
                None => match self.reconnect().await {
                    Some(transport) => transport,
                    None => break,
                },
            };

            match self.drive(transport).await {
                DriveOutcome::Closed => break,
                DriveOutcome::Lost(error) => {
                    warn!(session = %self.uuid, error = %error, "Gateway connection lost");
                    self.dispatcher.publish(Event::Disconnected { error: Arc::new(error) });
                }
            }
        }

        self.finish();
    }

    // ========================================================================
    // Connecting
    // ========================================================================

    /// Opens one connection, honoring close requests.
    async fn open(&mut self) -> Result<Box<dyn Transport>> {
        self.set_status(SessionStatus::Connecting);
        let limit = self.options.connect_timeout;

        tokio::select! {
            result = timeout(limit, self.connector.connect()) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::connection_timeout(millis(limit))),
            },
            _ = self.commands.recv() => {
                self.begin_close();
                Err(Error::SessionClosed)
            }
        }
    }

    /// Waits out the backoff and reconnects.
    ///
    /// Returns `None` when closed or when the session stopped for good.
    async fn reconnect(&mut self) -> Option<Box<dyn Transport>> {
        loop {
            if self.closing {
                return None;
            }

            let failed = self.state.read().reconnect_attempt;
            let Some(delay) = self.policy.next_delay(failed) else {
                self.fail(Error::reconnect_exhausted(failed));
                return None;
            };

            let attempt = failed.saturating_add(1);
            {
                let mut state = self.state.write();
                state.status = SessionStatus::Reconnecting;
                state.reconnect_attempt = attempt;
            }
            info!(session = %self.uuid, attempt, delay_ms = millis(delay), "Reconnecting");
            self.dispatcher.publish(Event::Reconnecting { attempt, delay });

            tokio::select! {
                () = sleep(delay) => {}
                _ = self.commands.recv() => {
                    self.begin_close();
                    return None;
                }
            }

            match self.open().await {
                Ok(transport) => return Some(transport),
                Err(_) if self.closing => return None,
                Err(e) if e.is_fatal() => {
                    self.fail(e);
                    return None;
                }
                Err(e) => warn!(session = %self.uuid, attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }

    // ========================================================================
    // Connection Loop
    // ========================================================================

    /// Runs one connection until it is lost or closed.
    async fn drive(&mut self, mut transport: Box<dyn Transport>) -> DriveOutcome {
        self.set_status(SessionStatus::Authenticating);
        debug!(session = %self.uuid, "Socket open, waiting for ready frame");

        let ready_timeout = self.options.ready_timeout;
        let ready_deadline = sleep(ready_timeout);
        tokio::pin!(ready_deadline);
        let mut heartbeat: Heartbeat = None;

        loop {
            let awaiting_ready = heartbeat.is_none();

            let result = tokio::select! {
                _ = self.commands.recv() => {
                    self.begin_close();
                    transport.close().await;
                    return DriveOutcome::Closed;
                }
                inbound = transport.recv() => match inbound {
                    Some(Ok(Inbound::Text(text))) => {
                        self.handle_text(&text, transport.as_mut(), &mut heartbeat).await
                    }
                    Some(Ok(Inbound::Pong(payload))) => match decode_pong(&payload) {
                        Some(control) => {
                            self.handle_control(control, transport.as_mut(), &mut heartbeat).await
                        }
                        None => Ok(()),
                    },
                    Some(Ok(Inbound::Close { code, reason })) => Err(Error::connection(format!(
                        "Gateway closed the connection (code {code:?}): {reason}"
                    ))),
                    Some(Err(e)) => Err(e),
                    None => Err(Error::ConnectionClosed),
                },
                () = next_tick(&mut heartbeat) => {
                    self.on_tick(transport.as_mut(), &mut heartbeat).await
                }
                () = &mut ready_deadline, if awaiting_ready => {
                    Err(Error::connection_timeout(millis(ready_timeout)))
                }
            };

            if let Err(error) = result {
                transport.close().await;
                return DriveOutcome::Lost(error);
            }
        }
    }

    /// Handles one text frame. Undecodable frames are dropped.
    async fn handle_text(
        &mut self,
        text: &str,
        transport: &mut dyn Transport,
        heartbeat: &mut Heartbeat,
    ) -> Result<()> {
        match decode(text) {
            Ok(Some(Frame::Control(control))) => {
                self.handle_control(control, transport, heartbeat).await
            }
            Ok(Some(Frame::Domain(frame))) => {
                let self_user_id = self.state.read().self_user_id.clone();
                self.dispatcher.dispatch(frame, self_user_id.as_ref());
                Ok(())
            }
            Ok(None) => {
                trace!(session = %self.uuid, "Ignored frame");
                Ok(())
            }
            Err(e) => {
                debug!(session = %self.uuid, error = %e, "Dropped undecodable frame");
                Ok(())
            }
        }
    }

    async fn handle_control(
        &mut self,
        control: ControlFrame,
        transport: &mut dyn Transport,
        heartbeat: &mut Heartbeat,
    ) -> Result<()> {
        match control {
            ControlFrame::Ready(ready) => self.on_ready(ready, transport, heartbeat).await,
            ControlFrame::HeartbeatAck => {
                let now = Instant::now();
                if let Some((monitor, _)) = heartbeat.as_mut() {
                    monitor.on_ack(now);
                }
                self.state.write().last_heartbeat_ack_at = Some(now);
                trace!(session = %self.uuid, "Heartbeat acknowledged");
                Ok(())
            }
            ControlFrame::HeartbeatFailed => {
                warn!(session = %self.uuid, "Gateway rejected a heartbeat");
                Ok(())
            }
        }
    }

    /// Enters `Ready`: records the self user, pings, starts the timer.
    async fn on_ready(
        &mut self,
        ready: ReadyPayload,
        transport: &mut dyn Transport,
        heartbeat: &mut Heartbeat,
    ) -> Result<()> {
        let Some(user) = self.dispatcher.cache().ingest_raw(&ready.user, None) else {
            warn!(session = %self.uuid, "Ready frame without self user id");
            return Ok(());
        };

        let interval = ready.heartbeat_interval;
        let now = Instant::now();
        let mut monitor = HeartbeatMonitor::new(interval, self.options.heartbeat_grace);
        let mut ticker = interval_at(now + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let user_id = user.id();
        {
            let mut state = self.state.write();
            state.status = SessionStatus::Ready;
            state.heartbeat_interval = Some(interval);
            state.reconnect_attempt = 0;
            state.self_user_id = Some(user_id.clone());
            state.ready_at = Some(now);
            state.last_heartbeat_ack_at = None;
        }
        info!(session = %self.uuid, %user_id, heartbeat_ms = millis(interval), "Session ready");

        self.send_ping(transport, &mut monitor).await?;
        *heartbeat = Some((monitor, ticker));

        self.dispatcher.publish(Event::Ready {
            user,
            heartbeat_interval: interval,
        });
        Ok(())
    }

    /// Heartbeat tick: ping, or give up on the connection.
    async fn on_tick(&mut self, transport: &mut dyn Transport, heartbeat: &mut Heartbeat) -> Result<()> {
        let Some((monitor, _)) = heartbeat.as_mut() else {
            return Ok(());
        };

        match monitor.on_tick(Instant::now()) {
            HeartbeatAction::SendPing => self.send_ping(transport, monitor).await,
            HeartbeatAction::Timeout { elapsed, limit } => {
                warn!(
                    session = %self.uuid,
                    elapsed_ms = millis(elapsed),
                    limit_ms = millis(limit),
                    "Heartbeat ack overdue"
                );
                Err(Error::heartbeat_timeout(millis(elapsed), millis(limit)))
            }
        }
    }

    async fn send_ping(&mut self, transport: &mut dyn Transport, monitor: &mut HeartbeatMonitor) -> Result<()> {
        transport.send_ping(HEARTBEAT_PING.as_bytes().to_vec()).await?;

        let now = Instant::now();
        monitor.on_ping_sent(now);
        self.state.write().last_heartbeat_sent_at = Some(now);
        trace!(session = %self.uuid, "Heartbeat sent");
        Ok(())
    }

    // ========================================================================
    // State
    // ========================================================================

    fn set_status(&self, status: SessionStatus) {
        let previous = std::mem::replace(&mut self.state.write().status, status);
        if previous != status {
            debug!(session = %self.uuid, from = %previous, to = %status, "Session status changed");
        }
    }

    fn begin_close(&mut self) {
        self.closing = true;
        self.set_status(SessionStatus::Closing);
    }

    /// Stops for good and surfaces `error`.
    fn fail(&mut self, error: Error) {
        error!(session = %self.uuid, error = %error, "Session stopped");
        self.closing = true;
        self.set_status(SessionStatus::Closing);
        self.dispatcher.publish(Event::Fatal {
            error: Arc::new(error),
        });
    }

    fn finish(&mut self) {
        self.set_status(SessionStatus::Closed);
        info!(session = %self.uuid, "Session closed");
        self.dispatcher.publish(Event::Closed);
        self.closed.send_replace(true);
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("uuid", &self.uuid)
            .field("options", &self.options)
            .field("closing", &self.closing)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves on the next heartbeat tick; never resolves before ready.
async fn next_tick(heartbeat: &mut Heartbeat) {
    match heartbeat {
        Some((_, ticker)) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::cache::IdentityCache;
    use crate::client::SessionRef;
    use crate::gateway::{Dispatch, EventKind};
    use crate::transport::mock::MockConnector;

    fn dispatcher() -> (EventDispatcher, mpsc::UnboundedReceiver<Dispatch>) {
        let dispatcher = EventDispatcher::new(IdentityCache::new(), SessionRef::detached());
        let (_, events) = dispatcher.stream(None);
        (dispatcher, events)
    }

    /// Collects events until the dispatcher is gone.
    async fn drain(events: &mut mpsc::UnboundedReceiver<Dispatch>) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Some(dispatch) = events.recv().await {
            seen.push(dispatch.event);
        }
        seen
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(Event::kind).collect()
    }

    async fn wait_for(events: &mut mpsc::UnboundedReceiver<Dispatch>, kind: EventKind) -> Event {
        loop {
            let dispatch = events.recv().await.expect("event stream ended");
            if dispatch.kind() == kind {
                return dispatch.event;
            }
        }
    }

    fn message_event(author: &str, content: &str) -> serde_json::Value {
        json!({
            "message": {
                "id": "M1",
                "content": content,
                "createdBy": author,
                "channelId": "C1",
                "serverId": "S1",
                "createdAt": "2020-01-01T00:00:00Z"
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_then_message_end_to_end() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 5000);
        remote.send_event("ChatMessageCreated", message_event("U1", "hi"));

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");

        let Event::Ready { user, heartbeat_interval } = wait_for(&mut events, EventKind::Ready).await else {
            panic!("expected ready");
        };
        assert_eq!(user.id(), UserId::new("B1"));
        assert_eq!(heartbeat_interval, Duration::from_millis(5000));

        let event = wait_for(&mut events, EventKind::MessageCreated).await;
        let message = event.message().expect("message");
        assert_eq!(message.content, "hi");
        assert_eq!(message.author_id(), Some(UserId::new("U1")));

        let session = handle.snapshot();
        assert_eq!(session.status, SessionStatus::Ready);
        assert_eq!(session.self_user_id, Some(UserId::new("B1")));
        assert!(session.last_heartbeat_sent_at.is_some());
        assert!(handle.uptime().is_some());

        handle.close().await;
        assert_eq!(handle.status(), SessionStatus::Closed);
        assert!(remote.is_closed());
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_and_unknown_frames_are_not_dispatched() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);
        remote.send_event("SomethingNew", json!({}));
        remote.send_text("{not json");
        remote.send_event("ChatMessageCreated", message_event("B1", "echo"));
        remote.send_event("ChatMessageCreated", message_event("U1", "hello"));

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");

        let event = wait_for(&mut events, EventKind::MessageCreated).await;
        assert_eq!(event.message().map(|m| m.content.as_str()), Some("hello"));
        assert_eq!(handle.status(), SessionStatus::Ready);

        handle.close().await;
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_heartbeat_ack_forces_reconnect() {
        let connector = MockConnector::new();
        let mut first = connector.push_ok(false);
        first.send_ready("B1", 10_000);
        let second = connector.push_ok(true);
        second.send_ready("B1", 10_000);

        let (dispatcher, mut events) = dispatcher();
        let start = Instant::now();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");

        let Event::Disconnected { error } = wait_for(&mut events, EventKind::Disconnected).await else {
            panic!("expected disconnect");
        };
        let elapsed = start.elapsed();
        assert!(matches!(*error, Error::HeartbeatTimeout { .. }), "{error}");
        assert!(elapsed >= Duration::from_millis(12_500), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(20_000), "{elapsed:?}");
        assert!(first.is_closed());
        assert_eq!(first.ping_count(), 2);

        let Event::Reconnecting { attempt, delay } = wait_for(&mut events, EventKind::Reconnecting).await else {
            panic!("expected reconnecting");
        };
        assert_eq!((attempt, delay), (1, Duration::from_millis(5000)));

        wait_for(&mut events, EventKind::Ready).await;
        assert_eq!(handle.snapshot().reconnect_attempt, 0);
        assert_eq!(connector.attempts(), 2);

        handle.close().await;
        assert!(second.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acked_heartbeats_keep_session_alive() {
        let connector = MockConnector::new();
        let mut remote = connector.push_ok(true);
        remote.send_ready("B1", 1000);

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");
        wait_for(&mut events, EventKind::Ready).await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(handle.status(), SessionStatus::Ready);
        assert!(remote.ping_count() >= 10);
        assert!(handle.snapshot().last_heartbeat_ack_at.is_some());

        handle.close().await;
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_then_exhaustion_is_fatal_once() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);
        remote.hang_up();

        let (dispatcher, mut events) = dispatcher();
        let options = GatewayOptions::new().with_max_reconnect_attempts(3);
        let handle = SessionController::connect(connector.clone(), dispatcher, options)
            .await
            .expect("connect");

        let start = Instant::now();
        let seen = drain(&mut events).await;
        let elapsed = start.elapsed();

        assert_eq!(
            kinds(&seen),
            vec![
                EventKind::Ready,
                EventKind::Disconnected,
                EventKind::Reconnecting,
                EventKind::Reconnecting,
                EventKind::Reconnecting,
                EventKind::Fatal,
                EventKind::Closed,
            ]
        );

        let delays: Vec<(u32, Duration)> = seen
            .iter()
            .filter_map(|event| match event {
                Event::Reconnecting { attempt, delay } => Some((*attempt, *delay)),
                _ => None,
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                (1, Duration::from_secs(5)),
                (2, Duration::from_secs(10)),
                (3, Duration::from_secs(15)),
            ]
        );

        let fatal = seen.iter().find_map(|event| match event {
            Event::Fatal { error } => Some(Arc::clone(error)),
            _ => None,
        });
        assert!(matches!(fatal.as_deref(), Some(Error::ReconnectExhausted { attempts: 3 })));

        assert!(elapsed >= Duration::from_secs(30), "{elapsed:?}");
        assert_eq!(connector.attempts(), 4);
        assert_eq!(handle.status(), SessionStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_is_fatal_without_retry() {
        let connector = MockConnector::new();
        connector.push_err(Error::authentication(401));

        let (dispatcher, mut events) = dispatcher();
        let err = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(connector.attempts(), 1);
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_during_reconnect_stops() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);
        remote.fail("connection reset");
        connector.push_err(Error::authentication(403));

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");

        let seen = drain(&mut events).await;
        assert_eq!(
            kinds(&seen),
            vec![
                EventKind::Ready,
                EventKind::Disconnected,
                EventKind::Reconnecting,
                EventKind::Fatal,
                EventKind::Closed,
            ]
        );
        assert!(matches!(
            seen.get(3),
            Some(Event::Fatal { error }) if error.is_authentication()
        ));
        assert_eq!(connector.attempts(), 2);
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_transport_failure_retries() {
        let connector = MockConnector::new();
        connector.push_err(Error::connection("refused"));
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("retriable failure still yields a session");

        wait_for(&mut events, EventKind::Ready).await;
        assert_eq!(connector.attempts(), 2);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_reconnect() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);
        remote.hang_up();

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");
        wait_for(&mut events, EventKind::Reconnecting).await;
        assert_eq!(handle.status(), SessionStatus::Reconnecting);

        let start = Instant::now();
        handle.close().await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(handle.status(), SessionStatus::Closed);
        assert_eq!(connector.attempts(), 1);
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);

        // Closing twice is harmless.
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_close_waits_for_shutdown() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");
        wait_for(&mut events, EventKind::Ready).await;

        let other = handle.clone();
        let (first, second) = tokio::join!(
            async {
                handle.close().await;
                handle.status()
            },
            async {
                other.close().await;
                other.status()
            },
        );

        assert_eq!(first, SessionStatus::Closed);
        assert_eq!(second, SessionStatus::Closed);
        assert!(remote.is_closed());
        assert_eq!(kinds(&drain(&mut events).await), vec![EventKind::Closed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_ready_frame_times_out() {
        let connector = MockConnector::new();
        let _remote = connector.push_ok(true);

        let (dispatcher, mut events) = dispatcher();
        let options = GatewayOptions::new()
            .with_ready_timeout(Duration::from_secs(1))
            .with_max_reconnect_attempts(0);
        let handle = SessionController::connect(connector.clone(), dispatcher, options)
            .await
            .expect("connect");

        let seen = drain(&mut events).await;
        assert_eq!(
            kinds(&seen),
            vec![EventKind::Disconnected, EventKind::Fatal, EventKind::Closed]
        );
        assert!(handle.is_closed());
        assert!(matches!(
            seen.first(),
            Some(Event::Disconnected { error }) if matches!(**error, Error::ConnectionTimeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_close_frame_is_retriable() {
        let connector = MockConnector::new();
        let remote = connector.push_ok(true);
        remote.send_ready("B1", 30_000);
        remote.send_close(1006);

        let (dispatcher, mut events) = dispatcher();
        let handle = SessionController::connect(connector.clone(), dispatcher, GatewayOptions::new())
            .await
            .expect("connect");

        let Event::Disconnected { error } = wait_for(&mut events, EventKind::Disconnected).await else {
            panic!("expected disconnect");
        };
        assert!(error.is_retriable());
        wait_for(&mut events, EventKind::Reconnecting).await;
        handle.close().await;
    }
}

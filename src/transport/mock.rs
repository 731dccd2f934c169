//! Scripted in-memory transport for tests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

use super::socket::{Connector, Inbound, Transport};

// ============================================================================
// MockConnector
// ============================================================================

/// What the remote end pushes into a mock connection.
enum MockFrame {
    Frame(Inbound),
    Error(String),
    End,
}

/// Connector that replays scripted connection outcomes in order.
///
/// Once the script runs out, every attempt fails with a retriable error.
#[derive(Default)]
pub(crate) struct MockConnector {
    plans: Mutex<VecDeque<Result<MockTransport>>>,
    attempts: AtomicUsize,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts a successful connection and returns its remote end.
    ///
    /// With `auto_pong`, every ping is answered with a pong echoing it.
    pub(crate) fn push_ok(&self, auto_pong: bool) -> MockRemote {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ping_tx, ping_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let transport = MockTransport {
            inbound: rx,
            echo: auto_pong.then(|| tx.clone()),
            pings: ping_tx,
            closed: Arc::clone(&closed),
        };
        self.plans.lock().push_back(Ok(transport));

        MockRemote {
            tx,
            pings: ping_rx,
            seen_pings: 0,
            closed,
        }
    }

    /// Scripts a failed connection attempt.
    pub(crate) fn push_err(&self, err: Error) {
        self.plans.lock().push_back(Err(err));
    }

    /// Makes the next connection attempt wait until the sender fires.
    pub(crate) fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock() = Some(rx);
        tx
    }

    /// Number of connection attempts made so far.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let plan = self.plans.lock().pop_front();
        match plan {
            Some(Ok(transport)) => Ok(Box::new(transport)),
            Some(Err(err)) => Err(err),
            None => Err(Error::connection("connection refused")),
        }
    }
}

// ============================================================================
// MockTransport
// ============================================================================

pub(crate) struct MockTransport {
    inbound: mpsc::UnboundedReceiver<MockFrame>,
    echo: Option<mpsc::UnboundedSender<MockFrame>>,
    pings: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<Result<Inbound>> {
        match self.inbound.recv().await? {
            MockFrame::Frame(inbound) => Some(Ok(inbound)),
            MockFrame::Error(message) => Some(Err(Error::connection(message))),
            MockFrame::End => None,
        }
    }

    async fn send_ping(&mut self, payload: Vec<u8>) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        if let Some(echo) = &self.echo {
            let _ = echo.send(MockFrame::Frame(Inbound::Pong(payload.clone())));
        }
        let _ = self.pings.send(payload);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// MockRemote
// ============================================================================

/// The gateway side of a scripted connection.
pub(crate) struct MockRemote {
    tx: mpsc::UnboundedSender<MockFrame>,
    pings: mpsc::UnboundedReceiver<Vec<u8>>,
    seen_pings: usize,
    closed: Arc<AtomicBool>,
}

impl MockRemote {
    pub(crate) fn send_text(&self, text: impl Into<String>) {
        let _ = self.tx.send(MockFrame::Frame(Inbound::Text(text.into())));
    }

    pub(crate) fn send_ready(&self, user_id: &str, heartbeat_interval_ms: u64) {
        let frame = json!({
            "op": 1,
            "d": {
                "user": { "id": user_id, "name": "bot", "type": "bot" },
                "heartbeatIntervalMs": heartbeat_interval_ms
            }
        });
        self.send_text(frame.to_string());
    }

    pub(crate) fn send_event(&self, event_type: &str, data: Value) {
        self.send_text(json!({ "t": event_type, "d": data }).to_string());
    }

    pub(crate) fn send_close(&self, code: u16) {
        let _ = self.tx.send(MockFrame::Frame(Inbound::Close {
            code: Some(code),
            reason: String::new(),
        }));
    }

    pub(crate) fn fail(&self, message: &str) {
        let _ = self.tx.send(MockFrame::Error(message.to_string()));
    }

    pub(crate) fn hang_up(&self) {
        let _ = self.tx.send(MockFrame::End);
    }

    /// Total pings the client has sent on this connection.
    pub(crate) fn ping_count(&mut self) -> usize {
        while self.pings.try_recv().is_ok() {
            self.seen_pings += 1;
        }
        self.seen_pings
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

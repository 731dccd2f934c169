//! Gateway frame decoding.
//!
//! Every inbound text frame is JSON in one of two shapes:
//!
//! | Shape | Format | Meaning |
//! |-------|--------|---------|
//! | Control | `{"op": 1, "d": {...}}` | session ready / heartbeat |
//! | Domain | `{"t": "<EventType>", "d": {...}}` | business event |
//!
//! Heartbeat pings go out as WebSocket pings carrying `{"op":1,"d":null}`;
//! the gateway answers with a pong carrying the same opcode, or opcode 8
//! when the heartbeat was not accepted.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

use super::event_type::EventType;

// ============================================================================
// Constants
// ============================================================================

/// Opcode reserved for session-ready and heartbeat frames.
pub const HEARTBEAT_OPCODE: u64 = 1;

/// Opcode the gateway uses to reject a heartbeat.
pub const HEARTBEAT_FAILED_OPCODE: u64 = 8;

/// Payload carried by outbound heartbeat pings.
pub const HEARTBEAT_PING: &str = r#"{"op":1,"d":null}"#;

// ============================================================================
// Frame Types
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Session or heartbeat control frame.
    Control(ControlFrame),
    /// Named business event.
    Domain(DomainFrame),
}

/// Session and heartbeat control payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame {
    /// The session is authenticated and ready.
    Ready(ReadyPayload),
    /// A heartbeat was acknowledged.
    HeartbeatAck,
    /// The gateway rejected a heartbeat.
    HeartbeatFailed,
}

/// Contents of the session-ready control frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyPayload {
    /// Raw self user object.
    pub user: Value,
    /// Heartbeat period requested by the gateway.
    pub heartbeat_interval: Duration,
    /// The whole `d` object.
    pub raw: Value,
}

/// A domain event frame with a recognized type.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainFrame {
    /// Event type from `t`.
    pub event_type: EventType,
    /// Event payload from `d`.
    pub data: Value,
}

/// Envelope shared by all frames.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    op: Option<u64>,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Value,
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one inbound text frame.
///
/// Returns `Ok(None)` for frames that carry nothing to act on, including
/// domain frames with an unrecognized event type.
///
/// # Errors
///
/// [`Error::Decode`] if the frame is not JSON or a control frame is
/// malformed. Callers drop the frame and keep the session running.
pub fn decode(text: &str) -> Result<Option<Frame>> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| Error::decode(format!("invalid frame JSON: {e}")))?;

    match raw.op {
        Some(HEARTBEAT_OPCODE) => return decode_control(raw.d).map(|c| Some(Frame::Control(c))),
        Some(HEARTBEAT_FAILED_OPCODE) => return Ok(Some(Frame::Control(ControlFrame::HeartbeatFailed))),
        _ => {}
    }

    let Some(name) = raw.t else {
        return Ok(None);
    };

    Ok(EventType::from_wire(&name).map(|event_type| {
        Frame::Domain(DomainFrame {
            event_type,
            data: raw.d,
        })
    }))
}

/// Decodes the payload of a WebSocket pong.
///
/// An empty payload is a plain acknowledgement. Returns `None` for payloads
/// that are not heartbeat frames.
#[must_use]
pub fn decode_pong(payload: &[u8]) -> Option<ControlFrame> {
    if payload.is_empty() {
        return Some(ControlFrame::HeartbeatAck);
    }

    let raw: RawFrame = serde_json::from_slice(payload).ok()?;
    match raw.op {
        Some(HEARTBEAT_OPCODE) => Some(ControlFrame::HeartbeatAck),
        Some(HEARTBEAT_FAILED_OPCODE) => Some(ControlFrame::HeartbeatFailed),
        _ => None,
    }
}

/// Interprets the `d` of an opcode-1 frame.
fn decode_control(data: Value) -> Result<ControlFrame> {
    if data.is_null() {
        return Ok(ControlFrame::HeartbeatAck);
    }

    let user = data
        .get("user")
        .filter(|user| user.is_object())
        .cloned()
        .ok_or_else(|| Error::decode("ready frame without user"))?;

    let interval_ms = data
        .get("heartbeatIntervalMs")
        .and_then(Value::as_u64)
        .filter(|ms| *ms > 0)
        .ok_or_else(|| Error::decode("ready frame without positive heartbeatIntervalMs"))?;

    Ok(ControlFrame::Ready(ReadyPayload {
        user,
        heartbeat_interval: Duration::from_millis(interval_ms),
        raw: data,
    }))
}

// ============================================================================
// Tests
// ============================================================================

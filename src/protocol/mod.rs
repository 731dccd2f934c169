//! Gateway wire protocol.
//!
//! This module turns inbound gateway text frames into typed values.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | Ready (`op` 1) | Gateway → Client | Session authenticated, heartbeat period |
//! | Heartbeat ping | Client → Gateway | WebSocket ping carrying `{"op":1,"d":null}` |
//! | Heartbeat pong | Gateway → Client | `op` 1 ack, or `op` 8 failure |
//! | Domain (`t`) | Gateway → Client | Business event payload |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event_type` | Recognized domain event names |
//! | `frame` | Frame types and decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Recognized domain event names.
pub mod event_type;

/// Frame types and decoding.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use event_type::EventType;
pub use frame::{
    ControlFrame, DomainFrame, Frame, HEARTBEAT_PING, ReadyPayload, decode, decode_pong,
};

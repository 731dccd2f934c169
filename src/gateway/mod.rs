//! Gateway session, heartbeat and event dispatch.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Connection lifecycle and reconnect loop |
//! | [`heartbeat`] | Ping/ack bookkeeping |
//! | [`backoff`] | Reconnect delay policy |
//! | [`dispatcher`] | Frame-to-event routing and subscriptions |
//! | [`events`] | Event types delivered to subscribers |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay policy.
pub mod backoff;

/// Frame-to-event routing and subscriptions.
pub mod dispatcher;

/// Event types.
pub mod events;

/// Heartbeat bookkeeping.
pub mod heartbeat;

/// Session lifecycle.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::ReconnectPolicy;
pub use dispatcher::{EventDispatcher, EventHandler};
pub use events::{Dispatch, Event, EventKind};
pub use heartbeat::{HeartbeatAction, HeartbeatMonitor};
pub use session::{Session, SessionController, SessionHandle, SessionStatus};

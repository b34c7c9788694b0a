//! Cross-context call bridge.
//!
//! The application context cannot touch real geometry; a privileged context
//! can. Calls cross over as JSON text tagged with an id and come back as a
//! response carrying the same id.
//!
//! - [`protocol`]: request/response wire messages.
//! - [`CrossContextBridge`]: issues calls, matches responses, enforces
//!   deadlines and cancellation.
//! - [`ContextHost`] / [`ActionHandler`]: the privileged side.
//! - [`LayoutHost`]: a taffy-backed handler answering `measure`.

pub mod call;
pub mod host;
pub mod layout;
pub mod protocol;

pub use call::{connect, BridgeConfig, CrossContextBridge, HostEndpoint, PendingCall, ResponseInbox};
pub use host::{ActionHandler, ContextHost};
pub use layout::{LayoutError, LayoutHost, MEASURE_ACTION};
pub use protocol::{Request, Response};

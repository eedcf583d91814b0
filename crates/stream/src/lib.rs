//! Ghost-cell completion streaming for notebook editors.
//!
//! Edits flow one way and suggestions the other:
//!
//! ```text
//! editor ─▶ ChangeEventSource ─▶ Coordinator ─▶ RequestBuilder ─▶ RequestQueue ─▶ Transport ─▶ service
//! editor ◀─ ResponseApplier ◀──────────────────────────────────────────────────── Transport ◀─ service
//! ```
//!
//! * [`ChangeEventSource`] resolves edited cells to `(notebook, block)` pairs.
//! * [`Coordinator`] debounces per notebook and decides between a
//!   full-context request and an incremental update.
//! * [`RequestBuilder`] shapes payloads; [`NotebookRequestBuilder`] is the
//!   default.
//! * [`Transport`] owns the single NDJSON connection.
//! * [`ResponseApplier`] shows suggestions as ghost blocks;
//!   [`GhostApplier`] is the default.
//! * [`SessionManager`] tags requests and rotates the session on demand.
//!
//! [`GhostStream`] wires all of it together.

#![warn(missing_docs)]

pub mod applier;
pub mod builder;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod session;
pub mod source;
mod stream;
pub mod transport;

pub use applier::{GhostApplier, NoopApplier, ResponseApplier};
pub use builder::{BuildContext, NotebookRequestBuilder, RequestBuilder, SessionDirective};
pub use config::{DEFAULT_RESET_MARKER, GhostConfig};
pub use coordinator::{Coordinator, CoordinatorStats, DEBOUNCE};
pub use error::{ConfigError, Error, Result};
pub use event::ChangeEvent;
pub use session::{SESSION_ID_LEN, SessionId, SessionIdSource, SessionManager, UlidSource};
pub use source::{ChangeEventSource, HostNotification, Subscription};
pub use stream::GhostStream;
pub use transport::{CloseReason, RequestQueue, Transport, TransportEvent, TransportObserver};

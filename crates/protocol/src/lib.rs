//! Wire protocol for the ghost-cell completion stream.
//!
//! The stream is a single long-lived, order-preserving bidirectional
//! connection. Each direction carries one JSON object per line:
//! * [`OutboundRequest`]: editor to completion service, either a full
//!   document snapshot or an incremental update of the active block
//! * [`InboundResponse`]: completion service to editor, the speculative
//!   blocks to show for one document
//!
//! [`Codec`] abstracts the framing so the transport stays agnostic of it;
//! [`JsonLines`] is the framing used in practice.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{Codec, JsonLines, MAX_LINE_BYTES};
pub use error::{ProtocolError, Result};
pub use message::{BlockContent, BlockKind, InboundResponse, OutboundRequest, RequestBody, RequestKind, Trigger, WireBlock, WireDocument};

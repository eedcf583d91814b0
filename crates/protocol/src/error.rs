//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding, decoding or validating stream messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
	/// The underlying stream failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// A line could not be decoded into the expected message.
	#[error("malformed message: {0}")]
	Decode(#[source] serde_json::Error),

	/// An outbound message could not be serialized.
	#[error("failed to encode message: {0}")]
	Encode(#[source] serde_json::Error),

	/// A line exceeded the framing limit and was discarded.
	#[error("message exceeds {limit} bytes")]
	TooLong {
		/// Configured limit in bytes.
		limit: usize,
	},

	/// A message decoded but violates a protocol invariant.
	#[error("invalid message: {0}")]
	Invalid(String),
}

impl ProtocolError {
	/// Returns true when the stream is still usable after this error.
	///
	/// Per-message failures leave the framing intact, so the reader can skip
	/// the offending line and keep going. I/O and encode failures cannot be
	/// recovered on the same connection.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::Decode(_) | Self::TooLong { .. } | Self::Invalid(_))
	}
}

/// Result alias for protocol operations.
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

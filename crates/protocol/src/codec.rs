//! Message framing for the completion stream.

use std::future::Future;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ProtocolError, Result};

/// Default upper bound for a single framed line (4 MiB).
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Binding between the transport and a concrete wire format.
pub trait Codec: Send + 'static {
	/// Messages read from the peer.
	type Inbound: Send + 'static;

	/// Messages written to the peer.
	type Outbound: Send + Sync + 'static;

	/// Reads the next complete message.
	///
	/// Returns `Ok(None)` on a clean end of stream. Errors for which
	/// [`ProtocolError::is_recoverable`] holds leave the stream positioned at
	/// the next message.
	fn read_message(&mut self, input: &mut (impl AsyncBufRead + Unpin + Send)) -> impl Future<Output = Result<Option<Self::Inbound>>> + Send;

	/// Writes one message and flushes it.
	fn write_message(&mut self, output: &mut (impl AsyncWrite + Unpin + Send), msg: &Self::Outbound) -> impl Future<Output = Result<()>> + Send;
}

/// Newline-delimited JSON framing.
///
/// `In` is the type decoded from the peer, `Out` the type encoded to it, so
/// the editor side uses `JsonLines<InboundResponse, OutboundRequest>` and a
/// service uses the mirror image.
pub struct JsonLines<In, Out> {
	buf: Vec<u8>,
	max_line: usize,
	_marker: PhantomData<fn() -> (In, Out)>,
}

impl<In, Out> std::fmt::Debug for JsonLines<In, Out> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JsonLines").field("max_line", &self.max_line).finish()
	}
}

impl<In, Out> Default for JsonLines<In, Out> {
	fn default() -> Self {
		Self::new()
	}
}

impl<In, Out> JsonLines<In, Out> {
	/// Creates a codec with the default line limit.
	pub fn new() -> Self {
		Self::with_max_line(MAX_LINE_BYTES)
	}

	/// Creates a codec that rejects lines longer than `max_line` bytes.
	pub fn with_max_line(max_line: usize) -> Self {
		Self {
			buf: Vec::new(),
			max_line,
			_marker: PhantomData,
		}
	}
}

enum LineRead {
	Line,
	Eof,
	TooLong,
}

/// Reads up to and including the next `\n`, keeping at most `limit` bytes.
///
/// Overlong lines are consumed in full but not buffered.
async fn read_line_bounded(input: &mut (impl AsyncBufRead + Unpin + Send), buf: &mut Vec<u8>, limit: usize) -> Result<LineRead> {
	let mut overflow = false;
	loop {
		let available = input.fill_buf().await?;
		if available.is_empty() {
			return Ok(if overflow {
				LineRead::TooLong
			} else if buf.is_empty() {
				LineRead::Eof
			} else {
				LineRead::Line
			});
		}

		let newline = available.iter().position(|&b| b == b'\n');
		let take = newline.map_or(available.len(), |pos| pos + 1);
		if !overflow {
			if buf.len() + take > limit.saturating_add(1) {
				overflow = true;
				buf.clear();
			} else {
				buf.extend_from_slice(&available[..take]);
			}
		}
		input.consume(take);

		if newline.is_some() {
			return Ok(if overflow { LineRead::TooLong } else { LineRead::Line });
		}
	}
}

impl<In, Out> Codec for JsonLines<In, Out>
where
	In: DeserializeOwned + Send + 'static,
	Out: Serialize + Send + Sync + 'static,
{
	type Inbound = In;
	type Outbound = Out;

	fn read_message(&mut self, input: &mut (impl AsyncBufRead + Unpin + Send)) -> impl Future<Output = Result<Option<In>>> + Send {
		async move {
			loop {
				self.buf.clear();
				match read_line_bounded(input, &mut self.buf, self.max_line).await? {
					LineRead::Eof => return Ok(None),
					LineRead::TooLong => return Err(ProtocolError::TooLong { limit: self.max_line }),
					LineRead::Line => {}
				}

				let line = self.buf.trim_ascii();
				if line.is_empty() {
					continue;
				}
				return serde_json::from_slice(line).map(Some).map_err(ProtocolError::Decode);
			}
		}
	}

	fn write_message(&mut self, output: &mut (impl AsyncWrite + Unpin + Send), msg: &Out) -> impl Future<Output = Result<()>> + Send {
		async move {
			let mut bytes = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
			bytes.push(b'\n');
			output.write_all(&bytes).await?;
			output.flush().await?;
			tracing::trace!(bytes = bytes.len(), "ghost.codec.write");
			Ok(())
		}
	}
}

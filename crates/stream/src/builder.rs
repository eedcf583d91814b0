//! Request construction policy.
//!
//! The coordinator decides *when* to send; a [`RequestBuilder`] decides
//! *what*. Builders are pure: everything they may consult arrives in the
//! [`BuildContext`], and their only effect is the returned value.

use ghostline_notebook::{Block, NotebookSnapshot};
use ghostline_protocol::{RequestBody, WireDocument};
use tracing::{debug, trace};

use crate::config::GhostConfig;
use crate::event::ChangeEvent;
use crate::session::SessionId;

/// Whether the coordinator should start a new session before building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDirective {
	/// Keep the current session.
	Continue,
	/// Rotate the session and send a full-context request.
	Rotate,
}

/// Inputs available to a [`RequestBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
	/// The settled event the request is for.
	pub event: &'a ChangeEvent,
	/// Whether this request must establish context.
	pub first_request: bool,
	/// Notebook content at flush time.
	pub snapshot: &'a NotebookSnapshot,
	/// Session the request will be tagged with.
	pub session_id: &'a SessionId,
	/// Active-block content carried by the last request sent for this
	/// notebook, if that request targeted the same block.
	pub last_sent: Option<&'a str>,
}

impl BuildContext<'_> {
	/// The block the event points at, if it still exists.
	pub fn active_block(&self) -> Option<&Block> {
		self.snapshot.block(self.event.block_index)
	}
}

/// Policy turning settled change events into request payloads.
pub trait RequestBuilder: Send + 'static {
	/// Asks for a session rotation before [`build_request`](Self::build_request).
	fn session_directive(&self, ctx: &BuildContext<'_>) -> SessionDirective {
		let _ = ctx;
		SessionDirective::Continue
	}

	/// Builds the payload, or returns `None` to send nothing.
	///
	/// Must return [`RequestBody::FullContext`] when `ctx.first_request`
	/// holds and [`RequestBody::Update`] otherwise.
	fn build_request(&self, ctx: &BuildContext<'_>) -> Option<RequestBody>;
}

/// Default builder for notebook documents.
#[derive(Debug, Clone)]
pub struct NotebookRequestBuilder {
	reset_marker: String,
	max_snapshot_blocks: Option<usize>,
}

impl Default for NotebookRequestBuilder {
	fn default() -> Self {
		Self::new(&GhostConfig::default())
	}
}

impl NotebookRequestBuilder {
	/// Creates a builder from configuration.
	pub fn new(config: &GhostConfig) -> Self {
		Self {
			reset_marker: config.reset_marker.clone(),
			max_snapshot_blocks: config.max_snapshot_blocks,
		}
	}

	fn full_context(&self, snapshot: &NotebookSnapshot, index: usize) -> Option<RequestBody> {
		let selected = snapshot.accepted_position(index)?;
		let (blocks, selected_index) = trim_window(snapshot.to_wire().blocks, selected, self.max_snapshot_blocks);
		Some(RequestBody::FullContext {
			document: WireDocument { blocks },
			selected_index,
			document_uri: snapshot.document.to_string(),
		})
	}
}

impl RequestBuilder for NotebookRequestBuilder {
	/// Rotates when the reset marker first shows up in the active block.
	fn session_directive(&self, ctx: &BuildContext<'_>) -> SessionDirective {
		let Some(block) = ctx.active_block() else {
			return SessionDirective::Continue;
		};
		let marked = block.content.contains(&self.reset_marker);
		let already_sent = ctx.last_sent.is_some_and(|sent| sent.contains(&self.reset_marker));
		if marked && !already_sent {
			SessionDirective::Rotate
		} else {
			SessionDirective::Continue
		}
	}

	fn build_request(&self, ctx: &BuildContext<'_>) -> Option<RequestBody> {
		let index = ctx.event.block_index;
		let Some(block) = ctx.active_block() else {
			debug!(document = %ctx.event.document, index, "ghost.builder.block_not_found");
			return None;
		};
		if block.is_ghost() {
			trace!(document = %ctx.event.document, index, "ghost.builder.skip_ghost");
			return None;
		}

		if ctx.first_request {
			return self.full_context(ctx.snapshot, index);
		}

		if ctx.last_sent == Some(block.content.as_str()) {
			trace!(document = %ctx.event.document, index, "ghost.builder.duplicate");
			return None;
		}
		Some(RequestBody::Update {
			block_id: block.id.0.clone(),
			block_content: block.content.clone(),
		})
	}
}

/// Keeps at most `max` items, centred on `selected` where possible.
///
/// Returns the kept items and the position of `selected` among them.
fn trim_window<T>(mut items: Vec<T>, selected: usize, max: Option<usize>) -> (Vec<T>, usize) {
	let Some(max) = max.filter(|&max| max > 0 && items.len() > max) else {
		return (items, selected);
	};
	let start = selected.saturating_sub(max / 2).min(items.len() - max);
	items.truncate(start + max);
	items.drain(..start);
	(items, selected - start)
}

#[cfg(test)]
mod tests;

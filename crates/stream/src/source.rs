//! Editor notifications into coordinator events.
//!
//! The editor reports edits per cell. [`ChangeEventSource`] maps each cell
//! back to its notebook through [`NotebookHost::resolve_cell`] and forwards
//! resolved edits to the [`Coordinator`]. It never edits documents itself;
//! focus changes are passed to the applier for promotion and close
//! notifications to every component keeping per-notebook state.

use std::sync::Arc;

use ghostline_notebook::{CellResolution, DocumentId, NotebookHost};
use ghostline_protocol::Trigger;
use ghostline_worker::TaskClass;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::applier::ResponseApplier;
use crate::coordinator::Coordinator;
use crate::event::ChangeEvent;

/// Notifications the editor feeds into the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotification {
	/// Text of a cell changed.
	TextChanged {
		/// URI of the edited cell.
		cell_uri: String,
		/// What caused the change.
		trigger: Trigger,
	},
	/// The user activated a cell.
	CellFocused {
		/// URI of the focused cell.
		cell_uri: String,
	},
	/// A notebook was closed.
	NotebookClosed {
		/// The closed notebook.
		document: DocumentId,
	},
}

impl HostNotification {
	/// A typed edit in `cell_uri`.
	pub fn text_changed(cell_uri: impl Into<String>) -> Self {
		Self::TextChanged {
			cell_uri: cell_uri.into(),
			trigger: Trigger::TextChange,
		}
	}
}

/// Resolves editor notifications and routes them.
#[derive(Clone)]
pub struct ChangeEventSource {
	host: Arc<dyn NotebookHost>,
	coordinator: Coordinator,
	applier: Arc<dyn ResponseApplier>,
	enabled: bool,
}

impl std::fmt::Debug for ChangeEventSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChangeEventSource").field("enabled", &self.enabled).finish_non_exhaustive()
	}
}

impl ChangeEventSource {
	/// Creates a source. When `enabled` is false, edits are dropped.
	pub fn new(host: Arc<dyn NotebookHost>, coordinator: Coordinator, applier: Arc<dyn ResponseApplier>, enabled: bool) -> Self {
		Self {
			host,
			coordinator,
			applier,
			enabled,
		}
	}

	/// Routes one notification synchronously.
	pub fn handle(&self, notification: HostNotification) {
		match notification {
			HostNotification::TextChanged { cell_uri, trigger } => self.text_changed(&cell_uri, trigger),
			HostNotification::CellFocused { cell_uri } => {
				if let CellResolution::Resolved { document, block_index } = self.host.resolve_cell(&cell_uri) {
					self.applier.promote(&document, block_index);
				}
			}
			HostNotification::NotebookClosed { document } => {
				debug!(document = %document, "ghost.source.notebook_closed");
				self.applier.document_closed(&document);
				if self.coordinator.document_closed(document).is_err() {
					trace!("ghost.source.closed_after_dispose");
				}
			}
		}
	}

	fn text_changed(&self, cell_uri: &str, trigger: Trigger) {
		if !self.enabled {
			return;
		}
		match self.host.resolve_cell(cell_uri) {
			CellResolution::Resolved { document, block_index } => {
				let event = ChangeEvent {
					document,
					block_index,
					trigger,
				};
				if self.coordinator.submit(event).is_err() {
					trace!(cell = cell_uri, "ghost.source.event_after_dispose");
				}
			}
			CellResolution::Orphaned { document } => {
				warn!(cell = cell_uri, document = %document, "ghost.source.notebook_not_found");
			}
			CellResolution::Untracked => trace!(cell = cell_uri, "ghost.source.untracked"),
		}
	}

	/// Consumes `feed` on a background task until it ends or the returned
	/// [`Subscription`] is dropped.
	pub fn spawn(self, mut feed: mpsc::UnboundedReceiver<HostNotification>) -> Subscription {
		let cancel = CancellationToken::new();
		let token = cancel.clone();
		let task = ghostline_worker::spawn(TaskClass::Background, "ghost.source", async move {
			loop {
				tokio::select! {
					biased;
					_ = token.cancelled() => break,
					next = feed.recv() => match next {
						Some(notification) => self.handle(notification),
						None => break,
					},
				}
			}
			debug!("ghost.source.stopped");
		});
		Subscription { cancel, task: Some(task) }
	}
}

/// Live notification feed. Dropping it stops the feed.
#[derive(Debug)]
pub struct Subscription {
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl Subscription {
	/// Stops the feed without waiting.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns true once the feed has been stopped.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Stops the feed and waits for its task to finish.
	pub async fn unsubscribe(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take()
			&& let Err(err) = task.await
		{
			tracing::error!(error = %err, "ghost.source.task_panicked");
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests;

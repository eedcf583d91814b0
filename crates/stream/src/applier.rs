//! Ghost-block application policy.
//!
//! A [`ResponseApplier`] turns inbound responses into notebook edits. The
//! default [`GhostApplier`] replaces all ghost blocks of the targeted
//! notebook with the response blocks in one atomic edit, so applying the same
//! response twice leaves the notebook exactly as applying it once.

use std::collections::HashMap;
use std::sync::Arc;

use ghostline_notebook::{BlockEdit, DocumentId, HostError, NotebookEdit, NotebookHost};
use ghostline_protocol::InboundResponse;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

/// Policy applying streamed responses to notebooks.
pub trait ResponseApplier: Send + Sync + 'static {
	/// Shows the response blocks as ghost content in the named notebook.
	fn apply_response(&self, response: InboundResponse);

	/// Accepts the ghost block at `block_index`: the ghost marker is cleared
	/// in place and the content stays as it is.
	fn promote(&self, document: &DocumentId, block_index: usize);

	/// Forgets per-notebook bookkeeping once the notebook is closed.
	fn document_closed(&self, document: &DocumentId) {
		let _ = document;
	}
}

/// Applier that ignores everything, for running the coordinator headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopApplier;

impl ResponseApplier for NoopApplier {
	fn apply_response(&self, response: InboundResponse) {
		trace!(document = response.document_uri.as_str(), "ghost.applier.noop");
	}

	fn promote(&self, _document: &DocumentId, _block_index: usize) {}
}

/// Default applier writing ghost blocks through a [`NotebookHost`].
///
/// When a response echoes a request `seq`, responses older than the newest
/// one already applied to the same notebook are dropped.
pub struct GhostApplier {
	host: Arc<dyn NotebookHost>,
	applied_seq: Mutex<HashMap<DocumentId, u64>>,
}

impl std::fmt::Debug for GhostApplier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GhostApplier").field("tracked", &self.applied_seq.lock().len()).finish()
	}
}

impl GhostApplier {
	/// Creates an applier editing notebooks through `host`.
	pub fn new(host: Arc<dyn NotebookHost>) -> Self {
		Self {
			host,
			applied_seq: Mutex::new(HashMap::new()),
		}
	}

	fn is_stale(&self, document: &DocumentId, seq: Option<u64>) -> bool {
		let Some(seq) = seq else {
			return false;
		};
		self.applied_seq.lock().get(document).is_some_and(|&applied| seq < applied)
	}

	fn record_seq(&self, document: &DocumentId, seq: Option<u64>) {
		if let Some(seq) = seq {
			let mut applied = self.applied_seq.lock();
			let entry = applied.entry(document.clone()).or_insert(seq);
			*entry = (*entry).max(seq);
		}
	}
}

/// Plans the edit replacing every ghost block with the response blocks.
///
/// The host locates ghost blocks when the edit applies, so the plan holds no
/// block positions that a concurrent user edit could invalidate.
pub(crate) fn plan_ghost_edit(response: &InboundResponse) -> NotebookEdit {
	let mut edit = NotebookEdit::new();
	edit.push(BlockEdit::ReplaceGhosts {
		insert_at: response.insert_at,
		blocks: response.blocks.clone(),
	});
	edit
}

impl ResponseApplier for GhostApplier {
	fn apply_response(&self, response: InboundResponse) {
		if let Err(err) = response.validate() {
			warn!(error = %err, "ghost.applier.malformed_response");
			return;
		}
		let document = DocumentId::new(&response.document_uri);

		if self.is_stale(&document, response.seq) {
			debug!(document = %document, seq = response.seq, "ghost.applier.stale_response");
			return;
		}

		match self.host.apply_edit(&document, plan_ghost_edit(&response)) {
			Ok(()) => {
				debug!(
					document = %document,
					insert_at = response.insert_at,
					blocks = response.blocks.len(),
					seq = response.seq,
					"ghost.applier.applied"
				);
				self.record_seq(&document, response.seq);
			}
			Err(HostError::DocumentNotFound(_)) => debug!(document = %document, "ghost.applier.document_not_open"),
			Err(err) => warn!(document = %document, error = %err, "ghost.applier.edit_failed"),
		}
	}

	fn promote(&self, document: &DocumentId, block_index: usize) {
		let Some(snapshot) = self.host.snapshot(document) else {
			debug!(document = %document, "ghost.applier.promote_document_not_open");
			return;
		};
		let Some(block) = snapshot.block(block_index) else {
			debug!(document = %document, block_index, "ghost.applier.promote_block_not_found");
			return;
		};
		if !block.is_ghost() {
			return;
		}

		let mut edit = NotebookEdit::new();
		edit.push(BlockEdit::SetGhost {
			index: block_index,
			ghost: false,
		});
		match self.host.apply_edit(document, edit) {
			Ok(()) => debug!(document = %document, block_index, "ghost.applier.promoted"),
			Err(err) => warn!(document = %document, block_index, error = %err, "ghost.applier.promote_failed"),
		}
	}

	fn document_closed(&self, document: &DocumentId) {
		self.applied_seq.lock().remove(document);
	}
}

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::{BlockId, DocumentId, NotebookEdit, NotebookSnapshot};

/// Errors reported by the editor host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
	/// The notebook is not open.
	#[error("document not open: {0}")]
	DocumentNotFound(DocumentId),

	/// An edit addressed a block position that does not exist.
	#[error("block index {index} out of range (len {len})")]
	BlockOutOfRange {
		/// Offending index.
		index: usize,
		/// Notebook length at the time of the edit.
		len: usize,
	},

	/// The host refused the edit for its own reasons.
	#[error("edit rejected: {0}")]
	Rejected(String),
}

/// Outcome of mapping an edited cell back to its notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellResolution {
	/// The edited text does not belong to a tracked notebook.
	Untracked,
	/// The cell belongs to an open notebook at `block_index`.
	Resolved {
		/// Owning notebook.
		document: DocumentId,
		/// Position of the cell in the notebook.
		block_index: usize,
	},
	/// The cell claims a notebook (or position) that is no longer open.
	///
	/// Editors emit these for stale cells during teardown.
	Orphaned {
		/// Notebook the cell claimed to belong to.
		document: DocumentId,
	},
}

/// Capabilities the completion stream consumes from the editor.
///
/// Implementations must apply a [`NotebookEdit`] atomically: observers see
/// either the notebook before the batch or after it, never in between.
pub trait NotebookHost: Send + Sync + 'static {
	/// Maps a cell (sub-document) URI to its notebook and block index.
	fn resolve_cell(&self, cell_uri: &str) -> CellResolution;

	/// Returns the current content of an open notebook.
	fn snapshot(&self, document: &DocumentId) -> Option<NotebookSnapshot>;

	/// Returns the identity of the block currently at `index`.
	fn block_id(&self, document: &DocumentId, index: usize) -> Option<BlockId> {
		self.snapshot(document)?.block(index).map(|block| block.id.clone())
	}

	/// Applies a batch of block edits to one notebook.
	fn apply_edit(&self, document: &DocumentId, edit: NotebookEdit) -> Result<(), HostError>;
}

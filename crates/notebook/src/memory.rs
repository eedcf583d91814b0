use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ghostline_protocol::BlockContent;
use parking_lot::RwLock;

use crate::{Block, BlockId, CellResolution, DocumentId, HostError, NotebookEdit, NotebookHost, NotebookSnapshot};

#[derive(Debug)]
struct Notebook {
	blocks: Vec<Block>,
	revision: u64,
}

/// Editor-less [`NotebookHost`].
///
/// Cell URIs have the form `<notebook-uri>#<block-id>`; anything without a
/// fragment is treated as a plain, untracked document.
#[derive(Debug, Default)]
pub struct InMemoryHost {
	docs: RwLock<HashMap<DocumentId, Notebook>>,
	next_block: AtomicU64,
}

impl InMemoryHost {
	/// Creates a host with no open notebooks.
	pub fn new() -> Self {
		Self::default()
	}

	fn mint(&self) -> BlockId {
		BlockId(format!("b{}", self.next_block.fetch_add(1, Ordering::Relaxed) + 1))
	}

	/// Opens (or replaces) a notebook with the given blocks.
	pub fn open(&self, uri: &str, blocks: impl IntoIterator<Item = BlockContent>) -> DocumentId {
		let document = DocumentId::new(uri);
		let blocks = blocks.into_iter().map(|content| Block::from_content(self.mint(), content)).collect();
		self.docs.write().insert(document.clone(), Notebook { blocks, revision: 0 });
		tracing::debug!(document = %document, "ghost.host.open");
		document
	}

	/// Closes a notebook. Returns false if it was not open.
	pub fn close(&self, document: &DocumentId) -> bool {
		self.docs.write().remove(document).is_some()
	}

	/// Returns true if the notebook is open.
	pub fn is_open(&self, document: &DocumentId) -> bool {
		self.docs.read().contains_key(document)
	}

	/// Replaces the text of one block, as a user edit would.
	pub fn set_content(&self, document: &DocumentId, index: usize, text: impl Into<String>) -> Result<(), HostError> {
		let mut docs = self.docs.write();
		let notebook = docs.get_mut(document).ok_or_else(|| HostError::DocumentNotFound(document.clone()))?;
		let len = notebook.blocks.len();
		let block = notebook.blocks.get_mut(index).ok_or(HostError::BlockOutOfRange { index, len })?;
		block.content = text.into();
		notebook.revision += 1;
		Ok(())
	}

	/// Returns a copy of the notebook's blocks.
	pub fn blocks(&self, document: &DocumentId) -> Option<Vec<Block>> {
		self.docs.read().get(document).map(|nb| nb.blocks.clone())
	}

	/// Number of mutations applied to the notebook since it was opened.
	pub fn revision(&self, document: &DocumentId) -> Option<u64> {
		self.docs.read().get(document).map(|nb| nb.revision)
	}

	/// Returns the cell URI of the block at `index`.
	pub fn cell_uri(&self, document: &DocumentId, index: usize) -> Option<String> {
		let docs = self.docs.read();
		let block = docs.get(document)?.blocks.get(index)?;
		Some(format!("{}#{}", document, block.id))
	}
}

impl NotebookHost for InMemoryHost {
	fn resolve_cell(&self, cell_uri: &str) -> CellResolution {
		let Some((uri, block_id)) = cell_uri.rsplit_once('#') else {
			return CellResolution::Untracked;
		};
		let document = DocumentId::new(uri);
		let docs = self.docs.read();
		let position = docs.get(&document).and_then(|nb| nb.blocks.iter().position(|b| b.id.0 == block_id));
		match position {
			Some(block_index) => CellResolution::Resolved { document, block_index },
			None => CellResolution::Orphaned { document },
		}
	}

	fn snapshot(&self, document: &DocumentId) -> Option<NotebookSnapshot> {
		let docs = self.docs.read();
		docs.get(document).map(|nb| NotebookSnapshot {
			document: document.clone(),
			blocks: nb.blocks.clone(),
		})
	}

	fn block_id(&self, document: &DocumentId, index: usize) -> Option<BlockId> {
		self.docs.read().get(document)?.blocks.get(index).map(|block| block.id.clone())
	}

	fn apply_edit(&self, document: &DocumentId, edit: NotebookEdit) -> Result<(), HostError> {
		let mut docs = self.docs.write();
		let notebook = docs.get_mut(document).ok_or_else(|| HostError::DocumentNotFound(document.clone()))?;
		notebook.blocks = edit.apply(&notebook.blocks, || self.mint())?;
		notebook.revision += 1;
		tracing::trace!(document = %document, edits = edit.edits.len(), revision = notebook.revision, "ghost.host.apply_edit");
		Ok(())
	}
}

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ghostline_protocol::{BlockContent, BlockKind, WireBlock, WireDocument};

/// Metadata key marking a block as ghost (speculative, not yet accepted).
pub const GHOST_METADATA_KEY: &str = "ghostline.ghost";

/// Identity of an open notebook: its URI.
///
/// Responses from the completion service name their target by URI, so the
/// URI doubles as the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
	/// Creates an id from a notebook URI.
	pub fn new(uri: impl AsRef<str>) -> Self {
		Self(Arc::from(uri.as_ref()))
	}

	/// Returns the notebook URI.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for DocumentId {
	fn from(uri: &str) -> Self {
		Self::new(uri)
	}
}

/// Stable identity of a block, independent of its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId(pub String);

impl fmt::Display for BlockId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// One notebook block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	/// Stable identity.
	pub id: BlockId,
	/// Code or markup.
	pub kind: BlockKind,
	/// Block text.
	pub content: String,
	/// Language of a code block, when known.
	pub language_id: Option<String>,
	/// Hidden per-block attributes.
	pub metadata: BTreeMap<String, String>,
}

impl Block {
	/// Creates a block from service-produced content.
	pub fn from_content(id: BlockId, content: BlockContent) -> Self {
		Self {
			id,
			kind: content.kind,
			content: content.content,
			language_id: content.language_id,
			metadata: BTreeMap::new(),
		}
	}

	/// Returns true when the block carries the ghost marker.
	pub fn is_ghost(&self) -> bool {
		self.metadata.get(GHOST_METADATA_KEY).is_some_and(|v| v == "true")
	}

	/// Sets or clears the ghost marker. Content is never touched.
	pub fn set_ghost(&mut self, ghost: bool) {
		if ghost {
			self.metadata.insert(GHOST_METADATA_KEY.to_string(), "true".to_string());
		} else {
			self.metadata.remove(GHOST_METADATA_KEY);
		}
	}

	/// Converts the block into its wire form.
	pub fn to_wire(&self) -> WireBlock {
		WireBlock {
			id: self.id.0.clone(),
			kind: self.kind,
			content: self.content.clone(),
			language_id: self.language_id.clone(),
		}
	}
}

/// Point-in-time copy of a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookSnapshot {
	/// Notebook the snapshot was taken from.
	pub document: DocumentId,
	/// Blocks in document order, ghost blocks included.
	pub blocks: Vec<Block>,
}

impl NotebookSnapshot {
	/// Returns the block at `index`.
	pub fn block(&self, index: usize) -> Option<&Block> {
		self.blocks.get(index)
	}

	/// Current position of the block with identity `id`.
	pub fn position(&self, id: &BlockId) -> Option<usize> {
		self.blocks.iter().position(|block| &block.id == id)
	}

	/// Indices of all ghost blocks in ascending order.
	pub fn ghost_indices(&self) -> Vec<usize> {
		self.blocks.iter().enumerate().filter(|(_, b)| b.is_ghost()).map(|(i, _)| i).collect()
	}

	/// Number of blocks the user owns (ghost blocks excluded).
	pub fn accepted_len(&self) -> usize {
		self.blocks.iter().filter(|b| !b.is_ghost()).count()
	}

	/// Maps a raw block index to its position among non-ghost blocks.
	///
	/// Returns `None` if the index is out of range or names a ghost block.
	pub fn accepted_position(&self, index: usize) -> Option<usize> {
		let block = self.blocks.get(index)?;
		if block.is_ghost() {
			return None;
		}
		Some(self.blocks[..index].iter().filter(|b| !b.is_ghost()).count())
	}

	/// Wire form of the non-ghost blocks.
	pub fn to_wire(&self) -> WireDocument {
		WireDocument {
			blocks: self.blocks.iter().filter(|b| !b.is_ghost()).map(Block::to_wire).collect(),
		}
	}
}

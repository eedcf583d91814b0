use ghostline_protocol::BlockContent;

use crate::{Block, BlockId, HostError};

/// A single block-level mutation.
///
/// Indices refer to the notebook as it stands after all preceding edits of
/// the same batch have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEdit {
	/// Deletes the block at `index`.
	Remove {
		/// Block position.
		index: usize,
	},
	/// Inserts `blocks` before position `index` (`index == len` appends).
	Insert {
		/// Insertion position.
		index: usize,
		/// Blocks to insert, in order.
		blocks: Vec<BlockContent>,
		/// Whether the inserted blocks carry the ghost marker.
		ghost: bool,
	},
	/// Sets or clears the ghost marker of the block at `index`.
	SetGhost {
		/// Block position.
		index: usize,
		/// New marker state.
		ghost: bool,
	},
	/// Removes every ghost block present when the edit applies, then inserts
	/// `blocks` as ghosts before non-ghost position `insert_at`.
	///
	/// `insert_at` is clamped to the number of remaining blocks. Ghosts are
	/// found at apply time, so the edit stays correct when the notebook moved
	/// since the caller last looked at it.
	ReplaceGhosts {
		/// Insertion position among non-ghost blocks.
		insert_at: usize,
		/// Blocks to insert, in order.
		blocks: Vec<BlockContent>,
	},
}

/// Batch of block edits applied atomically to one notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookEdit {
	/// Edits in application order.
	pub edits: Vec<BlockEdit>,
}

impl NotebookEdit {
	/// Creates an empty batch.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an edit.
	pub fn push(&mut self, edit: BlockEdit) {
		self.edits.push(edit);
	}

	/// Returns true when the batch contains no edits.
	pub fn is_empty(&self) -> bool {
		self.edits.is_empty()
	}

	/// Applies the batch to a copy of `blocks`.
	///
	/// Either every edit applies and the new block list is returned, or the
	/// first failing edit is reported and `blocks` is left as it was.
	/// `mint` supplies identities for inserted blocks.
	pub fn apply(&self, blocks: &[Block], mut mint: impl FnMut() -> BlockId) -> Result<Vec<Block>, HostError> {
		let mut next = blocks.to_vec();
		for edit in &self.edits {
			match edit {
				BlockEdit::Remove { index } => {
					if *index >= next.len() {
						return Err(HostError::BlockOutOfRange { index: *index, len: next.len() });
					}
					next.remove(*index);
				}
				BlockEdit::Insert { index, blocks, ghost } => {
					if *index > next.len() {
						return Err(HostError::BlockOutOfRange { index: *index, len: next.len() });
					}
					let inserted = blocks.iter().cloned().map(|content| {
						let mut block = Block::from_content(mint(), content);
						block.set_ghost(*ghost);
						block
					});
					next.splice(*index..*index, inserted);
				}
				BlockEdit::SetGhost { index, ghost } => {
					let len = next.len();
					let block = next.get_mut(*index).ok_or(HostError::BlockOutOfRange { index: *index, len })?;
					block.set_ghost(*ghost);
				}
				BlockEdit::ReplaceGhosts { insert_at, blocks } => {
					next.retain(|block| !block.is_ghost());
					let index = (*insert_at).min(next.len());
					let inserted = blocks.iter().cloned().map(|content| {
						let mut block = Block::from_content(mint(), content);
						block.set_ghost(true);
						block
					});
					next.splice(index..index, inserted);
				}
			}
		}
		Ok(next)
	}
}

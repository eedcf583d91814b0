//! Change events fed into the coordinator.

use ghostline_notebook::DocumentId;
use ghostline_protocol::Trigger;

/// A resolved edit inside a tracked notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
	/// Notebook that changed.
	pub document: DocumentId,
	/// Position of the edited block.
	pub block_index: usize,
	/// What caused the change.
	pub trigger: Trigger,
}

impl ChangeEvent {
	/// Creates a text-change event.
	pub fn text_change(document: DocumentId, block_index: usize) -> Self {
		Self {
			document,
			block_index,
			trigger: Trigger::TextChange,
		}
	}

	/// Creates a manually triggered event.
	pub fn manual(document: DocumentId, block_index: usize) -> Self {
		Self {
			document,
			block_index,
			trigger: Trigger::Manual,
		}
	}
}

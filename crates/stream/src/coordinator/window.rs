use ghostline_notebook::BlockId;
use tokio::time::Instant;

use crate::event::ChangeEvent;

/// Where a document stands within the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowPhase {
	/// Nothing sent yet, or context was lost. The next request is full-context.
	Idle,
	/// A full-context request has been sent for the active block.
	First,
	/// At least one update followed the full-context request.
	Steady,
}

/// Per-document debounce window.
#[derive(Debug)]
pub(crate) struct DocumentWindow {
	/// Identity of the block being edited. Positions shift when blocks are
	/// inserted above it; the identity does not.
	pub active_block: Option<BlockId>,
	pub phase: WindowPhase,
	/// Latest unsent event; earlier ones are superseded.
	pending: Option<ChangeEvent>,
	deadline: Option<Instant>,
	/// Set on block switch, cleared once a request is sent.
	force_first: bool,
	/// Session generation the last request was sent under.
	session_generation: Option<u64>,
	/// Active-block content of the last request sent.
	last_sent: Option<String>,
}

impl DocumentWindow {
	pub fn new() -> Self {
		Self {
			active_block: None,
			phase: WindowPhase::Idle,
			pending: None,
			deadline: None,
			force_first: false,
			session_generation: None,
			last_sent: None,
		}
	}

	/// Records an event on `block` and (re)arms the deadline.
	///
	/// Returns true when an unsent event was superseded.
	pub fn observe(&mut self, event: ChangeEvent, block: BlockId, deadline: Instant) -> bool {
		if self.active_block.as_ref() != Some(&block) {
			self.active_block = Some(block);
			self.force_first = true;
			self.last_sent = None;
		}
		self.deadline = Some(deadline);
		self.pending.replace(event).is_some()
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Takes the pending event once its deadline has passed.
	pub fn take_due(&mut self, now: Instant) -> Option<ChangeEvent> {
		if self.deadline.is_none_or(|deadline| deadline > now) {
			return None;
		}
		self.deadline = None;
		self.pending.take()
	}

	/// Whether the next request must carry full context under `generation`.
	pub fn needs_first(&self, generation: u64) -> bool {
		self.force_first || self.phase == WindowPhase::Idle || self.session_generation != Some(generation)
	}

	pub fn last_sent(&self) -> Option<&str> {
		self.last_sent.as_deref()
	}

	pub fn mark_sent(&mut self, full_context: bool, generation: u64, content: Option<String>) {
		self.phase = if full_context { WindowPhase::First } else { WindowPhase::Steady };
		self.force_first = false;
		self.session_generation = Some(generation);
		self.last_sent = content;
	}

	/// Drops established context. Pending events stay armed.
	pub fn reset(&mut self) {
		self.phase = WindowPhase::Idle;
		self.session_generation = None;
		self.last_sent = None;
	}
}

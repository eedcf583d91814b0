//! Message types exchanged over the completion stream.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// What caused an outbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
	/// The user edited a block.
	#[default]
	TextChange,
	/// The user explicitly asked for a completion.
	Manual,
}

impl Trigger {
	/// Returns the wire name of this trigger.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TextChange => "textChange",
			Self::Manual => "manual",
		}
	}
}

/// Kind of a notebook block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
	/// Executable code.
	Code,
	/// Prose (markdown).
	Markup,
}

/// Content of one block as produced by the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContent {
	/// Block kind.
	pub kind: BlockKind,
	/// Block text.
	pub content: String,
	/// Language of a code block, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub language_id: Option<String>,
}

impl BlockContent {
	/// Creates a code block.
	pub fn code(content: impl Into<String>) -> Self {
		Self {
			kind: BlockKind::Code,
			content: content.into(),
			language_id: None,
		}
	}

	/// Creates a markup block.
	pub fn markup(content: impl Into<String>) -> Self {
		Self {
			kind: BlockKind::Markup,
			content: content.into(),
			language_id: None,
		}
	}

	/// Sets the language of this block.
	pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
		self.language_id = Some(language_id.into());
		self
	}
}

/// A block as sent inside a full-context snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBlock {
	/// Stable block identifier assigned by the editor.
	pub id: String,
	/// Block kind.
	pub kind: BlockKind,
	/// Block text.
	pub content: String,
	/// Language of a code block, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub language_id: Option<String>,
}

/// Full document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDocument {
	/// Blocks in document order.
	pub blocks: Vec<WireBlock>,
}

/// Payload of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RequestBody {
	/// Establishes context: the whole document plus the block being edited.
	#[serde(rename_all = "camelCase")]
	FullContext {
		/// Document snapshot.
		document: WireDocument,
		/// Index of the active block inside `document`.
		selected_index: usize,
		/// URI of the notebook.
		document_uri: String,
	},
	/// Incremental update of the active block.
	#[serde(rename_all = "camelCase")]
	Update {
		/// Stable identifier of the edited block.
		block_id: String,
		/// Current block text.
		block_content: String,
	},
}

/// Discriminant of [`RequestBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// [`RequestBody::FullContext`].
	FullContext,
	/// [`RequestBody::Update`].
	Update,
}

impl RequestKind {
	/// Returns the wire tag of this kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::FullContext => "fullContext",
			Self::Update => "update",
		}
	}
}

impl RequestBody {
	/// Returns the discriminant of this payload.
	pub const fn kind(&self) -> RequestKind {
		match self {
			Self::FullContext { .. } => RequestKind::FullContext,
			Self::Update { .. } => RequestKind::Update,
		}
	}
}

/// One message from the editor to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRequest {
	/// Full-context or update payload.
	#[serde(flatten)]
	pub body: RequestBody,
	/// Session the request belongs to.
	pub session_id: String,
	/// What caused the request.
	pub trigger: Trigger,
	/// Per-stream sequence number, strictly increasing in send order.
	pub seq: u64,
}

impl OutboundRequest {
	/// Returns the payload kind.
	pub const fn kind(&self) -> RequestKind {
		self.body.kind()
	}

	/// Returns true for a full-context request.
	pub const fn is_full_context(&self) -> bool {
		matches!(self.body, RequestBody::FullContext { .. })
	}
}

/// One message from the completion service to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundResponse {
	/// Notebook the suggestion targets.
	pub document_uri: String,
	/// Insertion index into the notebook, ghost blocks excluded.
	pub insert_at: usize,
	/// Suggested blocks.
	pub blocks: Vec<BlockContent>,
	/// Sequence number of the request this answers, when the service echoes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub seq: Option<u64>,
}

impl InboundResponse {
	/// Checks invariants serde cannot express.
	pub fn validate(&self) -> Result<()> {
		if self.document_uri.trim().is_empty() {
			return Err(ProtocolError::Invalid("empty documentUri".into()));
		}
		Ok(())
	}
}

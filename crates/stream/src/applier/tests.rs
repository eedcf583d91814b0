use std::sync::atomic::{AtomicBool, Ordering};

use ghostline_notebook::{CellResolution, InMemoryHost, NotebookSnapshot};
use ghostline_protocol::BlockContent;
use pretty_assertions::assert_eq;

use super::*;

fn setup(blocks: &[&str]) -> (Arc<InMemoryHost>, GhostApplier, DocumentId) {
	let host = Arc::new(InMemoryHost::new());
	let doc = host.open("doc-A", blocks.iter().map(|text| BlockContent::code(*text)));
	let applier = GhostApplier::new(host.clone());
	(host, applier, doc)
}

fn response(uri: &str, insert_at: usize, blocks: &[&str], seq: Option<u64>) -> InboundResponse {
	InboundResponse {
		document_uri: uri.into(),
		insert_at,
		blocks: blocks.iter().map(|text| BlockContent::code(*text)).collect(),
		seq,
	}
}

fn view(host: &InMemoryHost, doc: &DocumentId) -> Vec<(String, bool)> {
	host.blocks(doc)
		.unwrap()
		.into_iter()
		.map(|b| {
			let ghost = b.is_ghost();
			(b.content, ghost)
		})
		.collect()
}

fn owned(items: &[(&str, bool)]) -> Vec<(String, bool)> {
	items.iter().map(|(text, ghost)| (text.to_string(), *ghost)).collect()
}

#[test]
fn inserts_blocks_as_ghosts() {
	let (host, applier, doc) = setup(&["a", "b"]);
	applier.apply_response(response("doc-A", 1, &["s1", "s2"], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("s1", true), ("s2", true), ("b", false)]));
}

#[test]
fn reapplying_same_response_is_idempotent() {
	let (host, applier, doc) = setup(&["a", "b"]);
	let resp = response("doc-A", 2, &["next"], None);

	applier.apply_response(resp.clone());
	let once = view(&host, &doc);
	applier.apply_response(resp);
	assert_eq!(view(&host, &doc), once);
}

#[test]
fn new_response_replaces_previous_ghosts() {
	let (host, applier, doc) = setup(&["a", "b"]);
	applier.apply_response(response("doc-A", 0, &["old1", "old2"], None));
	applier.apply_response(response("doc-A", 1, &["new"], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("new", true), ("b", false)]));
}

#[test]
fn empty_response_clears_ghosts() {
	let (host, applier, doc) = setup(&["a"]);
	applier.apply_response(response("doc-A", 1, &["g"], None));
	applier.apply_response(response("doc-A", 1, &[], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false)]));
}

#[test]
fn insert_position_is_clamped() {
	let (host, applier, doc) = setup(&["a"]);
	applier.apply_response(response("doc-A", 42, &["tail"], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("tail", true)]));
}

#[test]
fn response_for_other_document_leaves_active_one_alone() {
	let (host, applier, doc_a) = setup(&["a"]);
	let doc_b = host.open("doc-B", [BlockContent::code("b")]);

	applier.apply_response(response("doc-A", 1, &["for-a"], None));
	assert_eq!(host.revision(&doc_b), Some(0));
	assert_eq!(view(&host, &doc_a), owned(&[("a", false), ("for-a", true)]));

	host.close(&doc_a);
	applier.apply_response(response("doc-A", 1, &["late"], None));
	assert_eq!(host.revision(&doc_b), Some(0));
	assert!(!host.is_open(&doc_a));
}

#[test]
fn malformed_response_is_dropped() {
	let (host, applier, doc) = setup(&["a"]);
	applier.apply_response(response("", 0, &["x"], None));
	assert_eq!(host.revision(&doc), Some(0));
}

#[test]
fn promote_clears_flag_and_keeps_content() {
	let (host, applier, doc) = setup(&["a"]);
	applier.apply_response(response("doc-A", 1, &["suggested"], None));

	applier.promote(&doc, 1);
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("suggested", false)]));

	// The promoted block is now regular content: the next response keeps it.
	applier.apply_response(response("doc-A", 2, &["more"], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("suggested", false), ("more", true)]));
}

#[test]
fn promote_ignores_regular_and_missing_blocks() {
	let (host, applier, doc) = setup(&["a"]);
	applier.promote(&doc, 0);
	applier.promote(&doc, 9);
	applier.promote(&DocumentId::new("closed"), 0);
	assert_eq!(host.revision(&doc), Some(0));
}

#[test]
fn stale_sequenced_response_is_dropped() {
	let (host, applier, doc) = setup(&["a"]);
	applier.apply_response(response("doc-A", 1, &["from-5"], Some(5)));
	applier.apply_response(response("doc-A", 1, &["from-3"], Some(3)));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("from-5", true)]));

	// Unsequenced responses are always applied.
	applier.apply_response(response("doc-A", 1, &["plain"], None));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("plain", true)]));

	applier.document_closed(&doc);
	applier.apply_response(response("doc-A", 1, &["after-close"], Some(1)));
	assert_eq!(view(&host, &doc), owned(&[("a", false), ("after-close", true)]));
}

#[test]
fn plan_carries_no_block_positions() {
	let plan = plan_ghost_edit(&response("doc-A", 0, &["n"], None));
	assert_eq!(
		plan.edits,
		vec![BlockEdit::ReplaceGhosts {
			insert_at: 0,
			blocks: vec![BlockContent::code("n")],
		}]
	);
}

/// Host where the user inserts a block at the top right before the first
/// edit lands, as an editor would when a keystroke races a response.
struct RacingHost {
	inner: Arc<InMemoryHost>,
	raced: AtomicBool,
}

impl NotebookHost for RacingHost {
	fn resolve_cell(&self, cell_uri: &str) -> CellResolution {
		self.inner.resolve_cell(cell_uri)
	}

	fn snapshot(&self, document: &DocumentId) -> Option<NotebookSnapshot> {
		self.inner.snapshot(document)
	}

	fn apply_edit(&self, document: &DocumentId, edit: NotebookEdit) -> Result<(), HostError> {
		if !self.raced.swap(true, Ordering::SeqCst) {
			let mut user = NotebookEdit::new();
			user.push(BlockEdit::Insert {
				index: 0,
				blocks: vec![BlockContent::code("user-new")],
				ghost: false,
			});
			self.inner.apply_edit(document, user)?;
		}
		self.inner.apply_edit(document, edit)
	}
}

#[test]
fn user_edit_racing_a_response_keeps_user_blocks() {
	let (inner, seed, doc) = setup(&["a"]);
	seed.apply_response(response("doc-A", 1, &["g1"], None));
	assert_eq!(view(&inner, &doc), owned(&[("a", false), ("g1", true)]));

	let applier = GhostApplier::new(Arc::new(RacingHost {
		inner: inner.clone(),
		raced: AtomicBool::new(false),
	}));
	applier.apply_response(response("doc-A", 1, &["g2"], None));

	assert_eq!(view(&inner, &doc), owned(&[("user-new", false), ("g2", true), ("a", false)]));
}

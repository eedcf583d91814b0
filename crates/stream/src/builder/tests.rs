use ghostline_notebook::{BlockEdit, DocumentId, InMemoryHost, NotebookEdit, NotebookHost};
use ghostline_protocol::BlockContent;
use pretty_assertions::assert_eq;

use super::*;

fn notebook(blocks: &[&str]) -> (InMemoryHost, DocumentId) {
	let host = InMemoryHost::new();
	let doc = host.open("doc-A", blocks.iter().map(|text| BlockContent::code(*text)));
	(host, doc)
}

fn ctx<'a>(event: &'a ChangeEvent, snapshot: &'a NotebookSnapshot, session: &'a SessionId, first: bool, last_sent: Option<&'a str>) -> BuildContext<'a> {
	BuildContext {
		event,
		first_request: first,
		snapshot,
		session_id: session,
		last_sent,
	}
}

fn contents(body: &RequestBody) -> Vec<String> {
	match body {
		RequestBody::FullContext { document, .. } => document.blocks.iter().map(|b| b.content.clone()).collect(),
		RequestBody::Update { .. } => panic!("expected full context"),
	}
}

#[test]
fn first_request_builds_full_context() {
	let (host, doc) = notebook(&["# intro", "echo hello"]);
	let snapshot = host.snapshot(&doc).unwrap();
	let event = ChangeEvent::text_change(doc.clone(), 1);
	let session = SessionId::new("s1");

	let body = NotebookRequestBuilder::default().build_request(&ctx(&event, &snapshot, &session, true, None)).unwrap();
	match &body {
		RequestBody::FullContext {
			selected_index, document_uri, ..
		} => {
			assert_eq!(*selected_index, 1);
			assert_eq!(document_uri, "doc-A");
		}
		RequestBody::Update { .. } => panic!("expected full context"),
	}
	assert_eq!(contents(&body), vec!["# intro", "echo hello"]);
}

#[test]
fn later_request_builds_update_with_block_id() {
	let (host, doc) = notebook(&["echo hello"]);
	let snapshot = host.snapshot(&doc).unwrap();
	let event = ChangeEvent::text_change(doc.clone(), 0);
	let session = SessionId::new("s1");

	let body = NotebookRequestBuilder::default()
		.build_request(&ctx(&event, &snapshot, &session, false, Some("echo hell")))
		.unwrap();
	assert_eq!(
		body,
		RequestBody::Update {
			block_id: snapshot.blocks[0].id.0.clone(),
			block_content: "echo hello".into(),
		}
	);
}

#[test]
fn duplicate_update_is_suppressed() {
	let (host, doc) = notebook(&["same"]);
	let snapshot = host.snapshot(&doc).unwrap();
	let event = ChangeEvent::text_change(doc.clone(), 0);
	let session = SessionId::new("s1");
	let builder = NotebookRequestBuilder::default();

	assert_eq!(builder.build_request(&ctx(&event, &snapshot, &session, false, Some("same"))), None);
	// A first request is never a duplicate: context must be re-established.
	assert!(builder.build_request(&ctx(&event, &snapshot, &session, true, Some("same"))).is_some());
}

#[test]
fn missing_and_ghost_blocks_are_suppressed() {
	let (host, doc) = notebook(&["a"]);
	let mut edit = NotebookEdit::new();
	edit.push(BlockEdit::Insert {
		index: 1,
		blocks: vec![BlockContent::code("suggestion")],
		ghost: true,
	});
	host.apply_edit(&doc, edit).unwrap();
	let snapshot = host.snapshot(&doc).unwrap();
	let session = SessionId::new("s1");
	let builder = NotebookRequestBuilder::default();

	let on_ghost = ChangeEvent::text_change(doc.clone(), 1);
	assert_eq!(builder.build_request(&ctx(&on_ghost, &snapshot, &session, true, None)), None);
	let out_of_range = ChangeEvent::text_change(doc.clone(), 7);
	assert_eq!(builder.build_request(&ctx(&out_of_range, &snapshot, &session, true, None)), None);
}

#[test]
fn full_context_excludes_ghosts_and_remaps_selection() {
	let (host, doc) = notebook(&["a", "b"]);
	let mut edit = NotebookEdit::new();
	edit.push(BlockEdit::Insert {
		index: 0,
		blocks: vec![BlockContent::code("g")],
		ghost: true,
	});
	host.apply_edit(&doc, edit).unwrap();
	let snapshot = host.snapshot(&doc).unwrap();
	let session = SessionId::new("s1");

	let event = ChangeEvent::text_change(doc.clone(), 2);
	let body = NotebookRequestBuilder::default().build_request(&ctx(&event, &snapshot, &session, true, None)).unwrap();
	assert_eq!(contents(&body), vec!["a", "b"]);
	assert!(matches!(body, RequestBody::FullContext { selected_index: 1, .. }));
}

#[test]
fn snapshot_is_trimmed_around_selection() {
	let texts: Vec<String> = (0..10).map(|i| format!("block {i}")).collect();
	let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
	let (host, doc) = notebook(&refs);
	let snapshot = host.snapshot(&doc).unwrap();
	let session = SessionId::new("s1");
	let config = GhostConfig {
		max_snapshot_blocks: Some(4),
		..GhostConfig::default()
	};

	let event = ChangeEvent::text_change(doc.clone(), 6);
	let body = NotebookRequestBuilder::new(&config).build_request(&ctx(&event, &snapshot, &session, true, None)).unwrap();
	assert_eq!(contents(&body), vec!["block 4", "block 5", "block 6", "block 7"]);
	assert!(matches!(body, RequestBody::FullContext { selected_index: 2, .. }));
}

#[test]
fn trim_window_clamps_at_edges() {
	assert_eq!(trim_window(vec![0, 1, 2, 3, 4], 0, Some(3)), (vec![0, 1, 2], 0));
	assert_eq!(trim_window(vec![0, 1, 2, 3, 4], 4, Some(3)), (vec![2, 3, 4], 2));
	assert_eq!(trim_window(vec![0, 1], 1, Some(3)), (vec![0, 1], 1));
	assert_eq!(trim_window(vec![0, 1, 2], 2, None), (vec![0, 1, 2], 2));
}

#[test]
fn reset_marker_rotates_once() {
	let (host, doc) = notebook(&["%%reset\nls"]);
	let snapshot = host.snapshot(&doc).unwrap();
	let event = ChangeEvent::text_change(doc.clone(), 0);
	let session = SessionId::new("s1");
	let builder = NotebookRequestBuilder::default();

	assert_eq!(builder.session_directive(&ctx(&event, &snapshot, &session, false, Some("ls"))), SessionDirective::Rotate);
	assert_eq!(
		builder.session_directive(&ctx(&event, &snapshot, &session, false, Some("%%reset\nl"))),
		SessionDirective::Continue
	);

	let (host, doc) = notebook(&["plain"]);
	let snapshot = host.snapshot(&doc).unwrap();
	let event = ChangeEvent::text_change(doc, 0);
	assert_eq!(builder.session_directive(&ctx(&event, &snapshot, &session, true, None)), SessionDirective::Continue);
}

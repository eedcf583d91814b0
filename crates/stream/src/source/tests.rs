use ghostline_notebook::InMemoryHost;
use ghostline_protocol::{BlockContent, InboundResponse};

use super::*;
use crate::DEBOUNCE;
use crate::applier::GhostApplier;
use crate::builder::NotebookRequestBuilder;
use crate::session::{SequentialSource, SessionManager};
use crate::transport::RequestQueue;

struct Fixture {
	host: Arc<InMemoryHost>,
	applier: Arc<GhostApplier>,
	coordinator: Coordinator,
	queue: RequestQueue,
	doc: DocumentId,
}

fn fixture() -> Fixture {
	let host = Arc::new(InMemoryHost::new());
	let doc = host.open("nb://doc", [BlockContent::code("a"), BlockContent::code("b")]);
	let queue = RequestQueue::new();
	let coordinator = Coordinator::spawn(
		host.clone(),
		Arc::new(SessionManager::with_source(SequentialSource::default())),
		Box::new(NotebookRequestBuilder::default()),
		queue.clone(),
		true,
	);
	let applier = Arc::new(GhostApplier::new(host.clone()));
	Fixture {
		host,
		applier,
		coordinator,
		queue,
		doc,
	}
}

fn source(fx: &Fixture, enabled: bool) -> ChangeEventSource {
	ChangeEventSource::new(fx.host.clone(), fx.coordinator.clone(), fx.applier.clone(), enabled)
}

async fn settle() {
	tokio::time::sleep(DEBOUNCE * 2).await;
}

#[tokio::test(start_paused = true)]
async fn resolved_edits_reach_the_coordinator() {
	let fx = fixture();
	let cell = fx.host.cell_uri(&fx.doc, 1).unwrap();
	source(&fx, true).handle(HostNotification::text_changed(cell));
	settle().await;

	let request = fx.queue.try_pop().unwrap();
	assert!(request.is_full_context());
	assert_eq!(fx.coordinator.stats().events, 1);
}

#[tokio::test(start_paused = true)]
async fn untracked_and_orphaned_edits_are_dropped() {
	let fx = fixture();
	let src = source(&fx, true);
	src.handle(HostNotification::text_changed("file:///plain.py"));
	src.handle(HostNotification::text_changed("nb://gone#b1"));
	src.handle(HostNotification::text_changed("nb://doc#b99"));
	settle().await;

	assert_eq!(fx.coordinator.stats().events, 0);
	assert!(fx.queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_source_forwards_nothing() {
	let fx = fixture();
	let cell = fx.host.cell_uri(&fx.doc, 0).unwrap();
	source(&fx, false).handle(HostNotification::text_changed(cell));
	settle().await;
	assert_eq!(fx.coordinator.stats().events, 0);
}

#[tokio::test(start_paused = true)]
async fn focus_promotes_ghost_blocks() {
	let fx = fixture();
	fx.applier.apply_response(InboundResponse {
		document_uri: "nb://doc".into(),
		insert_at: 1,
		blocks: vec![BlockContent::code("ghost")],
		seq: None,
	});
	let cell = fx.host.cell_uri(&fx.doc, 1).unwrap();
	source(&fx, true).handle(HostNotification::CellFocused { cell_uri: cell });

	let blocks = fx.host.blocks(&fx.doc).unwrap();
	assert_eq!(blocks[1].content, "ghost");
	assert!(!blocks[1].is_ghost());
}

#[tokio::test(start_paused = true)]
async fn feed_routes_until_subscription_dropped() {
	let fx = fixture();
	let (tx, rx) = mpsc::unbounded_channel();
	let subscription = source(&fx, true).spawn(rx);

	let cell = fx.host.cell_uri(&fx.doc, 0).unwrap();
	tx.send(HostNotification::text_changed(cell.clone())).unwrap();
	settle().await;
	assert_eq!(fx.coordinator.stats().events, 1);

	tx.send(HostNotification::NotebookClosed { document: fx.doc.clone() }).unwrap();
	settle().await;
	assert_eq!(fx.coordinator.stats().tracked_documents, 0);

	drop(subscription);
	tokio::task::yield_now().await;
	let _ = tx.send(HostNotification::text_changed(cell));
	settle().await;
	assert_eq!(fx.coordinator.stats().events, 1);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_waits_for_the_task() {
	let fx = fixture();
	let (_tx, rx) = mpsc::unbounded_channel();
	let subscription = source(&fx, true).spawn(rx);
	assert!(!subscription.is_cancelled());
	subscription.unsubscribe().await;
}

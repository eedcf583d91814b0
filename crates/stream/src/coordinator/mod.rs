//! Debounced request scheduling.
//!
//! [`Coordinator`] is a cheap handle to a single task that owns the state of
//! every tracked document. Events are sent to it over an unbounded channel,
//! so callers never wait. The task sleeps until the earliest pending
//! deadline; when a window settles, the latest event for it is handed to the
//! [`RequestBuilder`] and the result is pushed onto the [`RequestQueue`].
//!
//! # Windows
//!
//! Each document moves `Idle → First → Steady`. The first request after the
//! window starts, after the active block changes, or after the session
//! rotates carries full context; later ones for the same block are updates.
//! Transport closure and [`Coordinator::reset_session`] return every window
//! to `Idle`.
//!
//! # Disposal
//!
//! [`Coordinator::dispose`] cancels the task, which drops all pending
//! deadlines, then closes the queue. Nothing is pushed afterwards.

mod window;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ghostline_notebook::{DocumentId, NotebookHost};
use ghostline_protocol::{OutboundRequest, RequestKind, Trigger};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use self::window::DocumentWindow;
use crate::builder::{BuildContext, RequestBuilder, SessionDirective};
use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::session::SessionManager;
use crate::transport::{RequestQueue, TransportEvent, TransportObserver};

/// Quiet period after the last event before a request is built.
pub const DEBOUNCE: Duration = Duration::from_millis(75);

/// Running totals kept by the coordinator task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStats {
	/// Change events received.
	pub events: u64,
	/// Events superseded by a later one before their window settled.
	pub collapsed: u64,
	/// Full-context requests queued.
	pub full_context: u64,
	/// Update requests queued.
	pub updates: u64,
	/// Settled events that produced no request.
	pub suppressed: u64,
	/// Requests built after the transport closed, never queued.
	pub dropped_after_close: u64,
	/// Session rotations performed by the coordinator.
	pub rotations: u64,
	/// Documents with a live window.
	pub tracked_documents: usize,
}

#[derive(Debug)]
enum Command {
	Change(ChangeEvent),
	DocumentClosed(DocumentId),
	ResetSession,
	Transport(TransportEvent),
}

struct Inner {
	tx: mpsc::UnboundedSender<Command>,
	cancel: CancellationToken,
	queue: RequestQueue,
	stats: watch::Receiver<CoordinatorStats>,
	task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the coordinator task. Clones share the same task.
#[derive(Clone)]
pub struct Coordinator {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for Coordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Coordinator")
			.field("disposed", &self.is_disposed())
			.field("stats", &self.stats())
			.finish()
	}
}

impl Coordinator {
	/// Starts the coordinator task on the current runtime.
	///
	/// With `manual_flush`, [`Trigger::Manual`] events settle immediately.
	pub fn spawn(
		host: Arc<dyn NotebookHost>,
		session: Arc<SessionManager>,
		builder: Box<dyn RequestBuilder>,
		queue: RequestQueue,
		manual_flush: bool,
	) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let (stats_tx, stats) = watch::channel(CoordinatorStats::default());
		let cancel = CancellationToken::new();

		let core = CoordinatorCore::new(host, session, builder, queue.clone(), manual_flush, cancel.clone(), stats_tx);
		let task = ghostline_worker::spawn(ghostline_worker::TaskClass::Interactive, "ghost.coordinator", core.run(rx));

		Self {
			inner: Arc::new(Inner {
				tx,
				cancel,
				queue,
				stats,
				task: Mutex::new(Some(task)),
			}),
		}
	}

	fn send(&self, command: Command) -> Result<()> {
		if self.inner.cancel.is_cancelled() {
			return Err(Error::Disposed);
		}
		self.inner.tx.send(command).map_err(|_| Error::Disposed)
	}

	/// Feeds one change event. Never blocks.
	pub fn submit(&self, event: ChangeEvent) -> Result<()> {
		self.send(Command::Change(event))
	}

	/// Forgets all state kept for `document`.
	pub fn document_closed(&self, document: DocumentId) -> Result<()> {
		self.send(Command::DocumentClosed(document))
	}

	/// Rotates the session and returns every window to `Idle`.
	pub fn reset_session(&self) -> Result<()> {
		self.send(Command::ResetSession)
	}

	/// Latest published statistics.
	pub fn stats(&self) -> CoordinatorStats {
		*self.inner.stats.borrow()
	}

	/// Returns a receiver notified whenever the statistics change.
	pub fn watch_stats(&self) -> watch::Receiver<CoordinatorStats> {
		self.inner.stats.clone()
	}

	/// Cancels pending deadlines, then closes the request queue. Idempotent.
	pub fn dispose(&self) {
		if self.inner.cancel.is_cancelled() {
			return;
		}
		self.inner.cancel.cancel();
		self.inner.queue.close();
		debug!("ghost.coordinator.disposed");
	}

	/// Returns true once [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.inner.cancel.is_cancelled()
	}

	/// Disposes and waits for the task to finish.
	pub async fn shutdown(&self) {
		self.dispose();
		let task = self.inner.task.lock().take();
		if let Some(task) = task
			&& let Err(err) = task.await
		{
			error!(error = %err, "ghost.coordinator.task_panicked");
		}
	}
}

impl TransportObserver for Coordinator {
	fn on_event(&self, event: TransportEvent) {
		if self.send(Command::Transport(event)).is_err() {
			trace!("ghost.coordinator.transport_event_after_dispose");
		}
	}
}

struct CoordinatorCore {
	host: Arc<dyn NotebookHost>,
	session: Arc<SessionManager>,
	builder: Box<dyn RequestBuilder>,
	queue: RequestQueue,
	manual_flush: bool,
	cancel: CancellationToken,
	windows: HashMap<DocumentId, DocumentWindow>,
	next_seq: u64,
	transport_open: bool,
	stats: CoordinatorStats,
	stats_tx: watch::Sender<CoordinatorStats>,
}

async fn sleep_until_opt(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

impl CoordinatorCore {
	fn new(
		host: Arc<dyn NotebookHost>,
		session: Arc<SessionManager>,
		builder: Box<dyn RequestBuilder>,
		queue: RequestQueue,
		manual_flush: bool,
		cancel: CancellationToken,
		stats_tx: watch::Sender<CoordinatorStats>,
	) -> Self {
		Self {
			host,
			session,
			builder,
			queue,
			manual_flush,
			cancel,
			windows: HashMap::new(),
			next_seq: 1,
			transport_open: true,
			stats: CoordinatorStats::default(),
			stats_tx,
		}
	}

	async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
		let cancel = self.cancel.clone();
		loop {
			let deadline = self.next_deadline();
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				command = rx.recv() => match command {
					Some(command) => self.handle(command),
					None => break,
				},
				_ = sleep_until_opt(deadline) => {}
			}

			if cancel.is_cancelled() {
				break;
			}
			self.flush_due(Instant::now());
			self.publish_stats();
		}

		let dropped = self.windows.len();
		self.windows.clear();
		debug!(dropped, "ghost.coordinator.stopped");
	}

	fn next_deadline(&self) -> Option<Instant> {
		self.windows.values().filter_map(DocumentWindow::deadline).min()
	}

	fn handle(&mut self, command: Command) {
		match command {
			Command::Change(event) => self.observe(event),
			Command::DocumentClosed(document) => {
				if self.windows.remove(&document).is_some() {
					debug!(document = %document, "ghost.coordinator.document_closed");
				}
			}
			Command::ResetSession => {
				self.session.rotate();
				self.stats.rotations += 1;
				self.reset_windows();
			}
			Command::Transport(TransportEvent::Closed { reason }) => {
				debug!(reason = ?reason, "ghost.coordinator.transport_closed");
				self.transport_open = false;
				self.reset_windows();
			}
			Command::Transport(TransportEvent::Response { document }) => {
				trace!(document = %document, "ghost.coordinator.response");
			}
		}
	}

	fn observe(&mut self, event: ChangeEvent) {
		self.stats.events += 1;
		let now = Instant::now();
		let deadline = if self.manual_flush && event.trigger == Trigger::Manual {
			now
		} else {
			now + DEBOUNCE
		};
		trace!(document = %event.document, index = event.block_index, trigger = event.trigger.as_str(), "ghost.coordinator.event");

		let Some(block) = self.host.block_id(&event.document, event.block_index) else {
			debug!(document = %event.document, index = event.block_index, "ghost.coordinator.block_not_found");
			self.stats.suppressed += 1;
			return;
		};
		let window = self.windows.entry(event.document.clone()).or_insert_with(DocumentWindow::new);
		if window.observe(event, block, deadline) {
			self.stats.collapsed += 1;
		}
	}

	fn reset_windows(&mut self) {
		for window in self.windows.values_mut() {
			window.reset();
		}
	}

	/// Builds and queues a request for every window whose deadline passed,
	/// oldest deadline first.
	fn flush_due(&mut self, now: Instant) {
		let mut due: Vec<(Instant, ChangeEvent)> = self
			.windows
			.values_mut()
			.filter_map(|window| {
				let deadline = window.deadline()?;
				window.take_due(now).map(|event| (deadline, event))
			})
			.collect();
		due.sort_by_key(|(deadline, _)| *deadline);

		for (_, event) in due {
			self.flush(event);
		}
	}

	fn flush(&mut self, mut event: ChangeEvent) {
		let Some(snapshot) = self.host.snapshot(&event.document) else {
			debug!(document = %event.document, "ghost.coordinator.document_not_open");
			self.stats.suppressed += 1;
			return;
		};
		let Some(window) = self.windows.get_mut(&event.document) else {
			return;
		};
		// Blocks inserted or removed above the active one since the event
		// arrived shift its position.
		let Some(index) = window.active_block.as_ref().and_then(|block| snapshot.position(block)) else {
			debug!(document = %event.document, "ghost.coordinator.active_block_gone");
			self.stats.suppressed += 1;
			return;
		};
		event.block_index = index;

		let (mut session_id, mut generation) = self.session.current_with_generation();
		let directive = self.builder.session_directive(&BuildContext {
			event: &event,
			first_request: window.needs_first(generation),
			snapshot: &snapshot,
			session_id: &session_id,
			last_sent: window.last_sent(),
		});
		if directive == SessionDirective::Rotate {
			self.session.rotate();
			self.stats.rotations += 1;
			(session_id, generation) = self.session.current_with_generation();
		}

		let first_request = window.needs_first(generation);
		let Some(body) = self.builder.build_request(&BuildContext {
			event: &event,
			first_request,
			snapshot: &snapshot,
			session_id: &session_id,
			last_sent: window.last_sent(),
		}) else {
			self.stats.suppressed += 1;
			return;
		};

		if !self.transport_open {
			debug!(document = %event.document, kind = body.kind().as_str(), "ghost.coordinator.dropped_after_close");
			self.stats.dropped_after_close += 1;
			return;
		}

		if self.cancel.is_cancelled() {
			debug!(document = %event.document, "ghost.coordinator.flush_after_dispose");
			return;
		}

		let full_context = body.kind() == RequestKind::FullContext;
		let seq = self.next_seq;
		let request = OutboundRequest {
			body,
			session_id: session_id.to_string(),
			trigger: event.trigger,
			seq,
		};
		if self.queue.push(request).is_err() {
			debug!(document = %event.document, seq, "ghost.coordinator.queue_closed");
			self.transport_open = false;
			self.stats.dropped_after_close += 1;
			return;
		}
		self.next_seq += 1;

		let content = snapshot.block(event.block_index).map(|block| block.content.clone());
		window.mark_sent(full_context, generation, content);
		if full_context {
			self.stats.full_context += 1;
		} else {
			self.stats.updates += 1;
		}
		debug!(
			document = %event.document,
			index = event.block_index,
			seq,
			full_context,
			session = session_id.as_str(),
			"ghost.coordinator.flush"
		);
	}

	fn publish_stats(&mut self) {
		self.stats.tracked_documents = self.windows.len();
		let stats = self.stats;
		self.stats_tx.send_if_modified(|current| {
			if *current == stats {
				return false;
			}
			*current = stats;
			true
		});
	}
}

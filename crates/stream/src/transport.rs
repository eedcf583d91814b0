//! The single bidirectional stream to the completion service.
//!
//! [`Transport::spawn`] binds one connection to two tasks:
//! * the writer pops [`OutboundRequest`]s from the [`RequestQueue`] in FIFO
//!   order, suspending only while the queue is empty
//! * the reader decodes [`InboundResponse`]s and hands them to the
//!   [`ResponseApplier`] in arrival order
//!
//! When either side ends, the other is cancelled and exactly one
//! [`TransportEvent::Closed`] is reported. There is no reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ghostline_notebook::DocumentId;
use ghostline_protocol::{Codec, InboundResponse, JsonLines, OutboundRequest};
use ghostline_worker::{FifoQueue, TaskClass};
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::applier::ResponseApplier;

/// Outbound FIFO shared by the coordinator (producer) and the transport
/// writer (consumer).
pub type RequestQueue = FifoQueue<OutboundRequest>;

/// Why the stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
	/// The service closed its side.
	Eof,
	/// Reading or writing failed.
	Io(String),
	/// Local shutdown: disposal or the request queue closing.
	Shutdown,
}

/// Notifications from the transport to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	/// A response for `document` has been handed to the applier.
	Response {
		/// Notebook named by the response.
		document: DocumentId,
	},
	/// The stream ended. Reported exactly once.
	Closed {
		/// Why it ended.
		reason: CloseReason,
	},
}

/// Receiver of [`TransportEvent`]s.
pub trait TransportObserver: Send + Sync + 'static {
	/// Called from the transport tasks; must not block.
	fn on_event(&self, event: TransportEvent);
}

impl TransportObserver for mpsc::UnboundedSender<TransportEvent> {
	fn on_event(&self, event: TransportEvent) {
		let _ = self.send(event);
	}
}

struct Shared {
	cancel: CancellationToken,
	closed_reported: AtomicBool,
	observer: Arc<dyn TransportObserver>,
}

impl Shared {
	/// Ends both halves and reports the first reason seen.
	fn close(&self, reason: CloseReason) {
		self.cancel.cancel();
		if self.closed_reported.swap(true, Ordering::AcqRel) {
			return;
		}
		match &reason {
			CloseReason::Io(message) => error!(reason = message.as_str(), "ghost.transport.closed"),
			CloseReason::Eof => warn!("ghost.transport.closed_by_peer"),
			CloseReason::Shutdown => debug!("ghost.transport.shutdown"),
		}
		self.observer.on_event(TransportEvent::Closed { reason });
	}
}

/// Handle to a running transport.
pub struct Transport {
	shared: Arc<Shared>,
	queue: RequestQueue,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Transport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Transport").field("closed", &self.is_closed()).finish()
	}
}

impl Transport {
	/// Starts the reader and writer tasks on the current runtime.
	pub fn spawn<R, W>(reader: R, writer: W, queue: RequestQueue, applier: Arc<dyn ResponseApplier>, observer: Arc<dyn TransportObserver>) -> Self
	where
		R: AsyncBufRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let shared = Arc::new(Shared {
			cancel: CancellationToken::new(),
			closed_reported: AtomicBool::new(false),
			observer,
		});

		let writer_task = ghostline_worker::spawn(
			TaskClass::Io,
			"ghost.transport.writer",
			write_loop(writer, queue.clone(), shared.clone()),
		);
		let reader_task = ghostline_worker::spawn(TaskClass::Io, "ghost.transport.reader", read_loop(reader, applier, shared.clone()));

		Self {
			shared,
			queue,
			tasks: Mutex::new(vec![writer_task, reader_task]),
		}
	}

	/// Stops both tasks and closes the request queue. Idempotent.
	pub fn shutdown(&self) {
		self.queue.close();
		self.shared.close(CloseReason::Shutdown);
	}

	/// Returns true once the stream has ended for any reason.
	pub fn is_closed(&self) -> bool {
		self.shared.cancel.is_cancelled()
	}

	/// Waits for both tasks to finish.
	pub async fn join(&self) {
		let tasks = std::mem::take(&mut *self.tasks.lock());
		for task in tasks {
			if let Err(err) = task.await {
				error!(error = %err, "ghost.transport.task_panicked");
			}
		}
	}
}

async fn write_loop<W>(mut writer: W, queue: RequestQueue, shared: Arc<Shared>)
where
	W: AsyncWrite + Unpin + Send,
{
	let mut codec = JsonLines::<InboundResponse, OutboundRequest>::new();
	let reason = loop {
		let request = tokio::select! {
			biased;
			_ = shared.cancel.cancelled() => break CloseReason::Shutdown,
			next = queue.pop() => match next {
				Some(request) => request,
				None => break CloseReason::Shutdown,
			},
		};

		if let Err(err) = codec.write_message(&mut writer, &request).await {
			break CloseReason::Io(err.to_string());
		}
		trace!(seq = request.seq, kind = request.kind().as_str(), session = request.session_id.as_str(), "ghost.transport.sent");
	};
	shared.close(reason);
}

async fn read_loop<R>(mut reader: R, applier: Arc<dyn ResponseApplier>, shared: Arc<Shared>)
where
	R: AsyncBufRead + Unpin + Send,
{
	let mut codec = JsonLines::<InboundResponse, OutboundRequest>::new();
	let reason = loop {
		let message = tokio::select! {
			biased;
			_ = shared.cancel.cancelled() => break CloseReason::Shutdown,
			message = codec.read_message(&mut reader) => message,
		};

		match message {
			Ok(Some(response)) => {
				if let Err(err) = response.validate() {
					warn!(error = %err, "ghost.transport.invalid_response");
					continue;
				}
				let document = DocumentId::new(&response.document_uri);
				trace!(document = %document, seq = response.seq, "ghost.transport.received");
				applier.apply_response(response);
				shared.observer.on_event(TransportEvent::Response { document });
			}
			Ok(None) => break CloseReason::Eof,
			Err(err) if err.is_recoverable() => warn!(error = %err, "ghost.transport.malformed_response"),
			Err(err) => break CloseReason::Io(err.to_string()),
		}
	};
	shared.close(reason);
}

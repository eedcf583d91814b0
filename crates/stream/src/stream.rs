//! Composition root.

use std::sync::Arc;

use ghostline_notebook::NotebookHost;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::applier::{GhostApplier, ResponseApplier};
use crate::builder::NotebookRequestBuilder;
use crate::config::GhostConfig;
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::session::SessionManager;
use crate::source::{ChangeEventSource, HostNotification, Subscription};
use crate::transport::{RequestQueue, Transport};

/// A running completion stream bound to one editor and one connection.
///
/// Feed editor notifications through [`notifier`](Self::notifier). Call
/// [`dispose`](Self::dispose) (or drop the stream) to tear everything down.
pub struct GhostStream {
	session: Arc<SessionManager>,
	coordinator: Coordinator,
	transport: Transport,
	notifier: mpsc::UnboundedSender<HostNotification>,
	subscription: Mutex<Option<Subscription>>,
}

impl std::fmt::Debug for GhostStream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GhostStream")
			.field("coordinator", &self.coordinator)
			.field("transport", &self.transport)
			.finish_non_exhaustive()
	}
}

impl GhostStream {
	/// Wires every component over `reader`/`writer` with a fresh session.
	///
	/// Must be called within a tokio runtime.
	pub fn start<R, W>(config: GhostConfig, host: Arc<dyn NotebookHost>, reader: R, writer: W) -> Result<Self>
	where
		R: AsyncBufRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		Self::start_with_session(config, host, Arc::new(SessionManager::new()), reader, writer)
	}

	/// Like [`start`](Self::start) with an externally owned session manager.
	pub fn start_with_session<R, W>(
		config: GhostConfig,
		host: Arc<dyn NotebookHost>,
		session: Arc<SessionManager>,
		reader: R,
		writer: W,
	) -> Result<Self>
	where
		R: AsyncBufRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		config.validate()?;

		let queue = RequestQueue::new();
		let applier: Arc<dyn ResponseApplier> = Arc::new(GhostApplier::new(host.clone()));
		let coordinator = Coordinator::spawn(
			host.clone(),
			session.clone(),
			Box::new(NotebookRequestBuilder::new(&config)),
			queue.clone(),
			config.manual_flush,
		);
		let transport = Transport::spawn(reader, writer, queue, applier.clone(), Arc::new(coordinator.clone()));

		let (notifier, feed) = mpsc::unbounded_channel();
		let subscription = ChangeEventSource::new(host, coordinator.clone(), applier, config.enabled).spawn(feed);

		info!(enabled = config.enabled, manual_flush = config.manual_flush, "ghost.stream.started");
		Ok(Self {
			session,
			coordinator,
			transport,
			notifier,
			subscription: Mutex::new(Some(subscription)),
		})
	}

	/// Sender for editor notifications.
	pub fn notifier(&self) -> mpsc::UnboundedSender<HostNotification> {
		self.notifier.clone()
	}

	/// The session manager tagging outbound requests.
	pub fn session(&self) -> &Arc<SessionManager> {
		&self.session
	}

	/// The coordinator, for statistics and explicit session resets.
	pub fn coordinator(&self) -> &Coordinator {
		&self.coordinator
	}

	/// Returns true once the connection has ended.
	pub fn is_closed(&self) -> bool {
		self.transport.is_closed()
	}

	/// Cancels pending deadlines, closes the request queue, shuts the
	/// transport down and ends the notification feed. Idempotent.
	pub fn dispose(&self) {
		self.coordinator.dispose();
		self.transport.shutdown();
		if let Some(subscription) = self.subscription.lock().take() {
			subscription.cancel();
			debug!("ghost.stream.disposed");
		}
	}

	/// Disposes and waits for every task to finish.
	pub async fn shutdown(&self) {
		self.dispose();
		self.coordinator.shutdown().await;
		self.transport.join().await;
	}
}

impl Drop for GhostStream {
	fn drop(&mut self) {
		self.dispose();
	}
}

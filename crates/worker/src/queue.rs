use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Error returned by [`FifoQueue::push`] once the queue is closed.
///
/// Carries the rejected item back to the caller.
pub struct QueueClosed<T>(pub T);

impl<T> fmt::Debug for QueueClosed<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("QueueClosed(..)")
	}
}

impl<T> fmt::Display for QueueClosed<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("queue closed")
	}
}

impl<T> std::error::Error for QueueClosed<T> {}

struct QueueState<T> {
	items: VecDeque<T>,
	closed: bool,
}

struct QueueInner<T> {
	state: Mutex<QueueState<T>>,
	notify: Notify,
}

/// Unbounded multi-producer FIFO with a suspending pop.
///
/// Producers never wait: [`push`](Self::push) is synchronous. Consumers
/// suspend in [`pop`](Self::pop) only while the queue is empty. After
/// [`close`](Self::close), pushes are rejected and consumers drain what is
/// left before observing `None`.
pub struct FifoQueue<T> {
	inner: Arc<QueueInner<T>>,
}

impl<T> Clone for FifoQueue<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for FifoQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for FifoQueue<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("FifoQueue").field("len", &state.items.len()).field("closed", &state.closed).finish()
	}
}

impl<T> FifoQueue<T> {
	/// Creates an open, empty queue.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(QueueInner {
				state: Mutex::new(QueueState {
					items: VecDeque::new(),
					closed: false,
				}),
				notify: Notify::new(),
			}),
		}
	}

	/// Appends an item. Never blocks.
	pub fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(QueueClosed(item));
		}
		state.items.push_back(item);
		drop(state);
		self.inner.notify.notify_one();
		Ok(())
	}

	/// Removes the oldest item, suspending while the queue is open and empty.
	///
	/// Returns `None` once the queue is closed and drained.
	pub async fn pop(&self) -> Option<T> {
		loop {
			// Register interest before inspecting state so a push or close
			// landing between the check and the await is not missed.
			let notified = self.inner.notify.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			{
				let mut state = self.inner.state.lock();
				if let Some(item) = state.items.pop_front() {
					return Some(item);
				}
				if state.closed {
					return None;
				}
			}

			notified.await;
		}
	}

	/// Removes the oldest item without waiting.
	pub fn try_pop(&self) -> Option<T> {
		self.inner.state.lock().items.pop_front()
	}

	/// Closes the queue and wakes every waiting consumer. Idempotent.
	pub fn close(&self) {
		let mut state = self.inner.state.lock();
		if state.closed {
			return;
		}
		state.closed = true;
		drop(state);
		self.inner.notify.notify_waiters();
		// A consumer between `enable` and `await` is covered by notify_waiters;
		// the stored permit covers one that has not registered yet.
		self.inner.notify.notify_one();
	}

	/// Returns true once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Number of queued items.
	pub fn len(&self) -> usize {
		self.inner.state.lock().items.len()
	}

	/// Returns true when nothing is queued.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

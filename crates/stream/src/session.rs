//! Session identity.
//!
//! One [`SessionManager`] is built by the composition root and shared by
//! `Arc` with everything that tags or rotates sessions. A session id is a
//! 26-character ULID-like string: 48 bits of milliseconds since the Unix
//! epoch followed by 80 random bits, Crockford base32 encoded, so ids issued
//! by one process sort in issue order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tracing::info;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
	/// Wraps an existing identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the identifier text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Produces fresh session identifiers.
pub trait SessionIdSource: Send + Sync + 'static {
	/// Returns an identifier never returned before by this source.
	fn next_id(&self) -> SessionId;
}

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1 << RANDOM_BITS) - 1;
const TIME_MASK: u64 = (1 << 48) - 1;

/// Length of an encoded session id.
pub const SESSION_ID_LEN: usize = 26;

fn encode_crockford(value: u128) -> String {
	let mut out = [0u8; SESSION_ID_LEN];
	let mut v = value;
	for slot in out.iter_mut().rev() {
		*slot = CROCKFORD[(v & 0x1f) as usize];
		v >>= 5;
	}
	out.iter().map(|&b| b as char).collect()
}

/// Default [`SessionIdSource`]: monotonic ULIDs.
///
/// Within one millisecond the random part is incremented instead of redrawn,
/// keeping ids strictly increasing.
#[derive(Debug, Default)]
pub struct UlidSource {
	last: Mutex<Option<(u64, u128)>>,
}

impl UlidSource {
	/// Creates a source.
	pub fn new() -> Self {
		Self::default()
	}

	fn now_millis() -> u64 {
		let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
		u64::try_from(millis).unwrap_or(u64::MAX) & TIME_MASK
	}

	fn random_bits() -> u128 {
		uuid::Uuid::new_v4().as_u128() & RANDOM_MASK
	}

	/// Computes the next `(millis, random)` pair after `last`.
	fn advance(last: Option<(u64, u128)>, now: u64, random: u128) -> (u64, u128) {
		match last {
			Some((ms, rand)) if now <= ms => {
				if rand < RANDOM_MASK {
					(ms, rand + 1)
				} else {
					((ms + 1) & TIME_MASK, 0)
				}
			}
			_ => (now, random),
		}
	}
}

impl SessionIdSource for UlidSource {
	fn next_id(&self) -> SessionId {
		let mut last = self.last.lock();
		let (ms, rand) = Self::advance(*last, Self::now_millis(), Self::random_bits());
		*last = Some((ms, rand));
		SessionId(encode_crockford((u128::from(ms) << RANDOM_BITS) | rand))
	}
}

/// Holder of the current session id.
///
/// Rotation is forward-looking: requests already tagged with an older id
/// stay valid, only later requests pick up the new one. Every rotation bumps
/// [`generation`](Self::generation) so dependents can detect it without
/// comparing strings.
pub struct SessionManager {
	source: Box<dyn SessionIdSource>,
	current: RwLock<Option<SessionId>>,
	generation: AtomicU64,
}

impl fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionManager")
			.field("current", &*self.current.read())
			.field("generation", &self.generation())
			.finish()
	}
}

impl Default for SessionManager {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionManager {
	/// Creates a manager backed by [`UlidSource`].
	pub fn new() -> Self {
		Self::with_source(UlidSource::new())
	}

	/// Creates a manager backed by a custom id source.
	pub fn with_source(source: impl SessionIdSource) -> Self {
		Self {
			source: Box::new(source),
			current: RwLock::new(None),
			generation: AtomicU64::new(0),
		}
	}

	/// Returns the current id, creating the first one lazily.
	pub fn current(&self) -> SessionId {
		if let Some(id) = self.current.read().as_ref() {
			return id.clone();
		}
		let mut current = self.current.write();
		current.get_or_insert_with(|| self.source.next_id()).clone()
	}

	/// Returns the current id together with the generation it belongs to.
	pub fn current_with_generation(&self) -> (SessionId, u64) {
		if let Some(id) = self.current.read().as_ref() {
			return (id.clone(), self.generation());
		}
		let mut current = self.current.write();
		let id = current.get_or_insert_with(|| self.source.next_id()).clone();
		(id, self.generation())
	}

	/// Replaces the current id with a fresh one and returns it.
	pub fn rotate(&self) -> SessionId {
		let next = self.source.next_id();
		let mut current = self.current.write();
		let previous = current.replace(next.clone());
		let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
		drop(current);
		info!(
			previous = previous.as_ref().map(SessionId::as_str),
			session = next.as_str(),
			generation,
			"ghost.session.rotate"
		);
		next
	}

	/// Number of rotations so far.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}
}

/// Deterministic ids for tests: `s1`, `s2`, ...
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct SequentialSource(AtomicU64);

#[cfg(test)]
impl SessionIdSource for SequentialSource {
	fn next_id(&self) -> SessionId {
		SessionId::new(format!("s{}", self.0.fetch_add(1, Ordering::Relaxed) + 1))
	}
}

#[cfg(test)]
mod tests;

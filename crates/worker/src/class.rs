/// Execution classes used to tag spawned tasks in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work on the edit-to-request path; latency is visible to the user.
	Interactive,
	/// Tasks that own one side of a network stream.
	Io,
	/// Everything else: notification feeds, bookkeeping.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Io => "io",
			Self::Background => "background",
		}
	}
}

/// Execution classes used to label spawned work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work that sits directly on the query path (the controller actor).
	Interactive,
	/// Stream pumps and other work that may lag without blocking queries.
	Background,
	/// Dedicated OS threads parked on blocking reads.
	IoBlocking,
}

impl TaskClass {
	/// Stable label used in tracing fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
		}
	}
}

//! Search process supervision.
//!
//! A [`SearchLauncher`] starts one external search for a query and streams
//! everything it learns about that run into a shared event channel. Every
//! event carries the [`RunTag`] of the run that produced it, which is what the
//! controller compares against its current state to drop stale output.

mod process;

use seek_worker::GenerationToken;
use tokio::sync::mpsc;

pub use process::ProcessLauncher;

use crate::Result;

/// Identity of one search run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunTag {
	/// Unique per launch, even when two launches share query text.
	pub generation: u64,
	pub query: String,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
	/// The process exited on its own. `None` when killed by a signal.
	Exited(Option<i32>),
	/// The run was cancelled and its process killed.
	Cancelled,
	/// Waiting on the process failed.
	Failed(String),
}

/// Payload of one [`SearchEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEventKind {
	/// Newly completed path records, in process output order.
	Output(Vec<String>),
	/// One line from the process error channel.
	Diagnostic(String),
	/// Terminal event. Sent exactly once per run.
	Completed(RunOutcome),
}

/// One notification from a running search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEvent {
	pub tag: RunTag,
	pub kind: SearchEventKind,
}

impl SearchEvent {
	pub fn new(tag: RunTag, kind: SearchEventKind) -> Self {
		Self { tag, kind }
	}
}

/// Channel every run reports into.
pub type EventSender = mpsc::UnboundedSender<SearchEvent>;

/// Control handle for one running search.
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct SearchHandle {
	tag: RunTag,
	token: GenerationToken,
}

impl SearchHandle {
	/// Wraps a run's tag and the token its pump watches.
	///
	/// The token's generation must match `tag.generation`.
	pub fn new(tag: RunTag, token: GenerationToken) -> Self {
		debug_assert_eq!(tag.generation, token.generation());
		Self { tag, token }
	}

	pub fn tag(&self) -> &RunTag {
		&self.tag
	}

	pub fn generation(&self) -> u64 {
		self.tag.generation
	}

	pub fn query(&self) -> &str {
		&self.tag.query
	}

	/// Requests termination. Safe to call after the run completed, and safe
	/// to call repeatedly; the run still reports completion at most once.
	pub fn cancel(&self) {
		if !self.token.is_cancelled() {
			tracing::debug!(generation = self.tag.generation, query = %self.tag.query, "cancelling search");
		}
		self.token.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}
}

impl Drop for SearchHandle {
	fn drop(&mut self) {
		self.token.cancel();
	}
}

/// Starts external searches.
///
/// Implemented by [`ProcessLauncher`] for real backends; tests substitute an
/// in-memory launcher and feed events by hand.
pub trait SearchLauncher: Send + 'static {
	/// Launches one search for `tag.query`.
	///
	/// On success the run must eventually send exactly one
	/// [`SearchEventKind::Completed`] for `tag` into `events`, and must not
	/// send output once its handle has been cancelled.
	fn launch(&self, tag: RunTag, events: EventSender) -> Result<SearchHandle>;
}

#[cfg(test)]
mod tests;

//! The query lifecycle controller.
//!
//! For each incoming query the controller decides whether to ignore it,
//! narrow the cached results of the previous query in place, or cancel the
//! running search and launch a new one. It is a plain synchronous state
//! machine; [`crate::service`] runs it inside a single task so that queries
//! and search events are never handled concurrently.

mod state;

use seek_worker::GenerationClock;
use tokio::sync::mpsc;

pub use state::ControllerState;

use crate::backend::Backend;
use crate::candidate::QueryResult;
use crate::config::BrokerConfig;
use crate::supervisor::{EventSender, RunTag, SearchEvent, SearchEventKind, SearchLauncher};

/// What [`QueryController::handle_query`] did with a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDisposition {
	/// Too short, a repeat of the previous query, or no backend.
	Ignored,
	/// Cached candidates were filtered and emitted synchronously.
	Refined { candidates: usize },
	/// A new search run was started.
	Launched { generation: u64 },
	/// The backend could not be started; the next query retries.
	LaunchFailed,
}

/// Drives one search backend from a stream of queries.
pub struct QueryController {
	state: ControllerState,
	backend: Backend,
	min_query_len: usize,
	launcher: Box<dyn SearchLauncher>,
	results: mpsc::UnboundedSender<QueryResult>,
	events: EventSender,
	clock: GenerationClock,
	sink_closed: bool,
}

impl QueryController {
	/// Creates a controller with empty state.
	///
	/// `results` receives every committed result set; `events` is handed to
	/// the launcher for each run and must feed back into
	/// [`handle_event`](Self::handle_event).
	pub fn new(config: &BrokerConfig, launcher: Box<dyn SearchLauncher>, results: mpsc::UnboundedSender<QueryResult>, events: EventSender) -> Self {
		Self {
			state: ControllerState::default(),
			backend: config.resolved_backend(),
			min_query_len: config.min_query_len,
			launcher,
			results,
			events,
			clock: GenerationClock::new(),
			sink_closed: false,
		}
	}

	/// Whether this controller has a backend to drive.
	pub fn is_available(&self) -> bool {
		self.backend.is_available()
	}

	pub fn backend(&self) -> Backend {
		self.backend
	}

	pub fn state(&self) -> &ControllerState {
		&self.state
	}

	pub fn is_searching(&self) -> bool {
		self.state.active.is_some()
	}

	/// Classifies and applies one query.
	pub fn handle_query(&mut self, input: &str) -> QueryDisposition {
		if !self.is_available() || input.chars().count() < self.min_query_len || self.state.previous_query() == Some(input) {
			return QueryDisposition::Ignored;
		}

		if self.state.can_refine(input) {
			return self.refine(input);
		}

		self.start_search(input)
	}

	fn refine(&mut self, input: &str) -> QueryDisposition {
		let before = self.state.candidate_cache.len();
		self.state.candidate_cache.retain(|path| path.contains(input));
		self.state.previous_query = Some(input.to_owned());

		let candidates = self.state.candidate_cache.len();
		tracing::debug!(query = %input, before, after = candidates, "refined cached candidates");
		self.emit(QueryResult::from_paths(input, &self.state.candidate_cache));
		QueryDisposition::Refined { candidates }
	}

	fn start_search(&mut self, input: &str) -> QueryDisposition {
		if let Some(generation) = self.state.cancel_active() {
			tracing::debug!(generation, query = %input, "superseded running search");
		}

		self.state.previous_query = Some(input.to_owned());
		self.state.candidate_cache.clear();

		let tag = RunTag {
			generation: self.clock.next(),
			query: input.to_owned(),
		};
		let generation = tag.generation;

		match self.launcher.launch(tag, self.events.clone()) {
			Ok(handle) => {
				tracing::debug!(generation, query = %input, backend = self.backend.as_str(), "launched search");
				self.state.active = Some(handle);
				QueryDisposition::Launched { generation }
			}
			Err(error) => {
				tracing::warn!(query = %input, %error, "search backend failed to start");
				self.state.previous_query = None;
				QueryDisposition::LaunchFailed
			}
		}
	}

	/// Applies one event from a search run.
	///
	/// Events from runs other than the in-flight one for the current query are
	/// dropped. Returns whether the event was applied.
	pub fn handle_event(&mut self, event: SearchEvent) -> bool {
		if !self.state.is_current(&event.tag) {
			tracing::trace!(generation = event.tag.generation, query = %event.tag.query, "dropping stale search event");
			return false;
		}

		match event.kind {
			SearchEventKind::Output(records) => {
				if records.is_empty() {
					return true;
				}
				self.state.candidate_cache.extend(records);
				self.emit(QueryResult::from_paths(&event.tag.query, &self.state.candidate_cache));
			}
			SearchEventKind::Diagnostic(line) => {
				tracing::debug!(generation = event.tag.generation, diagnostic = %line, "search backend diagnostic");
			}
			SearchEventKind::Completed(outcome) => {
				tracing::debug!(
					generation = event.tag.generation,
					query = %event.tag.query,
					records = self.state.candidate_cache.len(),
					?outcome,
					"search completed"
				);
				self.state.active = None;
			}
		}
		true
	}

	/// Cancels the in-flight search, if any. Safe to call repeatedly.
	///
	/// Returns the generation of the run that was cancelled.
	pub fn handle_shutdown(&mut self) -> Option<u64> {
		let cancelled = self.state.cancel_active();
		if let Some(generation) = cancelled {
			tracing::debug!(generation, "cancelled search on shutdown");
		}
		cancelled
	}

	fn emit(&mut self, result: QueryResult) {
		if self.results.send(result).is_err() && !self.sink_closed {
			tracing::debug!("result sink closed; dropping results");
			self.sink_closed = true;
		}
	}
}

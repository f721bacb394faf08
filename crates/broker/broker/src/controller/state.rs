use crate::supervisor::{RunTag, SearchHandle};

/// Query lifecycle state, owned by exactly one controller.
///
/// * `active` is set iff a search for `previous_query` is in flight.
/// * `candidate_cache` holds results for `previous_query` only.
#[derive(Debug, Default)]
pub struct ControllerState {
	pub(super) previous_query: Option<String>,
	pub(super) active: Option<SearchHandle>,
	pub(super) candidate_cache: Vec<String>,
}

impl ControllerState {
	pub fn previous_query(&self) -> Option<&str> {
		self.previous_query.as_deref()
	}

	pub fn candidate_cache(&self) -> &[String] {
		&self.candidate_cache
	}

	pub fn active(&self) -> Option<&SearchHandle> {
		self.active.as_ref()
	}

	/// True when `tag` belongs to the in-flight run for the current query.
	pub(super) fn is_current(&self, tag: &RunTag) -> bool {
		self.active.as_ref().is_some_and(|handle| handle.generation() == tag.generation)
			&& self.previous_query.as_deref() == Some(tag.query.as_str())
	}

	/// Refinement needs an idle controller, something cached, and a query
	/// that literally extends the previous one.
	pub(super) fn can_refine(&self, input: &str) -> bool {
		self.active.is_none()
			&& !self.candidate_cache.is_empty()
			&& self.previous_query.as_deref().is_some_and(|previous| input.starts_with(previous))
	}

	/// Cancels and forgets the in-flight run, returning its generation.
	pub(super) fn cancel_active(&mut self) -> Option<u64> {
		let handle = self.active.take()?;
		handle.cancel();
		Some(handle.generation())
	}
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation source. Clones share one counter.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a clock whose first generation is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Cancellation token bound to one generation.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Creates a fresh, uncancelled token for `generation`.
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Repeated calls are no-ops.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Resolves once cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Child token in the same generation; cancelled with its parent.
	pub fn child(&self) -> Self {
		Self {
			generation: self.generation,
			cancel: self.cancel.child_token(),
		}
	}
}

use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static FALLBACK_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = FALLBACK_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("seek-worker")
			.build()
			.expect("failed to build seek-worker fallback runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task labelled with `class`.
///
/// Uses the caller's runtime when there is one, so tasks spawned from a
/// `#[tokio::test]` stay on the test runtime.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns a named OS thread for work that blocks, such as reading host stdin.
///
/// The thread is detached when the handle is dropped and never keeps the
/// process alive past `main`.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_named_thread");
	std::thread::Builder::new().name(name.into()).spawn(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn spawn_runs_on_current_runtime() {
		let value = spawn(TaskClass::Interactive, async { 41 + 1 }).await.ok();
		assert_eq!(value, Some(42));
	}

	#[test]
	fn spawn_outside_runtime_uses_fallback() {
		let handle = spawn(TaskClass::Background, async { "done" });
		let (tx, rx) = std::sync::mpsc::channel();
		spawn(TaskClass::Background, async move {
			let _ = tx.send(handle.await.ok());
		});
		assert_eq!(rx.recv().ok().flatten(), Some("done"));
	}

	#[test]
	fn named_thread_carries_its_name() {
		let handle = spawn_named_thread(TaskClass::IoBlocking, "seek-test-reader", || {
			std::thread::current().name().map(str::to_owned)
		})
		.unwrap();
		assert_eq!(handle.join().unwrap().as_deref(), Some("seek-test-reader"));
	}
}

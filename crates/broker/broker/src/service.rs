//! Host-facing broker service.
//!
//! [`BrokerHandle::spawn`] moves a [`QueryController`] into one task that
//! owns it outright. Host commands and search events both arrive as channel
//! messages and are handled one at a time, so controller state is never
//! touched from two places at once.

use std::time::Duration;

use seek_worker::TaskClass;
use tokio::sync::{mpsc, oneshot};

use crate::candidate::QueryResult;
use crate::config::BrokerConfig;
use crate::controller::QueryController;
use crate::supervisor::{ProcessLauncher, SearchEvent, SearchEventKind, SearchLauncher};
use crate::{Error, Result};

/// How long shutdown waits for a cancelled process to be reaped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum HostCommand {
	Query(String),
	Shutdown { done: Option<oneshot::Sender<()>> },
}

/// Cloneable host interface to a running broker.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
	tx: mpsc::UnboundedSender<HostCommand>,
	available: bool,
}

impl BrokerHandle {
	/// Starts a broker that runs the configured platform backend.
	///
	/// Returns the handle and the stream of `query-result` events. Must be
	/// called from within a tokio runtime.
	pub fn spawn(config: &BrokerConfig) -> (Self, mpsc::UnboundedReceiver<QueryResult>) {
		Self::spawn_with_launcher(config, Box::new(ProcessLauncher::from_config(config)))
	}

	/// Starts a broker with a custom launcher.
	pub fn spawn_with_launcher(config: &BrokerConfig, launcher: Box<dyn SearchLauncher>) -> (Self, mpsc::UnboundedReceiver<QueryResult>) {
		let (results_tx, results_rx) = mpsc::unbounded_channel();
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let (tx, rx) = mpsc::unbounded_channel();

		let controller = QueryController::new(config, launcher, results_tx, events_tx);
		let available = controller.is_available();
		if available {
			tracing::info!(backend = controller.backend().as_str(), "query broker started");
		} else {
			tracing::warn!(error = %Error::UnsupportedEnvironment, "query handling disabled");
		}

		seek_worker::spawn(TaskClass::Interactive, run_controller(controller, rx, events_rx));
		(Self { tx, available }, results_rx)
	}

	/// Whether queries sent through this handle can produce results.
	pub fn is_available(&self) -> bool {
		self.available
	}

	/// Submits one query. Dropped without error when no backend is available.
	pub fn query(&self, input: impl Into<String>) -> Result<()> {
		if !self.available {
			return Ok(());
		}
		self.tx.send(HostCommand::Query(input.into())).map_err(|_| Error::ServiceStopped)
	}

	/// Requests shutdown without waiting. Repeated calls are no-ops.
	pub fn shutdown(&self) {
		let _ = self.tx.send(HostCommand::Shutdown { done: None });
	}

	/// Requests shutdown and waits until the controller has stopped and any
	/// running search has been cancelled.
	pub async fn shutdown_and_wait(&self) {
		let (done_tx, done_rx) = oneshot::channel();
		if self.tx.send(HostCommand::Shutdown { done: Some(done_tx) }).is_ok() {
			let _ = done_rx.await;
		}
	}
}

async fn run_controller(mut controller: QueryController, mut commands: mpsc::UnboundedReceiver<HostCommand>, mut events: mpsc::UnboundedReceiver<SearchEvent>) {
	let done = loop {
		// Events already produced are applied before the next host command.
		tokio::select! {
			biased;
			Some(event) = events.recv() => {
				controller.handle_event(event);
			}
			cmd = commands.recv() => match cmd {
				Some(HostCommand::Query(input)) => {
					if controller.is_available() {
						controller.handle_query(&input);
					}
				}
				Some(HostCommand::Shutdown { done }) => break done,
				None => break None,
			},
		}
	};

	if let Some(generation) = controller.handle_shutdown() {
		await_completion(&mut events, generation).await;
	}
	commands.close();
	tracing::info!("query broker stopped");

	if let Some(done) = done {
		let _ = done.send(());
	}
	// Later shutdown requests may already be queued; let their waiters go.
	while let Ok(cmd) = commands.try_recv() {
		if let HostCommand::Shutdown { done: Some(done) } = cmd {
			let _ = done.send(());
		}
	}
}

/// Waits for the cancelled run to report completion so its process is reaped.
async fn await_completion(events: &mut mpsc::UnboundedReceiver<SearchEvent>, generation: u64) {
	let reaped = tokio::time::timeout(SHUTDOWN_GRACE, async {
		while let Some(event) = events.recv().await {
			if event.tag.generation == generation && matches!(event.kind, SearchEventKind::Completed(_)) {
				return;
			}
		}
	})
	.await;
	if reaped.is_err() {
		tracing::warn!(generation, "search process did not exit within shutdown grace period");
	}
}

//! Production launcher backed by `tokio::process`.

use std::path::PathBuf;
use std::process::Stdio;

use seek_worker::{GenerationToken, TaskClass};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::{EventSender, RunOutcome, RunTag, SearchEvent, SearchEventKind, SearchHandle, SearchLauncher};
use crate::backend::{Backend, Invocation};
use crate::candidate::LineSplitter;
use crate::config::BrokerConfig;
use crate::{Error, Result};

const READ_CHUNK: usize = 16 * 1024;

/// Launches the platform backend executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
	backend: Backend,
	executable: Option<PathBuf>,
}

impl ProcessLauncher {
	pub fn new(backend: Backend, executable: Option<PathBuf>) -> Self {
		Self { backend, executable }
	}

	pub fn from_config(config: &BrokerConfig) -> Self {
		Self::new(config.resolved_backend(), config.executable.clone())
	}

	pub fn backend(&self) -> Backend {
		self.backend
	}
}

impl SearchLauncher for ProcessLauncher {
	/// Spawns the backend and a background pump that owns the child.
	///
	/// Must be called from within a tokio runtime.
	fn launch(&self, tag: RunTag, events: EventSender) -> Result<SearchHandle> {
		let invocation = Invocation::new(self.backend, self.executable.as_deref(), &tag.query)?;
		let program = invocation.program_lossy();

		let mut child = Command::new(&invocation.program)
			.args(&invocation.args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::Spawn {
				program: program.clone(),
				reason: e.to_string(),
			})?;

		let stdout = child.stdout.take().ok_or_else(|| Error::Spawn {
			program: program.clone(),
			reason: "failed to capture stdout".into(),
		})?;
		let stderr = child.stderr.take().ok_or_else(|| Error::Spawn {
			program: program.clone(),
			reason: "failed to capture stderr".into(),
		})?;

		tracing::debug!(
			generation = tag.generation,
			query = %tag.query,
			program = %program,
			pid = ?child.id(),
			"search process started"
		);

		let token = GenerationToken::new(tag.generation);
		seek_worker::spawn(TaskClass::Background, run_search_io(child, stdout, stderr, tag.clone(), token.child(), events));

		Ok(SearchHandle::new(tag, token))
	}
}

/// Owns one child process until it exits or is cancelled, then reports
/// completion exactly once.
async fn run_search_io(mut child: Child, stdout: ChildStdout, stderr: ChildStderr, tag: RunTag, token: GenerationToken, events: EventSender) {
	let finished = async {
		forward_streams(stdout, stderr, &tag, &token, &events).await;
		child.wait().await
	};

	let outcome = tokio::select! {
		biased;
		_ = token.cancelled() => RunOutcome::Cancelled,
		status = finished => match status {
			Ok(status) => RunOutcome::Exited(status.code()),
			Err(e) => RunOutcome::Failed(e.to_string()),
		},
	};

	if outcome == RunOutcome::Cancelled
		&& let Err(e) = child.kill().await
	{
		tracing::debug!(generation = tag.generation, error = %e, "search process already gone");
	}

	tracing::debug!(generation = tag.generation, query = %tag.query, ?outcome, "search process finished");
	let _ = events.send(SearchEvent::new(tag, SearchEventKind::Completed(outcome)));
}

/// Pumps stdout batches and stderr lines until both pipes close.
pub(super) async fn forward_streams<O, E>(mut stdout: O, stderr: E, tag: &RunTag, token: &GenerationToken, events: &EventSender)
where
	O: AsyncRead + Unpin,
	E: AsyncRead + Unpin,
{
	let mut splitter = LineSplitter::new();
	let mut stderr = BufReader::new(stderr).lines();
	let mut buf = vec![0u8; READ_CHUNK];
	let mut stdout_open = true;
	let mut stderr_open = true;

	while stdout_open || stderr_open {
		tokio::select! {
			read = stdout.read(&mut buf), if stdout_open => match read {
				Ok(0) => {
					stdout_open = false;
					send_output(splitter.finish(), tag, token, events);
				}
				Ok(n) => send_output(splitter.push(&buf[..n]), tag, token, events),
				Err(e) => {
					tracing::warn!(generation = tag.generation, error = %e, "reading search output failed");
					stdout_open = false;
					send_output(splitter.finish(), tag, token, events);
				}
			},
			line = stderr.next_line(), if stderr_open => match line {
				Ok(Some(line)) if !line.trim().is_empty() && !token.is_cancelled() => {
					let _ = events.send(SearchEvent::new(tag.clone(), SearchEventKind::Diagnostic(line)));
				}
				Ok(Some(_)) => {}
				Ok(None) | Err(_) => stderr_open = false,
			},
		}
	}
}

fn send_output(records: Vec<String>, tag: &RunTag, token: &GenerationToken, events: &EventSender) {
	if records.is_empty() || token.is_cancelled() {
		return;
	}
	tracing::trace!(generation = tag.generation, records = records.len(), "search output batch");
	let _ = events.send(SearchEvent::new(tag.clone(), SearchEventKind::Output(records)));
}

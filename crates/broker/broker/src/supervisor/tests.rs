use std::path::{Path, PathBuf};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use super::*;
use crate::Error;
use crate::backend::Backend;

fn tag(generation: u64, query: &str) -> RunTag {
	RunTag {
		generation,
		query: query.to_string(),
	}
}

/// Collects events for one run until its completion arrives.
async fn collect_run(rx: &mut mpsc::UnboundedReceiver<SearchEvent>) -> Vec<SearchEventKind> {
	let mut kinds = Vec::new();
	loop {
		let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
			.await
			.expect("search run should complete")
			.expect("event channel open");
		let done = matches!(event.kind, SearchEventKind::Completed(_));
		kinds.push(event.kind);
		if done {
			return kinds;
		}
	}
}

fn output_records(kinds: &[SearchEventKind]) -> Vec<String> {
	kinds
		.iter()
		.filter_map(|k| match k {
			SearchEventKind::Output(records) => Some(records.clone()),
			_ => None,
		})
		.flatten()
		.collect()
}

/// Writes a shell script and returns its path. The script is run as
/// `sh <path>` through the positional-argument convention, so it never needs
/// the executable bit.
fn script(dir: &Path, body: &str) -> PathBuf {
	let path = dir.join("search.sh");
	std::fs::write(&path, body).unwrap();
	path
}

fn sh_launcher() -> ProcessLauncher {
	ProcessLauncher::new(Backend::Locate, Some(PathBuf::from("sh")))
}

#[cfg(unix)]
#[tokio::test]
async fn streams_output_then_completes() {
	let launcher = ProcessLauncher::new(Backend::Locate, Some(PathBuf::from("echo")));
	let (tx, mut rx) = mpsc::unbounded_channel();

	let handle = launcher.launch(tag(1, "/tmp/seek/report.txt"), tx).unwrap();
	assert_eq!(handle.generation(), 1);
	assert_eq!(handle.query(), "/tmp/seek/report.txt");

	let kinds = collect_run(&mut rx).await;
	assert_eq!(output_records(&kinds), vec!["/tmp/seek/report.txt".to_string()]);
	assert_eq!(kinds.last(), Some(&SearchEventKind::Completed(RunOutcome::Exited(Some(0)))));
}

#[cfg(unix)]
#[tokio::test]
async fn every_event_carries_the_run_tag() {
	let dir = tempfile::tempdir().unwrap();
	let path = script(dir.path(), "printf '/x/doc1\\n'\nsleep 0.1\nprintf '/x/doc2\\n'\n");
	let query = path.to_string_lossy().into_owned();
	let (tx, mut rx) = mpsc::unbounded_channel();

	let _handle = sh_launcher().launch(tag(9, &query), tx).unwrap();

	let mut seen = Vec::new();
	loop {
		let event = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
		assert_eq!(event.tag, tag(9, &query));
		let done = matches!(event.kind, SearchEventKind::Completed(_));
		seen.push(event.kind);
		if done {
			break;
		}
	}
	assert_eq!(output_records(&seen), vec!["/x/doc1".to_string(), "/x/doc2".to_string()]);
}

#[cfg(unix)]
#[tokio::test]
async fn stderr_lines_become_diagnostics() {
	let dir = tempfile::tempdir().unwrap();
	let path = script(dir.path(), "echo 'database is stale' >&2\necho /var/a\nexit 1\n");
	let (tx, mut rx) = mpsc::unbounded_channel();

	let _handle = sh_launcher().launch(tag(2, &path.to_string_lossy()), tx).unwrap();
	let kinds = collect_run(&mut rx).await;

	assert!(kinds.contains(&SearchEventKind::Diagnostic("database is stale".to_string())));
	assert_eq!(output_records(&kinds), vec!["/var/a".to_string()]);
	assert_eq!(kinds.last(), Some(&SearchEventKind::Completed(RunOutcome::Exited(Some(1)))));
}

#[cfg(unix)]
#[tokio::test]
async fn cancel_kills_the_process_and_completes_once() {
	let dir = tempfile::tempdir().unwrap();
	let path = script(dir.path(), "sleep 30\necho /never\n");
	let (tx, mut rx) = mpsc::unbounded_channel();

	let handle = sh_launcher().launch(tag(3, &path.to_string_lossy()), tx).unwrap();
	handle.cancel();
	handle.cancel();
	assert!(handle.is_cancelled());

	let kinds = collect_run(&mut rx).await;
	assert_eq!(kinds, vec![SearchEventKind::Completed(RunOutcome::Cancelled)]);

	drop(handle);
	let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
	assert!(!matches!(extra, Ok(Some(_))), "no events after completion");
}

#[cfg(unix)]
#[tokio::test]
async fn dropping_the_handle_cancels() {
	let dir = tempfile::tempdir().unwrap();
	let path = script(dir.path(), "sleep 30\n");
	let (tx, mut rx) = mpsc::unbounded_channel();

	drop(sh_launcher().launch(tag(4, &path.to_string_lossy()), tx).unwrap());

	let kinds = collect_run(&mut rx).await;
	assert_eq!(kinds, vec![SearchEventKind::Completed(RunOutcome::Cancelled)]);
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
	let launcher = ProcessLauncher::new(Backend::Locate, Some(PathBuf::from("/nonexistent/seek-backend")));
	let (tx, _rx) = mpsc::unbounded_channel();

	match launcher.launch(tag(5, "abc"), tx) {
		Err(Error::Spawn { program, .. }) => assert_eq!(program, "/nonexistent/seek-backend"),
		other => panic!("expected spawn error, got {other:?}"),
	}
}

#[tokio::test]
async fn unsupported_backend_never_spawns() {
	let launcher = ProcessLauncher::new(Backend::Unsupported, None);
	let (tx, _rx) = mpsc::unbounded_channel();
	assert!(matches!(launcher.launch(tag(6, "abc"), tx), Err(Error::UnsupportedEnvironment)));
}

/// Stdout stand-in that yields queued chunks, then fails.
struct FailingReader {
	chunks: std::collections::VecDeque<&'static [u8]>,
}

impl tokio::io::AsyncRead for FailingReader {
	fn poll_read(
		mut self: std::pin::Pin<&mut Self>,
		_cx: &mut std::task::Context<'_>,
		buf: &mut tokio::io::ReadBuf<'_>,
	) -> std::task::Poll<std::io::Result<()>> {
		match self.chunks.pop_front() {
			Some(chunk) => {
				buf.put_slice(chunk);
				std::task::Poll::Ready(Ok(()))
			}
			None => std::task::Poll::Ready(Err(std::io::Error::other("pipe torn down"))),
		}
	}
}

#[tokio::test]
async fn read_error_keeps_the_partial_tail() {
	let reader = FailingReader {
		chunks: [b"/a\n/b".as_slice()].into(),
	};
	let token = seek_worker::GenerationToken::new(3);
	let (tx, mut rx) = mpsc::unbounded_channel();

	super::process::forward_streams(reader, tokio::io::empty(), &tag(3, "abc"), &token, &tx).await;
	drop(tx);

	let mut kinds = Vec::new();
	while let Some(event) = rx.recv().await {
		kinds.push(event.kind);
	}
	assert_eq!(
		kinds,
		vec![
			SearchEventKind::Output(vec!["/a".to_string()]),
			SearchEventKind::Output(vec!["/b".to_string()]),
		]
	);
}

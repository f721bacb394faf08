//! seek: incremental file search broker.
//!
//! Reads queries from stdin, one per line, and writes each `query-result`
//! event to stdout as a JSON object on its own line. Logs go to stderr, or to
//! `$SEEK_LOG_DIR/seek.<pid>.log` when that variable is set.

use std::io::BufRead;
use std::path::PathBuf;

use clap::Parser;
use seek_broker::{BackendKind, BrokerConfig, BrokerHandle, QueryResult};
use seek_worker::TaskClass;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::info;

/// Command line arguments. Flags override the config file.
#[derive(Parser, Debug)]
#[command(name = "seek")]
#[command(about = "Incremental file search: queries on stdin, JSON results on stdout")]
struct Args {
	/// Config file [default: <config dir>/seek/config.toml]
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Search backend: auto, mdfind, locate or none
	#[arg(short, long, value_name = "KIND")]
	backend: Option<BackendKind>,

	/// Backend executable to run instead of the default
	#[arg(long, value_name = "PATH")]
	executable: Option<PathBuf>,

	/// Ignore queries shorter than this many characters
	#[arg(long, value_name = "N")]
	min_query_len: Option<usize>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

impl Args {
	fn load_config(&self) -> seek_broker::Result<BrokerConfig> {
		let mut config = match &self.config {
			Some(path) if !path.exists() => {
				return Err(seek_broker::Error::ConfigRead {
					path: path.clone(),
					error: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
				});
			}
			Some(path) => BrokerConfig::load_from(path)?,
			None => BrokerConfig::load()?,
		};

		if let Some(backend) = self.backend {
			config.backend = backend;
		}
		if let Some(executable) = &self.executable {
			config.executable = Some(executable.clone());
		}
		if let Some(min_query_len) = self.min_query_len {
			config.min_query_len = min_query_len;
		}
		Ok(config)
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = args.load_config()?;
	info!(?config, "starting seek");

	let (broker, results) = BrokerHandle::spawn(&config);
	let writer = tokio::spawn(write_results(results, tokio::io::stdout()));

	let mut queries = read_queries()?;
	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);

	loop {
		tokio::select! {
			line = queries.recv() => match line {
				Some(query) => broker.query(query?)?,
				None => break,
			},
			_ = &mut ctrl_c => {
				info!("interrupted");
				break;
			}
		}
	}

	broker.shutdown_and_wait().await;
	writer.await??;
	Ok(())
}

/// Reads stdin lines on a dedicated thread.
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime;
/// otherwise shutdown would wait on it until the host closes the pipe. The
/// channel closes at EOF or after the first read error.
fn read_queries() -> std::io::Result<mpsc::UnboundedReceiver<std::io::Result<String>>> {
	let (tx, rx) = mpsc::unbounded_channel();
	seek_worker::spawn_named_thread(TaskClass::IoBlocking, "seek-stdin", move || {
		for line in std::io::stdin().lock().lines() {
			let failed = line.is_err();
			if tx.send(line).is_err() || failed {
				break;
			}
		}
	})?;
	Ok(rx)
}

/// Writes results as JSON lines until the broker drops its sink.
async fn write_results<W>(mut results: mpsc::UnboundedReceiver<QueryResult>, mut out: W) -> std::io::Result<()>
where
	W: AsyncWrite + Unpin,
{
	let mut buf = Vec::new();
	while let Some(result) = results.recv().await {
		buf.clear();
		serde_json::to_writer(&mut buf, &result).map_err(std::io::Error::other)?;
		buf.push(b'\n');
		out.write_all(&buf).await?;
		out.flush().await?;
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	if let Some(log_dir) = std::env::var("SEEK_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("seek.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
				if verbose {
					EnvFilter::new("seek_broker=trace,seek_worker=trace,debug")
				} else {
					EnvFilter::new("seek_broker=debug,info")
				}
			});

			let file_layer = tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false).with_target(true);

			tracing_subscriber::registry().with(filter).with(file_layer).init();

			tracing::info!(path = ?log_path, "seek tracing initialized");
			return;
		}
	}

	// stdout carries results, so console logging goes to stderr.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_max_level(if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flags_override_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "backend = \"mdfind\"\nmin_query_len = 5\n").unwrap();

		let args = Args::try_parse_from([
			"seek",
			"--config",
			path.to_str().unwrap(),
			"--backend",
			"locate",
			"--executable",
			"/usr/bin/plocate",
		])
		.unwrap();
		let config = args.load_config().unwrap();

		assert_eq!(config.backend, BackendKind::Locate);
		assert_eq!(config.executable, Some(PathBuf::from("/usr/bin/plocate")));
		assert_eq!(config.min_query_len, 5);
	}

	#[test]
	fn explicit_missing_config_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("nope.toml");
		let args = Args::try_parse_from(["seek", "--config", missing.to_str().unwrap()]).unwrap();
		assert!(matches!(args.load_config(), Err(seek_broker::Error::ConfigRead { .. })));
	}

	#[tokio::test]
	async fn results_are_written_as_json_lines() {
		let (tx, rx) = mpsc::unbounded_channel();
		tx.send(QueryResult::from_paths("doc", &["/x/doc1".to_string()])).unwrap();
		tx.send(QueryResult::from_paths("docs", &Vec::<String>::new())).unwrap();
		drop(tx);

		let mut out = Vec::new();
		write_results(rx, &mut out).await.unwrap();

		assert_eq!(
			String::from_utf8(out).unwrap(),
			"{\"input\":\"doc\",\"candidates\":[{\"primaryText\":\"doc1\",\"secondaryText\":\"/x/doc1\"}]}\n\
			 {\"input\":\"docs\",\"candidates\":[]}\n"
		);
	}

	#[test]
	fn rejects_unknown_backend() {
		assert!(Args::try_parse_from(["seek", "--backend", "everything"]).is_err());
	}
}

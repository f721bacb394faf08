//! Error types for the query broker.

use std::io;
use std::path::PathBuf;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
///
/// None of these are fatal to a running broker: a failed launch degrades to
/// "no results" and the next query tries again.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No search backend exists for the current platform.
	#[error("no file search backend is available on this platform")]
	UnsupportedEnvironment,
	/// The backend executable could not be started.
	#[error("failed to spawn {program}: {reason}")]
	Spawn {
		/// Program that was being launched.
		program: String,
		/// Why the launch failed.
		reason: String,
	},
	/// Input/output errors from process pipes.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// A configuration file exists but could not be read.
	#[error("I/O error reading {path}: {error}")]
	ConfigRead {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: io::Error,
	},
	/// A configuration file is not valid TOML for [`crate::BrokerConfig`].
	#[error("invalid configuration: {0}")]
	ConfigParse(#[from] toml::de::Error),
	/// The controller task is no longer running.
	#[error("service stopped")]
	ServiceStopped,
}

//! Platform backend table.
//!
//! Each supported platform has exactly one search executable and one way of
//! passing it the query. The backend is picked once and handed to the
//! controller, so tests can exercise every variant on any host.

use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// The external search executable used for the current platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
	/// Spotlight metadata search: `mdfind -name <query>`.
	Mdfind,
	/// Path index search: `locate <query>`.
	Locate,
	/// Nothing usable on this platform.
	Unsupported,
}

impl Backend {
	/// Picks the backend for the platform this binary was built for.
	pub const fn detect() -> Self {
		if cfg!(target_os = "macos") {
			Self::Mdfind
		} else if cfg!(target_os = "linux") {
			Self::Locate
		} else {
			Self::Unsupported
		}
	}

	pub const fn is_available(self) -> bool {
		!matches!(self, Self::Unsupported)
	}

	/// Default executable name, looked up on `PATH`.
	pub const fn executable(self) -> Option<&'static str> {
		match self {
			Self::Mdfind => Some("mdfind"),
			Self::Locate => Some("locate"),
			Self::Unsupported => None,
		}
	}

	/// Arguments for one search. `mdfind` takes the query as a named flag,
	/// `locate` as a positional pattern.
	pub fn args(self, query: &str) -> Vec<OsString> {
		match self {
			Self::Mdfind => vec!["-name".into(), query.into()],
			Self::Locate => vec![query.into()],
			Self::Unsupported => Vec::new(),
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Mdfind => "mdfind",
			Self::Locate => "locate",
			Self::Unsupported => "unsupported",
		}
	}
}

/// Backend selection as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
	/// Use [`Backend::detect`].
	#[default]
	Auto,
	Mdfind,
	Locate,
	/// Disable searching entirely.
	None,
}

impl BackendKind {
	pub const fn resolve(self) -> Backend {
		match self {
			Self::Auto => Backend::detect(),
			Self::Mdfind => Backend::Mdfind,
			Self::Locate => Backend::Locate,
			Self::None => Backend::Unsupported,
		}
	}
}

impl std::str::FromStr for BackendKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"auto" => Ok(Self::Auto),
			"mdfind" => Ok(Self::Mdfind),
			"locate" => Ok(Self::Locate),
			"none" => Ok(Self::None),
			other => Err(format!("unknown backend '{other}' (expected auto, mdfind, locate or none)")),
		}
	}
}

/// A fully resolved command line for one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	pub program: OsString,
	pub args: Vec<OsString>,
}

impl Invocation {
	/// Builds the command line for `query`.
	///
	/// `executable` replaces the backend's default program name while keeping
	/// its argument convention.
	pub fn new(backend: Backend, executable: Option<&Path>, query: &str) -> Result<Self> {
		let default = backend.executable().ok_or(Error::UnsupportedEnvironment)?;
		let program = executable.map_or_else(|| OsString::from(default), |path| path.as_os_str().to_owned());
		Ok(Self {
			program,
			args: backend.args(query),
		})
	}

	/// Program name for logs and errors.
	pub fn program_lossy(&self) -> String {
		self.program.to_string_lossy().into_owned()
	}
}

//! Broker configuration.
//!
//! Read from `$XDG_CONFIG_HOME/seek/config.toml` (or the platform
//! equivalent). Every field is optional:
//!
//! ```toml
//! backend = "locate"          # auto | mdfind | locate | none
//! executable = "/usr/bin/plocate"
//! min_query_len = 3
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::{Backend, BackendKind};
use crate::{Error, Result};

/// Queries shorter than this many characters are ignored.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Runtime configuration for one broker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
	pub backend: BackendKind,
	/// Replaces the backend's default executable name.
	pub executable: Option<PathBuf>,
	pub min_query_len: usize,
}

impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			backend: BackendKind::Auto,
			executable: None,
			min_query_len: DEFAULT_MIN_QUERY_LEN,
		}
	}
}

impl BrokerConfig {
	/// Default config file location, if the platform has a config dir.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("seek").join("config.toml"))
	}

	/// Loads the default config file. A missing file yields defaults.
	pub fn load() -> Result<Self> {
		match Self::default_path() {
			Some(path) => Self::load_from(&path),
			None => Ok(Self::default()),
		}
	}

	/// Loads `path`. A missing file yields defaults.
	pub fn load_from(path: &Path) -> Result<Self> {
		match std::fs::read_to_string(path) {
			Ok(text) => {
				let config = Self::from_toml_str(&text)?;
				tracing::debug!(path = %path.display(), ?config, "loaded broker config");
				Ok(config)
			}
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(error) => Err(Error::ConfigRead {
				path: path.to_path_buf(),
				error,
			}),
		}
	}

	pub fn from_toml_str(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	/// The concrete backend this config selects.
	pub const fn resolved_backend(&self) -> Backend {
		self.backend.resolve()
	}
}

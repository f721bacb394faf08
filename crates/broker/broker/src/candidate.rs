//! Candidates and the outbound `query-result` event.

use std::path::Path;

use serde::Serialize;

/// One matched path as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
	/// Final path component.
	pub primary_text: String,
	/// Full path.
	pub secondary_text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub icon_path: Option<String>,
}

impl Candidate {
	/// Derives the display pair from a raw path record.
	///
	/// Paths without a final component (`/`, `..`) show the whole path as
	/// primary text.
	pub fn from_path(path: &str) -> Self {
		let primary_text = Path::new(path)
			.file_name()
			.map_or_else(|| path.to_owned(), |name| name.to_string_lossy().into_owned());
		Self {
			primary_text,
			secondary_text: path.to_owned(),
			icon_path: None,
		}
	}
}

/// A committed result set for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
	pub input: String,
	pub candidates: Vec<Candidate>,
}

impl QueryResult {
	/// Maps raw path records to candidates, preserving order.
	pub fn from_paths<'a>(input: &str, paths: impl IntoIterator<Item = &'a String>) -> Self {
		Self {
			input: input.to_owned(),
			candidates: paths.into_iter().map(|p| Candidate::from_path(p)).collect(),
		}
	}
}

/// Splits streamed process output into path records.
///
/// A record is only emitted once its terminating newline has been seen; the
/// unterminated tail of a chunk waits for the next chunk or for
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct LineSplitter {
	pending: Vec<u8>,
}

impl LineSplitter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one chunk and returns every record completed by it.
	pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
		self.pending.extend_from_slice(chunk);
		let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
			return Vec::new();
		};
		let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
		split_records(&complete)
	}

	/// Flushes the unterminated tail at end of stream.
	pub fn finish(&mut self) -> Vec<String> {
		let rest = std::mem::take(&mut self.pending);
		split_records(&rest)
	}
}

/// Splits on runs of newlines, dropping empty records and `\r` terminators.
pub fn split_records(bytes: &[u8]) -> Vec<String> {
	String::from_utf8_lossy(bytes)
		.split('\n')
		.map(|line| line.strip_suffix('\r').unwrap_or(line))
		.filter(|line| !line.is_empty())
		.map(str::to_owned)
		.collect()
}

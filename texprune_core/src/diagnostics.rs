use std::collections::BTreeMap;
use std::path::PathBuf;

use derive_more::Deref;
use serde::Serialize;

/// Named counters collected over a run, e.g. `inline_comments` or
/// `cmds_removed_todo`. Counters only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref)]
#[serde(transparent)]
pub struct Stats(BTreeMap<String, u64>);

impl Stats {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn increment(&mut self, key: impl Into<String>) {
		*self.0.entry(key.into()).or_default() += 1;
	}

	/// The value of a counter, `0` when it was never incremented.
	pub fn get(&self, key: &str) -> u64 {
		self.0.get(key).copied().unwrap_or_default()
	}
}

/// A non-fatal problem found while crawling. The run continues after each
/// of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlDiagnostic {
	/// The document the problem was found in, relative to the source root.
	pub file: PathBuf,
	#[serde(flatten)]
	pub kind: DiagnosticKind,
	/// 1-indexed. `0` when the problem has no source location.
	pub line: usize,
	pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
	/// An `\input` or `\include` whose target doesn't exist.
	MissingInclude { target: String },
	/// A graphic that doesn't exist under any of the probed extensions.
	MissingGraphic { target: String },
	/// A command with an unexpected number of required arguments.
	AnomalousArguments {
		command: String,
		expected: usize,
		got: usize,
	},
	/// A path argument that isn't plain text, e.g. `\input{\dir/file}`.
	UnresolvedArgument { command: String },
	/// The document couldn't be parsed and was skipped.
	ParseFailure { message: String },
	/// The output root document couldn't be renamed because the target
	/// already exists.
	RenameSkipped { from: PathBuf, to: PathBuf },
}

impl CrawlDiagnostic {
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::MissingInclude { target } => {
				format!("included file `{target}` not found")
			}
			DiagnosticKind::MissingGraphic { target } => {
				format!("graphics file `{target}` not found")
			}
			DiagnosticKind::AnomalousArguments {
				command,
				expected,
				got,
			} => {
				format!("`\\{command}` expects {expected} argument(s), found {got}")
			}
			DiagnosticKind::UnresolvedArgument { command } => {
				format!("the argument of `\\{command}` is not a plain path")
			}
			DiagnosticKind::ParseFailure { message } => {
				format!("failed to parse document: {message}")
			}
			DiagnosticKind::RenameSkipped { from, to } => {
				format!(
					"not renaming `{}` to `{}`: destination already exists",
					from.display(),
					to.display()
				)
			}
		}
	}
}

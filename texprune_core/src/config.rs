use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::PruneError;
use crate::PruneResult;

/// Supported config file locations in discovery order (highest precedence
/// first), relative to the directory of the root document.
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"texprune.toml",
	".texprune.toml",
	".config/texprune.toml",
];

/// Name of the root document in the output directory, without extension.
pub const DEFAULT_OUT_ROOT_DOC_NAME: &str = "ms";

/// Commands removed even when nothing else is configured.
pub const DEFAULT_REMOVED_COMMANDS: [&str; 1] = ["comment"];

/// How much of a comment survives suppression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMode {
	/// Reduce the comment to a bare `%` so the line break it swallowed stays
	/// swallowed.
	#[default]
	KeepMarker,
	/// Delete the comment text entirely.
	RemoveCompletely,
}

/// Contents of `texprune.toml`.
///
/// ```toml
/// out_root_doc_name = "main"
/// clear_out_dir = true
///
/// [commands]
/// remove = ["todo", "note"]
/// short_circuit = ["revised"]
///
/// [comments]
/// remove_completely = false
///
/// [keep]
/// files = ["figures/extra.pdf"]
///
/// [unused]
/// exclude = ["drafts/**", "*.bak"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PruneConfig {
	#[serde(default)]
	pub out_root_doc_name: Option<String>,
	#[serde(default)]
	pub clear_out_dir: bool,
	#[serde(default)]
	pub commands: CommandsConfig,
	#[serde(default)]
	pub comments: CommentsConfig,
	#[serde(default)]
	pub keep: KeepConfig,
	#[serde(default)]
	pub unused: UnusedConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CommandsConfig {
	/// Commands removed with everything they contain. Extends the default
	/// `comment`.
	#[serde(default)]
	pub remove: Vec<String>,
	/// Commands replaced by the content of their single argument.
	#[serde(default)]
	pub short_circuit: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CommentsConfig {
	#[serde(default)]
	pub remove_completely: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct KeepConfig {
	/// Files copied to the output even though no document references them.
	#[serde(default)]
	pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UnusedConfig {
	/// Glob patterns, relative to the source root, left out of the unused
	/// files report.
	#[serde(default)]
	pub exclude: Vec<String>,
}

impl PruneConfig {
	/// Resolve the first existing config file in the candidate list.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is no config file.
	pub fn load(root: &Path) -> PruneResult<Option<PruneConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: PruneConfig =
			toml::from_str(&content).map_err(|e| PruneError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// Everything that shapes a crawl. Built from the config file and then
/// extended by command line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
	/// Commands and environments removed outright, without the backslash.
	pub remove: Vec<String>,
	/// Commands replaced by the content of their argument.
	pub short_circuit: Vec<String>,
	/// Extra files to copy, resolved against the source root first.
	pub keep_files: Vec<PathBuf>,
	/// Name of the root document in the output, without extension.
	pub out_root_doc_name: String,
	pub comment_mode: CommentMode,
	/// Delete the output directory before writing to it.
	pub clear_out_dir: bool,
	/// Globs excluded from the unused files report.
	pub unused_exclude: Vec<String>,
}

impl Default for CrawlOptions {
	fn default() -> Self {
		Self {
			remove: DEFAULT_REMOVED_COMMANDS.map(String::from).to_vec(),
			short_circuit: Vec::new(),
			keep_files: Vec::new(),
			out_root_doc_name: DEFAULT_OUT_ROOT_DOC_NAME.to_string(),
			comment_mode: CommentMode::default(),
			clear_out_dir: false,
			unused_exclude: Vec::new(),
		}
	}
}

impl CrawlOptions {
	pub fn from_config(config: Option<&PruneConfig>) -> Self {
		let mut options = Self::default();
		let Some(config) = config else {
			return options;
		};

		options.remove_commands(&config.commands.remove);
		options.short_circuit_commands(&config.commands.short_circuit);
		options.keep_files.extend(config.keep.files.iter().cloned());
		options.unused_exclude = config.unused.exclude.clone();
		options.clear_out_dir = config.clear_out_dir;

		if let Some(name) = &config.out_root_doc_name {
			options.set_out_root_doc_name(name);
		}

		if config.comments.remove_completely {
			options.comment_mode = CommentMode::RemoveCompletely;
		}

		options
	}

	/// Add commands to remove. Names may be given with or without their
	/// backslash; duplicates are ignored.
	pub fn remove_commands<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		extend_names(&mut self.remove, names);
	}

	/// Add commands to short-circuit.
	pub fn short_circuit_commands<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		extend_names(&mut self.short_circuit, names);
	}

	/// Set the output root document name. A trailing `.tex` is dropped.
	pub fn set_out_root_doc_name(&mut self, name: &str) {
		let name = name.trim();
		self.out_root_doc_name = name.strip_suffix(".tex").unwrap_or(name).to_string();
	}

	pub(crate) fn unused_exclude_set(&self) -> GlobSet {
		build_glob_set(&self.unused_exclude)
	}
}

/// Normalize a command name as written by a user: trim it and drop a leading
/// backslash. Returns `None` when nothing is left.
pub fn normalize_command_name(name: &str) -> Option<String> {
	let name = name.trim();
	let name = name.strip_prefix('\\').unwrap_or(name);

	(!name.is_empty()).then(|| name.to_string())
}

fn extend_names<I, S>(target: &mut Vec<String>, names: I)
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	for name in names {
		let Some(name) = normalize_command_name(name.as_ref()) else {
			continue;
		};

		if !target.contains(&name) {
			target.push(name);
		}
	}
}

fn build_glob_set(patterns: &[String]) -> GlobSet {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		if let Ok(glob) = Glob::new(pattern) {
			builder.add(glob);
		}
	}
	builder.build().unwrap_or_else(|_| GlobSet::empty())
}

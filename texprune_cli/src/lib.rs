use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use texprune_core::CommentMode;
use texprune_core::CrawlOptions;
use texprune_core::PruneConfig;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Prepare a LaTeX project for submission: strip comments, prune commands and copy only the \
	         files the document needs.",
	long_about = "texprune reads a LaTeX root document, follows every \\input, \\include, \
	              \\includegraphics, local package and class it reaches, and writes a cleaned copy \
	              of exactly those files to a destination directory.\n\nComments are emptied, \
	              commands named with --remove-cmd disappear together with their arguments, and \
	              commands named with --short-circuit-cmd are replaced by their content. Files in \
	              the source directory that nothing references are listed at the end so they can \
	              be checked before submitting.\n\nSettings can also be stored in a \
	              `texprune.toml` next to the root document."
)]
pub struct PruneCli {
	/// The root document of the project, e.g. `paper/main.tex`.
	pub source: PathBuf,

	/// Directory the cleaned project is written to. Must not be the directory
	/// of the root document or one of its parents.
	pub out_dir: PathBuf,

	/// Commands to remove together with their arguments. Comma separated,
	/// may be repeated. `comment` is always removed.
	#[arg(long = "remove-cmd", value_name = "NAMES", value_delimiter = ',')]
	pub remove_cmd: Vec<String>,

	/// Commands to replace by the content of their single argument. Comma
	/// separated, may be repeated.
	#[arg(long = "short-circuit-cmd", value_name = "NAMES", value_delimiter = ',')]
	pub short_circuit_cmd: Vec<String>,

	/// Extra file to copy even though no document references it. Resolved
	/// against the source directory first. May be repeated.
	#[arg(long = "keep-file", value_name = "PATH")]
	pub keep_file: Vec<PathBuf>,

	/// Name of the root document in the destination. Defaults to `ms`.
	#[arg(long, value_name = "NAME")]
	pub out_root_doc_name: Option<String>,

	/// Delete the destination directory before writing to it.
	#[arg(long, default_value_t = false)]
	pub clear_out_dir: bool,

	/// Delete comments entirely instead of leaving a bare `%` behind.
	#[arg(long, default_value_t = false)]
	pub remove_comments_completely: bool,

	/// Output format for the final report. Use `text` for human-readable
	/// output or `json` for programmatic consumption.
	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,
}

impl PruneCli {
	/// Merge the flags on top of the config file: list flags extend the
	/// configured lists, scalar flags override them.
	pub fn crawl_options(&self, config: Option<&PruneConfig>) -> CrawlOptions {
		let mut options = CrawlOptions::from_config(config);

		options.remove_commands(&self.remove_cmd);
		options.short_circuit_commands(&self.short_circuit_cmd);
		options.keep_files.extend(self.keep_file.iter().cloned());

		if let Some(name) = &self.out_root_doc_name {
			options.set_out_root_doc_name(name);
		}

		if self.clear_out_dir {
			options.clear_out_dir = true;
		}

		if self.remove_comments_completely {
			options.comment_mode = CommentMode::RemoveCompletely;
		}

		options
	}
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// The full crawl report as JSON.
	Json,
}

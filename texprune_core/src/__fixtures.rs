use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use crate::*;

pub(crate) fn tempdir() -> TempDir {
	tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"))
}

/// Write `content` to `root/relative`, creating parent directories.
pub(crate) fn write(root: &Path, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
	path
}

pub(crate) fn read(path: impl AsRef<Path>) -> String {
	std::fs::read_to_string(path.as_ref())
		.unwrap_or_else(|e| panic!("read {}: {e}", path.as_ref().display()))
}

pub(crate) fn parsed(content: &str) -> Document {
	parse(content).unwrap_or_else(|e| panic!("parse: {e}"))
}

pub(crate) fn options_with(remove: &[&str], short_circuit: &[&str]) -> CrawlOptions {
	let mut options = CrawlOptions::default();
	options.remove_commands(remove);
	options.short_circuit_commands(short_circuit);
	options
}

/// The outcome of running the built-in rules over a single document.
#[derive(Debug)]
pub(crate) struct Rewritten {
	pub output: String,
	pub stats: Stats,
	pub diagnostics: Vec<CrawlDiagnostic>,
	pub queue: FileQueue,
}

/// Run `registry` over `content` with `root_dir` as the source root.
pub(crate) fn rewrite_with(
	root_dir: &Path,
	content: &str,
	registry: &RuleRegistry,
) -> PruneResult<Rewritten> {
	let mut document = parse(content)?;
	let mut queue = FileQueue::new();
	let mut stats = Stats::new();
	let mut diagnostics = Vec::new();

	let mut ctx = RuleContext {
		document: Path::new("main.tex"),
		root_dir,
		queue: &mut queue,
		stats: &mut stats,
		diagnostics: &mut diagnostics,
	};
	walk_document(&mut document, registry, &mut ctx)?;

	Ok(Rewritten {
		output: document.to_string(),
		stats,
		diagnostics,
		queue,
	})
}

/// Run the built-in rules over `content` in an empty source root.
pub(crate) fn rewrite(content: &str, options: &CrawlOptions) -> PruneResult<Rewritten> {
	let root = tempdir();
	rewrite_with(root.path(), content, &builtin_registry(options))
}

/// Records every node it sees and answers with a fixed action.
#[derive(Debug, Clone)]
pub(crate) struct RecordingRule {
	pub label: &'static str,
	pub action: Action,
	pub seen: Rc<RefCell<Vec<String>>>,
}

impl Rule for RecordingRule {
	fn apply(&self, site: &mut Site<'_>, _ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let name = site
			.node()
			.and_then(Node::name)
			.unwrap_or_default()
			.to_string();
		self.seen.borrow_mut().push(format!("{}:{name}", self.label));

		Ok(self.action)
	}
}

/// A small project:
///
/// ```text
/// main.tex          \input{sections/intro} \includegraphics{figures/plot}
/// main.aux, main.bbl
/// sections/intro.tex \include{sections/details}
/// sections/details.tex
/// figures/plot.pdf
/// figures/unused.png
/// notes.txt
/// .hidden
/// ```
pub(crate) fn sample_project() -> TempDir {
	let tmp = tempdir();
	let root = tmp.path();

	write(
		root,
		"main.tex",
		"\\documentclass{article}\n\\begin{document}\n% draft note\n\\input{sections/intro}\n\\includegraphics[width=\\linewidth]{figures/plot}\n\\end{document}\n",
	);
	write(root, "main.aux", "\\relax\n");
	write(root, "main.bbl", "\\begin{thebibliography}{1}\\end{thebibliography}\n");
	write(
		root,
		"sections/intro.tex",
		"Intro text. % remove me\n\\include{sections/details}\n",
	);
	write(root, "sections/details.tex", "Details.\n");
	write(root, "figures/plot.pdf", "%PDF-1.5");
	write(root, "figures/unused.png", "png");
	write(root, "notes.txt", "notes");
	write(root, ".hidden", "secret");

	tmp
}

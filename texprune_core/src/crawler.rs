use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::CrawlDiagnostic;
use crate::CrawlOptions;
use crate::DiagnosticKind;
use crate::PruneConfig;
use crate::PruneError;
use crate::PruneResult;
use crate::RuleContext;
use crate::RuleRegistry;
use crate::Stats;
use crate::builtin_registry;
use crate::parse;
use crate::walk_document;

/// Build byproducts that sit next to a document and are never copied.
pub const BYPRODUCT_EXTENSIONS_TO_IGNORE: [&str; 11] = [
	"aux",
	"blg",
	"log",
	"synctex.gz",
	"pdf",
	"fls",
	"fdb_latexmk",
	"out",
	"toc",
	"lof",
	"lot",
];

/// Build byproducts that sit next to a document and are needed to compile
/// it without the bibliography database.
pub const BYPRODUCT_EXTENSIONS_TO_KEEP: [&str; 2] = ["bbl", "brf"];

/// How a queued file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
	/// Parsed, rewritten and written out.
	Document,
	/// Copied verbatim.
	Graphics,
	/// Copied verbatim.
	OpaqueCopy,
	/// Not copied. Queued only so it isn't reported as unused.
	Ignore,
}

impl Display for FileType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Document => "document",
			Self::Graphics => "graphics",
			Self::OpaqueCopy => "copy",
			Self::Ignore => "ignore",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileQueueEntry {
	pub path: PathBuf,
	pub file_type: FileType,
}

/// A FIFO of files to process that accepts every path at most once. The
/// first [`FileType`] a path is queued with wins, even after the entry has
/// been processed.
#[derive(Debug, Default)]
pub struct FileQueue {
	pending: VecDeque<FileQueueEntry>,
	seen: HashSet<PathBuf>,
	history: Vec<FileQueueEntry>,
}

impl FileQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue `path`, keyed by its canonical form. Returns `false` when the
	/// path was queued before.
	pub fn enqueue(&mut self, path: impl AsRef<Path>, file_type: FileType) -> bool {
		let path = canonical_path(path.as_ref());
		if !self.seen.insert(path.clone()) {
			debug!(path = %path.display(), %file_type, "already queued");
			return false;
		}

		debug!(path = %path.display(), %file_type, "queued");
		let entry = FileQueueEntry { path, file_type };
		self.history.push(entry.clone());
		self.pending.push_back(entry);

		true
	}

	pub fn pop(&mut self) -> Option<FileQueueEntry> {
		self.pending.pop_front()
	}

	pub fn is_seen(&self, path: impl AsRef<Path>) -> bool {
		self.seen.contains(&canonical_path(path.as_ref()))
	}

	pub fn pending_len(&self) -> usize {
		self.pending.len()
	}

	/// Every entry ever queued, in queue order.
	pub fn history(&self) -> &[FileQueueEntry] {
		&self.history
	}
}

/// The canonical form of `path`, or its absolute form when it doesn't exist.
pub fn canonical_path(path: &Path) -> PathBuf {
	path.canonicalize()
		.or_else(|_| std::path::absolute(path))
		.unwrap_or_else(|_| path.to_path_buf())
}

/// Everything a run produced, ready for display or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
	pub root_document: PathBuf,
	pub out_dir: PathBuf,
	/// Every queued file, relative to the source root where possible.
	pub files: Vec<FileQueueEntry>,
	/// Files under the source root that no document reached.
	pub unused_files: Vec<PathBuf>,
	pub stats: Stats,
	pub diagnostics: Vec<CrawlDiagnostic>,
}

/// Crawls a LaTeX project from its root document and writes the files the
/// document actually needs into an output directory.
#[derive(Debug)]
pub struct Crawler {
	options: CrawlOptions,
	root_doc: PathBuf,
	root_dir: PathBuf,
	out_dir: PathBuf,
	keep_files: Vec<PathBuf>,
	registry: RuleRegistry,
	queue: FileQueue,
	stats: Stats,
	diagnostics: Vec<CrawlDiagnostic>,
}

impl Crawler {
	/// Validate the paths and prepare a crawl. Fails when the root document
	/// or a keep-file is missing, or when the output directory is, or
	/// contains, the source root.
	pub fn new(
		root_doc: impl AsRef<Path>,
		out_dir: impl AsRef<Path>,
		options: CrawlOptions,
	) -> PruneResult<Self> {
		let root_doc = root_doc.as_ref();
		if !root_doc.is_file() {
			return Err(PruneError::RootDocumentNotFound(
				root_doc.display().to_string(),
			));
		}

		let root_doc = canonical_path(root_doc);
		let root_dir = root_doc
			.parent()
			.map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
		let out_dir = canonical_path(out_dir.as_ref());

		if out_dir == root_dir {
			return Err(PruneError::OutputIsSourceRoot(out_dir.display().to_string()));
		}

		if root_dir.starts_with(&out_dir) {
			return Err(PruneError::OutputContainsSourceRoot {
				out_dir: out_dir.display().to_string(),
				root_dir: root_dir.display().to_string(),
			});
		}

		let keep_files = options
			.keep_files
			.iter()
			.map(|file| resolve_keep_file(&root_dir, file))
			.collect::<PruneResult<Vec<_>>>()?;
		let registry = builtin_registry(&options);

		Ok(Self {
			options,
			root_doc,
			root_dir,
			out_dir,
			keep_files,
			registry,
			queue: FileQueue::new(),
			stats: Stats::new(),
			diagnostics: Vec::new(),
		})
	}

	pub fn root_doc(&self) -> &Path {
		&self.root_doc
	}

	pub fn root_dir(&self) -> &Path {
		&self.root_dir
	}

	pub fn out_dir(&self) -> &Path {
		&self.out_dir
	}

	pub fn queue(&self) -> &FileQueue {
		&self.queue
	}

	pub fn stats(&self) -> &Stats {
		&self.stats
	}

	pub fn diagnostics(&self) -> &[CrawlDiagnostic] {
		&self.diagnostics
	}

	/// Queue a file by hand. See [`FileQueue::enqueue`].
	pub fn enqueue(&mut self, path: impl AsRef<Path>, file_type: FileType) -> bool {
		self.queue.enqueue(path, file_type)
	}

	/// Delete the output directory and everything in it.
	pub fn clear_out_dir(&self) -> PruneResult<()> {
		if self.out_dir.exists() {
			info!(out_dir = %self.out_dir.display(), "clearing output directory");
			std::fs::remove_dir_all(&self.out_dir)?;
		}

		Ok(())
	}

	/// Process the root document and everything reachable from it, then
	/// rename the root document in the output.
	pub fn run(&mut self) -> PruneResult<()> {
		if self.options.clear_out_dir {
			self.clear_out_dir()?;
		}

		if let Some(config_path) = PruneConfig::resolve_path(&self.root_dir) {
			self.queue.enqueue(config_path, FileType::Ignore);
		}

		for file in &self.keep_files {
			self.queue.enqueue(file, FileType::OpaqueCopy);
		}
		self.queue.enqueue(&self.root_doc, FileType::Document);

		while let Some(entry) = self.queue.pop() {
			match entry.file_type {
				FileType::Document => self.process_document(&entry.path)?,
				FileType::Graphics | FileType::OpaqueCopy => self.copy_file(&entry.path)?,
				FileType::Ignore => {}
			}
		}

		self.rename_root_document()
	}

	/// Files under the source root that were never queued, relative to the
	/// root. Hidden files, the output directory and the configured exclude
	/// globs are left out.
	pub fn unused_files(&self) -> Vec<PathBuf> {
		let exclude = self.options.unused_exclude_set();
		let out_dir = canonical_path(&self.out_dir);
		let walker = WalkBuilder::new(&self.root_dir)
			.standard_filters(false)
			.hidden(true)
			.filter_entry(move |entry| !entry.path().starts_with(&out_dir))
			.build();

		let mut unused: Vec<PathBuf> = walker
			.flatten()
			.filter(|entry| entry.path().is_file())
			.filter(|entry| !self.queue.is_seen(entry.path()))
			.filter_map(|entry| {
				entry
					.path()
					.strip_prefix(&self.root_dir)
					.ok()
					.map(Path::to_path_buf)
			})
			.filter(|relative| !exclude.is_match(relative))
			.collect();

		unused.sort();
		unused
	}

	pub fn report(&self) -> CrawlReport {
		let files = self
			.queue
			.history()
			.iter()
			.map(|entry| {
				FileQueueEntry {
					path: self.relative(&entry.path).to_path_buf(),
					file_type: entry.file_type,
				}
			})
			.collect();

		CrawlReport {
			root_document: self.root_doc.clone(),
			out_dir: self.out_dir.clone(),
			files,
			unused_files: self.unused_files(),
			stats: self.stats.clone(),
			diagnostics: self.diagnostics.clone(),
		}
	}

	fn relative<'p>(&self, path: &'p Path) -> &'p Path {
		path.strip_prefix(&self.root_dir).unwrap_or(path)
	}

	/// Where `path` goes in the output. Files outside the source root are
	/// placed at the top of the output directory.
	fn out_path(&self, path: &Path) -> PathBuf {
		match path.strip_prefix(&self.root_dir) {
			Ok(relative) => self.out_dir.join(relative),
			Err(_) => self.out_dir.join(path.file_name().unwrap_or(path.as_os_str())),
		}
	}

	fn process_document(&mut self, path: &Path) -> PruneResult<()> {
		let relative = self.relative(path).to_path_buf();
		info!(file = %relative.display(), "processing document");

		let (content, encoding) = SourceEncoding::decode(std::fs::read(path)?);
		if encoding == SourceEncoding::Latin1 {
			debug!(file = %relative.display(), "not valid UTF-8, reading bytes as Latin-1");
		}

		let mut document = match parse(&content) {
			Ok(document) => document.with_path(path),
			Err(error) => {
				warn!(file = %relative.display(), %error, "skipping unparseable document");
				let (line, column) = error.location().unwrap_or_default();
				self.diagnostics.push(CrawlDiagnostic {
					file: relative,
					kind: DiagnosticKind::ParseFailure {
						message: error.to_string(),
					},
					line,
					column,
				});
				return Ok(());
			}
		};

		let mut ctx = RuleContext {
			document: &relative,
			root_dir: &self.root_dir,
			queue: &mut self.queue,
			stats: &mut self.stats,
			diagnostics: &mut self.diagnostics,
		};
		walk_document(&mut document, &self.registry, &mut ctx)?;

		let target = self.out_path(path);
		write_file(&target, &encoding.encode(&document.to_string()))?;

		self.queue_byproducts(path);

		Ok(())
	}

	fn queue_byproducts(&mut self, path: &Path) {
		for extension in BYPRODUCT_EXTENSIONS_TO_IGNORE {
			let candidate = path.with_extension(extension);
			if candidate.is_file() {
				self.queue.enqueue(candidate, FileType::Ignore);
			}
		}

		for extension in BYPRODUCT_EXTENSIONS_TO_KEEP {
			let candidate = path.with_extension(extension);
			if candidate.is_file() {
				self.queue.enqueue(candidate, FileType::OpaqueCopy);
			}
		}
	}

	fn copy_file(&self, path: &Path) -> PruneResult<()> {
		let target = self.out_path(path);
		debug!(from = %path.display(), to = %target.display(), "copying");

		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::copy(path, &target)?;

		Ok(())
	}

	/// Give the root document and its kept byproducts the configured output
	/// name. Existing files are never overwritten.
	fn rename_root_document(&mut self) -> PruneResult<()> {
		let Some(stem) = self.root_doc.file_stem().and_then(|stem| stem.to_str()) else {
			return Ok(());
		};
		let extension = self
			.root_doc
			.extension()
			.and_then(|extension| extension.to_str())
			.unwrap_or("tex");

		let extensions = std::iter::once(extension).chain(BYPRODUCT_EXTENSIONS_TO_KEEP);
		for extension in extensions {
			let from = self.out_dir.join(format!("{stem}.{extension}"));
			let to = self
				.out_dir
				.join(format!("{}.{extension}", self.options.out_root_doc_name));

			if from == to || !from.is_file() {
				continue;
			}

			if to.exists() {
				warn!(to = %to.display(), "not renaming, destination exists");
				let file = self.relative(&self.root_doc).to_path_buf();
				self.diagnostics.push(CrawlDiagnostic {
					file,
					kind: DiagnosticKind::RenameSkipped { from, to },
					line: 0,
					column: 0,
				});
				continue;
			}

			debug!(from = %from.display(), to = %to.display(), "renaming");
			std::fs::rename(&from, &to)?;
		}

		Ok(())
	}
}

/// How a document's bytes were turned into text. Sources that are not valid
/// UTF-8 (`inputenc` with `latin1`, for instance) are read one byte per
/// character so that writing them back reproduces every byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceEncoding {
	Utf8,
	Latin1,
}

impl SourceEncoding {
	fn decode(bytes: Vec<u8>) -> (String, Self) {
		match String::from_utf8(bytes) {
			Ok(content) => (content, Self::Utf8),
			Err(error) => {
				let content = error.as_bytes().iter().copied().map(char::from).collect();
				(content, Self::Latin1)
			}
		}
	}

	fn encode(self, content: &str) -> Vec<u8> {
		match self {
			Self::Utf8 => content.as_bytes().to_vec(),
			Self::Latin1 => {
				content
					.chars()
					.map(|character| u8::try_from(character).unwrap_or(b'?'))
					.collect()
			}
		}
	}
}

/// Resolve a keep-file against the source root first, then as given.
fn resolve_keep_file(root_dir: &Path, file: &Path) -> PruneResult<PathBuf> {
	let under_root = root_dir.join(file);
	if under_root.is_file() {
		return Ok(under_root);
	}

	if file.is_file() {
		return Ok(file.to_path_buf());
	}

	Err(PruneError::KeepFileNotFound(file.display().to_string()))
}

fn write_file(path: &Path, content: &[u8]) -> PruneResult<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;

	Ok(())
}

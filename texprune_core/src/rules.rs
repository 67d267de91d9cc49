use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::Action;
use crate::CommentMode;
use crate::CrawlOptions;
use crate::DiagnosticKind;
use crate::FileType;
use crate::Node;
use crate::NodeKind;
use crate::PruneError;
use crate::PruneResult;
use crate::Rule;
use crate::RuleContext;
use crate::RuleRegistry;
use crate::Site;
use crate::parser::DECLARATION_COMMANDS;

/// Commands that pull in another document.
pub const INCLUDE_COMMANDS: [&str; 2] = ["input", "include"];
/// Commands and environments that reference graphics files.
pub const GRAPHICS_COMMANDS: [&str; 2] = ["includegraphics", "overpic"];
/// Extensions tried, in order, for a graphic referenced without one.
pub const GRAPHICS_EXTENSIONS: [&str; 5] = ["pdf", "png", "jpg", "jpeg", "eps"];
/// Commands that load packages.
pub const PACKAGE_COMMANDS: [&str; 2] = ["usepackage", "RequirePackage"];

/// Build the registry used by a crawl. Rules for the same name run in the
/// order they are registered here, so a removed `\input` is still resolved
/// first and a declaration of a removed command is pruned before anything
/// looks inside it.
pub fn builtin_registry(options: &CrawlOptions) -> RuleRegistry {
	let mut registry = RuleRegistry::new();

	registry.register_text(SuppressComment {
		mode: options.comment_mode,
	});

	for name in INCLUDE_COMMANDS {
		registry.register(name, ResolveInclude);
	}

	let pruned: HashSet<String> = options
		.remove
		.iter()
		.chain(&options.short_circuit)
		.cloned()
		.collect();
	for name in DECLARATION_COMMANDS {
		registry.register(
			name,
			PruneDeclaration {
				names: pruned.clone(),
			},
		);
	}

	for name in PACKAGE_COMMANDS {
		registry.register(name, ResolveSupportFile { extension: "sty" });
	}
	registry.register("documentclass", ResolveSupportFile { extension: "cls" });

	for name in GRAPHICS_COMMANDS {
		registry.register(name, ResolveGraphics);
	}

	for name in &options.remove {
		registry.register(name.as_str(), RemoveNode);
	}

	for name in &options.short_circuit {
		registry.register(name.as_str(), ShortCircuit);
	}

	registry
}

/// Empties comments, leaving a `%` behind unless configured otherwise.
#[derive(Debug, Clone, Copy)]
pub struct SuppressComment {
	pub mode: CommentMode,
}

impl Rule for SuppressComment {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(text) = site.node_mut().and_then(Node::as_text_mut) else {
			return Ok(Action::Continue);
		};

		if !text.is_comment() {
			return Ok(Action::Continue);
		}

		text.content = match self.mode {
			CommentMode::KeepMarker => crate::COMMENT_MARKER.to_string(),
			CommentMode::RemoveCompletely => String::new(),
		};
		ctx.stats.increment("inline_comments");

		Ok(Action::StopDescent)
	}
}

/// Deletes the node and everything it contains.
#[derive(Debug, Clone, Copy)]
pub struct RemoveNode;

impl Rule for RemoveNode {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let node = site.remove()?;
		let name = node.name().unwrap_or_default();
		debug!(command = name, line = node.position.start.line, "removed");
		ctx.stats.increment(format!("cmds_removed_{name}"));

		Ok(Action::StopDescent)
	}
}

/// Replaces a command by the content of its only argument, or removes it
/// when it has none. Content owned by open-ended commands such as `\item` is
/// kept after the replacement.
///
/// An environment is replaced by its body alone. Its arguments are settings
/// such as the width of a `minipage` or the columns of a `tabular`, so they
/// are dropped whatever their number.
#[derive(Debug, Clone, Copy)]
pub struct ShortCircuit;

impl Rule for ShortCircuit {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(node) = site.node_mut() else {
			return Ok(Action::Continue);
		};

		let name = node.name().unwrap_or_default().to_string();
		let replacement = match &mut node.kind {
			NodeKind::Command(command) => {
				if command.args.len() > 1 {
					return Err(PruneError::AmbiguousShortCircuit {
						name,
						args: command.args.len(),
					});
				}

				let mut replacement: Vec<Node> = command
					.args
					.pop()
					.map(|argument| {
						match argument.kind {
							NodeKind::Argument(argument) => argument.children,
							_ => vec![argument],
						}
					})
					.unwrap_or_default();
				replacement.append(&mut command.extras);
				replacement
			}
			NodeKind::Environment(environment) => {
				if !environment.args.is_empty() {
					debug!(
						environment = %name,
						args = environment.args.len(),
						"dropping environment arguments"
					);
				}
				std::mem::take(&mut environment.body)
			}
			NodeKind::Text(_) | NodeKind::Argument(_) => return Ok(Action::Continue),
		};

		site.replace(replacement)?;
		ctx.stats.increment(format!("cmds_shortcircuited_{name}"));

		Ok(Action::Continue)
	}
}

/// Removes `\newcommand` and friends when they declare a command that is
/// being removed or short-circuited.
#[derive(Debug, Clone)]
pub struct PruneDeclaration {
	pub names: HashSet<String>,
}

impl Rule for PruneDeclaration {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let declared = site
			.node()
			.and_then(Node::as_command)
			.and_then(|command| command.arguments().next())
			.and_then(|argument| {
				match argument.children.iter().find_map(Node::as_command) {
					Some(command) => Some(command.name.clone()),
					None => argument.text_value(),
				}
			});

		let Some(declared) = declared else {
			return Ok(Action::Continue);
		};

		let declared = declared.strip_prefix('\\').unwrap_or(&declared);
		if !self.names.contains(declared) {
			return Ok(Action::Continue);
		}

		debug!(command = declared, "pruned declaration");
		site.remove()?;
		ctx.stats.increment("declarations_removed");

		Ok(Action::StopDescent)
	}
}

/// Queues the document named by `\input{…}` or `\include{…}`.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInclude;

impl Rule for ResolveInclude {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(node) = site.node() else {
			return Ok(Action::Continue);
		};

		let Some(target) = single_path_argument(node, ctx) else {
			return Ok(Action::Continue);
		};

		match find_document(ctx.root_dir, &target) {
			Some(path) => {
				ctx.queue.enqueue(&path, FileType::Document);
			}
			None => {
				ctx.report(node.position, DiagnosticKind::MissingInclude { target });
			}
		}

		Ok(Action::Continue)
	}
}

/// Queues every graphic named by `\includegraphics{…}` or an `overpic`
/// environment.
#[derive(Debug, Clone, Copy)]
pub struct ResolveGraphics;

impl Rule for ResolveGraphics {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(node) = site.node() else {
			return Ok(Action::Continue);
		};

		let name = node.name().unwrap_or_default();
		for argument in node.required_args() {
			let Some(target) = argument.text_value() else {
				ctx.report(
					node.position,
					DiagnosticKind::UnresolvedArgument {
						command: name.to_string(),
					},
				);
				continue;
			};

			match find_graphic(ctx.root_dir, &target) {
				Some(path) => {
					ctx.queue.enqueue(&path, FileType::Graphics);
				}
				None => {
					ctx.report(node.position, DiagnosticKind::MissingGraphic { target });
				}
			}
		}

		Ok(Action::Continue)
	}
}

/// Queues local `.sty` or `.cls` files loaded by `\usepackage`,
/// `\RequirePackage` or `\documentclass`. Packages that aren't next to the
/// root document come from the TeX distribution and are skipped.
#[derive(Debug, Clone, Copy)]
pub struct ResolveSupportFile {
	pub extension: &'static str,
}

impl Rule for ResolveSupportFile {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(node) = site.node() else {
			return Ok(Action::Continue);
		};

		let Some(packages) = single_path_argument(node, ctx) else {
			return Ok(Action::Continue);
		};

		for package in packages.split(',').map(str::trim).filter(|p| !p.is_empty()) {
			let path = ctx.root_dir.join(format!("{package}.{}", self.extension));
			if path.is_file() {
				ctx.queue.enqueue(&path, FileType::OpaqueCopy);
			} else {
				debug!(package, "not a local {} file", self.extension);
			}
		}

		Ok(Action::Continue)
	}
}

/// The text of the only required argument of `node`. Reports a diagnostic
/// and returns `None` when there isn't exactly one or it isn't plain text.
fn single_path_argument(node: &Node, ctx: &mut RuleContext<'_>) -> Option<String> {
	let name = node.name().unwrap_or_default();
	let required = node.required_args();

	if required.len() != 1 {
		ctx.report(
			node.position,
			DiagnosticKind::AnomalousArguments {
				command: name.to_string(),
				expected: 1,
				got: required.len(),
			},
		);
		return None;
	}

	let value = required[0].text_value().filter(|value| !value.is_empty());
	if value.is_none() {
		ctx.report(
			node.position,
			DiagnosticKind::UnresolvedArgument {
				command: name.to_string(),
			},
		);
	}

	value
}

/// Resolve an included document: the path as written, then with `.tex`
/// appended.
pub fn find_document(root_dir: &Path, target: &str) -> Option<PathBuf> {
	let literal = root_dir.join(target);
	if literal.is_file() {
		return Some(literal);
	}

	let with_extension = append_extension(&literal, "tex");
	with_extension.is_file().then_some(with_extension)
}

/// Resolve a graphic: the path as written, then with each of
/// [`GRAPHICS_EXTENSIONS`] appended.
pub fn find_graphic(root_dir: &Path, target: &str) -> Option<PathBuf> {
	let literal = root_dir.join(target);
	if literal.is_file() {
		return Some(literal);
	}

	GRAPHICS_EXTENSIONS
		.iter()
		.map(|extension| append_extension(&literal, extension))
		.find(|candidate| candidate.is_file())
}

/// `fig.v2` + `pdf` is `fig.v2.pdf`, unlike [`Path::with_extension`].
fn append_extension(path: &Path, extension: &str) -> PathBuf {
	let mut appended = OsString::from(path.as_os_str());
	appended.push(".");
	appended.push(extension);
	PathBuf::from(appended)
}

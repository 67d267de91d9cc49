use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

use tracing::warn;

use crate::CrawlDiagnostic;
use crate::DiagnosticKind;
use crate::Document;
use crate::FileQueue;
use crate::Node;
use crate::NodeId;
use crate::Position;
use crate::PruneResult;
use crate::Stats;
use crate::tree;

/// What the walker should do after a rule ran on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
	/// Visit the node's children and run the remaining rules.
	#[default]
	Continue,
	/// Skip the node's children and the remaining rules.
	StopDescent,
}

/// A rewrite rule, keyed in the [`RuleRegistry`] by command or environment
/// name. Rules inspect and mutate the tree through a [`Site`] and report
/// side effects through the [`RuleContext`].
pub trait Rule: Debug {
	fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action>;
}

/// Shared state available to rules while a document is walked.
pub struct RuleContext<'a> {
	/// The document being walked, relative to the source root.
	pub document: &'a Path,
	/// Directory of the root document. Relative paths in `\input`,
	/// `\includegraphics` and friends resolve against it.
	pub root_dir: &'a Path,
	pub queue: &'a mut FileQueue,
	pub stats: &'a mut Stats,
	pub diagnostics: &'a mut Vec<CrawlDiagnostic>,
}

impl RuleContext<'_> {
	/// Record a non-fatal problem at `position` in the current document.
	pub fn report(&mut self, position: Position, kind: DiagnosticKind) {
		let diagnostic = CrawlDiagnostic {
			file: self.document.to_path_buf(),
			kind,
			line: position.start.line,
			column: position.start.column,
		};

		warn!(
			file = %diagnostic.file.display(),
			line = diagnostic.line,
			"{}",
			diagnostic.message()
		);
		self.diagnostics.push(diagnostic);
	}
}

/// What has happened to the node a [`Site`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Kept,
	Removed,
	/// Replaced by this many nodes, spliced in at the same index.
	Replaced(usize),
}

/// A node in the context of its parent. Rules detach the node through the
/// site so the walker can tell where to continue.
#[derive(Debug)]
pub struct Site<'a> {
	parent: &'a mut Node,
	index: usize,
	id: NodeId,
	outcome: Outcome,
}

impl<'a> Site<'a> {
	/// The site of the child at `index`, or `None` past the last child.
	pub fn new(parent: &'a mut Node, index: usize) -> Option<Self> {
		let id = parent.child(index)?.id();

		Some(Self {
			parent,
			index,
			id,
			outcome: Outcome::Kept,
		})
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn outcome(&self) -> Outcome {
		self.outcome
	}

	pub fn parent(&self) -> &Node {
		self.parent
	}

	/// The node, while it is still attached.
	pub fn node(&self) -> Option<&Node> {
		if self.outcome != Outcome::Kept {
			return None;
		}

		self.parent.child(self.index)
	}

	pub fn node_mut(&mut self) -> Option<&mut Node> {
		if self.outcome != Outcome::Kept {
			return None;
		}

		self.parent.child_mut(self.index)
	}

	/// Detach the node from its parent and return it.
	pub fn remove(&mut self) -> PruneResult<Node> {
		let node = tree::remove(self.parent, self.id)?;
		self.outcome = Outcome::Removed;

		Ok(node)
	}

	/// Detach the node and splice `replacement` into its place.
	pub fn replace(&mut self, replacement: Vec<Node>) -> PruneResult<Node> {
		let count = replacement.len();
		let node = tree::replace(self.parent, self.id, replacement)?;
		self.outcome = Outcome::Replaced(count);

		Ok(node)
	}
}

/// Rules grouped by the name they apply to, in registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
	text_rules: Vec<Box<dyn Rule>>,
	named_rules: HashMap<String, Vec<Box<dyn Rule>>>,
}

impl RuleRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a rule that runs on every text node.
	pub fn register_text(&mut self, rule: impl Rule + 'static) {
		self.text_rules.push(Box::new(rule));
	}

	/// Register a rule for commands and environments called `name`.
	pub fn register(&mut self, name: impl Into<String>, rule: impl Rule + 'static) {
		self.named_rules
			.entry(name.into())
			.or_default()
			.push(Box::new(rule));
	}

	/// Rules that apply to `node`, in registration order.
	pub fn rules_for(&self, node: &Node) -> &[Box<dyn Rule>] {
		if node.as_text().is_some() {
			return &self.text_rules;
		}

		node.name()
			.and_then(|name| self.named_rules.get(name))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Run the applicable rules on the node at `site` until one stops
	/// descent or detaches the node.
	pub fn apply(&self, site: &mut Site<'_>, ctx: &mut RuleContext<'_>) -> PruneResult<Action> {
		let Some(node) = site.node() else {
			return Ok(Action::StopDescent);
		};

		for rule in self.rules_for(node) {
			let action = rule.apply(site, ctx)?;
			if action == Action::StopDescent || site.outcome() != Outcome::Kept {
				return Ok(action);
			}
		}

		Ok(Action::Continue)
	}
}

/// Walk the whole document, applying rules depth first in document order.
pub fn walk_document(
	document: &mut Document,
	registry: &RuleRegistry,
	ctx: &mut RuleContext<'_>,
) -> PruneResult<()> {
	walk(&mut document.root, registry, ctx)
}

/// Walk the descendants of `parent`. Children are addressed by index so the
/// traversal stays valid while rules remove and replace nodes: a removed
/// node's successor shifts into the current index, and nodes spliced in by a
/// replacement are visited in place unless the rule stopped descent.
pub fn walk(parent: &mut Node, registry: &RuleRegistry, ctx: &mut RuleContext<'_>) -> PruneResult<()> {
	let mut index = 0;

	while index < parent.child_count() {
		let (action, outcome) = {
			let Some(mut site) = Site::new(parent, index) else {
				break;
			};
			let action = registry.apply(&mut site, ctx)?;
			(action, site.outcome())
		};

		match outcome {
			Outcome::Kept => {
				if action == Action::Continue {
					if let Some(child) = parent.child_mut(index) {
						walk(child, registry, ctx)?;
					}
				}
				index += 1;
			}
			Outcome::Removed => {}
			Outcome::Replaced(count) => {
				if action == Action::StopDescent {
					index += count;
				}
			}
		}
	}

	Ok(())
}

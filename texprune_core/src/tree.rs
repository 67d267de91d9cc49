use std::fmt::Display;
use std::iter::Chain;
use std::path::Path;
use std::path::PathBuf;
use std::slice::Iter;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::Position;
use crate::PruneError;
use crate::PruneResult;

/// The character that starts a comment.
pub const COMMENT_MARKER: char = '%';

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node. Ownership checks in [`remove`] and
/// [`replace`] compare identities, never structure, so two identical
/// `\foo` commands in the same body are still told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
	fn next() -> Self {
		Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A unit of the document tree.
///
/// Every node has a unique [`NodeId`] and a single parent, so nodes are not
/// `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct Node {
	id: NodeId,
	/// Where the node came from. Synthesized nodes carry a default position.
	pub position: Position,
	pub kind: NodeKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum NodeKind {
	/// Prose, a comment or verbatim content.
	Text(Text),
	/// `\name[opt]{arg} extras`
	Command(Command),
	/// `\begin{name}[opt]{arg} body \end{name}`
	Environment(Environment),
	/// A delimited or undelimited sequence of nodes. Command and environment
	/// arguments, freestanding brace groups and the document root all use
	/// this shape.
	Argument(Argument),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
	Prose,
	Comment,
	/// Content of `verbatim`-like environments and `\verb`. Never treated as a
	/// comment, even when it starts with the marker.
	Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
	pub content: String,
	pub kind: TextKind,
}

impl Text {
	pub fn is_comment(&self) -> bool {
		self.kind != TextKind::Verbatim && self.content.starts_with(COMMENT_MARKER)
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Command {
	/// The name without its backslash, e.g. `section*` or `%`.
	pub name: String,
	/// Formal arguments, each an [`NodeKind::Argument`] node.
	pub args: Vec<Node>,
	/// Trailing content owned by open-ended commands such as `\item`.
	pub extras: Vec<Node>,
}

impl Command {
	/// Iterate over the formal arguments.
	pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
		self.args.iter().filter_map(Node::as_argument)
	}

	/// Iterate over the braced (mandatory) arguments.
	pub fn required_args(&self) -> impl Iterator<Item = &Argument> {
		self.arguments()
			.filter(|argument| argument.delimiter == Delimiter::Brace)
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Environment {
	pub name: String,
	/// Arguments directly following `\begin{name}`.
	pub args: Vec<Node>,
	pub body: Vec<Node>,
}

impl Environment {
	pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
		self.args.iter().filter_map(Node::as_argument)
	}

	pub fn required_args(&self) -> impl Iterator<Item = &Argument> {
		self.arguments()
			.filter(|argument| argument.delimiter == Delimiter::Brace)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
	/// `{…}`
	Brace,
	/// `[…]`
	Bracket,
	/// No delimiters: the document root, or a bare control sequence used as
	/// an argument as in `\newcommand\foo{…}`.
	None,
}

impl Delimiter {
	pub fn open(self) -> &'static str {
		match self {
			Self::Brace => "{",
			Self::Bracket => "[",
			Self::None => "",
		}
	}

	pub fn close(self) -> &'static str {
		match self {
			Self::Brace => "}",
			Self::Bracket => "]",
			Self::None => "",
		}
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Argument {
	pub delimiter: Delimiter,
	/// Whitespace between the previous token and the opening delimiter, as in
	/// `\todo {…}`.
	pub leading: String,
	pub children: Vec<Node>,
}

impl Argument {
	/// The plain-text value of this argument, e.g. `chapters/intro` for
	/// `{chapters/intro}`. Comments are skipped and the result is trimmed.
	/// Returns `None` when the argument contains anything other than text.
	pub fn text_value(&self) -> Option<String> {
		let mut value = String::new();

		for child in &self.children {
			let NodeKind::Text(text) = &child.kind else {
				return None;
			};

			if text.kind != TextKind::Comment {
				value.push_str(&text.content);
			}
		}

		Some(value.trim().to_string())
	}
}

impl Node {
	fn from_kind(kind: NodeKind) -> Self {
		Self {
			id: NodeId::next(),
			position: Position::default(),
			kind,
		}
	}

	pub fn text(content: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Text(Text {
			content: content.into(),
			kind: TextKind::Prose,
		}))
	}

	pub fn comment(content: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Text(Text {
			content: content.into(),
			kind: TextKind::Comment,
		}))
	}

	pub fn verbatim(content: impl Into<String>) -> Self {
		Self::from_kind(NodeKind::Text(Text {
			content: content.into(),
			kind: TextKind::Verbatim,
		}))
	}

	pub fn command(name: impl Into<String>, args: Vec<Node>) -> Self {
		Self::from_kind(NodeKind::Command(Command {
			name: name.into(),
			args,
			extras: Vec::new(),
		}))
	}

	pub fn environment(name: impl Into<String>, args: Vec<Node>, body: Vec<Node>) -> Self {
		Self::from_kind(NodeKind::Environment(Environment {
			name: name.into(),
			args,
			body,
		}))
	}

	pub fn argument(delimiter: Delimiter, children: Vec<Node>) -> Self {
		Self::from_kind(NodeKind::Argument(Argument {
			delimiter,
			leading: String::new(),
			children,
		}))
	}

	/// Shorthand for a braced argument.
	pub fn braced(children: Vec<Node>) -> Self {
		Self::argument(Delimiter::Brace, children)
	}

	/// The undelimited container used as a document root.
	pub fn root(children: Vec<Node>) -> Self {
		Self::argument(Delimiter::None, children)
	}

	#[must_use]
	pub fn with_position(mut self, position: Position) -> Self {
		self.position = position;
		self
	}

	/// Set the whitespace written before an argument's opening delimiter.
	/// Has no effect on other nodes.
	#[must_use]
	pub fn with_leading(mut self, leading: impl Into<String>) -> Self {
		if let NodeKind::Argument(argument) = &mut self.kind {
			argument.leading = leading.into();
		}
		self
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	/// The name of commands and environments. Text and arguments are
	/// anonymous.
	pub fn name(&self) -> Option<&str> {
		match &self.kind {
			NodeKind::Command(command) => Some(&command.name),
			NodeKind::Environment(environment) => Some(&environment.name),
			NodeKind::Text(_) | NodeKind::Argument(_) => None,
		}
	}

	pub fn as_text(&self) -> Option<&Text> {
		match &self.kind {
			NodeKind::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_text_mut(&mut self) -> Option<&mut Text> {
		match &mut self.kind {
			NodeKind::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_command(&self) -> Option<&Command> {
		match &self.kind {
			NodeKind::Command(command) => Some(command),
			_ => None,
		}
	}

	pub fn as_command_mut(&mut self) -> Option<&mut Command> {
		match &mut self.kind {
			NodeKind::Command(command) => Some(command),
			_ => None,
		}
	}

	pub fn as_environment(&self) -> Option<&Environment> {
		match &self.kind {
			NodeKind::Environment(environment) => Some(environment),
			_ => None,
		}
	}

	pub fn as_argument(&self) -> Option<&Argument> {
		match &self.kind {
			NodeKind::Argument(argument) => Some(argument),
			_ => None,
		}
	}

	/// The braced arguments of a command or environment.
	pub fn required_args(&self) -> Vec<&Argument> {
		match &self.kind {
			NodeKind::Command(command) => command.required_args().collect(),
			NodeKind::Environment(environment) => environment.required_args().collect(),
			NodeKind::Text(_) | NodeKind::Argument(_) => Vec::new(),
		}
	}

	/// The direct children. See [`children_of`].
	pub fn children(&self) -> Children<'_> {
		children_of(self)
	}

	pub fn child_count(&self) -> usize {
		match &self.kind {
			NodeKind::Text(_) => 0,
			NodeKind::Command(command) => command.args.len() + command.extras.len(),
			NodeKind::Environment(environment) => environment.args.len() + environment.body.len(),
			NodeKind::Argument(argument) => argument.children.len(),
		}
	}

	pub fn child(&self, index: usize) -> Option<&Node> {
		self.children().nth(index)
	}

	pub fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
		let (nodes, local) = self.slot_mut(index)?;
		nodes.get_mut(local)
	}

	/// Position of the direct child with the given id.
	pub fn index_of(&self, id: NodeId) -> Option<usize> {
		self.children().position(|child| child.id == id)
	}

	/// Whether the node with the given id is anywhere in this subtree,
	/// including `self`.
	pub fn contains(&self, id: NodeId) -> bool {
		self.id == id || self.children().any(|child| child.contains(id))
	}

	/// Map a uniform child index onto the storage vector that holds it.
	fn slot_mut(&mut self, index: usize) -> Option<(&mut Vec<Node>, usize)> {
		let (first, second) = match &mut self.kind {
			NodeKind::Text(_) => return None,
			NodeKind::Command(command) => (&mut command.args, &mut command.extras),
			NodeKind::Environment(environment) => (&mut environment.args, &mut environment.body),
			NodeKind::Argument(argument) => {
				return (index < argument.children.len()).then_some((&mut argument.children, index));
			}
		};

		if index < first.len() {
			return Some((first, index));
		}

		let local = index - first.len();
		(local < second.len()).then_some((second, local))
	}

	fn splice(&mut self, id: NodeId, replacement: Vec<Node>) -> PruneResult<Node> {
		let parent = self.id;
		let Some((nodes, local)) = self.index_of(id).and_then(|index| self.slot_mut(index)) else {
			return Err(PruneError::NotAChild {
				parent: parent.get(),
				child: id.get(),
			});
		};

		let detached = nodes.remove(local);
		nodes.splice(local..local, replacement);

		Ok(detached)
	}
}

/// The direct children of a node, in order.
pub type Children<'a> = Chain<Iter<'a, Node>, Iter<'a, Node>>;

/// Produce the ordered direct children of `node`: arguments then extras for
/// a command, arguments then body for an environment, the children of an
/// argument, and nothing for text. The iterator borrows the node, so it is
/// always a view of the current state and can be recreated at any time.
pub fn children_of(node: &Node) -> Children<'_> {
	const NONE: &[Node] = &[];

	match &node.kind {
		NodeKind::Text(_) => NONE.iter().chain(NONE.iter()),
		NodeKind::Command(command) => command.args.iter().chain(command.extras.iter()),
		NodeKind::Environment(environment) => environment.args.iter().chain(environment.body.iter()),
		NodeKind::Argument(argument) => argument.children.iter().chain(NONE.iter()),
	}
}

/// Detach the direct child `child` from `parent` and return it.
pub fn remove(parent: &mut Node, child: NodeId) -> PruneResult<Node> {
	parent.splice(child, Vec::new())
}

/// Detach the direct child `child` from `parent` and splice `replacement`
/// into its former position. Returns the detached node.
pub fn replace(parent: &mut Node, child: NodeId, replacement: Vec<Node>) -> PruneResult<Node> {
	parent.splice(child, replacement)
}

impl Display for Node {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.kind {
			NodeKind::Text(text) => f.write_str(&text.content),
			NodeKind::Command(command) => {
				write!(f, "\\{}", command.name)?;
				for node in command.args.iter().chain(&command.extras) {
					write!(f, "{node}")?;
				}
				Ok(())
			}
			NodeKind::Environment(environment) => {
				write!(f, "\\begin{{{}}}", environment.name)?;
				for node in environment.args.iter().chain(&environment.body) {
					write!(f, "{node}")?;
				}
				write!(f, "\\end{{{}}}", environment.name)
			}
			NodeKind::Argument(argument) => {
				f.write_str(&argument.leading)?;
				f.write_str(argument.delimiter.open())?;
				for node in &argument.children {
					write!(f, "{node}")?;
				}
				f.write_str(argument.delimiter.close())
			}
		}
	}
}

/// A parsed source file: the unit of parse → rewrite → serialize.
#[derive(Debug)]
pub struct Document {
	/// The file the document was read from, if any.
	pub path: Option<PathBuf>,
	pub root: Node,
}

impl Document {
	pub fn new(root: Node) -> Self {
		Self { path: None, root }
	}

	#[must_use]
	pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
		self.path = Some(path.as_ref().to_path_buf());
		self
	}
}

impl Display for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.root)
	}
}

use std::collections::HashSet;
use std::ops::Range;

use crate::Delimiter;
use crate::Document;
use crate::Node;
use crate::NodeKind;
use crate::PruneError;
use crate::PruneResult;
use crate::TextKind;
use crate::lexer::Lexed;
use crate::lexer::RawToken;
use crate::lexer::TokenStream;
use crate::position::LineTable;

/// Environments whose body is kept as raw text rather than parsed.
pub const VERBATIM_ENVIRONMENTS: [&str; 6] = [
	"verbatim",
	"verbatim*",
	"Verbatim",
	"lstlisting",
	"minted",
	"comment",
];

/// Commands that own the content following them up to the next command of
/// the same kind or the end of the enclosing group.
pub const OPEN_ENDED_COMMANDS: [&str; 2] = ["item", "bibitem"];

/// Commands that declare other commands. When written as
/// `\newcommand\foo{…}` the bare `\foo` is taken as their first argument.
pub const DECLARATION_COMMANDS: [&str; 8] = [
	"newcommand",
	"newcommand*",
	"renewcommand",
	"renewcommand*",
	"providecommand",
	"providecommand*",
	"DeclareRobustCommand",
	"DeclareRobustCommand*",
];

/// Parse TeX source into a [`Document`].
///
/// The parser is structural only: it recognizes commands, their `{}`/`[]`
/// arguments, environments, brace groups, comments and verbatim content.
/// Serializing the result reproduces the input byte for byte.
pub fn parse(content: impl AsRef<str>) -> PruneResult<Document> {
	let content = content.as_ref();
	let mut parser = Parser::new(content);
	let children = parser.parse_sequence(&Terminator::EndOfInput)?;
	let root = Node::root(children).with_position(parser.lines.position(&(0..content.len())));

	Ok(Document::new(root))
}

/// What ends the sequence currently being parsed.
enum Terminator<'n> {
	EndOfInput,
	Group { delimiter: Delimiter, opened: usize },
	Environment { name: &'n str, opened: usize },
}

struct Parser<'a> {
	stream: TokenStream<'a>,
	lines: LineTable,
	/// Offsets of `[` and `\begin` tokens whose group could not be closed.
	/// They are read as text or a plain command when reached again.
	unclosed: HashSet<usize>,
}

impl<'a> Parser<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			stream: TokenStream::new(source),
			lines: LineTable::new(source),
			unclosed: HashSet::new(),
		}
	}

	fn parse_sequence(&mut self, terminator: &Terminator<'_>) -> PruneResult<Vec<Node>> {
		let mut nodes = Vec::new();

		loop {
			let Some(lexed) = self.stream.next_token() else {
				return match terminator {
					Terminator::EndOfInput => Ok(attach_trailing_content(nodes)),
					Terminator::Group { opened, .. } => {
						let point = self.lines.point(*opened);
						Err(PruneError::UnterminatedGroup {
							line: point.line,
							column: point.column,
						})
					}
					Terminator::Environment { name, opened } => {
						let point = self.lines.point(*opened);
						Err(PruneError::UnterminatedEnvironment {
							name: (*name).to_string(),
							line: point.line,
							column: point.column,
						})
					}
				};
			};

			match lexed.token {
				RawToken::BraceClose => {
					if let Terminator::Group {
						delimiter: Delimiter::Brace,
						..
					} = terminator
					{
						return Ok(attach_trailing_content(nodes));
					}

					let point = self.lines.point(lexed.span.start);
					return Err(PruneError::UnexpectedClosingBrace {
						line: point.line,
						column: point.column,
					});
				}
				RawToken::BracketClose
					if matches!(
						terminator,
						Terminator::Group {
							delimiter: Delimiter::Bracket,
							..
						}
					) =>
				{
					return Ok(attach_trailing_content(nodes));
				}
				RawToken::Text | RawToken::BracketOpen | RawToken::BracketClose => {
					self.push_text(&mut nodes, &lexed.span);
				}
				RawToken::Comment => {
					let node = Node::comment(self.stream.slice(&lexed.span))
						.with_position(self.lines.position(&lexed.span));
					nodes.push(node);
				}
				RawToken::BraceOpen => {
					let group = self.parse_group(Delimiter::Brace, lexed.span.start)?;
					nodes.push(group);
				}
				RawToken::ControlWord if self.stream.slice(&lexed.span) == "\\end" => {
					let Terminator::Environment { name, .. } = terminator else {
						nodes.push(self.parse_command(&lexed)?);
						continue;
					};

					let found = self.environment_name(&lexed)?.ok_or_else(|| {
						let point = self.lines.point(lexed.span.start);
						PruneError::MalformedEnvironment {
							command: "end".to_string(),
							line: point.line,
							column: point.column,
						}
					})?;

					if found == *name {
						return Ok(attach_trailing_content(nodes));
					}

					let point = self.lines.point(lexed.span.start);
					return Err(PruneError::MismatchedEnvironment {
						expected: (*name).to_string(),
						found,
						line: point.line,
						column: point.column,
					});
				}
				RawToken::ControlWord | RawToken::ControlSymbol => {
					nodes.push(self.parse_command(&lexed)?);
				}
			}
		}
	}

	/// Parse the rest of a group whose opening delimiter at `opened` has
	/// already been consumed.
	fn parse_group(&mut self, delimiter: Delimiter, opened: usize) -> PruneResult<Node> {
		let children = self.parse_sequence(&Terminator::Group { delimiter, opened })?;
		let position = self.lines.position(&(opened..self.stream.offset()));

		Ok(Node::argument(delimiter, children).with_position(position))
	}

	fn parse_command(&mut self, lexed: &Lexed) -> PruneResult<Node> {
		let slice = self.stream.slice(&lexed.span);
		let name = &slice[1..];

		match name {
			"begin" => return self.parse_environment(lexed),
			"verb" | "verb*" => return Ok(self.parse_verb(name, lexed)),
			_ => {}
		}

		let mut args = Vec::new();
		if DECLARATION_COMMANDS.contains(&name) {
			args.extend(self.parse_bare_control_sequence());
		}

		// Only `\\` among the control symbols takes arguments, as in `\\[2pt]`.
		if lexed.token == RawToken::ControlWord {
			args.extend(self.parse_arguments(true)?);
		} else if name == "\\" {
			args.extend(self.parse_arguments(false)?);
		}

		let position = self.lines.position(&(lexed.span.start..self.stream.offset()));
		Ok(Node::command(name, args).with_position(position))
	}

	/// Collect the `{…}` and `[…]` arguments following the token just
	/// consumed. With `skip_spaces`, whitespace holding at most one line break
	/// may precede each argument up to the first braced one, as TeX skips
	/// spaces after a control word. Otherwise any whitespace ends the list.
	fn parse_arguments(&mut self, mut skip_spaces: bool) -> PruneResult<Vec<Node>> {
		let mut args = Vec::new();

		loop {
			let start = self.stream.offset();
			let leading = if skip_spaces {
				self.spaces_before_argument()
			} else {
				""
			};
			if !leading.is_empty() {
				self.stream.resume_at(start + leading.len());
			}

			let (delimiter, opened) = match self.stream.peek() {
				Some(Lexed {
					token: RawToken::BraceOpen,
					span,
				}) => (Delimiter::Brace, span.start),
				Some(Lexed {
					token: RawToken::BracketOpen,
					span,
				}) => (Delimiter::Bracket, span.start),
				_ => {
					if !leading.is_empty() {
						self.stream.resume_at(start);
					}
					break;
				}
			};

			if delimiter == Delimiter::Brace {
				self.stream.next_token();
				args.push(self.parse_group(delimiter, opened)?.with_leading(leading));
				skip_spaces = false;
				continue;
			}

			// A `[` that never closes is ordinary text, as in `$x \in [0, 1)$`.
			if self.unclosed.contains(&opened) {
				self.stream.resume_at(start);
				break;
			}

			self.stream.next_token();
			match self.parse_group(delimiter, opened) {
				Ok(argument) => args.push(argument.with_leading(leading)),
				Err(_) => {
					self.unclosed.insert(opened);
					self.stream.resume_at(start);
					break;
				}
			}
		}

		Ok(args)
	}

	/// The whitespace at the current offset when an argument delimiter
	/// follows it. A blank line is a paragraph break and never skipped.
	fn spaces_before_argument(&self) -> &'a str {
		let source = self.stream.source();
		let offset = self.stream.offset();
		let rest = &source[offset..];

		let horizontal = [' ', '\t', '\r'];
		let after_spaces = rest.trim_start_matches(horizontal);
		let after_break = after_spaces
			.strip_prefix('\n')
			.map_or(after_spaces, |line| line.trim_start_matches(horizontal));

		if after_break.starts_with(['{', '[']) {
			&source[offset..offset + (rest.len() - after_break.len())]
		} else {
			""
		}
	}

	/// `\newcommand\foo` passes `\foo` without braces.
	fn parse_bare_control_sequence(&mut self) -> Option<Node> {
		let span = match self.stream.peek() {
			Some(Lexed {
				token: RawToken::ControlWord | RawToken::ControlSymbol,
				span,
			}) => span.clone(),
			_ => return None,
		};

		self.stream.next_token();
		let position = self.lines.position(&span);
		let declared = Node::command(&self.stream.slice(&span)[1..], Vec::new()).with_position(position);

		Some(Node::argument(Delimiter::None, vec![declared]).with_position(position))
	}

	fn parse_environment(&mut self, begin: &Lexed) -> PruneResult<Node> {
		let opened = begin.span.start;
		let after_begin = self.stream.offset();
		if self.unclosed.contains(&opened) {
			return self.parse_plain_begin(opened);
		}

		let Some(name) = self.environment_name(begin)? else {
			// A bare `\begin`, for instance inside a macro body.
			return self.parse_plain_begin(opened);
		};

		let args = self.parse_arguments(false)?;
		let body = if VERBATIM_ENVIRONMENTS.contains(&name.as_str()) {
			self.parse_verbatim_body(&name, opened)?
		} else {
			let terminator = Terminator::Environment {
				name: &name,
				opened,
			};

			match self.parse_sequence(&terminator) {
				Ok(body) => body,
				// The enclosing group closes first, as in
				// `\newenvironment{boxed}{\begin{center}}{\end{center}}`.
				Err(PruneError::UnexpectedClosingBrace { .. }) => {
					self.unclosed.insert(opened);
					self.stream.resume_at(after_begin);
					return self.parse_plain_begin(opened);
				}
				Err(error) => return Err(error),
			}
		};

		let position = self.lines.position(&(opened..self.stream.offset()));
		Ok(Node::environment(name, args, body).with_position(position))
	}

	/// `\begin` as an ordinary command whose arguments include the
	/// environment name.
	fn parse_plain_begin(&mut self, opened: usize) -> PruneResult<Node> {
		let args = self.parse_arguments(true)?;
		let position = self.lines.position(&(opened..self.stream.offset()));

		Ok(Node::command("begin", args).with_position(position))
	}

	/// Read the `{name}` following `\begin` or `\end`, allowing spaces before
	/// the brace. Returns `None` when no brace follows.
	fn environment_name(&mut self, command: &Lexed) -> PruneResult<Option<String>> {
		let offset = self.stream.offset();
		let rest = &self.stream.source()[offset..];
		let trimmed = rest.trim_start_matches([' ', '\t']);

		let Some(inner) = trimmed.strip_prefix('{') else {
			return Ok(None);
		};

		let name = inner
			.find('}')
			.map(|close| &inner[..close])
			.filter(|name| !name.trim().is_empty() && !name.contains(['\\', '{', '%', '\n']));

		let Some(name) = name else {
			let point = self.lines.point(command.span.start);
			return Err(PruneError::MalformedEnvironment {
				command: self.stream.slice(&command.span)[1..].to_string(),
				line: point.line,
				column: point.column,
			});
		};

		let consumed = (rest.len() - trimmed.len()) + name.len() + 2;
		self.stream.resume_at(offset + consumed);

		Ok(Some(name.trim().to_string()))
	}

	fn parse_verbatim_body(&mut self, name: &str, opened: usize) -> PruneResult<Vec<Node>> {
		let start = self.stream.offset();
		let closing = format!("\\end{{{name}}}");

		let Some(length) = self.stream.source()[start..].find(&closing) else {
			let point = self.lines.point(opened);
			return Err(PruneError::UnterminatedEnvironment {
				name: name.to_string(),
				line: point.line,
				column: point.column,
			});
		};

		let end = start + length;
		let mut body = Vec::new();
		if end > start {
			let span = start..end;
			body.push(Node::verbatim(self.stream.slice(&span)).with_position(self.lines.position(&span)));
		}

		self.stream.resume_at(end + closing.len());
		Ok(body)
	}

	/// `\verb|…|`: the character after the command delimits content that must
	/// end on the same line. Without a closing delimiter `\verb` is left as a
	/// plain command.
	fn parse_verb(&mut self, name: &str, lexed: &Lexed) -> Node {
		let start = self.stream.offset();
		let rest = &self.stream.source()[start..];
		let line = &rest[..rest.find('\n').unwrap_or(rest.len())];

		let length = line
			.chars()
			.next()
			.filter(|delimiter| !delimiter.is_whitespace())
			.and_then(|delimiter| {
				let width = delimiter.len_utf8();
				line[width..]
					.find(delimiter)
					.map(|close| width + close + width)
			});

		let mut node = Node::command(name, Vec::new());
		if let Some(length) = length {
			let span = start..start + length;
			let content = Node::verbatim(self.stream.slice(&span)).with_position(self.lines.position(&span));
			if let Some(command) = node.as_command_mut() {
				command.extras.push(content);
			}
			self.stream.resume_at(span.end);
		}

		node.with_position(self.lines.position(&(lexed.span.start..self.stream.offset())))
	}

	/// Append text to the previous prose node when possible so that a run of
	/// text tokens ends up as a single node.
	fn push_text(&self, nodes: &mut Vec<Node>, span: &Range<usize>) {
		let content = self.stream.slice(span);

		if let Some(last) = nodes.last_mut() {
			if let NodeKind::Text(text) = &mut last.kind {
				if text.kind == TextKind::Prose {
					text.content.push_str(content);
					last.position.end = self.lines.point(span.end);
					return;
				}
			}
		}

		nodes.push(Node::text(content).with_position(self.lines.position(span)));
	}
}

/// Move the siblings following each open-ended command into that command's
/// extras.
fn attach_trailing_content(nodes: Vec<Node>) -> Vec<Node> {
	let mut attached: Vec<Node> = Vec::with_capacity(nodes.len());
	let mut open: Option<usize> = None;

	for node in nodes {
		let is_open_ended = node
			.as_command()
			.is_some_and(|command| OPEN_ENDED_COMMANDS.contains(&command.name.as_str()));

		if is_open_ended {
			open = Some(attached.len());
			attached.push(node);
			continue;
		}

		match open.and_then(|index| attached.get_mut(index)) {
			Some(owner) => {
				owner.position.end = node.position.end;
				if let Some(command) = owner.as_command_mut() {
					command.extras.push(node);
				}
			}
			None => attached.push(node),
		}
	}

	attached
}

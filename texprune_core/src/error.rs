use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum PruneError {
	#[error(transparent)]
	#[diagnostic(code(texprune::io_error))]
	Io(#[from] std::io::Error),

	#[error("output directory `{0}` is the same as the source root")]
	#[diagnostic(
		code(texprune::output_is_source_root),
		help("choose a destination directory outside of the document's directory")
	)]
	OutputIsSourceRoot(String),

	#[error("output directory `{out_dir}` contains the source root `{root_dir}`")]
	#[diagnostic(
		code(texprune::output_contains_source_root),
		help("the output directory must not be an ancestor of the source root")
	)]
	OutputContainsSourceRoot { out_dir: String, root_dir: String },

	#[error("root document not found: `{0}`")]
	#[diagnostic(code(texprune::root_document_not_found))]
	RootDocumentNotFound(String),

	#[error("file `{0}` requested by --keep-file does not exist")]
	#[diagnostic(
		code(texprune::keep_file_not_found),
		help("paths are resolved relative to the source root first, then as given")
	)]
	KeepFileNotFound(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(texprune::config_parse),
		help("check that texprune.toml is valid TOML with [commands], [keep] and [unused] sections")
	)]
	ConfigParse(String),

	#[error("unterminated group opened at {line}:{column}")]
	#[diagnostic(code(texprune::unterminated_group), help("add the missing `}}`"))]
	UnterminatedGroup { line: usize, column: usize },

	#[error("environment `{name}` opened at {line}:{column} is never closed")]
	#[diagnostic(
		code(texprune::unterminated_environment),
		help("add `\\end{{{name}}}` to close this environment")
	)]
	UnterminatedEnvironment {
		name: String,
		line: usize,
		column: usize,
	},

	#[error("expected `\\end{{{expected}}}` but found `\\end{{{found}}}` at {line}:{column}")]
	#[diagnostic(code(texprune::mismatched_environment))]
	MismatchedEnvironment {
		expected: String,
		found: String,
		line: usize,
		column: usize,
	},

	#[error("unexpected `}}` at {line}:{column}")]
	#[diagnostic(code(texprune::unexpected_closing_brace))]
	UnexpectedClosingBrace { line: usize, column: usize },

	#[error("`\\{command}` at {line}:{column} is missing its environment name")]
	#[diagnostic(
		code(texprune::malformed_environment),
		help("write the name as a braced argument, e.g. `\\{command}{{figure}}`")
	)]
	MalformedEnvironment {
		command: String,
		line: usize,
		column: usize,
	},

	#[error("node {child} is not a child of node {parent}")]
	#[diagnostic(
		code(texprune::not_a_child),
		help("a rule tried to detach a node through a parent that does not own it")
	)]
	NotAChild { parent: u64, child: u64 },

	#[error("cannot short-circuit `\\{name}`: it has {args} arguments")]
	#[diagnostic(
		code(texprune::ambiguous_short_circuit),
		help("only commands with zero or one argument can be replaced by their content")
	)]
	AmbiguousShortCircuit { name: String, args: usize },
}

impl PruneError {
	/// The source location of a parse error, as `(line, column)`.
	pub fn location(&self) -> Option<(usize, usize)> {
		match self {
			Self::UnterminatedGroup { line, column }
			| Self::UnterminatedEnvironment { line, column, .. }
			| Self::MismatchedEnvironment { line, column, .. }
			| Self::UnexpectedClosingBrace { line, column }
			| Self::MalformedEnvironment { line, column, .. } => Some((*line, *column)),
			_ => None,
		}
	}
}

pub type PruneResult<T> = Result<T, PruneError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

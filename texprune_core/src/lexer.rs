use std::ops::Range;

use logos::Logos;

/// Flat tokens produced by logos. Everything that is not markup is folded
/// into `Text` runs so the parser only ever has to look at structure.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
	/// `\section`, `\section*`, `\@startsection`
	#[regex(r"\\[a-zA-Z@]+\*?")]
	ControlWord,
	/// `\%`, `\\`, `\{`, `\ `
	#[regex(r"\\[^a-zA-Z@]")]
	ControlSymbol,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	/// `% ...` up to, but not including, the end of the line.
	#[regex(r"%[^\n]*", allow_greedy = true)]
	Comment,
	#[regex(r"[^\\{}\[\]%]+")]
	Text,
}

/// A token together with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lexed {
	pub token: RawToken,
	pub span: Range<usize>,
}

/// A peekable token stream that can be repositioned. Repositioning is what
/// lets the parser read verbatim content straight from the source instead of
/// through the tokenizer.
pub(crate) struct TokenStream<'a> {
	source: &'a str,
	lexer: logos::Lexer<'a, RawToken>,
	peeked: Option<Option<Lexed>>,
}

impl<'a> TokenStream<'a> {
	pub(crate) fn new(source: &'a str) -> Self {
		Self {
			source,
			lexer: RawToken::lexer(source),
			peeked: None,
		}
	}

	pub(crate) fn source(&self) -> &'a str {
		self.source
	}

	pub(crate) fn slice(&self, span: &Range<usize>) -> &'a str {
		&self.source[span.clone()]
	}

	fn lex(&mut self) -> Option<Lexed> {
		let result = self.lexer.next()?;
		// Unrecognized input (a lone trailing backslash) is kept as text.
		let token = result.unwrap_or(RawToken::Text);

		Some(Lexed {
			token,
			span: self.lexer.span(),
		})
	}

	pub(crate) fn next_token(&mut self) -> Option<Lexed> {
		match self.peeked.take() {
			Some(peeked) => peeked,
			None => self.lex(),
		}
	}

	pub(crate) fn peek(&mut self) -> Option<&Lexed> {
		if self.peeked.is_none() {
			let lexed = self.lex();
			self.peeked = Some(lexed);
		}

		self.peeked.as_ref().and_then(Option::as_ref)
	}

	/// Byte offset where the next unconsumed token starts.
	pub(crate) fn offset(&self) -> usize {
		match &self.peeked {
			Some(Some(lexed)) => lexed.span.start,
			Some(None) => self.source.len(),
			None => self.lexer.span().end,
		}
	}

	/// Discard any lookahead and continue lexing from `offset`.
	pub(crate) fn resume_at(&mut self, offset: usize) {
		let mut lexer = RawToken::lexer(self.source);
		lexer.bump(offset);
		self.lexer = lexer;
		self.peeked = None;
	}
}

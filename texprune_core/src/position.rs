use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// A single location in a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
	/// 1-indexed line number. `0` for nodes that were never part of a source
	/// file.
	pub line: usize,
	/// 1-indexed column, counted in bytes.
	pub column: usize,
	/// 0-indexed byte offset.
	pub offset: usize,
}

impl Point {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}
}

impl Display for Point {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// The span of a node in its source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

/// Pre-computed table of line-start byte offsets so that converting a byte
/// offset into a line/column pair is a binary search instead of a scan.
pub(crate) struct LineTable {
	/// Byte offsets of the start of each line. `line_starts[0]` is always 0.
	line_starts: Vec<usize>,
}

impl LineTable {
	pub(crate) fn new(content: &str) -> Self {
		let mut line_starts = vec![0];
		for (i, byte) in content.bytes().enumerate() {
			if byte == b'\n' {
				line_starts.push(i + 1);
			}
		}
		Self { line_starts }
	}

	pub(crate) fn point(&self, offset: usize) -> Point {
		let line_idx = match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact,
			Err(insert) => insert.saturating_sub(1),
		};

		Point {
			line: line_idx + 1,
			column: offset - self.line_starts[line_idx] + 1,
			offset,
		}
	}

	pub(crate) fn position(&self, span: &std::ops::Range<usize>) -> Position {
		Position {
			start: self.point(span.start),
			end: self.point(span.end),
		}
	}
}

//! `texprune_core` is the library behind the [texprune](https://github.com/texprune/texprune) command line tool. It turns a LaTeX project into a minimal, comment-free copy that is ready to submit: only the files the root document actually reaches are written out, and every document is rewritten on the way.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Root document
//!   → Lexer (splits source into control sequences, groups, comments and text)
//!   → Parser (builds a lossless document tree of commands, environments and arguments)
//!   → Engine (walks the tree, running the rules registered for each node's name)
//!   → Rules (suppress comments, remove or inline commands, discover referenced files)
//!   → Crawler (queues discovered files, writes documents, copies assets, reports leftovers)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `texprune.toml` and the options that shape a crawl.
//! - [`crawler`]: The file queue, the crawl loop and the unused files report.
//! - [`rules`]: The built-in rewrite rules and the registry they are assembled into.
//!
//! ## Key Types
//!
//! - [`Node`]: A unit of the document tree. Serializing a freshly parsed tree reproduces its source exactly.
//! - [`Rule`]: A rewrite rule applied to nodes of a given name through a [`Site`].
//! - [`Crawler`]: Drives a run from the root document to the output directory.
//! - [`CrawlReport`]: Everything a run produced: files, unused files, counters and diagnostics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use texprune_core::CrawlOptions;
//! use texprune_core::Crawler;
//!
//! let mut options = CrawlOptions::default();
//! options.remove_commands(["todo"]);
//!
//! let mut crawler = Crawler::new("paper/main.tex", "submission", options).unwrap();
//! crawler.run().unwrap();
//!
//! for file in crawler.unused_files() {
//!     eprintln!("unused: {}", file.display());
//! }
//! ```

pub use config::*;
pub use crawler::*;
pub use diagnostics::*;
pub use engine::*;
pub use error::*;
pub use parser::*;
pub use position::*;
pub use rules::*;
pub use tree::*;

pub mod config;
pub mod crawler;
mod diagnostics;
mod engine;
#[allow(unused_assignments)]
mod error;
pub(crate) mod lexer;
mod parser;
mod position;
pub mod rules;
mod tree;

#[cfg(test)]
mod __fixtures;

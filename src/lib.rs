//! A streaming CommonMark parser.
//!
//! `rivermark` parses CommonMark 0.31.2 plus GFM pipe tables into a typed
//! AST, and it does so *incrementally*: feed it chunks as they arrive (say,
//! from a token stream) and each call returns exactly the top-level blocks
//! whose content can no longer change.
//!
//! ```
//! use rivermark::{Block, MarkdownParser};
//!
//! let mut parser = MarkdownParser::new();
//!
//! let blocks = parser.parse_stream("# Hello World\nThis");
//! assert!(matches!(blocks[0], Block::Heading { level: 1, .. }));
//!
//! let blocks = parser.parse_stream(" is a paragraph\n\nSecond.");
//! assert!(matches!(blocks[0], Block::Paragraph { .. }));
//!
//! // A final non-streaming call flushes whatever is still open.
//! let blocks = parser.parse("");
//! assert_eq!(blocks.len(), 1);
//! ```
//!
//! For whole documents there is a one-shot form:
//!
//! ```
//! use rivermark::{parse_document, Options};
//!
//! let blocks = parse_document("*hi*\n", &Options::default());
//! assert_eq!(rivermark::html::render_html(&blocks), "<p><em>hi</em></p>\n");
//! ```

pub mod ast;
pub mod html;

mod arena;
mod ctype;
mod entity;
mod nodes;
mod parser;
mod scanners;
mod strings;

pub use ast::{
    Block, Inline, LinkData, ListData, ListDelimType, ListItem, ListKind, TableAlignment,
    TableCell, TableData,
};
pub use parser::{parse_document, ExtensionOptions, MarkdownParser, Options};

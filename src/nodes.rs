//! The internal block/inline tree the parser mutates while lines arrive.
//! Only the public conversion in the parser ever leaves this module's types
//! behind; callers see [`crate::ast`] instead.

use crate::ast::TableAlignment;

/// The tagged node variant.
#[derive(Debug, Clone)]
pub enum NodeValue {
    /// The root of the open-block tree. Contains blocks.
    Document,

    /// Block. Contains other blocks.
    BlockQuote,

    /// Block. Contains list items.
    List(NodeList),

    /// Block. A list item; contains other blocks.
    Item(NodeList),

    /// Block. Fenced or indented; carries raw text.
    CodeBlock(Box<NodeCodeBlock>),

    /// Block. Raw HTML lines.
    HtmlBlock(NodeHtmlBlock),

    /// Block. Contains inlines once parsed.
    Paragraph,

    /// Block. ATX or setext; contains inlines once parsed.
    Heading(NodeHeading),

    /// Block. No content.
    ThematicBreak,

    /// Block. GFM pipe table; carries the per-column alignments and
    /// contains rows.
    Table(Vec<TableAlignment>),

    /// Block. A table row; `true` for the header row. Contains cells.
    TableRow(bool),

    /// Block. A single cell; its text sits in `content` until inline
    /// parsing runs.
    TableCell,

    /// Inline.
    Text(String),

    /// Inline. A soft line break.
    SoftBreak,

    /// Inline. A hard line break.
    LineBreak,

    /// Inline. A code span, already normalized.
    Code(String),

    /// Inline. Raw HTML.
    HtmlInline(String),

    /// Inline. Emphasis.
    Emph,

    /// Inline. Strong emphasis.
    Strong,

    /// Inline. A link; children are the label.
    Link(NodeLink),

    /// Inline. An image; children are the alt text.
    Image(NodeLink),
}

/// The metadata of a list or list item.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeList {
    pub list_type: ListType,

    /// Number of spaces before the marker.
    pub marker_offset: usize,

    /// Columns between the start of the marker and the item content; the
    /// required child indent of the list.
    pub padding: usize,

    /// For ordered lists, the starting ordinal.
    pub start: usize,

    /// For ordered lists, the delimiter after each number.
    pub delimiter: ListDelimType,

    /// For bullet lists, the marker character.
    pub bullet_char: u8,

    /// Computed when the list closes.
    pub tight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListType {
    #[default]
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListDelimType {
    #[default]
    Period,
    Paren,
}

#[derive(Debug, Default, Clone)]
pub struct NodeCodeBlock {
    pub fenced: bool,
    pub fence_char: u8,
    pub fence_length: usize,
    pub fence_offset: usize,
    /// The info string of a fenced block, cleaned at close.
    pub info: Option<String>,
    pub literal: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NodeHeading {
    pub level: u8,
    pub setext: bool,
}

#[derive(Debug, Default, Clone)]
pub struct NodeHtmlBlock {
    /// Which of the seven start conditions opened the block.
    pub block_type: u8,
    pub literal: String,
}

#[derive(Debug, Clone)]
pub struct NodeLink {
    pub url: String,
    pub title: Option<String>,
}

impl NodeValue {
    pub fn block(&self) -> bool {
        matches!(
            *self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(..)
                | NodeValue::Item(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::HtmlBlock(..)
                | NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak
                | NodeValue::Table(..)
                | NodeValue::TableRow(..)
                | NodeValue::TableCell
        )
    }

    /// Whether this kind of node buffers raw lines.
    pub fn accepts_lines(&self) -> bool {
        matches!(
            *self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::CodeBlock(..)
        )
    }

    /// Whether this kind of node gets an inline parse at conversion time.
    pub fn contains_inlines(&self) -> bool {
        matches!(
            *self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::TableCell
        )
    }

    pub fn text(&self) -> Option<&String> {
        match *self {
            NodeValue::Text(ref t) => Some(t),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match *self {
            NodeValue::Text(ref mut t) => Some(t),
            _ => None,
        }
    }
}

/// Returns true if a node holding `parent` can contain a child holding
/// `child`.
pub fn can_contain_type(parent: &NodeValue, child: &NodeValue) -> bool {
    if let NodeValue::Document = *child {
        return false;
    }

    match *parent {
        NodeValue::Document | NodeValue::BlockQuote | NodeValue::Item(..) => {
            child.block() && !matches!(*child, NodeValue::Item(..))
        }

        NodeValue::List(..) => matches!(*child, NodeValue::Item(..)),

        NodeValue::Paragraph
        | NodeValue::Heading(..)
        | NodeValue::Emph
        | NodeValue::Strong
        | NodeValue::Link(..)
        | NodeValue::Image(..)
        | NodeValue::TableCell => !child.block(),

        NodeValue::Table(..) => matches!(*child, NodeValue::TableRow(..)),

        NodeValue::TableRow(..) => matches!(*child, NodeValue::TableCell),

        _ => false,
    }
}

/// Per-node state. Leaf blocks accumulate their input in `content` with
/// `\n` separators until they close.
#[derive(Debug, Clone)]
pub struct Ast {
    pub value: NodeValue,
    pub content: String,
    pub start_line: usize,
    pub open: bool,
    pub last_line_blank: bool,
}

impl Ast {
    pub fn new(value: NodeValue, start_line: usize) -> Self {
        Ast {
            value,
            content: String::new(),
            start_line,
            open: true,
            last_line_blank: false,
        }
    }
}

macro_rules! node_matches {
    ($arena:expr, $node:expr, $($pat:tt)+) => {
        matches!($node.data($arena).value, $($pat)+)
    };
}

pub(crate) use node_matches;

//! The streaming block parser: an open-block tree that consumes chunks of
//! text and gives back the top-level blocks that have become stable.

mod inlines;
pub mod options;
mod table;

use std::cmp::min;
use std::mem;

use crate::arena::{Arena, Node};
use crate::ast::{
    self, Block, Inline, LinkData, ListData, ListItem, TableCell, TableData,
};
use crate::entity;
use crate::nodes::{
    self, node_matches, Ast, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeList, NodeValue,
};
use crate::scanners;
use crate::strings;

use inlines::{RefMap, ResolvedReference, Scanner, Subject};
pub use options::{ExtensionOptions, Options};

const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

// Very deeply nested lists can cause quadratic performance issues. This
// constant limits the nesting depth in open_new_blocks().
const MAX_LIST_DEPTH: usize = 100;

/// Parse a complete document in one call.
pub fn parse_document(text: &str, options: &Options) -> Vec<Block> {
    let mut parser = MarkdownParser::with_options(options.clone());
    parser.parse(text)
}

/// An incremental Markdown parser.
///
/// Feed it chunks with [`parse_stream`](MarkdownParser::parse_stream) and it
/// returns, per call, the top-level blocks whose content can no longer
/// change. [`parse`](MarkdownParser::parse) closes everything still open and
/// flushes the rest.
pub struct MarkdownParser {
    pub(crate) arena: Arena,
    root: Node,
    pub(crate) current: Node,
    refmap: RefMap,
    options: Options,
    line_number: usize,
    pub(crate) offset: usize,
    column: usize,
    pub(crate) first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    pub(crate) blank: bool,
    partially_consumed_tab: bool,
    thematic_break_kill_pos: usize,
    linebuf: String,
    last_buffer_ended_with_cr: bool,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Ast::new(NodeValue::Document, 0));
        MarkdownParser {
            arena,
            root,
            current: root,
            refmap: RefMap::new(),
            options,
            line_number: 0,
            offset: 0,
            column: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            thematic_break_kill_pos: 0,
            linebuf: String::new(),
            last_buffer_ended_with_cr: false,
        }
    }

    /// Feed one chunk and collect the blocks that became stable. A partial
    /// trailing line is buffered for the next call.
    pub fn parse_stream(&mut self, chunk: &str) -> Vec<Block> {
        self.feed(chunk);
        self.harvest()
    }

    /// Feed the (possibly empty) remainder, close every open block, and
    /// return everything not yet emitted. The parser stays usable.
    pub fn parse(&mut self, text: &str) -> Vec<Block> {
        self.feed(text);
        if !self.linebuf.is_empty() {
            let line = mem::take(&mut self.linebuf);
            self.process_line(&line);
        }
        self.close_rightmost_path();
        self.harvest()
    }

    //////////////////////
    // Line splitting   //
    //////////////////////

    fn feed(&mut self, s: &str) {
        let sb = s.as_bytes();
        let mut buffer = 0;
        if self.last_buffer_ended_with_cr && !s.is_empty() && sb[0] == b'\n' {
            buffer += 1;
        }
        // One-call lookahead only: a chunk that does not start with the
        // matching LF flushes the flag.
        self.last_buffer_ended_with_cr = false;

        let end = s.len();

        while buffer < end {
            let mut process = false;
            let mut eol = buffer;
            let mut ate_line_end = false;
            while eol < end {
                if strings::is_line_end_char(sb[eol]) {
                    process = true;
                    ate_line_end = true;
                    eol += 1;
                    break;
                }
                if sb[eol] == 0 {
                    break;
                }
                eol += 1;
            }

            if process {
                if !self.linebuf.is_empty() {
                    self.linebuf.push_str(&s[buffer..eol]);
                    let line = mem::take(&mut self.linebuf);
                    self.process_line(&line);
                } else {
                    self.process_line(&s[buffer..eol]);
                }
            } else if eol < end && sb[eol] == b'\0' {
                self.linebuf.push_str(&s[buffer..eol]);
                self.linebuf.push('\u{fffd}');
            } else {
                self.linebuf.push_str(&s[buffer..eol]);
            }

            buffer = eol;
            if buffer < end {
                if sb[buffer] == b'\0' {
                    buffer += 1;
                } else {
                    if ate_line_end {
                        buffer -= 1;
                    }
                    if sb[buffer] == b'\r' {
                        buffer += 1;
                    }
                    if buffer < end && sb[buffer] == b'\n' {
                        buffer += 1;
                    }
                }
            } else if ate_line_end && sb[eol - 1] == b'\r' {
                // The chunk ended on a bare CR; remember it so a LF opening
                // the next chunk completes the pair instead of making a
                // blank line.
                self.last_buffer_ended_with_cr = true;
            }
        }
    }

    //////////////////////
    // Per-line driving //
    //////////////////////

    fn process_line(&mut self, line: &str) {
        let mut line_owned;
        let line: &str = if line.is_empty()
            || !strings::is_line_end_char(line.as_bytes()[line.len() - 1])
        {
            line_owned = line.to_string();
            line_owned.push('\n');
            &line_owned
        } else if line.as_bytes()[line.len() - 1] == b'\r' {
            line_owned = line[..line.len() - 1].to_string();
            line_owned.push('\n');
            &line_owned
        } else {
            line
        };

        self.offset = 0;
        self.column = 0;
        self.first_nonspace = 0;
        self.first_nonspace_column = 0;
        self.indent = 0;
        self.thematic_break_kill_pos = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        if self.line_number == 0 && line.len() >= 3 && line.starts_with('\u{feff}') {
            self.offset += 3;
        }

        self.line_number += 1;

        if let Some((last_matched_container, all_matched)) = self.check_open_blocks(line) {
            let mut container = last_matched_container;
            let current = self.current;
            self.open_new_blocks(&mut container, line, all_matched);

            if current == self.current {
                self.add_text_to_container(container, last_matched_container, line);
            }
        }

        // Headings and thematic breaks never take another line; close them
        // now so they can be emitted without waiting for the next line.
        if node_matches!(
            &self.arena,
            self.current,
            NodeValue::Heading(..) | NodeValue::ThematicBreak
        ) {
            if let Some(parent) = self.finalize(self.current) {
                self.current = parent;
            }
        }
    }

    ///////////////////////
    // Check open blocks //
    ///////////////////////

    fn check_open_blocks(&mut self, line: &str) -> Option<(Node, bool)> {
        let (all_matched, mut container) = self.check_open_blocks_inner(self.root, line)?;

        if !all_matched {
            container = container.parent(&self.arena).unwrap();
        }

        Some((container, all_matched))
    }

    fn check_open_blocks_inner(&mut self, mut container: Node, line: &str) -> Option<(bool, Node)> {
        let mut all_matched = false;

        loop {
            if !container.last_child_is_open(&self.arena) {
                all_matched = true;
                break;
            }
            container = container.last_child(&self.arena).unwrap();

            self.find_first_nonspace(line);

            match container.data(&self.arena).value {
                NodeValue::BlockQuote => {
                    if !self.parse_block_quote_prefix(line) {
                        break;
                    }
                }
                NodeValue::Item(nl) => {
                    if !self.parse_node_item_prefix(line, container, &nl) {
                        break;
                    }
                }
                NodeValue::CodeBlock(..) => {
                    if !self.parse_code_block_prefix(line, container)? {
                        break;
                    }
                }
                NodeValue::HtmlBlock(ref nhb) => {
                    let block_type = nhb.block_type;
                    if !self.parse_html_block_prefix(block_type) {
                        break;
                    }
                }
                NodeValue::Paragraph => {
                    if self.blank {
                        break;
                    }
                }
                NodeValue::Table(..) => {
                    if !table::matches(&line[self.first_nonspace..]) {
                        break;
                    }
                }
                NodeValue::Heading(..) | NodeValue::TableRow(..) | NodeValue::TableCell => {
                    break;
                }
                _ => {}
            }
        }

        Some((all_matched, container))
    }

    fn find_first_nonspace(&mut self, line: &str) {
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
        let bytes = line.as_bytes();

        if self.first_nonspace <= self.offset {
            self.first_nonspace = self.offset;
            self.first_nonspace_column = self.column;

            loop {
                if self.first_nonspace >= line.len() {
                    break;
                }
                match bytes[self.first_nonspace] {
                    32 => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    9 => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
        }

        self.indent = self.first_nonspace_column - self.column;
        self.blank = self.first_nonspace < line.len()
            && strings::is_line_end_char(bytes[self.first_nonspace]);
    }

    fn parse_block_quote_prefix(&mut self, line: &str) -> bool {
        let indent = self.indent;
        if indent <= 3 && line.as_bytes()[self.first_nonspace] == b'>' {
            self.advance_offset(line, indent + 1, true);

            if strings::is_space_or_tab(line.as_bytes()[self.offset]) {
                self.advance_offset(line, 1, true);
            }

            return true;
        }

        false
    }

    fn parse_node_item_prefix(&mut self, line: &str, container: Node, nl: &NodeList) -> bool {
        if self.indent >= nl.marker_offset + nl.padding {
            self.advance_offset(line, nl.marker_offset + nl.padding, true);
            true
        } else if self.blank && container.first_child(&self.arena).is_some() {
            let offset = self.first_nonspace - self.offset;
            self.advance_offset(line, offset, false);
            true
        } else {
            false
        }
    }

    fn parse_code_block_prefix(&mut self, line: &str, container: Node) -> Option<bool> {
        let (fenced, fence_char, fence_length, fence_offset) =
            match container.data(&self.arena).value {
                NodeValue::CodeBlock(ref ncb) => (
                    ncb.fenced,
                    ncb.fence_char,
                    ncb.fence_length,
                    ncb.fence_offset,
                ),
                _ => unreachable!(),
            };

        if !fenced {
            if self.indent >= CODE_INDENT {
                self.advance_offset(line, CODE_INDENT, true);
                return Some(true);
            } else if self.blank {
                let offset = self.first_nonspace - self.offset;
                self.advance_offset(line, offset, false);
                return Some(true);
            }
            return Some(false);
        }

        let bytes = line.as_bytes();
        let matched = if self.indent <= 3 && bytes[self.first_nonspace] == fence_char {
            scanners::close_code_fence(&line[self.first_nonspace..]).unwrap_or(0)
        } else {
            0
        };

        if matched >= fence_length {
            self.advance_offset(line, matched, false);
            self.current = self.finalize(container).unwrap();
            return None;
        }

        let mut i = fence_offset;
        while i > 0 && strings::is_space_or_tab(bytes[self.offset]) {
            self.advance_offset(line, 1, true);
            i -= 1;
        }
        Some(true)
    }

    fn parse_html_block_prefix(&self, t: u8) -> bool {
        match t {
            1..=5 => true,
            6 | 7 => !self.blank,
            _ => unreachable!(),
        }
    }

    /////////////////////
    // Open new blocks //
    /////////////////////

    fn open_new_blocks(&mut self, container: &mut Node, line: &str, all_matched: bool) {
        let mut maybe_lazy = node_matches!(&self.arena, self.current, NodeValue::Paragraph);
        let mut depth = 0;

        while !node_matches!(
            &self.arena,
            *container,
            NodeValue::CodeBlock(..) | NodeValue::HtmlBlock(..)
        ) {
            depth += 1;
            self.find_first_nonspace(line);
            let indented = self.indent >= CODE_INDENT;

            if !((!indented
                && (self.handle_blockquote(container, line)
                    || self.handle_atx_heading(container, line)
                    || self.handle_code_fence(container, line)
                    || self.handle_html_block(container, line)
                    || self.handle_table_header(container, line)
                    || self.handle_setext_heading(container, line)
                    || self.handle_thematic_break(container, line, all_matched)))
                || self.handle_list(container, line, indented, depth)
                || self.handle_code_block(container, line, indented, maybe_lazy)
                || self.handle_table_row(container, line, indented))
            {
                break;
            }

            if container.data(&self.arena).value.accepts_lines() {
                break;
            }

            maybe_lazy = false;
        }
    }

    fn handle_blockquote(&mut self, container: &mut Node, line: &str) -> bool {
        if line.as_bytes()[self.first_nonspace] != b'>' {
            return false;
        }

        let offset = self.first_nonspace + 1 - self.offset;
        self.advance_offset(line, offset, false);
        if strings::is_space_or_tab(line.as_bytes()[self.offset]) {
            self.advance_offset(line, 1, true);
        }
        *container = self.add_child(*container, NodeValue::BlockQuote);

        true
    }

    fn handle_atx_heading(&mut self, container: &mut Node, line: &str) -> bool {
        let Some(matched) = scanners::atx_heading_start(&line[self.first_nonspace..]) else {
            return false;
        };

        let heading_startpos = self.first_nonspace;
        let offset = self.offset;
        self.advance_offset(line, heading_startpos + matched - offset, false);
        *container = self.add_child(*container, NodeValue::Heading(NodeHeading::default()));

        let bytes = line.as_bytes();
        let mut hashpos = heading_startpos;
        let mut level = 0;
        while bytes[hashpos] == b'#' {
            level += 1;
            hashpos += 1;
        }

        container.data_mut(&mut self.arena).value = NodeValue::Heading(NodeHeading {
            level,
            setext: false,
        });

        true
    }

    fn handle_code_fence(&mut self, container: &mut Node, line: &str) -> bool {
        let Some(matched) = scanners::open_code_fence(&line[self.first_nonspace..]) else {
            return false;
        };

        let first_nonspace = self.first_nonspace;
        let offset = self.offset;
        let ncb = NodeCodeBlock {
            fenced: true,
            fence_char: line.as_bytes()[first_nonspace],
            fence_length: matched,
            fence_offset: first_nonspace - offset,
            info: None,
            literal: String::new(),
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(Box::new(ncb)));
        self.advance_offset(line, first_nonspace + matched - offset, false);

        true
    }

    fn handle_html_block(&mut self, container: &mut Node, line: &str) -> bool {
        let Some(matched) = self.detect_html_block(*container, line) else {
            return false;
        };

        let nhb = NodeHtmlBlock {
            block_type: matched,
            literal: String::new(),
        };
        *container = self.add_child(*container, NodeValue::HtmlBlock(nhb));

        true
    }

    fn detect_html_block(&self, container: Node, line: &str) -> Option<u8> {
        scanners::html_block_start(&line[self.first_nonspace..]).or_else(|| {
            if !node_matches!(&self.arena, container, NodeValue::Paragraph) {
                scanners::html_block_start_7(&line[self.first_nonspace..])
            } else {
                None
            }
        })
    }

    fn handle_table_header(&mut self, container: &mut Node, line: &str) -> bool {
        if !self.options.extension.table
            || !node_matches!(&self.arena, *container, NodeValue::Paragraph)
        {
            return false;
        }
        table::try_opening_header(self, container, line)
    }

    fn handle_table_row(&mut self, container: &mut Node, line: &str, indented: bool) -> bool {
        if indented
            || !self.options.extension.table
            || !node_matches!(&self.arena, *container, NodeValue::Table(..))
        {
            return false;
        }
        table::try_opening_row(self, container, line)
    }

    fn handle_setext_heading(&mut self, container: &mut Node, line: &str) -> bool {
        let Some(sc) = self.detect_setext_heading(*container, line) else {
            return false;
        };

        // Leading reference definitions leave the would-be heading first;
        // when nothing remains, the underline is ordinary paragraph text.
        let has_content = self.resolve_reference_link_definitions(*container);
        if has_content {
            container.data_mut(&mut self.arena).value = NodeValue::Heading(NodeHeading {
                level: match sc {
                    scanners::SetextChar::Equals => 1,
                    scanners::SetextChar::Hyphen => 2,
                },
                setext: true,
            });
            let adv = line.len() - 1 - self.offset;
            self.advance_offset(line, adv, false);
        }

        true
    }

    fn detect_setext_heading(&self, container: Node, line: &str) -> Option<scanners::SetextChar> {
        if node_matches!(&self.arena, container, NodeValue::Paragraph) {
            scanners::setext_heading_line(&line[self.first_nonspace..])
        } else {
            None
        }
    }

    fn handle_thematic_break(
        &mut self,
        container: &mut Node,
        line: &str,
        all_matched: bool,
    ) -> bool {
        if self.detect_thematic_break(*container, line, all_matched).is_none() {
            return false;
        }

        *container = self.add_child(*container, NodeValue::ThematicBreak);

        let adv = line.len() - 1 - self.offset;
        self.advance_offset(line, adv, false);

        true
    }

    fn detect_thematic_break(
        &mut self,
        container: Node,
        line: &str,
        all_matched: bool,
    ) -> Option<usize> {
        let paragraph_unmatched =
            node_matches!(&self.arena, container, NodeValue::Paragraph) && !all_matched;

        if !paragraph_unmatched && self.thematic_break_kill_pos <= self.first_nonspace {
            let (offset, found) = self.scan_thematic_break_inner(line);
            if !found {
                self.thematic_break_kill_pos = offset;
                None
            } else {
                Some(offset)
            }
        } else {
            None
        }
    }

    fn scan_thematic_break_inner(&self, line: &str) -> (usize, bool) {
        let mut i = self.first_nonspace;

        if i >= line.len() {
            return (i, false);
        }

        let bytes = line.as_bytes();
        let c = bytes[i];
        if c != b'*' && c != b'_' && c != b'-' {
            return (i, false);
        }

        let mut count = 1;
        let mut nextc;
        loop {
            i += 1;
            if i >= line.len() {
                return (i, false);
            }
            nextc = bytes[i];

            if nextc == c {
                count += 1;
            } else if nextc != b' ' && nextc != b'\t' {
                break;
            }
        }

        if count >= 3 && (nextc == b'\r' || nextc == b'\n') {
            ((i - self.first_nonspace) + 1, true)
        } else {
            (i, false)
        }
    }

    fn handle_list(
        &mut self,
        container: &mut Node,
        line: &str,
        indented: bool,
        depth: usize,
    ) -> bool {
        let Some((matched, mut nl)) = self.detect_list(*container, line, indented, depth) else {
            return false;
        };

        let offset = self.first_nonspace + matched - self.offset;
        self.advance_offset(line, offset, false);
        let (save_partially_consumed_tab, save_offset, save_column) =
            (self.partially_consumed_tab, self.offset, self.column);

        let bytes = line.as_bytes();
        while self.column - save_column <= 5 && strings::is_space_or_tab(bytes[self.offset]) {
            self.advance_offset(line, 1, true);
        }

        // Wide content rule: one to four columns of whitespace before
        // non-empty content set the item's indent; anything else falls back
        // to marker + 1 and the excess stays on the content.
        let i = self.column - save_column;
        if !(1..5).contains(&i) || strings::is_line_end_char(bytes[self.offset]) {
            nl.padding = matched + 1;
            self.offset = save_offset;
            self.column = save_column;
            self.partially_consumed_tab = save_partially_consumed_tab;
            if i > 0 {
                self.advance_offset(line, 1, true);
            }
        } else {
            nl.padding = matched + i;
        }

        nl.marker_offset = self.indent;

        if match container.data(&self.arena).value {
            NodeValue::List(ref mnl) => !lists_match(&nl, mnl),
            _ => true,
        } {
            *container = self.add_child(*container, NodeValue::List(nl));
        }

        *container = self.add_child(*container, NodeValue::Item(nl));

        true
    }

    fn detect_list(
        &self,
        container: Node,
        line: &str,
        indented: bool,
        depth: usize,
    ) -> Option<(usize, NodeList)> {
        if (!indented || node_matches!(&self.arena, container, NodeValue::List(..)))
            && self.indent < 4
            && depth < MAX_LIST_DEPTH
        {
            parse_list_marker(
                line,
                self.first_nonspace,
                node_matches!(&self.arena, container, NodeValue::Paragraph),
            )
        } else {
            None
        }
    }

    fn handle_code_block(
        &mut self,
        container: &mut Node,
        line: &str,
        indented: bool,
        maybe_lazy: bool,
    ) -> bool {
        if !indented || maybe_lazy || self.blank {
            return false;
        }

        self.advance_offset(line, CODE_INDENT, true);
        let ncb = NodeCodeBlock {
            fenced: false,
            ..Default::default()
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(Box::new(ncb)));

        true
    }

    //////////
    // Core //
    //////////

    pub(crate) fn advance_offset(&mut self, line: &str, mut count: usize, columns: bool) {
        let bytes = line.as_bytes();
        while count > 0 {
            match bytes[self.offset] {
                9 => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let chars_to_advance = min(count, chars_to_tab);
                        self.column += chars_to_advance;
                        self.offset += if self.partially_consumed_tab { 0 } else { 1 };
                        count -= chars_to_advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                _ => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
            }
        }
    }

    pub(crate) fn add_child(&mut self, mut parent: Node, value: NodeValue) -> Node {
        while !nodes::can_contain_type(&parent.data(&self.arena).value, &value) {
            parent = self.finalize(parent).unwrap();
        }

        let child = Ast::new(value, self.line_number);
        let node = self.arena.alloc(child);
        parent.append(&mut self.arena, node);
        node
    }

    fn add_text_to_container(
        &mut self,
        mut container: Node,
        last_matched_container: Node,
        line: &str,
    ) {
        self.find_first_nonspace(line);

        if self.blank {
            if let Some(last_child) = container.last_child(&self.arena) {
                last_child.data_mut(&mut self.arena).last_line_blank = true;
            }
        }

        let container_blank = self.blank
            && match container.data(&self.arena).value {
                NodeValue::BlockQuote | NodeValue::Heading(..) | NodeValue::ThematicBreak => false,
                NodeValue::CodeBlock(ref ncb) => !ncb.fenced,
                NodeValue::Item(..) => {
                    container.first_child(&self.arena).is_some()
                        || container.data(&self.arena).start_line != self.line_number
                }
                _ => true,
            };
        container.data_mut(&mut self.arena).last_line_blank = container_blank;

        let mut tmp = container;
        while let Some(parent) = tmp.parent(&self.arena) {
            parent.data_mut(&mut self.arena).last_line_blank = false;
            tmp = parent;
        }

        if self.current != last_matched_container
            && container == last_matched_container
            && !self.blank
            && node_matches!(&self.arena, self.current, NodeValue::Paragraph)
        {
            // Lazy continuation: the raw line joins the open paragraph.
            self.add_line(self.current, line);
        } else {
            while self.current != last_matched_container {
                self.current = self.finalize(self.current).unwrap();
            }

            let add_text_result = match container.data(&self.arena).value {
                NodeValue::CodeBlock(..) => AddTextResult::LiteralText,
                NodeValue::HtmlBlock(ref nhb) => AddTextResult::HtmlBlock(nhb.block_type),
                _ => AddTextResult::Otherwise,
            };

            match add_text_result {
                AddTextResult::LiteralText => {
                    self.add_line(container, line);
                }
                AddTextResult::HtmlBlock(block_type) => {
                    self.add_line(container, line);

                    let matches_end_condition = match block_type {
                        1 => scanners::html_block_end_1(&line[self.first_nonspace..]),
                        2 => scanners::html_block_end_2(&line[self.first_nonspace..]),
                        3 => scanners::html_block_end_3(&line[self.first_nonspace..]),
                        4 => scanners::html_block_end_4(&line[self.first_nonspace..]),
                        5 => scanners::html_block_end_5(&line[self.first_nonspace..]),
                        _ => false,
                    };

                    if matches_end_condition {
                        container = self.finalize(container).unwrap();
                    }
                }
                AddTextResult::Otherwise => {
                    if self.blank {
                        // nothing to add
                    } else if container.data(&self.arena).value.accepts_lines() {
                        let mut line = line;
                        if let NodeValue::Heading(ref nh) = container.data(&self.arena).value {
                            if !nh.setext {
                                line = strings::chop_trailing_hashes(line);
                            }
                        };
                        let count = self.first_nonspace - self.offset;

                        // Chopping can leave the line shorter than
                        // first_nonspace (e.g. `###   ###`); then there is
                        // no text to add.
                        let have_line_text = self.first_nonspace <= line.len();

                        if have_line_text {
                            self.advance_offset(line, count, false);
                            self.add_line(container, line);
                        }
                    } else {
                        container = self.add_child(container, NodeValue::Paragraph);
                        let count = self.first_nonspace - self.offset;
                        self.advance_offset(line, count, false);
                        self.add_line(container, line);
                    }
                }
            }

            self.current = container;
        }
    }

    fn add_line(&mut self, node: Node, line: &str) {
        let mut pad = 0;
        if self.partially_consumed_tab {
            self.offset += 1;
            pad = TAB_STOP - (self.column % TAB_STOP);
        }
        let offset = self.offset;
        let ast = node.data_mut(&mut self.arena);
        assert!(ast.open);
        for _ in 0..pad {
            ast.content.push(' ');
        }
        if offset < line.len() {
            ast.content.push_str(&line[offset..]);
        }
    }

    fn close_rightmost_path(&mut self) {
        while self.current != self.root {
            self.current = match self.finalize(self.current) {
                Some(parent) => parent,
                None => self.root,
            };
        }
    }

    pub(crate) fn finalize(&mut self, node: Node) -> Option<Node> {
        let parent = node.parent(&self.arena);

        {
            let ast = node.data_mut(&mut self.arena);
            assert!(ast.open);
            ast.open = false;
        }

        enum Fin {
            Paragraph,
            CodeFenced,
            CodeIndented,
            Html,
            List,
            Other,
        }

        let fin = match node.data(&self.arena).value {
            NodeValue::Paragraph => Fin::Paragraph,
            NodeValue::CodeBlock(ref ncb) => {
                if ncb.fenced {
                    Fin::CodeFenced
                } else {
                    Fin::CodeIndented
                }
            }
            NodeValue::HtmlBlock(..) => Fin::Html,
            NodeValue::List(..) => Fin::List,
            _ => Fin::Other,
        };

        match fin {
            Fin::Paragraph => {
                let has_content = self.resolve_reference_link_definitions(node);
                if !has_content {
                    node.detach(&mut self.arena);
                }
            }
            Fin::CodeIndented => {
                let mut content = mem::take(&mut node.data_mut(&mut self.arena).content);
                strings::remove_trailing_blank_lines(&mut content);
                content.push('\n');
                if let NodeValue::CodeBlock(ref mut ncb) = node.data_mut(&mut self.arena).value {
                    ncb.literal = content;
                }
            }
            Fin::CodeFenced => {
                let mut content = mem::take(&mut node.data_mut(&mut self.arena).content);

                // The first buffered line is the info string.
                let mut pos = 0;
                while pos < content.len()
                    && !strings::is_line_end_char(content.as_bytes()[pos])
                {
                    pos += 1;
                }
                assert!(pos < content.len());

                let mut info = entity::unescape_html(strings::trim_slice(&content[..pos]));
                strings::unescape(&mut info);

                if content.as_bytes()[pos] == b'\r' {
                    pos += 1;
                }
                if pos < content.len() && content.as_bytes()[pos] == b'\n' {
                    pos += 1;
                }
                content.drain(..pos);

                if let NodeValue::CodeBlock(ref mut ncb) = node.data_mut(&mut self.arena).value {
                    ncb.info = if info.is_empty() { None } else { Some(info) };
                    ncb.literal = content;
                }
            }
            Fin::Html => {
                let mut content = mem::take(&mut node.data_mut(&mut self.arena).content);
                if content.ends_with('\n') {
                    content.pop();
                }
                if let NodeValue::HtmlBlock(ref mut nhb) = node.data_mut(&mut self.arena).value {
                    nhb.literal = content;
                }
            }
            Fin::List => {
                let tight = self.determine_list_tight(node);
                if let NodeValue::List(ref mut nl) = node.data_mut(&mut self.arena).value {
                    nl.tight = tight;
                }
            }
            Fin::Other => {}
        }

        parent
    }

    fn determine_list_tight(&self, node: Node) -> bool {
        let mut ch = node.first_child(&self.arena);

        while let Some(item) = ch {
            if item.data(&self.arena).last_line_blank && item.next_sibling(&self.arena).is_some() {
                return false;
            }

            let mut subch = item.first_child(&self.arena);
            while let Some(subitem) = subch {
                if (item.next_sibling(&self.arena).is_some()
                    || subitem.next_sibling(&self.arena).is_some())
                    && self.ends_with_blank_line(subitem)
                {
                    return false;
                }
                subch = subitem.next_sibling(&self.arena);
            }

            ch = item.next_sibling(&self.arena);
        }

        true
    }

    fn ends_with_blank_line(&self, node: Node) -> bool {
        let mut it = Some(node);
        while let Some(cur) = it {
            if cur.data(&self.arena).last_line_blank {
                return true;
            }
            match cur.data(&self.arena).value {
                NodeValue::List(..) | NodeValue::Item(..) => it = cur.last_child(&self.arena),
                _ => it = None,
            }
        }
        false
    }

    ///////////////////////////
    // Reference definitions //
    ///////////////////////////

    fn resolve_reference_link_definitions(&mut self, node: Node) -> bool {
        let mut seeked = 0;
        let mut rrs_to_add = vec![];

        {
            let content = &node.data(&self.arena).content;
            let bytes = content.as_bytes();
            while seeked < content.len() && bytes[seeked] == b'[' {
                if let Some((offset, rr)) = self.parse_reference_inline(&content[seeked..]) {
                    seeked += offset;
                    if let Some(rr) = rr {
                        rrs_to_add.push(rr);
                    }
                } else {
                    break;
                }
            }
        }

        for (lab, rr) in rrs_to_add {
            // First writer wins, also among definitions of one batch.
            self.refmap.map.entry(lab).or_insert(rr);
        }

        let content = &mut node.data_mut(&mut self.arena).content;
        if seeked != 0 {
            content.drain(..seeked);
        }

        !strings::is_blank(content)
    }

    fn parse_reference_inline(
        &self,
        content: &str,
    ) -> Option<(usize, Option<(String, ResolvedReference)>)> {
        let mut scanner = Scanner::new();

        let mut lab: String = match scanner.link_label(content) {
            Some(lab) if !lab.is_empty() => lab.to_string(),
            _ => return None,
        };

        if scanner.peek_byte(content) != Some(b':') {
            return None;
        }

        scanner.pos += 1;
        scanner.spnl(content);
        let matchlen = inlines::manual_scan_link_url(&content[scanner.pos..])?;
        if matchlen == 0 {
            return None;
        }
        let url = content[scanner.pos..scanner.pos + matchlen].to_string();
        scanner.pos += matchlen;

        let beforetitle = scanner.pos;
        scanner.spnl(content);
        let title_search = if scanner.pos == beforetitle {
            None
        } else {
            scanners::link_title(&content[scanner.pos..])
        };
        let mut title = match title_search {
            Some(matchlen) => {
                let t = &content[scanner.pos..scanner.pos + matchlen];
                scanner.pos += matchlen;
                Some(t.to_string())
            }
            None => {
                scanner.pos = beforetitle;
                None
            }
        };

        scanner.skip_spaces(content);
        if !scanner.skip_line_end(content) {
            if title.is_some() {
                // The title did not end its line; the definition stops
                // before it and the title text stays in the paragraph.
                title = None;
                scanner.pos = beforetitle;
                scanner.skip_spaces(content);
                if !scanner.skip_line_end(content) {
                    return None;
                }
            } else {
                return None;
            }
        }

        lab = strings::normalize_label(&lab);
        let mut rr = None;
        if !lab.is_empty() && !self.refmap.map.contains_key(&lab) {
            rr = Some((
                lab,
                ResolvedReference {
                    url: strings::clean_url(&url),
                    title: title.map(|t| strings::clean_title(&t)),
                },
            ));
        }

        Some((scanner.pos, rr))
    }

    ////////////////////////////////
    // Emission & AST conversion  //
    ////////////////////////////////

    fn harvest(&mut self) -> Vec<Block> {
        let mut out = vec![];
        while let Some(child) = self.root.first_child(&self.arena) {
            if child.data(&self.arena).open {
                break;
            }
            self.process_inlines_subtree(child);
            out.push(self.convert_block(child));
            child.detach(&mut self.arena);
        }
        out
    }

    fn process_inlines_subtree(&mut self, node: Node) {
        if node.data(&self.arena).value.contains_inlines() {
            self.parse_inlines(node);
            return;
        }
        for child in node.children(&self.arena) {
            self.process_inlines_subtree(child);
        }
    }

    fn parse_inlines(&mut self, node: Node) {
        let mut content = mem::take(&mut node.data_mut(&mut self.arena).content);
        strings::rtrim(&mut content);

        let mut subj = Subject::new(&mut self.arena, content, &self.refmap);
        while subj.parse_inline(node) {}
        subj.process_emphasis(0);
    }

    fn convert_block(&self, node: Node) -> Block {
        match node.data(&self.arena).value {
            NodeValue::Paragraph => Block::Paragraph {
                children: self.convert_inlines(node),
            },
            NodeValue::Heading(ref nh) => Block::Heading {
                level: nh.level,
                children: self.convert_inlines(node),
            },
            NodeValue::CodeBlock(ref ncb) => Block::CodeBlock {
                info: ncb.info.clone(),
                literal: ncb.literal.clone(),
            },
            NodeValue::HtmlBlock(ref nhb) => Block::HtmlBlock {
                literal: nhb.literal.clone(),
            },
            NodeValue::ThematicBreak => Block::ThematicBreak,
            NodeValue::BlockQuote => Block::BlockQuote {
                children: node
                    .children(&self.arena)
                    .into_iter()
                    .map(|c| self.convert_block(c))
                    .collect(),
            },
            NodeValue::List(ref nl) => {
                let kind = match nl.list_type {
                    ListType::Bullet => ast::ListKind::Bullet {
                        marker: nl.bullet_char,
                    },
                    ListType::Ordered => ast::ListKind::Ordered {
                        start: nl.start,
                        delimiter: match nl.delimiter {
                            ListDelimType::Period => ast::ListDelimType::Period,
                            ListDelimType::Paren => ast::ListDelimType::Paren,
                        },
                    },
                };
                let items = node
                    .children(&self.arena)
                    .into_iter()
                    .map(|item| ListItem {
                        children: item
                            .children(&self.arena)
                            .into_iter()
                            .map(|c| self.convert_block(c))
                            .collect(),
                    })
                    .collect();
                Block::List(ListData {
                    kind,
                    tight: nl.tight,
                    items,
                })
            }
            NodeValue::Table(ref aligns) => {
                let mut header = vec![];
                let mut rows = vec![];
                for row in node.children(&self.arena) {
                    let cells: Vec<TableCell> = row
                        .children(&self.arena)
                        .into_iter()
                        .map(|c| TableCell {
                            children: self.convert_inlines(c),
                        })
                        .collect();
                    match row.data(&self.arena).value {
                        NodeValue::TableRow(true) => header = cells,
                        NodeValue::TableRow(false) => rows.push(cells),
                        _ => {}
                    }
                }
                Block::Table(Box::new(TableData {
                    alignments: aligns.clone(),
                    header,
                    rows,
                }))
            }
            _ => unreachable!("inline value in block position"),
        }
    }

    fn convert_inlines(&self, node: Node) -> Vec<Inline> {
        let mut out: Vec<Inline> = vec![];
        for child in node.children(&self.arena) {
            let inl = self.convert_inline(child);
            if let Inline::Text(ref t) = inl {
                if t.is_empty() {
                    continue;
                }
            }
            match (out.last_mut(), inl) {
                (Some(Inline::Text(prev)), Inline::Text(t)) => prev.push_str(&t),
                (_, inl) => out.push(inl),
            }
        }
        out
    }

    fn convert_inline(&self, node: Node) -> Inline {
        match node.data(&self.arena).value {
            NodeValue::Text(ref t) => Inline::Text(t.clone()),
            NodeValue::Code(ref t) => Inline::Code(t.clone()),
            NodeValue::SoftBreak => Inline::SoftBreak,
            NodeValue::LineBreak => Inline::LineBreak,
            NodeValue::HtmlInline(ref t) => Inline::HtmlInline(t.clone()),
            NodeValue::Emph => Inline::Emph {
                children: self.convert_inlines(node),
            },
            NodeValue::Strong => Inline::Strong {
                children: self.convert_inlines(node),
            },
            NodeValue::Link(ref nl) => Inline::Link(LinkData {
                url: nl.url.clone(),
                title: nl.title.clone(),
                children: self.convert_inlines(node),
            }),
            NodeValue::Image(ref nl) => Inline::Image(LinkData {
                url: nl.url.clone(),
                title: nl.title.clone(),
                children: self.convert_inlines(node),
            }),
            _ => unreachable!("block value in inline position"),
        }
    }
}

enum AddTextResult {
    LiteralText,
    HtmlBlock(u8),
    Otherwise,
}

fn parse_list_marker(
    line: &str,
    mut pos: usize,
    interrupts_paragraph: bool,
) -> Option<(usize, NodeList)> {
    let bytes = line.as_bytes();
    let mut c = bytes[pos];
    let startpos = pos;

    if c == b'*' || c == b'-' || c == b'+' {
        pos += 1;
        if !crate::ctype::isspace(bytes[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(bytes[i]) {
                i += 1;
            }
            if bytes[i] == b'\n' {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Bullet,
                marker_offset: 0,
                padding: 0,
                start: 1,
                delimiter: ListDelimType::Period,
                bullet_char: c,
                tight: false,
            },
        ));
    } else if crate::ctype::isdigit(c) {
        let mut start: usize = 0;
        let mut digits = 0;

        loop {
            start = (10 * start) + (bytes[pos] - b'0') as usize;
            pos += 1;
            digits += 1;

            if !(digits < 9 && crate::ctype::isdigit(bytes[pos])) {
                break;
            }
        }

        if interrupts_paragraph && start != 1 {
            return None;
        }

        c = bytes[pos];
        if c != b'.' && c != b')' {
            return None;
        }

        pos += 1;

        if !crate::ctype::isspace(bytes[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(bytes[i]) {
                i += 1;
            }
            if strings::is_line_end_char(bytes[i]) {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Ordered,
                marker_offset: 0,
                padding: 0,
                start,
                delimiter: if c == b'.' {
                    ListDelimType::Period
                } else {
                    ListDelimType::Paren
                },
                bullet_char: 0,
                tight: false,
            },
        ));
    }

    None
}

fn lists_match(list_data: &NodeList, item_data: &NodeList) -> bool {
    list_data.list_type == item_data.list_type
        && list_data.delimiter == item_data.delimiter
        && list_data.bullet_char == item_data.bullet_char
}

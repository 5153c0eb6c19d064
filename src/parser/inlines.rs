use std::collections::HashMap;

use unicode_categories::UnicodeCategories;

use crate::arena::{Arena, Node};
use crate::ctype::{ispunct, isspace};
use crate::entity;
use crate::nodes::{Ast, NodeLink, NodeValue};
use crate::scanners;
use crate::strings;

const MAXBACKTICKS: usize = 80;
const MAX_LINK_LABEL_LENGTH: usize = 999;

/// The link reference definition store. First writer wins; the parser only
/// inserts labels that are not already present.
pub struct RefMap {
    pub map: HashMap<String, ResolvedReference>,
}

impl RefMap {
    pub fn new() -> Self {
        RefMap {
            map: HashMap::new(),
        }
    }
}

/// A reference link's resolved details.
#[derive(Clone, Debug)]
pub struct ResolvedReference {
    pub url: String,
    pub title: Option<String>,
}

/// The inline tokenizer. Runs over the buffered content of one leaf block,
/// appending inline nodes to it, then resolves emphasis.
pub struct Subject<'p> {
    arena: &'p mut Arena,
    pub input: String,
    pub pos: usize,
    refmap: &'p RefMap,
    delimiters: Vec<Delimiter>,
    brackets: Vec<Bracket>,
    backticks: [usize; MAXBACKTICKS + 1],
    scanned_for_backticks: bool,
}

/// One `*`/`_` run. Inactive entries are tombstones: their text has been
/// consumed into emphasis or ruled out, and scans skip them.
struct Delimiter {
    inl: Node,
    delim_char: u8,
    /// The run length at creation time; the rule of three wants the
    /// original, not what is left after partial consumption.
    length: usize,
    can_open: bool,
    can_close: bool,
    active: bool,
}

struct Bracket {
    /// Delimiter stack height when the bracket was pushed; emphasis inside
    /// the label resolves down to here.
    stack_bottom: usize,
    inl_text: Node,
    position: usize,
    image: bool,
    active: bool,
    bracket_after: bool,
}

const SPECIAL_CHARS: [bool; 256] = strings::byte_table(b"\r\n`\\&<[]!*_");

fn is_flank_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\x0b'
            | '\x0c'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
    )
}

fn is_flank_punctuation(c: char) -> bool {
    c.is_punctuation() || c.is_symbol()
}

impl<'p> Subject<'p> {
    pub fn new(arena: &'p mut Arena, input: String, refmap: &'p RefMap) -> Self {
        Subject {
            arena,
            input,
            pos: 0,
            refmap,
            delimiters: vec![],
            brackets: vec![],
            backticks: [0; MAXBACKTICKS + 1],
            scanned_for_backticks: false,
        }
    }

    /// Consume one construct, appending its node(s) to `node`. Returns
    /// false at end of input.
    pub fn parse_inline(&mut self, node: Node) -> bool {
        let c = match self.peek_char() {
            None => return false,
            Some(ch) => ch,
        };

        let new_inl: Option<Node> = match c {
            b'\r' | b'\n' => Some(self.handle_newline()),
            b'`' => Some(self.handle_backticks()),
            b'\\' => Some(self.handle_backslash()),
            b'&' => Some(self.handle_entity()),
            b'<' => Some(self.handle_pointy_brace()),
            b'*' | b'_' => Some(self.handle_delim(c)),
            b'[' => {
                self.pos += 1;
                let inl = make_inline(self.arena, NodeValue::Text("[".to_string()));
                self.push_bracket(false, inl);
                Some(inl)
            }
            b']' => self.handle_close_bracket(),
            b'!' => {
                self.pos += 1;
                if self.peek_char() == Some(b'[') {
                    self.pos += 1;
                    let inl = make_inline(self.arena, NodeValue::Text("![".to_string()));
                    self.push_bracket(true, inl);
                    Some(inl)
                } else {
                    Some(make_inline(self.arena, NodeValue::Text("!".to_string())))
                }
            }
            _ => {
                let endpos = self.find_special_char();
                let mut contents = self.input[self.pos..endpos].to_string();
                self.pos = endpos;

                // Trailing spaces before a line end belong to the break.
                if self
                    .peek_char()
                    .map_or(false, strings::is_line_end_char)
                {
                    strings::rtrim(&mut contents);
                }

                Some(make_inline(self.arena, NodeValue::Text(contents)))
            }
        };

        if let Some(inl) = new_inl {
            node.append(self.arena, inl);
        }

        true
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek_char(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn find_special_char(&self) -> usize {
        for n in self.pos..self.input.len() {
            if SPECIAL_CHARS[self.input.as_bytes()[n] as usize] {
                return n;
            }
        }
        self.input.len()
    }

    fn char_at(&self, pos: usize) -> char {
        self.input[pos..].chars().next().unwrap_or('\n')
    }

    fn handle_newline(&mut self) -> Node {
        let nlpos = self.pos;
        let hardbreak = nlpos >= 2
            && self.input.as_bytes()[nlpos - 1] == b' '
            && self.input.as_bytes()[nlpos - 2] == b' ';
        if self.peek_char() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_char() == Some(b'\n') {
            self.pos += 1;
        }
        self.skip_spaces();
        if hardbreak {
            make_inline(self.arena, NodeValue::LineBreak)
        } else {
            make_inline(self.arena, NodeValue::SoftBreak)
        }
    }

    fn take_while(&mut self, c: u8) -> usize {
        let start = self.pos;
        while self.peek_char() == Some(c) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn scan_to_closing_backtick(&mut self, openticklength: usize) -> Option<usize> {
        if openticklength > MAXBACKTICKS {
            return None;
        }

        if self.scanned_for_backticks && self.backticks[openticklength] <= self.pos {
            return None;
        }

        loop {
            while self.peek_char().map_or(false, |c| c != b'`') {
                self.pos += 1;
            }
            if self.eof() {
                self.scanned_for_backticks = true;
                return None;
            }
            let numticks = self.take_while(b'`');
            if numticks <= MAXBACKTICKS {
                self.backticks[numticks] = self.pos - numticks;
            }
            if numticks == openticklength {
                return Some(self.pos);
            }
        }
    }

    fn handle_backticks(&mut self) -> Node {
        let startticks = self.pos;
        let openticks = self.take_while(b'`');
        let startpos = self.pos;
        let endpos = self.scan_to_closing_backtick(openticks);

        match endpos {
            None => {
                self.pos = startpos;
                let literal = self.input[startticks..startpos].to_string();
                make_inline(self.arena, NodeValue::Text(literal))
            }
            Some(endpos) => {
                let buf = &self.input[startpos..endpos - openticks];
                let buf = strings::normalize_code(buf);
                make_inline(self.arena, NodeValue::Code(buf))
            }
        }
    }

    pub fn skip_spaces(&mut self) -> bool {
        let mut skipped = false;
        while self.peek_char().map_or(false, |c| c == b' ' || c == b'\t') {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    pub fn skip_line_end(&mut self) -> bool {
        let old_pos = self.pos;
        if self.peek_char() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_char() == Some(b'\n') {
            self.pos += 1;
        }
        self.pos > old_pos || self.eof()
    }

    fn handle_backslash(&mut self) -> Node {
        self.pos += 1;
        if self.peek_char().map_or(false, ispunct) {
            self.pos += 1;
            let lit = (self.input.as_bytes()[self.pos - 1] as char).to_string();
            make_inline(self.arena, NodeValue::Text(lit))
        } else if !self.eof() && self.skip_line_end() {
            self.skip_spaces();
            make_inline(self.arena, NodeValue::LineBreak)
        } else {
            make_inline(self.arena, NodeValue::Text("\\".to_string()))
        }
    }

    fn handle_entity(&mut self) -> Node {
        self.pos += 1;

        match entity::unescape(&self.input[self.pos..]) {
            None => make_inline(self.arena, NodeValue::Text("&".to_string())),
            Some((entity, len)) => {
                self.pos += len;
                make_inline(self.arena, NodeValue::Text(entity))
            }
        }
    }

    fn handle_pointy_brace(&mut self) -> Node {
        self.pos += 1;

        if let Some(matchlen) = scanners::autolink_uri(&self.input[self.pos..]) {
            let inl = make_autolink(
                self.arena,
                &self.input[self.pos..self.pos + matchlen - 1],
                false,
            );
            self.pos += matchlen;
            return inl;
        }

        if let Some(matchlen) = scanners::autolink_email(&self.input[self.pos..]) {
            let inl = make_autolink(
                self.arena,
                &self.input[self.pos..self.pos + matchlen - 1],
                true,
            );
            self.pos += matchlen;
            return inl;
        }

        if let Some(matchlen) = scanners::html_tag(&self.input[self.pos..]) {
            let contents = self.input[self.pos - 1..self.pos + matchlen].to_string();
            let inl = make_inline(self.arena, NodeValue::HtmlInline(contents));
            self.pos += matchlen;
            return inl;
        }

        make_inline(self.arena, NodeValue::Text("<".to_string()))
    }

    fn handle_delim(&mut self, c: u8) -> Node {
        let (numdelims, can_open, can_close) = self.scan_delims(c);

        let contents = self.input[self.pos - numdelims..self.pos].to_string();
        let inl = make_inline(self.arena, NodeValue::Text(contents));

        if can_open || can_close {
            self.delimiters.push(Delimiter {
                inl,
                delim_char: c,
                length: numdelims,
                can_open,
                can_close,
                active: true,
            });
        }

        inl
    }

    fn scan_delims(&mut self, c: u8) -> (usize, bool, bool) {
        let before_char = if self.pos == 0 {
            '\n'
        } else {
            let mut before_char_pos = self.pos - 1;
            while before_char_pos > 0 && self.input.as_bytes()[before_char_pos] >> 6 == 2 {
                before_char_pos -= 1;
            }
            self.char_at(before_char_pos)
        };

        let numdelims = self.take_while(c);

        let after_char = if self.eof() {
            '\n'
        } else {
            self.char_at(self.pos)
        };

        let left_flanking = numdelims > 0
            && !is_flank_whitespace(after_char)
            && !(is_flank_punctuation(after_char)
                && !is_flank_whitespace(before_char)
                && !is_flank_punctuation(before_char));
        let right_flanking = numdelims > 0
            && !is_flank_whitespace(before_char)
            && !(is_flank_punctuation(before_char)
                && !is_flank_whitespace(after_char)
                && !is_flank_punctuation(after_char));

        if c == b'_' {
            (
                numdelims,
                left_flanking && (!right_flanking || is_flank_punctuation(before_char)),
                right_flanking && (!left_flanking || is_flank_punctuation(after_char)),
            )
        } else {
            (numdelims, left_flanking, right_flanking)
        }
    }

    /// The CommonMark "process emphasis" pass over delimiters at and above
    /// `stack_bottom`.
    pub fn process_emphasis(&mut self, stack_bottom: usize) {
        // Lowest opener worth scanning for, per closer length mod 3 and
        // delimiter character.
        let mut openers_bottom = [[stack_bottom; 2]; 3];

        let mut closer = stack_bottom;
        while closer < self.delimiters.len() {
            if !self.delimiters[closer].active || !self.delimiters[closer].can_close {
                closer += 1;
                continue;
            }

            let closer_char = self.delimiters[closer].delim_char;
            let closer_len = self.delimiters[closer].length;
            let ci = (closer_char == b'_') as usize;
            let bottom = openers_bottom[closer_len % 3][ci];

            let mut opener = closer;
            let mut opener_found = false;
            while opener > bottom {
                opener -= 1;
                let o = &self.delimiters[opener];
                if !o.active || !o.can_open || o.delim_char != closer_char {
                    continue;
                }
                // Rule of three, on original run lengths.
                let odd_match = (self.delimiters[closer].can_open || o.can_close)
                    && (o.length + closer_len) % 3 == 0
                    && !(o.length % 3 == 0 && closer_len % 3 == 0);
                if !odd_match {
                    opener_found = true;
                    break;
                }
            }

            if opener_found {
                closer = self.insert_emph(opener, closer);
            } else {
                openers_bottom[closer_len % 3][ci] = closer;
                if !self.delimiters[closer].can_open {
                    self.delimiters[closer].active = false;
                }
                closer += 1;
            }
        }

        for d in &mut self.delimiters[stack_bottom..] {
            d.active = false;
        }
    }

    fn insert_emph(&mut self, opener: usize, closer: usize) -> usize {
        let opener_inl = self.delimiters[opener].inl;
        let closer_inl = self.delimiters[closer].inl;

        let mut opener_num_chars = opener_inl.data(self.arena).value.text().unwrap().len();
        let mut closer_num_chars = closer_inl.data(self.arena).value.text().unwrap().len();
        let use_delims = if closer_num_chars >= 2 && opener_num_chars >= 2 {
            2
        } else {
            1
        };
        opener_num_chars -= use_delims;
        closer_num_chars -= use_delims;

        opener_inl
            .data_mut(self.arena)
            .value
            .text_mut()
            .unwrap()
            .truncate(opener_num_chars);
        closer_inl
            .data_mut(self.arena)
            .value
            .text_mut()
            .unwrap()
            .truncate(closer_num_chars);

        // Delimiters between the pair can never match across the new
        // nesting.
        for d in &mut self.delimiters[opener + 1..closer] {
            d.active = false;
        }

        let emph = make_inline(
            self.arena,
            if use_delims == 1 {
                NodeValue::Emph
            } else {
                NodeValue::Strong
            },
        );

        let mut tmp = opener_inl.next_sibling(self.arena);
        while let Some(t) = tmp {
            if t == closer_inl {
                break;
            }
            tmp = t.next_sibling(self.arena);
            emph.append(self.arena, t);
        }
        opener_inl.insert_after(self.arena, emph);

        if opener_num_chars == 0 {
            opener_inl.detach(self.arena);
            self.delimiters[opener].active = false;
        }

        if closer_num_chars == 0 {
            closer_inl.detach(self.arena);
            self.delimiters[closer].active = false;
            closer + 1
        } else {
            closer
        }
    }

    fn push_bracket(&mut self, image: bool, inl_text: Node) {
        let len = self.brackets.len();
        if len > 0 {
            self.brackets[len - 1].bracket_after = true;
        }
        self.brackets.push(Bracket {
            stack_bottom: self.delimiters.len(),
            inl_text,
            position: self.pos,
            image,
            active: true,
            bracket_after: false,
        });
    }

    fn handle_close_bracket(&mut self) -> Option<Node> {
        self.pos += 1;
        let initial_pos = self.pos;

        let brackets_len = self.brackets.len();
        if brackets_len == 0 {
            return Some(make_inline(self.arena, NodeValue::Text("]".to_string())));
        }

        if !self.brackets[brackets_len - 1].active {
            self.brackets.pop();
            return Some(make_inline(self.arena, NodeValue::Text("]".to_string())));
        }

        let is_image = self.brackets[brackets_len - 1].image;
        let after_link_text_pos = self.pos;

        // Inline link: `(dest "title")`.
        if self.peek_char() == Some(b'(') {
            let sps = scanners::spacechars(&self.input[self.pos + 1..]).unwrap_or(0);
            if let Some(n) = manual_scan_link_url(&self.input[self.pos + 1 + sps..]) {
                let starturl = self.pos + 1 + sps;
                let endurl = starturl + n;
                let starttitle =
                    endurl + scanners::spacechars(&self.input[endurl..]).unwrap_or(0);
                let endtitle = if starttitle == endurl {
                    starttitle
                } else {
                    starttitle + scanners::link_title(&self.input[starttitle..]).unwrap_or(0)
                };
                let endall =
                    endtitle + scanners::spacechars(&self.input[endtitle..]).unwrap_or(0);

                if endall < self.input.len() && self.input.as_bytes()[endall] == b')' {
                    self.pos = endall + 1;
                    let url = strings::clean_url(&self.input[starturl..endurl]);
                    let title = if endtitle > starttitle {
                        Some(strings::clean_title(&self.input[starttitle..endtitle]))
                    } else {
                        None
                    };
                    self.close_bracket_match(is_image, url, title);
                    return None;
                }
            }
            self.pos = after_link_text_pos;
        }

        // Full, collapsed, or shortcut reference.
        let (mut lab, mut found_label) = match self.link_label() {
            Some(lab) => (lab.to_string(), true),
            None => (String::new(), false),
        };

        if !found_label {
            self.pos = initial_pos;
        }

        if (!found_label || lab.is_empty()) && !self.brackets[brackets_len - 1].bracket_after {
            lab = self.input[self.brackets[brackets_len - 1].position..initial_pos - 1]
                .to_string();
            found_label = true;
        }

        let reff: Option<ResolvedReference> = if found_label {
            lab = strings::normalize_label(&lab);
            self.refmap.map.get(&lab).cloned()
        } else {
            None
        };

        if let Some(reff) = reff {
            self.close_bracket_match(is_image, reff.url, reff.title);
            return None;
        }

        self.brackets.pop();
        self.pos = initial_pos;
        Some(make_inline(self.arena, NodeValue::Text("]".to_string())))
    }

    fn close_bracket_match(&mut self, is_image: bool, url: String, title: Option<String>) {
        let nl = NodeLink { url, title };
        let inl = make_inline(
            self.arena,
            if is_image {
                NodeValue::Image(nl)
            } else {
                NodeValue::Link(nl)
            },
        );

        let bracket = self.brackets.last().map(|b| (b.inl_text, b.stack_bottom));
        let (inl_text, stack_bottom) = match bracket {
            Some(b) => b,
            None => return,
        };

        inl_text.insert_before(self.arena, inl);
        let mut tmpch = inl_text.next_sibling(self.arena);
        while let Some(tmp) = tmpch {
            tmpch = tmp.next_sibling(self.arena);
            inl.append(self.arena, tmp);
        }
        inl_text.detach(self.arena);
        self.process_emphasis(stack_bottom);
        self.brackets.pop();

        // No links inside links: deactivate every earlier `[` opener.
        if !is_image {
            for b in self.brackets.iter_mut().rev() {
                if !b.image {
                    if !b.active {
                        break;
                    }
                    b.active = false;
                }
            }
        }
    }

    pub fn link_label(&mut self) -> Option<&str> {
        let startpos = self.pos;

        if self.peek_char() != Some(b'[') {
            return None;
        }

        self.pos += 1;

        let mut length = 0;
        let mut closed = false;
        while let Some(c) = self.peek_char() {
            if c == b'[' {
                break;
            }
            if c == b']' {
                closed = true;
                break;
            }
            if c == b'\\' {
                self.pos += 1;
                length += 1;
                if self.peek_char().map_or(false, ispunct) {
                    self.pos += 1;
                    length += 1;
                }
            } else {
                self.pos += 1;
                length += 1;
            }
            if length > MAX_LINK_LABEL_LENGTH {
                self.pos = startpos;
                return None;
            }
        }

        if closed {
            let raw_label = strings::trim_slice(&self.input[startpos + 1..self.pos]);
            self.pos += 1;
            Some(raw_label)
        } else {
            self.pos = startpos;
            None
        }
    }
}

/// Scan a link destination: either `<...>`-wrapped or bare with balanced
/// parentheses. Returns the matched length.
pub fn manual_scan_link_url(input: &str) -> Option<usize> {
    let len = input.len();
    let bytes = input.as_bytes();
    let mut i = 0;

    if i < len && bytes[i] == b'<' {
        i += 1;
        while i < len {
            let b = bytes[i];
            if b == b'>' {
                return Some(i + 1);
            } else if b == b'\\' && i + 1 < len && ispunct(bytes[i + 1]) {
                i += 2;
            } else if strings::is_line_end_char(b) || b == b'<' {
                return None;
            } else {
                i += 1;
            }
        }
        None
    } else {
        let mut nb_p: u32 = 0;
        while i < len {
            let b = bytes[i];
            if b == b'\\' && i + 1 < len && ispunct(bytes[i + 1]) {
                i += 2;
            } else if b == b'(' {
                nb_p += 1;
                i += 1;
                if nb_p > 32 {
                    return None;
                }
            } else if b == b')' {
                if nb_p == 0 {
                    break;
                }
                nb_p -= 1;
                i += 1;
            } else if isspace(b) || b < 0x20 || b == 0x7F {
                break;
            } else {
                i += 1;
            }
        }
        if nb_p != 0 {
            return None;
        }
        Some(i)
    }
}

pub fn make_inline(arena: &mut Arena, value: NodeValue) -> Node {
    let mut ast = Ast::new(value, 0);
    ast.open = false;
    arena.alloc(ast)
}

fn make_autolink(arena: &mut Arena, url: &str, email: bool) -> Node {
    let inl = make_inline(
        arena,
        NodeValue::Link(NodeLink {
            url: strings::clean_autolink(url, email),
            title: None,
        }),
    );
    let text = make_inline(arena, NodeValue::Text(entity::unescape_html(url)));
    inl.append(arena, text);
    inl
}

/// A lightweight cursor for parsing link reference definitions out of
/// closed paragraph content.
pub struct Scanner {
    pub pos: usize,
}

impl Scanner {
    pub fn new() -> Self {
        Scanner { pos: 0 }
    }

    pub fn peek_byte(&self, content: &str) -> Option<u8> {
        content.as_bytes().get(self.pos).copied()
    }

    pub fn link_label<'c>(&mut self, content: &'c str) -> Option<&'c str> {
        let startpos = self.pos;
        let bytes = content.as_bytes();

        if self.peek_byte(content) != Some(b'[') {
            return None;
        }

        self.pos += 1;

        let mut length = 0;
        let mut closed = false;
        while let Some(&c) = bytes.get(self.pos) {
            if c == b'[' {
                break;
            }
            if c == b']' {
                closed = true;
                break;
            }
            if c == b'\\' {
                self.pos += 1;
                length += 1;
                if self.peek_byte(content).map_or(false, ispunct) {
                    self.pos += 1;
                    length += 1;
                }
            } else {
                self.pos += 1;
                length += 1;
            }
            if length > MAX_LINK_LABEL_LENGTH {
                self.pos = startpos;
                return None;
            }
        }

        if closed {
            let raw_label = strings::trim_slice(&content[startpos + 1..self.pos]);
            self.pos += 1;
            Some(raw_label)
        } else {
            self.pos = startpos;
            None
        }
    }

    pub fn skip_spaces(&mut self, content: &str) -> bool {
        let mut skipped = false;
        while self
            .peek_byte(content)
            .map_or(false, |c| c == b' ' || c == b'\t')
        {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    pub fn skip_line_end(&mut self, content: &str) -> bool {
        let old_pos = self.pos;
        if self.peek_byte(content) == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_byte(content) == Some(b'\n') {
            self.pos += 1;
        }
        self.pos > old_pos || self.pos >= content.len()
    }

    pub fn spnl(&mut self, content: &str) {
        self.skip_spaces(content);
        if self.skip_line_end(content) {
            self.skip_spaces(content);
        }
    }
}

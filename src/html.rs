//! A reference HTML renderer for the public AST. It exists so the parser
//! can be checked against the CommonMark suite's expected output; policy
//! concerns (URL safety, sanitization, highlighting) are out of scope.

use crate::ast::{Block, Inline, ListKind, TableAlignment, TableCell};

/// Render blocks to HTML in the reference output shape.
pub fn render_html(blocks: &[Block]) -> String {
    let mut f = HtmlFormatter::new();
    f.format_blocks(blocks, false);
    f.output
}

struct HtmlFormatter {
    output: String,
}

impl HtmlFormatter {
    fn new() -> Self {
        HtmlFormatter {
            output: String::new(),
        }
    }

    fn cr(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
    }

    fn escape(&mut self, buffer: &str) {
        for c in buffer.chars() {
            match c {
                '"' => self.output.push_str("&quot;"),
                '&' => self.output.push_str("&amp;"),
                '<' => self.output.push_str("&lt;"),
                '>' => self.output.push_str("&gt;"),
                _ => self.output.push(c),
            }
        }
    }

    fn escape_href(&mut self, buffer: &str) {
        // Destinations come out of the parser already percent-encoded.
        for c in buffer.chars() {
            match c {
                '&' => self.output.push_str("&amp;"),
                '\'' => self.output.push_str("&#x27;"),
                _ => self.output.push(c),
            }
        }
    }

    fn format_blocks(&mut self, blocks: &[Block], tight: bool) {
        for block in blocks {
            self.format_block(block, tight);
        }
    }

    fn format_block(&mut self, block: &Block, tight: bool) {
        match *block {
            Block::Paragraph { ref children } => {
                if tight {
                    self.format_inlines(children);
                } else {
                    self.cr();
                    self.output.push_str("<p>");
                    self.format_inlines(children);
                    self.output.push_str("</p>\n");
                }
            }
            Block::Heading { level, ref children } => {
                self.cr();
                self.output.push_str(&format!("<h{}>", level));
                self.format_inlines(children);
                self.output.push_str(&format!("</h{}>\n", level));
            }
            Block::CodeBlock {
                ref info,
                ref literal,
            } => {
                self.cr();
                match info {
                    Some(info) => {
                        let first_word =
                            info.split_whitespace().next().unwrap_or_default();
                        self.output.push_str("<pre><code class=\"language-");
                        self.escape(first_word);
                        self.output.push_str("\">");
                    }
                    None => self.output.push_str("<pre><code>"),
                }
                self.escape(literal);
                self.output.push_str("</code></pre>\n");
            }
            Block::HtmlBlock { ref literal } => {
                self.cr();
                self.output.push_str(literal);
                self.cr();
            }
            Block::ThematicBreak => {
                self.cr();
                self.output.push_str("<hr />\n");
            }
            Block::BlockQuote { ref children } => {
                self.cr();
                self.output.push_str("<blockquote>\n");
                self.format_blocks(children, false);
                self.cr();
                self.output.push_str("</blockquote>\n");
            }
            Block::List(ref list) => {
                self.cr();
                match list.kind {
                    ListKind::Bullet { .. } => self.output.push_str("<ul>\n"),
                    ListKind::Ordered { start, .. } => {
                        if start == 1 {
                            self.output.push_str("<ol>\n");
                        } else {
                            self.output.push_str(&format!("<ol start=\"{}\">\n", start));
                        }
                    }
                }
                for item in &list.items {
                    self.cr();
                    self.output.push_str("<li>");
                    self.format_blocks(&item.children, list.tight);
                    self.output.push_str("</li>\n");
                }
                match list.kind {
                    ListKind::Bullet { .. } => self.output.push_str("</ul>\n"),
                    ListKind::Ordered { .. } => self.output.push_str("</ol>\n"),
                }
            }
            Block::Table(ref table) => {
                self.cr();
                self.output.push_str("<table>\n<thead>\n<tr>\n");
                for (i, cell) in table.header.iter().enumerate() {
                    self.table_cell("th", table.alignments.get(i), cell);
                }
                self.output.push_str("</tr>\n</thead>\n");
                if !table.rows.is_empty() {
                    self.output.push_str("<tbody>\n");
                    for row in &table.rows {
                        self.output.push_str("<tr>\n");
                        for (i, cell) in row.iter().enumerate() {
                            self.table_cell("td", table.alignments.get(i), cell);
                        }
                        self.output.push_str("</tr>\n");
                    }
                    self.output.push_str("</tbody>\n");
                }
                self.output.push_str("</table>\n");
            }
        }
    }

    fn table_cell(&mut self, tag: &str, alignment: Option<&TableAlignment>, cell: &TableCell) {
        self.output.push('<');
        self.output.push_str(tag);
        match alignment {
            Some(TableAlignment::Left) => self.output.push_str(" align=\"left\""),
            Some(TableAlignment::Right) => self.output.push_str(" align=\"right\""),
            Some(TableAlignment::Center) => self.output.push_str(" align=\"center\""),
            _ => {}
        }
        self.output.push('>');
        self.format_inlines(&cell.children);
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push_str(">\n");
    }

    fn format_inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.format_inline(inline);
        }
    }

    fn format_inline(&mut self, inline: &Inline) {
        match *inline {
            Inline::Text(ref literal) => self.escape(literal),
            Inline::SoftBreak => self.output.push('\n'),
            Inline::LineBreak => self.output.push_str("<br />\n"),
            Inline::Code(ref literal) => {
                self.output.push_str("<code>");
                self.escape(literal);
                self.output.push_str("</code>");
            }
            Inline::HtmlInline(ref literal) => self.output.push_str(literal),
            Inline::Emph { ref children } => {
                self.output.push_str("<em>");
                self.format_inlines(children);
                self.output.push_str("</em>");
            }
            Inline::Strong { ref children } => {
                self.output.push_str("<strong>");
                self.format_inlines(children);
                self.output.push_str("</strong>");
            }
            Inline::Link(ref link) => {
                self.output.push_str("<a href=\"");
                self.escape_href(&link.url);
                if let Some(ref title) = link.title {
                    self.output.push_str("\" title=\"");
                    self.escape(title);
                }
                self.output.push_str("\">");
                self.format_inlines(&link.children);
                self.output.push_str("</a>");
            }
            Inline::Image(ref link) => {
                self.output.push_str("<img src=\"");
                self.escape_href(&link.url);
                self.output.push_str("\" alt=\"");
                let mut alt = String::new();
                collect_plain_text(&link.children, &mut alt);
                self.escape(&alt);
                if let Some(ref title) = link.title {
                    self.output.push_str("\" title=\"");
                    self.escape(title);
                }
                self.output.push_str("\" />");
            }
        }
    }
}

fn collect_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match *inline {
            Inline::Text(ref t) | Inline::Code(ref t) => out.push_str(t),
            Inline::SoftBreak | Inline::LineBreak => out.push(' '),
            Inline::Emph { ref children } | Inline::Strong { ref children } => {
                collect_plain_text(children, out)
            }
            Inline::Link(ref l) | Inline::Image(ref l) => collect_plain_text(&l.children, out),
            Inline::HtmlInline(..) => {}
        }
    }
}

//! GFM pipe tables: delimiter-row recognition, header conversion, and row
//! continuation.

use crate::arena::Node;
use crate::ast::TableAlignment;
use crate::nodes::NodeValue;
use crate::strings;

use super::MarkdownParser;

/// Turn a matched paragraph whose last line is a table header into a table,
/// when the current line is a valid delimiter row.
pub fn try_opening_header(
    parser: &mut MarkdownParser,
    container: &mut Node,
    line: &str,
) -> bool {
    let aligns = match delimiter_row(&line[parser.first_nonspace..]) {
        Some(aligns) => aligns,
        None => return false,
    };

    // The header is the paragraph's last buffered line.
    let (split, header_line) = {
        let content = &container.data(&parser.arena).content;
        let trimmed_end = content.strip_suffix('\n').unwrap_or(content);
        let split = trimmed_end.rfind('\n').map(|i| i + 1).unwrap_or(0);
        (split, content[split..].to_string())
    };

    if !header_line.contains('|') {
        return false;
    }

    let header_row = match row(&header_line) {
        Some(cells) => cells,
        None => return false,
    };

    if header_row.len() != aligns.len() {
        return false;
    }

    // Commit: the header line leaves the paragraph, which closes (and
    // disappears when nothing remains), and the table takes its place.
    container
        .data_mut(&mut parser.arena)
        .content
        .truncate(split);

    let parent = match parser.finalize(*container) {
        Some(parent) => parent,
        None => return false,
    };

    let table = parser.add_child(parent, NodeValue::Table(aligns));
    let header = parser.add_child(table, NodeValue::TableRow(true));
    for header_str in header_row {
        let cell = parser.add_child(header, NodeValue::TableCell);
        cell.data_mut(&mut parser.arena).content = header_str;
    }

    let offset = line.len() - 1 - parser.offset;
    parser.advance_offset(line, offset, false);
    parser.current = table;
    *container = table;

    true
}

/// Append one body row to an open table. Rows are padded or truncated to
/// the header width.
pub fn try_opening_row(parser: &mut MarkdownParser, container: &mut Node, line: &str) -> bool {
    if parser.blank {
        return false;
    }

    let ncols = match container.data(&parser.arena).value {
        NodeValue::Table(ref aligns) => aligns.len(),
        _ => return false,
    };

    let this_row = match row(&line[parser.first_nonspace..]) {
        Some(cells) => cells,
        None => return false,
    };

    let new_row = parser.add_child(*container, NodeValue::TableRow(false));
    for i in 0..ncols {
        let cell = parser.add_child(new_row, NodeValue::TableCell);
        if let Some(s) = this_row.get(i) {
            cell.data_mut(&mut parser.arena).content = s.clone();
        }
    }

    let offset = line.len() - 1 - parser.offset;
    parser.advance_offset(line, offset, false);
    *container = new_row;

    true
}

/// Whether a line can continue an open table.
pub fn matches(line: &str) -> bool {
    row(line).is_some()
}

/// Parse a delimiter row into per-column alignments.
fn delimiter_row(line: &str) -> Option<Vec<TableAlignment>> {
    let trimmed = strings::trim_slice(line);
    if trimmed.is_empty() {
        return None;
    }

    let bytes = trimmed.as_bytes();
    match bytes[0] {
        b'|' | b':' => {}
        b'-' => {
            if bytes.len() > 1 && strings::is_space_or_tab(bytes[1]) {
                return None;
            }
        }
        _ => return None,
    }

    let segments: Vec<&str> = trimmed.split('|').collect();
    let mut segs = &segments[..];
    if segs.first() == Some(&"") {
        segs = &segs[1..];
    }
    if segs.last() == Some(&"") {
        segs = &segs[..segs.len() - 1];
    }
    if segs.is_empty() {
        return None;
    }

    let mut aligns = Vec::with_capacity(segs.len());
    for seg in segs {
        let seg = strings::trim_slice(seg);
        if seg.is_empty() {
            return None;
        }
        let b = seg.as_bytes();
        let left = b[0] == b':';
        let right = b[b.len() - 1] == b':';
        let dashes = &b[(left as usize)..b.len() - (right as usize)];
        if dashes.is_empty() || !dashes.iter().all(|&c| c == b'-') {
            return None;
        }
        aligns.push(match (left, right) {
            (true, true) => TableAlignment::Center,
            (true, false) => TableAlignment::Left,
            (false, true) => TableAlignment::Right,
            (false, false) => TableAlignment::None,
        });
    }

    Some(aligns)
}

/// Split a line into cells on unescaped pipes. `\|` becomes a literal `|`;
/// every other escape is left for the inline parser. One leading and one
/// trailing empty cell are dropped.
fn row(string: &str) -> Option<Vec<String>> {
    let trimmed = strings::trim_slice(string);
    if trimmed.is_empty() {
        return None;
    }

    let mut cells: Vec<String> = vec![];
    let mut cur = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'|') {
            chars.next();
            cur.push('|');
        } else if c == '|' {
            cells.push(cur);
            cur = String::new();
        } else {
            cur.push(c);
        }
    }
    cells.push(cur);

    let mut cells: Vec<String> = cells
        .into_iter()
        .map(|c| strings::trim_slice(&c).to_string())
        .collect();

    if cells.first().map_or(false, |c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().map_or(false, |c| c.is_empty()) {
        cells.pop();
    }

    Some(cells)
}

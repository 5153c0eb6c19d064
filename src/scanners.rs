use once_cell::sync::Lazy;
use regex::Regex;

use crate::ctype::{ispunct, isspace};

pub enum SetextChar {
    Equals,
    Hyphen,
}

pub fn atx_heading_start(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}([ \t]+|[\r\n])").unwrap());
    RE.find(line).map(|m| m.end())
}

pub fn setext_heading_line(line: &str) -> Option<SetextChar> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(=+|-+)[ \t]*[\r\n]").unwrap());
    if RE.is_match(line) {
        if line.as_bytes()[0] == b'=' {
            Some(SetextChar::Equals)
        } else {
            Some(SetextChar::Hyphen)
        }
    } else {
        None
    }
}

/// Opening code fence; returns the fence length. Info strings of backtick
/// fences may not contain backticks; tilde fences take anything.
pub fn open_code_fence(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(`{3,})[^`\r\n]*[\r\n]|^(~{3,})[^\r\n]*[\r\n]").unwrap());
    let caps = RE.captures(line)?;
    let m = caps.get(1).or_else(|| caps.get(2))?;
    Some(m.as_str().len())
}

pub fn close_code_fence(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(`{3,}|~{3,})[ \t]*[\r\n]").unwrap());
    let caps = RE.captures(line)?;
    Some(caps.get(1).map(|m| m.as_str().len()).unwrap_or(0))
}

static BLOCK_TAG_NAMES_PIPED: &str = "address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul";

/// HTML block start conditions 1 through 6.
pub fn html_block_start(line: &str) -> Option<u8> {
    static RE1: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^<(?i:script|pre|textarea|style)([ \t\v\f\r\n]|>)").unwrap());
    static RE2: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<!--").unwrap());
    static RE3: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<\?").unwrap());
    static RE4: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<![A-Za-z]").unwrap());
    static RE5: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<!\[CDATA\[").unwrap());
    static RE6: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"^</?(?i:{})([ \t\v\f\r\n]|/?>)",
            BLOCK_TAG_NAMES_PIPED
        ))
        .unwrap()
    });

    if RE1.is_match(line) {
        Some(1)
    } else if RE2.is_match(line) {
        Some(2)
    } else if RE3.is_match(line) {
        Some(3)
    } else if RE5.is_match(line) {
        // CDATA before the declaration pattern; `<![` is not a letter but
        // keeping the checks disjoint costs nothing.
        Some(5)
    } else if RE4.is_match(line) {
        Some(4)
    } else if RE6.is_match(line) {
        Some(6)
    } else {
        None
    }
}

const SPACE_CHAR: &str = r"[ \t\v\f\r\n]";
const TAG_NAME: &str = r"[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE_NAME: &str = r"[a-zA-Z_:][a-zA-Z0-9:._-]*";
const ATTRIBUTE_VALUE: &str = r#"(?:[^ \t\v\f\r\n"'=<>`\x00]+|'[^'\x00]*'|"[^"\x00]*")"#;

static OPEN_TAG: Lazy<String> = Lazy::new(|| {
    let attribute_value_spec = format!(r"(?:{}*={}*{})", SPACE_CHAR, SPACE_CHAR, ATTRIBUTE_VALUE);
    let attribute = format!(r"(?:{}+{}{}?)", SPACE_CHAR, ATTRIBUTE_NAME, attribute_value_spec);
    format!(r"(?:{}{}*{}*/?>)", TAG_NAME, attribute, SPACE_CHAR)
});
static CLOSE_TAG: Lazy<String> = Lazy::new(|| format!(r"(?:/{}{}*>)", TAG_NAME, SPACE_CHAR));

/// HTML block start condition 7: a complete open or close tag alone on its
/// line. Cannot interrupt a paragraph; the caller enforces that.
pub fn html_block_start_7(line: &str) -> Option<u8> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"^<({}|{})[ \t]*[\r\n]",
            *OPEN_TAG, *CLOSE_TAG
        ))
        .unwrap()
    });

    if RE.is_match(line) {
        Some(7)
    } else {
        None
    }
}

pub fn html_block_end_1(line: &str) -> bool {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)</(?:script|pre|textarea|style)>").unwrap());
    RE.is_match(line)
}

pub fn html_block_end_2(line: &str) -> bool {
    line.contains("-->")
}

pub fn html_block_end_3(line: &str) -> bool {
    line.contains("?>")
}

pub fn html_block_end_4(line: &str) -> bool {
    line.contains('>')
}

pub fn html_block_end_5(line: &str) -> bool {
    line.contains("]]>")
}

/// Inline raw HTML, matched just past the `<`. Open/close tags, comments,
/// processing instructions, declarations and CDATA sections, any of which
/// may span line endings.
pub fn html_tag(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"^(?:{}|{}|!-->|!--->|!--(?s:.*?)-->|\?(?s:.*?)\?>|![A-Za-z][^>\x00]*>|!\[CDATA\[(?s:.*?)\]\]>)",
            *OPEN_TAG, *CLOSE_TAG
        ))
        .unwrap()
    });
    RE.find(line).map(|m| m.end())
}

pub fn autolink_uri(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9.+-]{1,31}:[^\x00-\x20<>\x7F]*>").unwrap());
    RE.find(line).map(|m| m.end())
}

pub fn autolink_email(line: &str) -> Option<usize> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*>",
        )
        .unwrap()
    });
    RE.find(line).map(|m| m.end())
}

/// A link title in any of its three quoting styles; `(...)` titles may not
/// contain an unescaped `(`. Returns the full delimited length.
pub fn link_title(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if s.is_empty() {
        return None;
    }
    let open = bytes[0];
    if open != b'"' && open != b'\'' && open != b'(' {
        return None;
    }
    let closer = if open == b'(' { b')' } else { open };

    let mut i = 1;
    while i < s.len() {
        let b = bytes[i];
        if b == b'\\' && i + 1 < s.len() && ispunct(bytes[i + 1]) {
            i += 2;
            continue;
        }
        if b == closer {
            return Some(i + 1);
        }
        if open == b'(' && b == b'(' {
            return None;
        }
        i += 1;
    }
    None
}

/// A run of whitespace, if there is one.
pub fn spacechars(s: &str) -> Option<usize> {
    let n = s.bytes().take_while(|&b| isspace(b)).count();
    if n > 0 {
        Some(n)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx() {
        assert_eq!(atx_heading_start("## x\n"), Some(3));
        assert_eq!(atx_heading_start("###\n"), Some(4));
        assert_eq!(atx_heading_start("####### x\n"), None);
        assert_eq!(atx_heading_start("#x\n"), None);
    }

    #[test]
    fn fences() {
        assert_eq!(open_code_fence("```\n"), Some(3));
        assert_eq!(open_code_fence("````rust x\n"), Some(4));
        assert_eq!(open_code_fence("```a`b\n"), None);
        assert_eq!(open_code_fence("~~~a`b\n"), Some(3));
        assert_eq!(close_code_fence("```  \n"), Some(3));
        assert_eq!(close_code_fence("``` x\n"), None);
    }

    #[test]
    fn html_starts() {
        assert_eq!(html_block_start("<script>\n"), Some(1));
        assert_eq!(html_block_start("<!-- c\n"), Some(2));
        assert_eq!(html_block_start("<?php\n"), Some(3));
        assert_eq!(html_block_start("<!X\n"), Some(4));
        assert_eq!(html_block_start("<![CDATA[\n"), Some(5));
        assert_eq!(html_block_start("</table>\n"), Some(6));
        assert_eq!(html_block_start("<xmp>\n"), None);
        assert_eq!(html_block_start_7("<a b=\"c\">\n"), Some(7));
        assert_eq!(html_block_start_7("<a b> c\n"), None);
    }

    #[test]
    fn inline_tags() {
        assert_eq!(html_tag("em>"), Some(3));
        assert_eq!(html_tag("/em>"), Some(4));
        assert_eq!(html_tag("!-- hi -->"), Some(10));
        assert_eq!(html_tag("!-->"), Some(4));
        assert_eq!(html_tag("? pi ?>"), Some(7));
        assert_eq!(html_tag("!DECL x>"), Some(8));
        assert_eq!(html_tag("![CDATA[z]]>"), Some(12));
        assert_eq!(html_tag("3>"), None);
    }

    #[test]
    fn autolinks() {
        assert_eq!(autolink_uri("https://x.example/a?b=c>"), Some(24));
        assert_eq!(autolink_uri("https://x y>"), None);
        assert_eq!(autolink_email("a@b.example>"), Some(12));
        assert_eq!(autolink_email("not an email>"), None);
    }

    #[test]
    fn titles() {
        assert_eq!(link_title("\"t\""), Some(3));
        assert_eq!(link_title("'t'"), Some(3));
        assert_eq!(link_title("(t)"), Some(3));
        assert_eq!(link_title("(t(t))"), None);
        assert_eq!(link_title("\"\\\"t\""), Some(5));
        assert_eq!(link_title("\"open"), None);
    }
}

use super::*;
use crate::{Block, Inline};

fn text_of(children: &[Inline]) -> String {
    let mut out = String::new();
    for c in children {
        if let Inline::Text(t) = c {
            out.push_str(t);
        }
    }
    out
}

#[test]
fn heading_is_emitted_as_soon_as_its_line_ends() {
    let mut parser = MarkdownParser::new();

    let blocks = parser.parse_stream("# Hello World\nThis");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Heading { level, children } => {
            assert_eq!(*level, 1);
            assert_eq!(text_of(children), "Hello World");
        }
        other => panic!("expected heading, got {:?}", other),
    }

    let blocks = parser.parse_stream(" is a paragraph\n\nSecond.");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Paragraph { children } => {
            assert_eq!(text_of(children), "This is a paragraph");
        }
        other => panic!("expected paragraph, got {:?}", other),
    }

    let blocks = parser.parse("");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Paragraph { children } => assert_eq!(text_of(children), "Second."),
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn nothing_is_emitted_twice() {
    let mut parser = MarkdownParser::new();
    assert_eq!(parser.parse_stream("# a\n").len(), 1);
    assert_eq!(parser.parse_stream("").len(), 0);
    assert_eq!(parser.parse("").len(), 0);
}

#[test]
fn flush_on_a_fresh_parser_is_empty() {
    let mut parser = MarkdownParser::new();
    assert_eq!(parser.parse(""), vec![]);
}

#[test]
fn open_blocks_hold_back_emission() {
    let mut parser = MarkdownParser::new();
    // A list stays open across blank lines, so nothing can be emitted yet.
    assert_eq!(parser.parse_stream("- one\n\n- two\n").len(), 0);
    // A heading seals the list; both arrive at once, in order.
    let blocks = parser.parse_stream("# done\n");
    assert_eq!(blocks.len(), 2);
    assert!(matches!(blocks[0], Block::List(..)));
    assert!(matches!(blocks[1], Block::Heading { .. }));
    assert_eq!(parser.parse("").len(), 0);
}

#[test]
fn blocks_arrive_in_source_order() {
    let mut parser = MarkdownParser::new();
    let mut blocks = parser.parse_stream("# a\n\npara\n\n```\nx\n```\n");
    blocks.extend(parser.parse(""));
    assert!(matches!(blocks[0], Block::Heading { .. }));
    assert!(matches!(blocks[1], Block::Paragraph { .. }));
    assert!(matches!(blocks[2], Block::CodeBlock { .. }));
}

#[test]
fn crlf_split_across_chunks_is_one_line() {
    let mut parser = MarkdownParser::new();
    let mut blocks = parser.parse_stream("a\r");
    blocks.extend(parser.parse_stream("\nb"));
    blocks.extend(parser.parse(""));
    assert_eq!(render_html(&blocks), "<p>a\nb</p>\n");
}

#[test]
fn cr_then_empty_chunk_then_lf_makes_a_blank_line() {
    let mut parser = MarkdownParser::new();
    let mut blocks = parser.parse_stream("a\r");
    // An intervening call, even an empty one, flushes the pending CR.
    blocks.extend(parser.parse_stream(""));
    blocks.extend(parser.parse_stream("\nX"));
    // The LF made a blank line, which closed the paragraph.
    assert_eq!(blocks.len(), 1);
    assert_eq!(render_html(&blocks), "<p>a</p>\n");
    let blocks = parser.parse("");
    assert_eq!(render_html(&blocks), "<p>X</p>\n");
}

#[test]
fn streamed_output_matches_batch_output() {
    let docs = [
        "# h\n\npara one\npara one b\n\n- a\n- b\n\n> quote\n",
        "| a | b |\n| - | - |\n| 1 | 2 |\n\ndone\n",
        "[ref]: /url \"t\"\n\n```rust\nfn x() {}\n```\ntext [ref] text\n",
        "setext\n===\n\n***deep *em* deep***\n",
        "1. first\n2. second\n\n    code\n",
    ];
    for doc in docs {
        assert_rechunking_invariant(doc);
    }
}

#[test]
fn rechunking_handles_multibyte_boundaries() {
    assert_rechunking_invariant("# héäding\n\npär *ägraph* ö\n");
}

#[test]
fn streaming_table_rows() {
    let mut parser = MarkdownParser::new();
    assert_eq!(parser.parse_stream("| a |\n| - |\n").len(), 0);
    assert_eq!(parser.parse_stream("| 1 |\n| 2 |\n").len(), 0);
    let blocks = parser.parse("");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Table(table) => {
            assert_eq!(table.header.len(), 1);
            assert_eq!(table.rows.len(), 2);
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn table_shape() {
    let mut parser = MarkdownParser::new();
    let blocks = parser.parse("| a | b |\n| - | - |\n| 1 | 2 |\n");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Table(table) => {
            assert_eq!(text_of(&table.header[0].children), "a");
            assert_eq!(text_of(&table.header[1].children), "b");
            assert_eq!(table.rows.len(), 1);
            assert_eq!(text_of(&table.rows[0][0].children), "1");
            assert_eq!(text_of(&table.rows[0][1].children), "2");
            assert_eq!(
                table.alignments,
                vec![crate::TableAlignment::None, crate::TableAlignment::None]
            );
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn definitions_from_an_earlier_call_still_resolve() {
    let mut parser = MarkdownParser::new();
    assert_eq!(parser.parse_stream("[ref]: /url\n\n").len(), 0);
    let blocks = parser.parse("see [ref]\n");
    assert_eq!(
        render_html(&blocks),
        "<p>see <a href=\"/url\">ref</a></p>\n"
    );
}

#[test]
fn partial_line_is_not_parsed_early() {
    let mut parser = MarkdownParser::new();
    assert_eq!(parser.parse_stream("# partial head").len(), 0);
    let blocks = parser.parse("ing\n");
    assert_eq!(render_html(&blocks), "<h1>partial heading</h1>\n");
}

#[test]
fn parser_stays_usable_after_flush() {
    let mut parser = MarkdownParser::new();
    assert_eq!(render_html(&parser.parse("one\n")), "<p>one</p>\n");
    assert_eq!(render_html(&parser.parse("two\n")), "<p>two</p>\n");
}

#[test]
fn drip_fed_document() {
    let doc = "# title\n\n- item one\n- item two\n\nlast *paragraph*\n";
    let expected = render_html(&parse_document(doc, &crate::Options::default()));

    let mut parser = MarkdownParser::new();
    let mut blocks = vec![];
    for chunk in doc.split_inclusive(' ') {
        blocks.extend(parser.parse_stream(chunk));
    }
    blocks.extend(parser.parse(""));
    assert_eq!(render_html(&blocks), expected);
}

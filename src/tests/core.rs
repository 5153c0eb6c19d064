use super::*;

#[test]
fn basic() {
    html(
        concat!(
            "My **document**.\n",
            "\n",
            "It's mine.\n",
            "\n",
            "> Yes.\n",
            "\n",
            "## Hi!\n",
            "\n",
            "Okay.\n"
        ),
        concat!(
            "<p>My <strong>document</strong>.</p>\n",
            "<p>It's mine.</p>\n",
            "<blockquote>\n",
            "<p>Yes.</p>\n",
            "</blockquote>\n",
            "<h2>Hi!</h2>\n",
            "<p>Okay.</p>\n"
        ),
    );
}

#[test]
fn paragraph_joins_lines() {
    html("a\nb\nc\n", "<p>a\nb\nc</p>\n");
}

#[test]
fn continuation_leading_spaces_are_dropped() {
    html("aaa\n             bbb\n", "<p>aaa\nbbb</p>\n");
}

#[test]
fn blockquote_nesting() {
    html(
        "> > inner\n> outer\n",
        concat!(
            "<blockquote>\n",
            "<blockquote>\n",
            "<p>inner\nouter</p>\n",
            "</blockquote>\n",
            "</blockquote>\n"
        ),
    );
}

#[test]
fn blockquote_lazy_continuation() {
    html(
        "> foo\nbaz\n",
        "<blockquote>\n<p>foo\nbaz</p>\n</blockquote>\n",
    );
}

#[test]
fn blockquote_blank_line_splits_paragraphs() {
    html(
        "> a\n>\n> b\n",
        "<blockquote>\n<p>a</p>\n<p>b</p>\n</blockquote>\n",
    );
}

#[test]
fn setext_lazily_continued_in_blockquote() {
    html(
        "> foo\nbar\n===\n",
        "<blockquote>\n<p>foo\nbar\n===</p>\n</blockquote>\n",
    );
}

#[test]
fn thematic_breaks() {
    html(
        concat!("---\n", "\n", "- - -\n", "\n", "\n", "_        _   _\n"),
        concat!("<hr />\n", "<hr />\n", "<hr />\n"),
    );
}

#[test]
fn thematic_break_interrupts_paragraph() {
    html("Foo\n* * *\nbar\n", "<p>Foo</p>\n<hr />\n<p>bar</p>\n");
}

#[test]
fn nul_is_replaced() {
    html("a\u{0}b\n", "<p>a\u{fffd}b</p>\n");
}

#[test]
fn bom_is_skipped() {
    html("\u{feff}# hi\n", "<h1>hi</h1>\n");
}

#[test]
fn no_trailing_newline() {
    html("paragraph", "<p>paragraph</p>\n");
}

#[test]
fn carriage_returns_normalize() {
    html("a\r\nb\rc\n", "<p>a\nb\nc</p>\n");
}

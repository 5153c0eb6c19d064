use super::*;
use crate::{parse_document, Block, Inline, Options};

#[test]
fn links() {
    html(
        concat!(
            "Where are you [going](https://microsoft.com (today))?\n",
            "\n",
            "[Where am I?](/here)\n"
        ),
        concat!(
            "<p>Where are you <a href=\"https://microsoft.com\" \
             title=\"today\">going</a>?</p>\n",
            "<p><a href=\"/here\">Where am I?</a></p>\n"
        ),
    );
}

#[test]
fn pointy_destination() {
    html(
        "[link](</my uri>)\n",
        "<p><a href=\"/my%20uri\">link</a></p>\n",
    );
}

#[test]
fn empty_destination() {
    html("[link]()\n", "<p><a href=\"\">link</a></p>\n");
}

#[test]
fn balanced_parens_in_destination() {
    html(
        "[link](foo(and(bar)))\n",
        "<p><a href=\"foo(and(bar))\">link</a></p>\n",
    );
    html("[link](foo(and(bar))\n", "<p>[link](foo(and(bar))</p>\n");
}

#[test]
fn destination_is_percent_encoded() {
    html("[a](/föö)\n", "<p><a href=\"/f%C3%B6%C3%B6\">a</a></p>\n");
    html(
        "[a](/url?find=\"me\")\n",
        "<p><a href=\"/url?find=%22me%22\">a</a></p>\n",
    );
}

#[test]
fn titles_in_all_quote_styles() {
    html(
        "[a](/u \"t\")\n[b](/u 't')\n[c](/u (t))\n",
        concat!(
            "<p><a href=\"/u\" title=\"t\">a</a>\n",
            "<a href=\"/u\" title=\"t\">b</a>\n",
            "<a href=\"/u\" title=\"t\">c</a></p>\n"
        ),
    );
}

#[test]
fn empty_title_is_kept() {
    html("[a](/u \"\")\n", "<p><a href=\"/u\" title=\"\">a</a></p>\n");
}

#[test]
fn escaped_characters_in_destination_and_title() {
    html(
        "[a](/u\\_x \"t\\\"t\")\n",
        "<p><a href=\"/u_x\" title=\"t&quot;t\">a</a></p>\n",
    );
}

#[test]
fn reference_links() {
    html(
        concat!(
            "This [is] [legit], [very][honestly] legit.\n",
            "\n",
            "[legit]: ok\n",
            "[honestly]: sure \"hm\"\n"
        ),
        concat!(
            "<p>This [is] <a href=\"ok\">legit</a>, <a href=\"sure\" title=\"hm\">very</a> \
             legit.</p>\n"
        ),
    );
}

#[test]
fn full_collapsed_and_shortcut_references() {
    html(
        "[ref]: /u \"t\"\n\n[ref] and [ref][]\n",
        concat!(
            "<p><a href=\"/u\" title=\"t\">ref</a> and ",
            "<a href=\"/u\" title=\"t\">ref</a></p>\n"
        ),
    );
}

#[test]
fn reference_resolution_shape() {
    let blocks = parse_document("[ref]: /u \"t\"\n\n[ref] and [ref][]\n", &Options::default());
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        Block::Paragraph { children } => {
            assert_eq!(children.len(), 3);
            match (&children[0], &children[1], &children[2]) {
                (Inline::Link(a), Inline::Text(mid), Inline::Link(b)) => {
                    assert_eq!(a.url, "/u");
                    assert_eq!(a.title.as_deref(), Some("t"));
                    assert_eq!(mid, " and ");
                    assert_eq!(b.url, "/u");
                }
                other => panic!("unexpected children: {:?}", other),
            }
        }
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn definitions_later_in_the_same_call_resolve() {
    // Batch parse only: inline parsing is deferred to emission, so a
    // definition that closes later in the same call still applies.
    let blocks = parse_document("[ref]\n\n[ref]: /go\n", &Options::default());
    assert_eq!(
        crate::html::render_html(&blocks),
        "<p><a href=\"/go\">ref</a></p>\n"
    );
}

#[test]
fn first_definition_wins() {
    html(
        "[foo]: /first\n[foo]: /second\n\n[foo]\n",
        "<p><a href=\"/first\">foo</a></p>\n",
    );
}

#[test]
fn labels_are_case_folded() {
    html(
        "[FoO]: /url\n\n[fOo]\n",
        "<p><a href=\"/url\">fOo</a></p>\n",
    );
}

#[test]
fn label_whitespace_collapses() {
    html(
        "[foo   bar\n  baz]: /url\n\n[foo bar baz]\n",
        "<p><a href=\"/url\">foo bar baz</a></p>\n",
    );
}

#[test]
fn undefined_reference_stays_literal() {
    html("[nope][missing]\n", "<p>[nope][missing]</p>\n");
    html("![nope]\n", "<p>![nope]</p>\n");
}

#[test]
fn definition_title_on_next_line() {
    html(
        "[foo]: /url\n\"title\"\n\n[foo]\n",
        "<p><a href=\"/url\" title=\"title\">foo</a></p>\n",
    );
}

#[test]
fn definition_alone_is_invisible() {
    html("[foo]: /url\n", "");
}

#[test]
fn definition_needs_a_destination() {
    html("[foo]:\n\n[foo]\n", "<p>[foo]:</p>\n<p>[foo]</p>\n");
}

#[test]
fn images() {
    html(
        "I am ![eating [things](/url)](http://i.imgur.com/QqK1vq7.png).\n",
        concat!(
            "<p>I am <img src=\"http://i.imgur.com/QqK1vq7.png\" alt=\"eating things\" \
             />.</p>\n"
        ),
    );
}

#[test]
fn image_with_title() {
    html(
        "![alt](/img \"t\")\n",
        "<p><img src=\"/img\" alt=\"alt\" title=\"t\" /></p>\n",
    );
}

#[test]
fn no_links_inside_links() {
    html(
        "[a [b](/inner) c](/outer)\n",
        "<p>[a <a href=\"/inner\">b</a> c](/outer)</p>\n",
    );
}

#[test]
fn emphasis_resolves_inside_link_labels() {
    html(
        "[*em* text](/u)\n",
        "<p><a href=\"/u\"><em>em</em> text</a></p>\n",
    );
}

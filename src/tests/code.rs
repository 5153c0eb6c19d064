use super::*;
use crate::{parse_document, Block, Options};

#[test]
fn codefence() {
    html(
        concat!("``` rust yum\n", "fn main<'a>();\n", "```\n"),
        concat!(
            "<pre><code class=\"language-rust\">fn main&lt;'a&gt;();\n",
            "</code></pre>\n"
        ),
    );
}

#[test]
fn fence_with_empty_body() {
    let blocks = parse_document("```\n```\n", &Options::default());
    assert_eq!(
        blocks,
        vec![Block::CodeBlock {
            info: None,
            literal: String::new(),
        }]
    );
    html("```\n```\n", "<pre><code></code></pre>\n");
}

#[test]
fn unterminated_fence_runs_to_the_end() {
    html("```\nbody\n", "<pre><code>body\n</code></pre>\n");
    html("```\n", "<pre><code></code></pre>\n");
}

#[test]
fn closing_fence_must_be_long_enough() {
    html(
        "````\n```\nstill code\n````\n",
        "<pre><code>```\nstill code\n</code></pre>\n",
    );
}

#[test]
fn tilde_info_may_contain_backticks() {
    html(
        "~~~ a`b\nx\n~~~\n",
        "<pre><code class=\"language-a`b\">x\n</code></pre>\n",
    );
}

#[test]
fn backtick_info_may_not_contain_backticks() {
    html("``` a`b\n", "<p>``` a`b</p>\n");
}

#[test]
fn fenced_code_interrupts_paragraph() {
    html(
        "para\n```\ncode\n```\n",
        "<p>para</p>\n<pre><code>code\n</code></pre>\n",
    );
}

#[test]
fn indented_code() {
    html(
        "    a simple\n      indented code block\n",
        "<pre><code>a simple\n  indented code block\n</code></pre>\n",
    );
}

#[test]
fn indented_code_keeps_interior_blanks_trims_trailing() {
    html(
        "    chunk1\n\n    chunk2\n\n\n    chunk3\n\n\n",
        "<pre><code>chunk1\n\nchunk2\n\n\nchunk3\n</code></pre>\n",
    );
}

#[test]
fn indented_code_cannot_interrupt_paragraph() {
    html("Foo\n    bar\n", "<p>Foo\nbar</p>\n");
}

#[test]
fn fence_inside_list_item() {
    html(
        "- ```\n  code\n  ```\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<pre><code>code\n</code></pre>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn fence_indent_is_stripped_from_content() {
    html(
        "   ```\n   code\n    still\n   ```\n",
        "<pre><code>code\n still\n</code></pre>\n",
    );
}

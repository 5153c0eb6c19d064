use super::*;

#[test]
fn entities() {
    html(
        concat!(
            "This is &amp;, &copy;, &trade;, \\&trade;, &xyz;, &NotEqualTilde;.\n",
            "\n",
            "&#8734; &#x221e;\n"
        ),
        concat!(
            "<p>This is &amp;, ©, ™, &amp;trade;, &amp;xyz;, \u{2242}\u{338}.</p>\n",
            "<p>∞ ∞</p>\n"
        ),
    );
}

#[test]
fn numeric_out_of_range_becomes_replacement() {
    html("&#0; &#x110000;\n", "<p>\u{fffd} \u{fffd}</p>\n");
}

#[test]
fn bare_ampersand_is_literal() {
    html("a & b &; &x\n", "<p>a &amp; b &amp;; &amp;x</p>\n");
}

#[test]
fn entities_decode_inside_destinations() {
    html(
        "[a](/url?a=b&amp;c=d)\n",
        "<p><a href=\"/url?a=b&amp;c=d\">a</a></p>\n",
    );
}

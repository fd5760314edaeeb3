use docxflow_pdf::{clean, sanitize};

#[test]
fn typographic_characters_become_ascii() {
    let raw = "a\u{2013}b\u{2014}c \u{2018}q\u{2019} \u{201C}dq\u{201D} \u{2022} wait\u{2026}";
    let out = sanitize(raw);
    for original in ['\u{2013}', '\u{2014}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2026}'] {
        assert!(!out.contains(original), "{original:?} survived in {out:?}");
    }
    assert_eq!(out, "a-b--c 'q' \"dq\" - wait...");
}

#[test]
fn markup_characters_are_escaped() {
    let out = sanitize("x < y && y > z");
    assert_eq!(out, "x &lt; y &amp;&amp; y &gt; z");
    assert!(!out.contains('<'));
    assert!(!out.contains('>'));
    assert_eq!(out.matches('&').count(), out.matches("&amp;").count() + 2);
}

#[test]
fn ampersand_is_escaped_once() {
    assert_eq!(sanitize("&lt;"), "&amp;lt;");
    assert_eq!(sanitize("R&D"), "R&amp;D");
}

#[test]
fn empty_or_absent_text_is_empty() {
    assert_eq!(sanitize(""), "");
    assert_eq!(sanitize(None), "");
    assert_eq!(sanitize(sanitize("").as_str()), "");
}

#[test]
fn plain_text_passes_through() {
    assert_eq!(sanitize("Quarterly report, 2024"), "Quarterly report, 2024");
}

#[test]
fn clean_trims_before_escaping() {
    assert_eq!(clean("  \u{201C}Scope\u{201D} & aims\t\n"), "\"Scope\" &amp; aims");
    assert_eq!(clean(" \u{00A0} "), "");
}

/// Typographic substitutions first, then markup escapes with `&` leading so
/// the later escapes are not escaped twice.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{2013}", "-"),
    ("\u{2014}", "--"),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{201C}", "\""),
    ("\u{201D}", "\""),
    ("\u{2022}", "-"),
    ("\u{2026}", "..."),
    ("&", "&amp;"),
    ("<", "&lt;"),
    (">", "&gt;"),
];

/// Make raw document text safe for the paragraph markup used by the layout engine.
///
/// Accepts `&str` or `Option<&str>`; absent and empty input both yield an empty string.
pub fn sanitize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into().filter(|t| !t.is_empty()) else {
        return String::new();
    };
    REPLACEMENTS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| {
            if acc.contains(from) { acc.replace(from, to) } else { acc }
        })
}

/// Trim, then sanitize. This is how every paragraph and cell enters the story.
pub fn clean(text: &str) -> String {
    sanitize(text.trim())
}

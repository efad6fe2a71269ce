/// Collapses runs of whitespace (including non-breaking spaces) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a comma separated marker list such as `"Gl, Mi,,Sl "`.
pub fn split_codes(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

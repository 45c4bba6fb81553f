/// Characters that must be backslash-escaped in Telegram MarkdownV2 text.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape every reserved MarkdownV2 character in `text`.
///
/// Callers escape each literal exactly once; applying this to already escaped
/// text escapes the inserted punctuation again.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Like [`escape`], mapping an absent value to the empty string.
pub fn escape_opt(text: Option<&str>) -> String {
    text.map(escape).unwrap_or_default()
}

/// Wrap already escaped text in bold markers.
pub fn bold(escaped: &str) -> String {
    format!("*{escaped}*")
}

/// Wake-phrase prefixes paired with the number of bytes to strip, in
/// priority order: the punctuated forms first so the bare word never
/// shadows them.
const WAKE_PREFIXES: &[(&str, usize)] = &[
    ("computer,", 9),
    ("computer.", 9),
    ("computer", 8),
];

/// Strip the wake phrase from recognized text, case-insensitively.
///
/// Returns the remaining command with leading whitespace trimmed, or
/// `None` when the text does not start with any known form of the wake
/// phrase.
pub fn strip_wake_phrase(text: &str) -> Option<&str> {
    for (prefix, strip) in WAKE_PREFIXES {
        if let Some(head) = text.get(..*strip) {
            if head.eq_ignore_ascii_case(prefix) {
                return Some(text[*strip..].trim_start());
            }
        }
    }
    None
}

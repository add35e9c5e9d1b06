/// Directory-safe board identifiers derived from display names.
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase the name and join its words with hyphens.
///
/// Accents are folded (`Café` -> `cafe`), whitespace, `-` and `_` runs become a
/// single hyphen, and any other character outside `[a-z0-9]` is dropped.
/// Returns an empty string when nothing usable remains.
pub fn board_id_from_name(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.trim().nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_whitespace() || c == '-' || c == '_' {
            if !id.is_empty() {
                pending_hyphen = true;
            }
            continue;
        }
        for lower in c.to_lowercase() {
            if lower.is_ascii_alphanumeric() {
                if pending_hyphen {
                    id.push('-');
                    pending_hyphen = false;
                }
                id.push(lower);
            }
        }
    }
    id
}

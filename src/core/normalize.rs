/// Canonicalizes a human-authored header or placeholder name into the key
/// form used everywhere field names are compared: punctuation stripped,
/// lowercased, runs of whitespace/hyphens/underscores collapsed to a single
/// underscore, leading/trailing separators trimmed.
///
/// Total and idempotent. Two names are the same field if and only if they
/// normalize to the same string.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
        } else if ch.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        }
        // any other character is stripped without breaking a separator run
    }

    out
}

//! URL-safe identifiers derived from heading text

/// Identifier used when heading text produces no usable characters
pub const FALLBACK_ID: &str = "heading";

/// Create an identifier from heading text.
///
/// Keeps ASCII word characters, whitespace and hyphens, turns whitespace runs
/// into single hyphens and trims hyphens from both ends.
pub fn generate_id(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut id = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for c in lowered.trim().chars() {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !id.is_empty() {
                id.push('-');
            }
            pending_hyphen = false;
            id.push(c);
        }
    }

    if id.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        id
    }
}

/// Append `-1`, `-2`, ... to `base` until `taken` reports the candidate free
pub fn unique_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }

    let mut counter = 1u32;
    loop {
        let candidate = format!("{base}-{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

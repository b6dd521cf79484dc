//! Install-name derivation.
//!
//! The install name keys the ledger and every IDE config entry, so it must be
//! safe as a file name and as a JSON object key: `[a-z0-9-]+`.

/// Derive an install name from a display name.
///
/// Lowercases and trims, turns whitespace runs into a single dash, maps `_`
/// to `-`, drops every other character outside `[a-z0-9-]`, collapses dash
/// runs and strips leading/trailing dashes. The result may be empty when the
/// name contains no usable characters; callers must reject that.
///
/// Deriving from an already-derived name returns it unchanged.
pub fn derive_install_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().to_lowercase().chars() {
        let mapped = match c {
            'a'..='z' | '0'..='9' => Some(c),
            '-' | '_' => None,
            c if c.is_whitespace() => None,
            _ => {
                // Stripped characters do not separate words.
                continue;
            }
        };
        match mapped {
            Some(c) => {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c);
            }
            None => pending_dash = true,
        }
    }

    out
}

/// Whether `value` is a well-formed install name.
pub fn is_valid_install_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

//! Shell quoting for displaying command lines.

/// Escape a string for use in a shell command
///
/// This function quotes the string only if necessary (i.e., if it contains characters
/// that have special meaning in the shell). It uses single quotes for safety.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    if s.chars().all(|c| {
        c.is_alphanumeric() || matches!(c, '-' | '_' | '=' | '/' | '.' | ':' | ',' | '@' | '+')
    }) {
        return s.to_string();
    }

    format!("'{}'", s.replace('\'', r"'\''"))
}

//! Small string helpers.

/// Uppercases the first character, leaving the rest untouched.
///
/// ```
/// use taleweaver_domain::common::capitalize;
///
/// assert_eq!(capitalize("devoted"), "Devoted");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts a blank (empty or whitespace-only) string to `None`.
///
/// DM notes arrive from UI text boxes, where an untouched box is "".
pub fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

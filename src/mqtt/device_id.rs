//! Device identifier rules.

/// True when `id` is non-empty and only made of ASCII letters, digits, `-` and `_`.
///
/// Identifiers passing this check can be embedded into any topic pattern
/// without producing an invalid topic.
pub fn is_valid_device_id(id: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    !id.is_empty() && id.chars().all(allowed)
}

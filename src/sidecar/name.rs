//! Container name derivation.

/// Namespace token prepended to every derived container name.
pub const CONTAINER_NAME_PREFIX: &str = "ls-ext-";

/// Derive a runtime-safe container name from a logical service name.
///
/// Every character outside `[A-Za-z0-9_]` becomes `-`. Names that differ only
/// in which punctuation they use map to the same container name.
pub fn container_name(logical_name: &str) -> String {
    let sanitized: String = logical_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{CONTAINER_NAME_PREFIX}{sanitized}")
}

//! Environment access helpers shared by the config resolvers.

use std::env::{self, VarError};

use crate::error::ConfigError;

/// Read a single variable. Unset and empty both mean `None`.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
            key: key.to_string(),
        }),
    }
}

/// Snapshot every variable whose name starts with `prefix`.
///
/// Variables with non-UTF-8 names are skipped; a matching name with a
/// non-UTF-8 value is an error.
pub(crate) fn env_with_prefix(prefix: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut vars = Vec::new();
    for (key, value) in env::vars_os() {
        let Some(key) = key.to_str() else {
            continue;
        };
        if !key.starts_with(prefix) {
            continue;
        }
        let value = value
            .into_string()
            .map_err(|_| ConfigError::NotUnicode {
                key: key.to_string(),
            })?;
        vars.push((key.to_string(), value));
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys are unique per test; the process environment is shared.

    #[test]
    fn test_optional_env_unset() {
        assert_eq!(
            optional_env("QDRANT_SIDECAR_TEST_DEFINITELY_UNSET").unwrap(),
            None
        );
    }

    #[test]
    fn test_env_with_prefix_matches_nothing_for_unique_prefix() {
        let vars = env_with_prefix("QDRANT_SIDECAR_TEST_NO_SUCH_PREFIX_").unwrap();
        assert!(vars.is_empty());
    }
}

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing
/// or empty.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Maps a hierarchical parameter path onto an environment variable name.
///
/// Path separators and dashes become underscores, everything is uppercased and
/// leading/trailing separators are dropped:
/// `/rrg-creator/rds-endpoint` -> `RRG_CREATOR_RDS_ENDPOINT`.
pub fn env_key_for_path(path: &str) -> String {
    path.trim_matches('/')
        .chars()
        .map(|c| match c {
            '/' | '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_paths_map_to_env_keys() {
        assert_eq!(env_key_for_path("/rrg-creator/rds-endpoint"), "RRG_CREATOR_RDS_ENDPOINT");
        assert_eq!(env_key_for_path("rds.user"), "RDS_USER");
        assert_eq!(env_key_for_path("/a/"), "A");
    }

    #[test]
    fn missing_var_reports_its_name() {
        let err = get_env_var("SHARED_UTILS_SURELY_UNSET_VAR").unwrap_err();
        assert_eq!(err.to_string(), "Missing environment variable: SHARED_UTILS_SURELY_UNSET_VAR");
    }
}

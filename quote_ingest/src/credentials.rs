//! Credentials providers: where connection parameters come from.
//!
//! The worker never reads secrets from global state. An [`crate::ingest::Ingestor`]
//! is built with a [`CredentialsProvider`] and asks it for the four connection
//! parameters named in [`crate::config::ParameterPaths`].

use indexmap::IndexMap;
use secrecy::SecretString;
use shared_utils::env::{MissingEnvVarError, env_key_for_path, get_env_var};
use thiserror::Error;

use crate::IngestError;
use crate::config::ParameterPaths;
use crate::sink::ConnectionSettings;

/// Errors a [`CredentialsProvider`] may report.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The environment variable backing the parameter is unset.
    #[error(transparent)]
    MissingEnv(#[from] MissingEnvVarError),

    /// The provider has no value for the parameter.
    #[error("parameter not found: {0}")]
    NotFound(String),
}

/// Parameter-store style lookup: `path` -> value.
///
/// `decrypt` asks for the plaintext of an encrypted parameter; providers that
/// only hold plaintext ignore it.
pub trait CredentialsProvider {
    /// Resolves one parameter.
    fn get_parameter(&self, path: &str, decrypt: bool) -> Result<String, CredentialsError>;
}

impl<T: CredentialsProvider + ?Sized> CredentialsProvider for &T {
    fn get_parameter(&self, path: &str, decrypt: bool) -> Result<String, CredentialsError> {
        (**self).get_parameter(path, decrypt)
    }
}

impl<T: CredentialsProvider + ?Sized> CredentialsProvider for Box<T> {
    fn get_parameter(&self, path: &str, decrypt: bool) -> Result<String, CredentialsError> {
        (**self).get_parameter(path, decrypt)
    }
}

/// Reads parameters from environment variables.
///
/// `/rrg-creator/rds-user` is looked up as `RRG_CREATOR_RDS_USER`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn get_parameter(&self, path: &str, _decrypt: bool) -> Result<String, CredentialsError> {
        Ok(get_env_var(&env_key_for_path(path))?)
    }
}

/// Fixed in-memory parameters, e.g. from the `[static_parameters]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    params: IndexMap<String, String>,
}

impl StaticCredentials {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(path.into(), value.into());
        self
    }
}

impl From<IndexMap<String, String>> for StaticCredentials {
    fn from(params: IndexMap<String, String>) -> Self {
        Self { params }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn get_parameter(&self, path: &str, _decrypt: bool) -> Result<String, CredentialsError> {
        self.params
            .get(path)
            .cloned()
            .ok_or_else(|| CredentialsError::NotFound(path.to_string()))
    }
}

/// Resolves host, user, password (decrypted) and database, in that order.
pub fn resolve_settings<P: CredentialsProvider + ?Sized>(
    provider: &P,
    paths: &ParameterPaths,
) -> Result<ConnectionSettings, IngestError> {
    let fetch = |path: &str, decrypt: bool| {
        provider
            .get_parameter(path, decrypt)
            .map_err(|source| IngestError::Credentials {
                path: path.to_string(),
                source,
            })
    };

    Ok(ConnectionSettings {
        host: fetch(&paths.host, false)?,
        user: fetch(&paths.user, false)?,
        password: SecretString::new(fetch(&paths.password, true)?.into()),
        database: fetch(&paths.database, false)?,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use secrecy::ExposeSecret;

    use super::*;

    struct Recording {
        inner: StaticCredentials,
        calls: RefCell<Vec<(String, bool)>>,
    }

    impl CredentialsProvider for Recording {
        fn get_parameter(&self, path: &str, decrypt: bool) -> Result<String, CredentialsError> {
            self.calls.borrow_mut().push((path.to_string(), decrypt));
            self.inner.get_parameter(path, decrypt)
        }
    }

    fn full_static() -> StaticCredentials {
        StaticCredentials::new()
            .with("/rrg-creator/rds-endpoint", "db.internal")
            .with("/rrg-creator/rds-user", "ingest")
            .with("/rrg-creator/rds-password", "hunter2")
            .with("/rrg-creator/rds-database", "quotes")
    }

    #[test]
    fn resolves_all_four_and_decrypts_only_the_password() {
        let provider = Recording {
            inner: full_static(),
            calls: RefCell::new(vec![]),
        };

        let settings = resolve_settings(&provider, &ParameterPaths::default()).expect("resolve");
        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.user, "ingest");
        assert_eq!(settings.password.expose_secret(), "hunter2");
        assert_eq!(settings.database, "quotes");

        let calls = provider.calls.into_inner();
        assert_eq!(
            calls,
            vec![
                ("/rrg-creator/rds-endpoint".to_string(), false),
                ("/rrg-creator/rds-user".to_string(), false),
                ("/rrg-creator/rds-password".to_string(), true),
                ("/rrg-creator/rds-database".to_string(), false),
            ]
        );
    }

    #[test]
    fn missing_parameter_names_its_path() {
        let provider = StaticCredentials::new().with("/rrg-creator/rds-endpoint", "h");
        let err = resolve_settings(&provider, &ParameterPaths::default()).unwrap_err();
        match err {
            IngestError::Credentials { path, source } => {
                assert_eq!(path, "/rrg-creator/rds-user");
                assert!(matches!(source, CredentialsError::NotFound(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_provider_reports_the_variable_it_tried() {
        let err = EnvCredentials
            .get_parameter("/quote-ingest-test/surely-unset", false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: QUOTE_INGEST_TEST_SURELY_UNSET"
        );
    }
}

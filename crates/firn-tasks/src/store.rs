//! Injected variable and secret stores.
//!
//! Builders never reach for process-global configuration directly; they take
//! a [`VariableStore`] or [`SecretStore`] so tests and embedders can supply
//! in-memory values. Missing keys surface the store's own error unmodified.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

/// Lookup-by-name configuration values.
pub trait VariableStore {
    /// Fetch the value for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not set.
    fn get(&self, name: &str) -> Result<String>;
}

/// Variables read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVariableStore;

impl VariableStore for EnvVariableStore {
    fn get(&self, name: &str) -> Result<String> {
        std::env::var(name).with_context(|| format!("variable {name:?} is not set"))
    }
}

/// In-memory variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticVariableStore {
    values: BTreeMap<String, String>,
}

impl StaticVariableStore {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl VariableStore for StaticVariableStore {
    fn get(&self, name: &str) -> Result<String> {
        self.values
            .get(name)
            .cloned()
            .with_context(|| format!("variable {name:?} is not set"))
    }
}

/// Lookup-by-identifier secrets: plaintext or a serialized key/value document.
pub trait SecretStore {
    /// Fetch the secret string for `secret_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret does not exist.
    fn get_secret(&self, secret_id: &str) -> Result<String>;
}

/// Secrets resolved through environment variables.
///
/// The secret id is uppercased with `-`, `/`, and `.` mapped to `_`, then
/// prefixed, so secret id `etl/warehouse-token` under prefix `SECRET_`
/// resolves from `SECRET_ETL_WAREHOUSE_TOKEN`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn env_name(&self, secret_id: &str) -> String {
        let mapped: String = secret_id
            .chars()
            .map(|c| match c {
                '-' | '/' | '.' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{mapped}", self.prefix)
    }
}

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, secret_id: &str) -> Result<String> {
        let name = self.env_name(secret_id);
        std::env::var(&name).with_context(|| format!("secret {secret_id:?} ({name}) is not set"))
    }
}

/// In-memory secrets, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    values: BTreeMap<String, String>,
}

impl StaticSecretStore {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl SecretStore for StaticSecretStore {
    fn get_secret(&self, secret_id: &str) -> Result<String> {
        self.values
            .get(secret_id)
            .cloned()
            .with_context(|| format!("secret {secret_id:?} is not set"))
    }
}

/// Decode a secret stored as a JSON key/value document.
///
/// # Errors
///
/// Returns an error if the secret is not a JSON object of strings.
pub fn parse_key_value(secret: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(secret).context("secret is not a JSON key/value document")
}

/// Deployment environment, read from the variable `env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployEnv {
    Prod,
    NonProd,
}

impl DeployEnv {
    /// Anything other than exactly `prod` is non-prod.
    ///
    /// # Errors
    ///
    /// Returns the store's error if `env` is not set.
    pub fn from_store(store: &dyn VariableStore) -> Result<Self> {
        let env = store.get("env")?;
        Ok(if env == "prod" {
            Self::Prod
        } else {
            Self::NonProd
        })
    }

    /// Select the environment-specific value.
    #[must_use]
    pub fn choose<T>(self, prod_value: T, non_prod_value: T) -> T {
        match self {
            Self::Prod => prod_value,
            Self::NonProd => non_prod_value,
        }
    }
}

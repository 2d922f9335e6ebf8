//! Server configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{DivanError, DivanResult};

/// Environment variable holding the database location.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Environment variable enabling registry bootstrap on start.
pub const BOOTSTRAP_VAR: &str = "DIVAN_BOOTSTRAP";

/// Settings needed to open a store and start serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivanConfig {
    /// Location of the relational engine, interpreted by the backend builder.
    pub database_url: String,
    /// Create the registry relation on start if it does not exist.
    #[serde(default)]
    pub bootstrap: bool,
}

impl DivanConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self { database_url: database_url.into(), bootstrap: false }
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Reads `DATABASE_URL` and `DIVAN_BOOTSTRAP` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::Initialization`] if `DATABASE_URL` is unset or empty.
    pub fn from_env() -> DivanResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DivanResult<Self> {
        let database_url = lookup(DATABASE_URL_VAR)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DivanError::Initialization(format!("{DATABASE_URL_VAR} required")))?;

        let bootstrap = lookup(BOOTSTRAP_VAR)
            .map(|flag| matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self { database_url, bootstrap })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn requires_database_url() {
        assert_eq!(
            DivanConfig::from_lookup(lookup(&[])),
            Err(DivanError::Initialization("DATABASE_URL required".into())),
        );
        assert!(DivanConfig::from_lookup(lookup(&[("DATABASE_URL", "")])).is_err());
    }

    #[test]
    fn bootstrap_flag_is_optional() {
        let config = DivanConfig::from_lookup(lookup(&[("DATABASE_URL", "divan.db")])).unwrap();
        assert_eq!(config, DivanConfig::new("divan.db"));

        let config = DivanConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "divan.db"),
            ("DIVAN_BOOTSTRAP", "TRUE"),
        ]))
        .unwrap();
        assert!(config.bootstrap);
    }

    #[test]
    fn deserializes_without_bootstrap() {
        let config: DivanConfig = serde_json::from_str(r#"{"database_url": ":memory:"}"#).unwrap();

        assert_eq!(config, DivanConfig::new(":memory:"));
    }
}

//! Application configuration consumed by the data-access layer.
//!
//! ```toml
//! [database]
//! dbname = "beaker"
//! host = "localhost"
//! user = "beaker"
//! password = "${BEAKER_DB_PASSWORD}"
//! ```
//!
//! `${VAR}` references are expanded from the environment after parsing.

use crate::error::{DbError, DbResult};
use serde::Deserialize;
use std::path::Path;

pub const ENV_DBNAME: &str = "BEAKER_DB_NAME";
pub const ENV_HOST: &str = "BEAKER_DB_HOST";
pub const ENV_USER: &str = "BEAKER_DB_USER";
pub const ENV_PASSWORD: &str = "BEAKER_DB_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub dbname: String,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dbname", &self.dbname)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl AppConfig {
    /// Read, expand and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            DbError::Config(msg) => {
                DbError::config(format!("{} ({msg})", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> DbResult<Self> {
        Self::from_toml_str_with(raw, |key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::from_toml_str`], resolving `${VAR}` through `lookup`
    /// instead of the process environment.
    pub fn from_toml_str_with(
        raw: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DbResult<Self> {
        let mut config: AppConfig = toml::from_str(raw)
            .map_err(|e| DbError::config(format!("failed to parse config: {e}")))?;
        config.database.expand_vars(&lookup)?;
        config.database.validate()?;
        Ok(config)
    }
}

impl DatabaseConfig {
    /// Build from `BEAKER_DB_NAME`, `BEAKER_DB_HOST`, `BEAKER_DB_USER` and
    /// `BEAKER_DB_PASSWORD` (the password may be unset).
    pub fn from_env() -> DbResult<Self> {
        let var = |key: &str| {
            std::env::var(key).map_err(|_| DbError::config(format!("missing env var: {key}")))
        };
        let config = Self {
            dbname: var(ENV_DBNAME)?,
            host: var(ENV_HOST)?,
            user: var(ENV_USER)?,
            password: std::env::var(ENV_PASSWORD).unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn expand_vars(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> DbResult<()> {
        self.dbname = expand_vars(&self.dbname, lookup)?;
        self.host = expand_vars(&self.host, lookup)?;
        self.user = expand_vars(&self.user, lookup)?;
        self.password = expand_vars(&self.password, lookup)?;
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        for (name, value) in [
            ("database.dbname", &self.dbname),
            ("database.host", &self.host),
            ("database.user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(DbError::config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

fn expand_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> DbResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(DbError::config(format!(
                    "unterminated env var reference: ${{{key}"
                )));
            }
            if key.is_empty() {
                return Err(DbError::config("invalid env var reference: ${}"));
            }

            let v = lookup(&key).ok_or_else(|| {
                DbError::config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_database_section() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            dbname = "beaker"
            host = "localhost"
            user = "web"
            password = "pw"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.dbname, "beaker");
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.user, "web");
        assert_eq!(config.database.password, "pw");
    }

    #[test]
    fn missing_field_is_config_error() {
        let err = AppConfig::from_toml_str("[database]\ndbname = \"x\"\nhost = \"h\"\n").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = AppConfig::from_toml_str(
            "[database]\ndbname = \"x\"\nhost = \" \"\nuser = \"u\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("database.host"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn expands_env_references() {
        let config = AppConfig::from_toml_str_with(
            "[database]\ndbname = \"${APP}_db\"\nhost = \"h\"\nuser = \"u\"\npassword = \"${DB_PW}\"\n",
            vars(&[("APP", "beaker"), ("DB_PW", "s3cret")]),
        )
        .unwrap();
        assert_eq!(config.database.dbname, "beaker_db");
        assert_eq!(config.database.password, "s3cret");
    }

    #[test]
    fn missing_env_reference_fails() {
        let err = expand_vars("${SURELY_UNSET}", &vars(&[])).unwrap_err();
        assert!(err.to_string().contains("SURELY_UNSET"));
    }

    #[test]
    fn unterminated_reference_fails() {
        let lookup = vars(&[("OOPS", "x")]);
        assert!(expand_vars("${OOPS", &lookup).is_err());
        assert!(expand_vars("${}", &lookup).is_err());
        assert_eq!(expand_vars("plain $text", &lookup).unwrap(), "plain $text");
    }

    #[test]
    fn expanded_empty_host_is_rejected() {
        let err = AppConfig::from_toml_str_with(
            "[database]\ndbname = \"x\"\nhost = \"${HOST}\"\nuser = \"u\"\n",
            vars(&[("HOST", "")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("database.host"));
    }

    #[test]
    fn debug_masks_password() {
        let config = DatabaseConfig {
            dbname: "x".into(),
            host: "h".into(),
            user: "u".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

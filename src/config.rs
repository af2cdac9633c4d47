use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_host: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_port: u16,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            db_host: try_load(&lookup, "DB_HOST", "localhost")?,
            db_user: try_load(&lookup, "DB_USER", "postgres")?,
            db_password: try_load(&lookup, "DB_PASSWORD", "")?,
            db_name: try_load(&lookup, "DB_NAME", "postgres")?,
            db_port: try_load(&lookup, "DB_PORT", "5432")?,
            port: try_load(&lookup, "PORT", "3000")?,
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_password)
            .database(&self.db_name)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        log::info!("{} not set, using default: {:?}", key, default);
        default.to_string()
    });
    raw.parse::<T>()
        .map_err(|err| anyhow::anyhow!("{}", err))
        .with_context(|| format!("Invalid {} value: {:?}", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_host, "localhost");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_USER", "race"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "race_logs"),
            ("DB_PORT", "6543"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(
            config,
            Config {
                db_host: "db.internal".to_string(),
                db_user: "race".to_string(),
                db_password: "secret".to_string(),
                db_name: "race_logs".to_string(),
                db_port: 6543,
                port: 8080,
            }
        );
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}

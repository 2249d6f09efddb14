use anyhow::{bail, Result};
use std::env;

/// How CSV files get into their destination tables.
///
/// `Replace` drops and recreates each table from the file contents.
/// `Copy` streams file bytes into a table that must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMethod {
    Replace,
    Copy,
}

impl LoadMethod {
    /// Parse the `LOAD_METHOD` value. `"pandas"` selects the replace
    /// strategy; every other value (including the default) selects COPY.
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("pandas") {
            LoadMethod::Replace
        } else {
            LoadMethod::Copy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMethod::Replace => "replace",
            LoadMethod::Copy => "copy",
        }
    }
}

/// Database connection parameters loaded from environment variables.
///
/// | Env Var       | Default     | Required |
/// |---------------|-------------|----------|
/// | `DB_USER`     | —           | yes      |
/// | `DB_PASS`     | —           | yes      |
/// | `DB_HOST`     | `localhost` | no       |
/// | `DB_PORT`     | `5432`      | no       |
/// | `DB_NAME`     | —           | yes      |
/// | `LOAD_METHOD` | `copy`      | no       |
#[derive(Debug, Clone)]
pub struct Config {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub load_method: LoadMethod,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Fails listing every missing required variable, so one run of the
    /// diagnostics tells the operator the full story.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let user = require("DB_USER", &mut missing);
        let password = require("DB_PASS", &mut missing);
        let dbname = require("DB_NAME", &mut missing);
        if !missing.is_empty() {
            bail!(
                "missing required environment variables: {} (check .env)",
                missing.join(", ")
            );
        }

        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".into());
        let port_raw = env::var("DB_PORT").unwrap_or_else(|_| "5432".into());
        let port: u16 = match port_raw.parse() {
            Ok(p) => p,
            Err(_) => bail!("DB_PORT `{}` is not a valid port number", port_raw),
        };

        let load_method = LoadMethod::from_env_value(
            &env::var("LOAD_METHOD").unwrap_or_else(|_| "copy".into()),
        );

        Ok(Config {
            user: user.unwrap(),
            password: password.unwrap(),
            host,
            port,
            dbname: dbname.unwrap(),
            load_method,
        })
    }

    /// Connection summary with the password masked, for diagnostics output.
    pub fn dsn_summary(&self) -> String {
        format!(
            "postgresql://{}:****@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

fn require(key: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(key);
            None
        }
    }
}

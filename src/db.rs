use crate::config::Config;
use anyhow::{Context, Result};
use tokio_postgres::{Client, NoTls};
use tracing::error;

/// Open one connection and spawn its driver task.
///
/// The pipeline deliberately uses a single client per bounded unit of work
/// (one load pass, one batch of queries) instead of a pool; dropping the
/// returned client ends the connection.
pub async fn connect(config: &Config) -> Result<Client> {
    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host(&config.host)
        .port(config.port)
        .dbname(&config.dbname)
        .user(&config.user)
        .password(&config.password);

    let (client, connection) = pg_config
        .connect(NoTls)
        .await
        .with_context(|| format!("connecting to {}", config.dsn_summary()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("postgres connection error: {}", e);
        }
    });

    Ok(client)
}

/// Quote an identifier for interpolation into SQL text. Table names come
/// from file stems, so they must survive quoting untrusted characters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Check the schema catalog for a table with the given name.
pub async fn table_exists(client: &Client, table: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_name = $1
            )",
            &[&table],
        )
        .await
        .with_context(|| format!("checking existence of table `{}`", table))?;
    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_wraps_plain_names() {
        assert_eq!(quote_ident("sales_2024"), "\"sales_2024\"");
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}

//! Minimal connectivity probe: connect with the configured credentials,
//! run one trivial query, print the result.

use anyhow::Result;
use pgrun::{config::Config, db};
use tokio_postgres::SimpleQueryMessage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    println!("connecting to {}", config.dsn_summary());

    let client = db::connect(&config).await?;
    for msg in client.simple_query("SELECT 'ok' AS status").await? {
        if let SimpleQueryMessage::Row(row) = msg {
            println!("test query result: {}", row.get(0).unwrap_or(""));
        }
    }
    println!("CONNECTION OK");
    Ok(())
}

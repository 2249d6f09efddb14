//! Verbose connectivity probe: print every resolved configuration value
//! (password masked), attempt a connection, and print the negotiated server
//! parameters or the error. For manual troubleshooting only.

use pgrun::{config::Config, db};
use std::path::Path;
use std::process;
use tokio_postgres::SimpleQueryMessage;

#[tokio::main]
async fn main() {
    let env_loaded = dotenvy::dotenv().is_ok();
    println!(".env present: {}", Path::new(".env").exists());
    println!(".env loaded:  {}", env_loaded);
    for key in ["DB_HOST", "DB_PORT", "DB_NAME", "DB_USER"] {
        println!(
            "{} = {}",
            key,
            std::env::var(key).unwrap_or_else(|_| "<unset>".into())
        );
    }
    let pass_set = std::env::var("DB_PASS").map(|v| !v.is_empty()).unwrap_or(false);
    println!("DB_PASS = {}", if pass_set { "<set>" } else { "<unset>" });

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration incomplete: {e:#}");
            process::exit(1);
        }
    };
    println!("DB URL: {}", config.dsn_summary());

    match db::connect(&config).await {
        Ok(client) => {
            for (label, sql) in [
                ("server_version", "SHOW server_version"),
                ("database", "SELECT current_database()"),
                ("user", "SELECT current_user"),
            ] {
                match client.simple_query(sql).await {
                    Ok(messages) => {
                        println!("{} = {}", label, first_value(&messages));
                    }
                    Err(e) => println!("{} query failed: {}", label, e),
                }
            }
            println!("CONNECTION OK");
        }
        Err(e) => {
            eprintln!("ERROR connecting: {e:#}");
            process::exit(1);
        }
    }
}

fn first_value(messages: &[SimpleQueryMessage]) -> String {
    for msg in messages {
        if let SimpleQueryMessage::Row(row) = msg {
            return row.get(0).unwrap_or("").to_string();
        }
    }
    "<no result>".into()
}

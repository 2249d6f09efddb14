use anyhow::Result;
use pgrun::{config::Config, db, layout::Layout, load, logging, query, report};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) base dir + output dirs ───────────────────────────────────
    let base = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let layout = Layout::new(&base);
    layout.ensure_outputs()?;

    // ─── 2) init logging (console + run_logs/run_all.log) ────────────
    logging::init(&layout.log_file())?;
    info!("RUN ALL: start (base `{}`)", base.display());

    // ─── 3) env + config; missing DB_* vars abort before any I/O ─────
    dotenvy::from_path(base.join(".env")).ok();
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };
    info!(
        "target {} LOAD_METHOD={}",
        config.dsn_summary(),
        config.load_method.as_str()
    );

    // ─── 4) bulk load stage ──────────────────────────────────────────
    {
        let client = db::connect(&config).await?;
        load::load_all(&client, &layout, config.load_method).await?;
        // dropping the client closes the connection
    }

    // ─── 5) query stages: validation then analysis ───────────────────
    {
        let client = db::connect(&config).await?;
        for (dir, prefix) in [
            (&layout.val_queries_dir, "val_"),
            (&layout.ana_queries_dir, "ana_"),
        ] {
            match query::run_dir(&client, dir, prefix, &layout.outputs_dir).await {
                Ok(summary) => info!(
                    "query stage `{}`: {} executed, {} failed",
                    dir.display(),
                    summary.executed,
                    summary.failed
                ),
                Err(e) => error!("query stage `{}` failed: {:#}", dir.display(), e),
            }
        }
    }

    // ─── 6) summary workbook ─────────────────────────────────────────
    match report::build(&layout) {
        Ok(summary) => info!(
            "workbook written: {} sheet(s), {} skipped",
            summary.sheets, summary.skipped
        ),
        Err(e) => error!("building the summary workbook failed: {:#}", e),
    }

    info!(
        "RUN ALL: finished; see `{}` and `{}`",
        layout.outputs_dir.display(),
        layout.log_file().display()
    );
    Ok(())
}

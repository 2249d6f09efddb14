//! Streaming-copy strategy: `COPY … FROM STDIN` straight from the file,
//! header line discarded server-side. The destination table must already
//! exist; this strategy never creates one.

use super::FileOutcome;
use crate::db::{quote_ident, table_exists};
use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use futures::{pin_mut, SinkExt};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_postgres::{Client, CopyInSink};

/// Flush threshold for COPY buffers (~64 KiB keeps syscalls low while
/// bounding memory).
const COPY_CHUNK: usize = 64 * 1024;

pub async fn load_file(client: &Client, path: &Path, table: &str) -> Result<FileOutcome> {
    if !table_exists(client, table).await? {
        return Ok(FileOutcome::SkippedMissingTable);
    }

    let stmt = format!(
        "COPY {} FROM STDIN WITH (FORMAT csv, HEADER true)",
        quote_ident(table)
    );
    let sink: CopyInSink<Bytes> = client
        .copy_in(stmt.as_str())
        .await
        .with_context(|| format!("initiating COPY into {}", quote_ident(table)))?;
    pin_mut!(sink);

    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening `{}`", path.display()))?;
    let mut buf = BytesMut::with_capacity(COPY_CHUNK);
    loop {
        buf.reserve(COPY_CHUNK);
        let n = file
            .read_buf(&mut buf)
            .await
            .with_context(|| format!("reading `{}`", path.display()))?;
        if n == 0 {
            break;
        }
        if buf.len() >= COPY_CHUNK {
            sink.send(buf.split().freeze())
                .await
                .context("sending COPY data")?;
        }
    }
    if !buf.is_empty() {
        sink.send(buf.split().freeze())
            .await
            .context("sending final COPY data")?;
    }

    let rows = sink.finish().await.context("finishing COPY")?;
    Ok(FileOutcome::Loaded { rows })
}

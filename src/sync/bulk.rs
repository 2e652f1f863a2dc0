// ABOUTME: Bulk export/import engine built on the PostgreSQL COPY protocol
// ABOUTME: Streams table rows to a client-side TSV dump file and loads it back

use crate::sync::schema;
use crate::utils::quote_ident;
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::{pin_mut, SinkExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_postgres::Client;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Stream a table (optionally row-filtered) into a TSV dump file.
///
/// Uses `COPY ... TO STDOUT`, so the file is written on the client side —
/// the database service account never touches the output directory. Output
/// is PostgreSQL text format: tab-separated fields in declaration order,
/// newline-terminated records, no header. Returns the dump file path; the
/// caller owns its cleanup.
pub async fn export_to_file(
    client: &Client,
    table: &str,
    filter: Option<&str>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let columns = schema::list_columns(client, table).await?;
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();

    let mut select = format!(
        "SELECT {} FROM {}",
        column_list.join(", "),
        quote_ident(table)
    );
    if let Some(predicate) = filter {
        select.push_str(" WHERE ");
        select.push_str(predicate);
    }
    let query = format!("COPY ({}) TO STDOUT", select);

    let path = output_dir.join(format!("{}.tsv", table));
    tracing::debug!("Exporting '{}' to {}", table, path.display());

    let stream = client
        .copy_out(&query)
        .await
        .with_context(|| format!("COPY OUT failed for '{}'", table))?;
    pin_mut!(stream);

    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create dump file {}", path.display()))?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write dump file {}", path.display()))?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::debug!(
        "Exported {} byte(s) from '{}' to {}",
        bytes_written,
        table,
        path.display()
    );
    Ok(path)
}

/// Bulk-load a TSV dump file into a table via `COPY ... FROM STDIN`.
///
/// The explicit column list (the exporting table's declaration order) keeps
/// a file holding a strict subset of the destination's columns from loading
/// misaligned. Returns the number of rows loaded.
pub async fn import_from_file(
    client: &Client,
    table: &str,
    columns: &[String],
    path: &Path,
) -> Result<u64> {
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let query = format!(
        "COPY {} ({}) FROM STDIN",
        quote_ident(table),
        column_list.join(", ")
    );

    tracing::debug!("Importing {} into '{}'", path.display(), table);

    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open dump file {}", path.display()))?;

    let sink = client
        .copy_in(&query)
        .await
        .with_context(|| format!("COPY IN failed for '{}'", table))?;
    pin_mut!(sink);

    let mut buf = BytesMut::with_capacity(READ_CHUNK_BYTES);
    loop {
        let n = file
            .read_buf(&mut buf)
            .await
            .with_context(|| format!("Failed to read dump file {}", path.display()))?;
        if n == 0 {
            break;
        }
        sink.send(buf.split().freeze())
            .await
            .with_context(|| format!("COPY IN stream failed for '{}'", table))?;
    }

    let rows = sink
        .finish()
        .await
        .with_context(|| format!("COPY IN did not complete for '{}'", table))?;

    tracing::debug!("Imported {} row(s) into '{}'", rows, table);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::connect;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore]
    async fn test_export_produces_tab_delimited_records() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        client
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_bulk_export_test;
                 CREATE TABLE tmp_bulk_export_test (id integer PRIMARY KEY, test_string varchar(50));
                 INSERT INTO tmp_bulk_export_test VALUES (1, 'test')",
            )
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let path = export_to_file(&client, "tmp_bulk_export_test", None, dir.path())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1\ttest\n");

        client
            .batch_execute("DROP TABLE tmp_bulk_export_test")
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_export_honors_row_filter() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        client
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_bulk_filter_test;
                 CREATE TABLE tmp_bulk_filter_test (id integer PRIMARY KEY, test_string varchar(50));
                 INSERT INTO tmp_bulk_filter_test VALUES (1, 'keep'), (2, 'skip')",
            )
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let path = export_to_file(&client, "tmp_bulk_filter_test", Some("id = 1"), dir.path())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1\tkeep\n");

        client
            .batch_execute("DROP TABLE tmp_bulk_filter_test")
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_round_trip_preserves_rows() {
        let source_url = std::env::var("TEST_SOURCE_URL").unwrap();
        let target_url = std::env::var("TEST_TARGET_URL").unwrap();
        let source = connect(&source_url).await.unwrap();
        let target = connect(&target_url).await.unwrap();

        source
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_bulk_rt_test;
                 CREATE TABLE tmp_bulk_rt_test (id integer PRIMARY KEY, test_string varchar(50));
                 INSERT INTO tmp_bulk_rt_test VALUES (1, 'test'), (2, 'test1'), (3, NULL)",
            )
            .await
            .unwrap();
        target
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_bulk_rt_test;
                 CREATE TABLE tmp_bulk_rt_test (id integer PRIMARY KEY, test_string varchar(50))",
            )
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let path = export_to_file(&source, "tmp_bulk_rt_test", None, dir.path())
            .await
            .unwrap();

        let columns = vec!["id".to_string(), "test_string".to_string()];
        let rows = import_from_file(&target, "tmp_bulk_rt_test", &columns, &path)
            .await
            .unwrap();
        assert_eq!(rows, 3);

        let fetched = target
            .query("SELECT id, test_string FROM tmp_bulk_rt_test ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[0].get::<_, i32>(0), 1);
        assert_eq!(fetched[0].get::<_, String>(1), "test");
        assert_eq!(fetched[2].get::<_, Option<String>>(1), None);

        source.batch_execute("DROP TABLE tmp_bulk_rt_test").await.unwrap();
        target.batch_execute("DROP TABLE tmp_bulk_rt_test").await.unwrap();
    }
}

// ABOUTME: Destination table mutation: truncate and batched hash deletes
// ABOUTME: Splits large delete sets into bounded batches, one autocommitted statement each

use crate::utils::quote_ident;
use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio_postgres::Client;

/// Empty a table in a single statement, resetting identity state.
pub async fn truncate_table(client: &Client, table: &str) -> Result<()> {
    let statement = format!("TRUNCATE TABLE {} RESTART IDENTITY", quote_ident(table));
    client
        .execute(&statement, &[])
        .await
        .with_context(|| format!("Failed to truncate '{}'", table))?;
    Ok(())
}

/// Delete every row whose hash-column value is a member of `hashes`.
///
/// The set is partitioned into `batch_size` chunks and each chunk issues one
/// autocommitted `DELETE ... WHERE hash = ANY($1)`. An unbounded single
/// statement spanning the whole set would exceed message-size limits and
/// degrade planning for very large deltas; batching bounds statement size at
/// the cost of statement count. A failed batch aborts the remaining unsent
/// batches — skipping one silently would leave the destination desynchronized
/// with no record of what was missed.
///
/// An empty set issues no statement. Hashes absent from the table delete
/// zero rows by the database's own DELETE semantics. Rows sharing a hash all
/// match the same member, so this can delete more physical rows than the set
/// has members — an accepted imprecision of hash-keyed deletion. Returns the
/// total number of rows deleted.
pub async fn delete_records(
    client: &Client,
    table: &str,
    hash_column: &str,
    hashes: &HashSet<String>,
    batch_size: usize,
) -> Result<u64> {
    if hashes.is_empty() {
        return Ok(0);
    }

    let statement = format!(
        "DELETE FROM {} WHERE {} = ANY($1)",
        quote_ident(table),
        quote_ident(hash_column)
    );

    let members: Vec<&str> = hashes.iter().map(String::as_str).collect();
    let batches = partition(&members, batch_size);
    let batch_count = batches.len();

    let mut total_deleted: u64 = 0;
    for (i, batch) in batches.into_iter().enumerate() {
        let deleted = client
            .execute(&statement, &[&batch])
            .await
            .with_context(|| {
                format!(
                    "Delete batch {}/{} failed on '{}'; remaining batches not sent",
                    i + 1,
                    batch_count,
                    table
                )
            })?;
        tracing::debug!(
            "Deleted {} row(s) from '{}' (batch {}/{})",
            deleted,
            table,
            i + 1,
            batch_count
        );
        total_deleted += deleted;
    }

    Ok(total_deleted)
}

/// Partition a slice into chunks of at most `batch_size` members.
fn partition<'a>(members: &[&'a str], batch_size: usize) -> Vec<Vec<&'a str>> {
    assert!(batch_size > 0, "batch size must be positive");
    members
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

// ABOUTME: Hash set extraction for table diffing
// ABOUTME: Reads every per-row content hash so tables can be diffed without moving payloads

use crate::utils::quote_ident;
use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio_postgres::Client;

/// Read the full set of per-row content hashes for a table.
///
/// Only the hash column travels over the wire, so a table with millions of
/// rows diffs in memory proportional to its distinct hashes rather than its
/// payload. NULL hashes are skipped. Membership is unordered, and physical
/// rows sharing a hash collapse into one set member — a known imprecision:
/// deleting by such a hash later removes every row that shares it.
pub async fn get_current_hash_set(
    client: &Client,
    table: &str,
    hash_column: &str,
) -> Result<HashSet<String>> {
    let query = format!(
        "SELECT {} FROM {}",
        quote_ident(hash_column),
        quote_ident(table)
    );

    let rows = client
        .query(&query, &[])
        .await
        .with_context(|| format!("Failed to read hash column '{}' of '{}'", hash_column, table))?;

    let hashes: HashSet<String> = rows
        .iter()
        .filter_map(|row| row.get::<_, Option<String>>(0))
        .collect();

    tracing::debug!(
        "Read {} distinct hash(es) from '{}' ({} rows)",
        hashes.len(),
        table,
        rows.len()
    );

    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::connect;

    #[tokio::test]
    #[ignore]
    async fn test_hash_set_is_insertion_order_independent() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        client
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_hash_set_test;
                 CREATE TABLE tmp_hash_set_test (
                     id integer PRIMARY KEY,
                     test_string varchar(50),
                     field_hash varchar(50)
                 );
                 INSERT INTO tmp_hash_set_test VALUES (3, 'test2', '345');
                 INSERT INTO tmp_hash_set_test VALUES (1, 'test', '123');
                 INSERT INTO tmp_hash_set_test VALUES (2, 'test1', '234')",
            )
            .await
            .unwrap();

        let hashes = get_current_hash_set(&client, "tmp_hash_set_test", "field_hash")
            .await
            .unwrap();

        let expected: HashSet<String> =
            ["123", "234", "345"].iter().map(|s| s.to_string()).collect();
        assert_eq!(hashes, expected);

        client
            .batch_execute("DROP TABLE tmp_hash_set_test")
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_duplicate_hashes_collapse() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        client
            .batch_execute(
                "DROP TABLE IF EXISTS tmp_hash_dup_test;
                 CREATE TABLE tmp_hash_dup_test (id integer PRIMARY KEY, field_hash varchar(50));
                 INSERT INTO tmp_hash_dup_test VALUES (1, 'aaa'), (2, 'aaa'), (3, NULL)",
            )
            .await
            .unwrap();

        let hashes = get_current_hash_set(&client, "tmp_hash_dup_test", "field_hash")
            .await
            .unwrap();

        // Two rows share a hash and the NULL is skipped
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains("aaa"));

        client
            .batch_execute("DROP TABLE tmp_hash_dup_test")
            .await
            .unwrap();
    }
}

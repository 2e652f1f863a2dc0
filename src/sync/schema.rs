// ABOUTME: Schema inspection and reconciliation for sync sessions
// ABOUTME: Reads canonical table structure and creates/drops destination tables

use crate::utils::quote_ident;
use anyhow::{Context, Result};
use tokio_postgres::Client;

/// Check whether a table exists in the connected database.
///
/// Any failure, including a syntactically invalid name, normalizes to
/// `false` — this function never raises.
pub async fn table_exists(client: &Client, table: &str) -> bool {
    let result = client
        .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
        .await;

    match result {
        Ok(row) => row.get(0),
        Err(_) => false,
    }
}

/// List a table's column names in declaration order, dropped columns excluded.
pub async fn list_columns(client: &Client, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT a.attname
             FROM pg_catalog.pg_attribute a
             WHERE a.attrelid = $1::text::regclass
               AND a.attnum > 0
               AND NOT a.attisdropped
             ORDER BY a.attnum",
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to list columns for '{}'", table))?;

    if rows.is_empty() {
        anyhow::bail!("Table '{}' has no columns", table);
    }

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Read a table's canonical creation text.
///
/// The text is assembled by the server in a single catalog query (ordered
/// column definitions with NOT NULL markers, then the primary key), so both
/// hosts report structure through the same code path. Callers compare the
/// result byte-for-byte and never parse it.
pub async fn get_table_structure(client: &Client, table: &str) -> Result<String> {
    let row = client
        .query_one(
            "WITH cols AS (
                 SELECT string_agg(
                            quote_ident(a.attname) || ' '
                            || pg_catalog.format_type(a.atttypid, a.atttypmod)
                            || CASE WHEN a.attnotnull THEN ' NOT NULL' ELSE '' END,
                            E',\n  ' ORDER BY a.attnum) AS defs
                 FROM pg_catalog.pg_attribute a
                 WHERE a.attrelid = $1::text::regclass
                   AND a.attnum > 0
                   AND NOT a.attisdropped
             ),
             pk AS (
                 SELECT string_agg(quote_ident(a.attname), ', ' ORDER BY k.ord) AS cols
                 FROM pg_catalog.pg_index i
                 CROSS JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord)
                 JOIN pg_catalog.pg_attribute a
                   ON a.attrelid = i.indrelid AND a.attnum = k.attnum
                 WHERE i.indrelid = $1::text::regclass
                   AND i.indisprimary
             )
             SELECT 'CREATE TABLE ' || quote_ident($1) || E' (\n  ' || cols.defs
                    || COALESCE(E',\n  PRIMARY KEY (' || pk.cols || ')', '')
                    || E'\n)'
             FROM cols LEFT JOIN pk ON true",
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to read structure of '{}'", table))?;

    let structure: Option<String> = row.get(0);
    structure.ok_or_else(|| anyhow::anyhow!("Table '{}' has no columns", table))
}

/// Create a table by executing its creation text verbatim.
///
/// Conflicts (an existing table with an incompatible definition) propagate
/// as the server reports them.
pub async fn create_table_with_schema(client: &Client, structure: &str) -> Result<()> {
    client
        .batch_execute(structure)
        .await
        .context("Failed to create table from structure text")?;
    Ok(())
}

/// Drop a table. Errors propagate unchanged.
pub async fn drop_table(client: &Client, table: &str) -> Result<()> {
    let statement = format!("DROP TABLE {}", quote_ident(table));
    client
        .execute(&statement, &[])
        .await
        .with_context(|| format!("Failed to drop table '{}'", table))?;
    Ok(())
}

//! SQLite sink. Every write fully replaces the named table.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::cli::StoreArgs;
use crate::formats::RawRecord;
use crate::table::{Cell, Table};

pub async fn run(args: StoreArgs) -> anyhow::Result<()> {
    let raw_path = PathBuf::from(&args.raw);
    let db_path = PathBuf::from(&args.db);

    let records: Vec<RawRecord> =
        crate::formats::read_jsonl(&raw_path).context("read raw snapshot")?;
    let table = crate::clean::clean(&records)?;
    let table = crate::analyze::with_derived_columns(table).context("derive columns")?;

    persist(&db_path, &args.table, &table).await?;
    tracing::info!(table = %args.table, rows = table.len(), db = %db_path.display(), "stored");
    Ok(())
}

pub async fn persist(db_path: &Path, table_name: &str, table: &Table) -> anyhow::Result<()> {
    let pool = open_pool(db_path).await?;
    let result = replace_table(&pool, table_name, table).await;
    pool.close().await;
    result
}

pub async fn count_rows(db_path: &Path, table_name: &str) -> anyhow::Result<i64> {
    let pool = open_pool(db_path).await?;
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table_name));
    let result = sqlx::query_as::<_, (i64,)>(&sql)
        .fetch_one(&pool)
        .await
        .with_context(|| format!("count rows in {table_name}"));
    pool.close().await;
    Ok(result?.0)
}

pub async fn column_names(db_path: &Path, table_name: &str) -> anyhow::Result<Vec<String>> {
    let pool = open_pool(db_path).await?;
    let result = sqlx::query_as::<_, (String,)>(
        r"
        SELECT name
        FROM pragma_table_info(?)
        ORDER BY cid
        ",
    )
    .bind(table_name)
    .fetch_all(&pool)
    .await
    .with_context(|| format!("read columns of {table_name}"));
    pool.close().await;
    Ok(result?.into_iter().map(|(name,)| name).collect())
}

async fn open_pool(db_path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("open sqlite database: {}", db_path.display()))
}

async fn replace_table(pool: &SqlitePool, table_name: &str, table: &Table) -> anyhow::Result<()> {
    if table.columns().is_empty() {
        anyhow::bail!("refusing to store table {table_name} with no columns");
    }

    let name = quote_ident(table_name);
    let column_defs = table
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(c.name()), c.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; table.columns().len()].join(", ");

    let drop_sql = format!("DROP TABLE IF EXISTS {name}");
    let create_sql = format!("CREATE TABLE {name} ({column_defs})");
    let insert_sql = format!("INSERT INTO {name} VALUES ({placeholders})");

    let mut tx = pool.begin().await.context("begin transaction")?;
    sqlx::query(&drop_sql)
        .execute(&mut *tx)
        .await
        .context("drop table")?;
    sqlx::query(&create_sql)
        .execute(&mut *tx)
        .await
        .context("create table")?;

    for (idx, row) in table.rows().iter().enumerate() {
        let mut query = sqlx::query(&insert_sql);
        for cell in row {
            query = match cell {
                Cell::Null => query.bind(None::<i64>),
                Cell::Int(v) => query.bind(*v),
                Cell::Float(v) => query.bind(*v),
                Cell::Text(v) => query.bind(v.clone()),
            };
        }
        query
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert row {idx}"))?;
    }

    tx.commit().await.context("commit transaction")?;
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

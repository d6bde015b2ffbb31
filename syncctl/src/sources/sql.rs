use super::dialect::{ColumnTypes, Dialect};
use super::{SourceDatabase, SourceError, SourceRow};
use crate::config::PoolSettings;
use crate::payload::{DocValue, Payload};
use crate::types::{SourceMode, TableName};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Connection, Database, Encode, MySqlPool, PgPool, Pool, Row, SqlitePool, Type, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, instrument};

/// Connection pool for one backend.
#[derive(Debug, Clone)]
pub enum SourcePool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl SourcePool {
    fn dialect(&self) -> Dialect {
        match self {
            SourcePool::Postgres(_) => Dialect::Postgres,
            SourcePool::MySql(_) => Dialect::MySql,
            SourcePool::Sqlite(_) => Dialect::Sqlite,
        }
    }
}

/// A source database reached through the native sqlx driver its URL names.
#[derive(Debug, Clone)]
pub struct SqlSource {
    mode: SourceMode,
    pool: SourcePool,
}

fn pool_options<DB: Database>(options: PoolOptions<DB>, settings: &PoolSettings) -> PoolOptions<DB> {
    let mut options = options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }
    options
}

impl SqlSource {
    pub fn new(mode: SourceMode, pool: SourcePool) -> Self {
        Self { mode, pool }
    }

    /// Build the pool without connecting. The first request (or the startup ping) opens the
    /// first connection, so an unreachable source does not stop the service from starting.
    pub fn connect_lazy(mode: SourceMode, url: &str, settings: &PoolSettings) -> Result<Self, SourceError> {
        let connect_error = |e: sqlx::Error| SourceError::Connect {
            mode,
            message: e.to_string(),
        };

        let pool = match Dialect::from_url(url)? {
            Dialect::Postgres => SourcePool::Postgres(
                pool_options(PgPoolOptions::new(), settings)
                    .connect_lazy(url)
                    .map_err(connect_error)?,
            ),
            Dialect::MySql => SourcePool::MySql(
                pool_options(MySqlPoolOptions::new(), settings)
                    .connect_lazy(url)
                    .map_err(connect_error)?,
            ),
            Dialect::Sqlite => SourcePool::Sqlite(
                pool_options(SqlitePoolOptions::new(), settings)
                    .connect_lazy(url)
                    .map_err(connect_error)?,
            ),
        };

        debug!(%mode, dialect = pool.dialect().name(), "Configured source database pool");
        Ok(Self::new(mode, pool))
    }

    async fn acquire<DB: Database>(&self, pool: &Pool<DB>) -> Result<PoolConnection<DB>, SourceError> {
        pool.acquire().await.map_err(|e| SourceError::Connect {
            mode: self.mode,
            message: e.to_string(),
        })
    }

    async fn ping_pool<DB: Database>(&self, pool: &Pool<DB>) -> Result<(), SourceError> {
        let mut conn = self.acquire(pool).await?;
        conn.ping().await.map_err(|e| SourceError::Connect {
            mode: self.mode,
            message: e.to_string(),
        })
    }

    pub async fn close(&self) {
        match &self.pool {
            SourcePool::Postgres(pool) => pool.close().await,
            SourcePool::MySql(pool) => pool.close().await,
            SourcePool::Sqlite(pool) => pool.close().await,
        }
    }
}

#[async_trait]
impl SourceDatabase for SqlSource {
    fn mode(&self) -> SourceMode {
        self.mode
    }

    async fn ping(&self) -> Result<(), SourceError> {
        match &self.pool {
            SourcePool::Postgres(pool) => self.ping_pool(pool).await,
            SourcePool::MySql(pool) => self.ping_pool(pool).await,
            SourcePool::Sqlite(pool) => self.ping_pool(pool).await,
        }
    }

    #[instrument(skip(self), fields(mode = %self.mode), err)]
    async fn select_all(&self, table: &TableName) -> Result<Vec<Payload>, SourceError> {
        let sql = self.pool.dialect().select_all(table);
        let query_error = |e: sqlx::Error| SourceError::Query {
            table: table.to_string(),
            message: e.to_string(),
        };

        let payloads = match &self.pool {
            SourcePool::Postgres(pool) => {
                let mut conn = self.acquire(pool).await?;
                let rows = sqlx::query(&sql).fetch_all(&mut *conn).await.map_err(query_error)?;
                rows.iter().map(decode_pg_row).collect::<Result<Vec<_>, _>>()
            }
            SourcePool::MySql(pool) => {
                let mut conn = self.acquire(pool).await?;
                let rows = sqlx::query(&sql).fetch_all(&mut *conn).await.map_err(query_error)?;
                rows.iter().map(decode_mysql_row).collect::<Result<Vec<_>, _>>()
            }
            SourcePool::Sqlite(pool) => {
                let mut conn = self.acquire(pool).await?;
                let rows = sqlx::query(&sql).fetch_all(&mut *conn).await.map_err(query_error)?;
                rows.iter().map(decode_sqlite_row).collect::<Result<Vec<_>, _>>()
            }
        };

        payloads.map_err(query_error)
    }

    #[instrument(skip(self, rows), fields(mode = %self.mode, rows = rows.len()), err)]
    async fn insert_rows(&self, table: &TableName, rows: &[SourceRow]) -> Result<u64, SourceError> {
        let dialect = self.pool.dialect();
        let mut inserted = 0;
        let insert_error = |inserted: u64, e: sqlx::Error| SourceError::Insert {
            table: table.to_string(),
            inserted,
            message: e.to_string(),
        };

        // Same loop for every backend; only the connection type differs.
        macro_rules! insert_each {
            ($conn:expr, $types:expr) => {
                for row in rows {
                    let sql = dialect.insert_statement(table, row, $types);
                    row.bound_values()
                        .fold(sqlx::query(&sql), bind_value)
                        .execute(&mut *$conn)
                        .await
                        .map_err(|e| insert_error(inserted, e))?;
                    inserted += 1;
                }
            };
        }

        match &self.pool {
            SourcePool::Postgres(pool) => {
                let mut conn = self.acquire(pool).await?;
                let types = postgres_column_types(&mut conn, table)
                    .await
                    .map_err(|e| insert_error(0, e))?;
                insert_each!(conn, &types);
            }
            SourcePool::MySql(pool) => {
                let mut conn = self.acquire(pool).await?;
                insert_each!(conn, &ColumnTypes::new());
            }
            SourcePool::Sqlite(pool) => {
                let mut conn = self.acquire(pool).await?;
                insert_each!(conn, &ColumnTypes::new());
            }
        }

        Ok(inserted)
    }
}

/// Declared type of every column of `table`, as PostgreSQL spells it in a cast.
///
/// Fails with "relation does not exist" before any insert when the table is missing.
async fn postgres_column_types(conn: &mut PgConnection, table: &TableName) -> Result<ColumnTypes, sqlx::Error> {
    let columns: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT a.attname::text, format_type(a.atttypid, a.atttypmod)
        FROM pg_attribute a
        WHERE a.attrelid = $1::regclass
          AND a.attnum > 0
          AND NOT a.attisdropped
        "#,
    )
    .bind(table.as_str())
    .fetch_all(conn)
    .await?;

    Ok(columns.into_iter().collect())
}

fn bind_value<'q, DB>(query: Query<'q, DB, <DB as Database>::Arguments<'q>>, value: &DocValue) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Vec<u8>: Encode<'q, DB> + Type<DB>,
{
    match value {
        // bound_values() never yields nulls; insert_statement writes them as literals
        DocValue::Null => query,
        DocValue::Bool(b) => query.bind(*b),
        DocValue::Integer(i) => query.bind(*i),
        DocValue::Float(f) => query.bind(*f),
        DocValue::String(s) => query.bind(s.clone()),
        DocValue::Map(_) => match value.as_binary() {
            Some(bytes) => query.bind(bytes),
            // Nested mappings only exist when a record was edited by hand; store them as JSON text
            None => query.bind(value.to_string()),
        },
    }
}

/// Integer that may not fit in an i64 (MySQL `BIGINT UNSIGNED`).
fn unsigned(value: u64) -> DocValue {
    i64::try_from(value)
        .map(DocValue::Integer)
        .unwrap_or_else(|_| DocValue::String(value.to_string()))
}

/// Text when the bytes are UTF-8, otherwise a tagged binary value.
fn text_or_binary(bytes: Vec<u8>) -> DocValue {
    match String::from_utf8(bytes) {
        Ok(text) => DocValue::String(text),
        Err(e) => DocValue::binary(e.as_bytes()),
    }
}

/// Convert one PostgreSQL row into a payload.
///
/// Decimals, dates, times, uuids and JSON become text that PostgreSQL casts back on push.
/// Types without a dedicated arm (enums, domains) are read as text.
fn decode_pg_row(row: &PgRow) -> Result<Payload, sqlx::Error> {
    let mut payload = Payload::new();

    for column in row.columns() {
        let i = column.ordinal();
        let value = if row.try_get_raw(i)?.is_null() {
            DocValue::Null
        } else {
            match column.type_info().name() {
                "BOOL" => DocValue::Bool(row.try_get(i)?),
                "INT2" => DocValue::Integer(row.try_get::<i16, _>(i)?.into()),
                "INT4" => DocValue::Integer(row.try_get::<i32, _>(i)?.into()),
                "INT8" => DocValue::Integer(row.try_get(i)?),
                "FLOAT4" => DocValue::Float(row.try_get::<f32, _>(i)?.into()),
                "FLOAT8" => DocValue::Float(row.try_get(i)?),
                "NUMERIC" => DocValue::String(row.try_get::<Decimal, _>(i)?.to_string()),
                "DATE" => DocValue::String(row.try_get::<NaiveDate, _>(i)?.to_string()),
                "TIME" => DocValue::String(row.try_get::<NaiveTime, _>(i)?.to_string()),
                "TIMESTAMP" => DocValue::String(row.try_get::<NaiveDateTime, _>(i)?.to_string()),
                "TIMESTAMPTZ" => DocValue::String(row.try_get::<DateTime<Utc>, _>(i)?.to_rfc3339()),
                "UUID" => DocValue::String(row.try_get::<uuid::Uuid, _>(i)?.to_string()),
                "JSON" | "JSONB" => DocValue::String(row.try_get::<serde_json::Value, _>(i)?.to_string()),
                "BYTEA" => DocValue::binary(&row.try_get::<Vec<u8>, _>(i)?),
                _ => text_or_binary(row.try_get_unchecked::<Vec<u8>, _>(i)?),
            }
        };
        payload.insert(column.name().to_string(), value);
    }

    Ok(payload)
}

/// Convert one MySQL row into a payload. Binary-collation columns are tagged binary values.
fn decode_mysql_row(row: &MySqlRow) -> Result<Payload, sqlx::Error> {
    let mut payload = Payload::new();

    for column in row.columns() {
        let i = column.ordinal();
        let type_name = column.type_info().name();
        let value = if row.try_get_raw(i)?.is_null() {
            DocValue::Null
        } else if type_name.ends_with(" UNSIGNED") {
            unsigned(row.try_get(i)?)
        } else {
            match type_name {
                "BOOLEAN" => DocValue::Bool(row.try_get(i)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => DocValue::Integer(row.try_get(i)?),
                "YEAR" => DocValue::Integer(row.try_get_unchecked(i)?),
                "FLOAT" => DocValue::Float(row.try_get::<f32, _>(i)?.into()),
                "DOUBLE" => DocValue::Float(row.try_get(i)?),
                "DECIMAL" => DocValue::String(row.try_get::<Decimal, _>(i)?.to_string()),
                "DATE" => DocValue::String(row.try_get::<NaiveDate, _>(i)?.to_string()),
                "TIME" => DocValue::String(row.try_get::<NaiveTime, _>(i)?.to_string()),
                "DATETIME" | "TIMESTAMP" => DocValue::String(row.try_get::<NaiveDateTime, _>(i)?.to_string()),
                "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" | "GEOMETRY" => {
                    DocValue::binary(&row.try_get_unchecked::<Vec<u8>, _>(i)?)
                }
                _ => text_or_binary(row.try_get_unchecked::<Vec<u8>, _>(i)?),
            }
        };
        payload.insert(column.name().to_string(), value);
    }

    Ok(payload)
}

/// Convert one SQLite row into a payload, going by each value's storage class.
///
/// Columns declared `BOOLEAN` hold integers; those come back as booleans.
fn decode_sqlite_row(row: &SqliteRow) -> Result<Payload, sqlx::Error> {
    let mut payload = Payload::new();

    for column in row.columns() {
        let i = column.ordinal();
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            DocValue::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" if column.type_info().name() == "BOOLEAN" => DocValue::Bool(row.try_get::<i64, _>(i)? != 0),
                "INTEGER" => DocValue::Integer(row.try_get(i)?),
                "REAL" => DocValue::Float(row.try_get(i)?),
                "BLOB" => DocValue::binary(&row.try_get::<Vec<u8>, _>(i)?),
                _ => text_or_binary(row.try_get_unchecked::<Vec<u8>, _>(i)?),
            }
        };
        payload.insert(column.name().to_string(), value);
    }

    Ok(payload)
}

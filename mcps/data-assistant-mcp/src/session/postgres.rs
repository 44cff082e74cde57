//! PostgreSQL session backed by a single sqlx connection

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgConnectOptions, PgHasArrayType, PgRow};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{Column, Connection, Decode, PgConnection, Postgres, Row as _, Type, TypeInfo};
use uuid::Uuid;
use tokio::sync::Mutex;

use super::{ColumnSchema, Row, Session};
use crate::config::PostgresConfig;
use crate::error::DatabaseError;

// information_schema exposes sql_identifier / character_data domains; cast so
// they decode as plain text.
const TABLE_COLUMNS_SQL: &str = r#"
    SELECT column_name::text, data_type::text
    FROM information_schema.columns
    WHERE table_name = $1
    ORDER BY table_schema, ordinal_position
"#;

pub struct PostgresSession {
    conn: Mutex<Option<PgConnection>>,
}

impl PostgresSession {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DatabaseError> {
        let conn = PgConnection::connect_with(&connect_options(config)).await?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }
}

fn connect_options(config: &PostgresConfig) -> PgConnectOptions {
    let mut server_options: Vec<(&str, String)> = Vec::new();
    if config.read_only {
        server_options.push(("default_transaction_read_only", "on".to_string()));
    }
    if let Some(secs) = config.statement_timeout_secs {
        server_options.push(("statement_timeout", format!("{}s", secs)));
    }

    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.dbname)
        .username(&config.user)
        .password(&config.password)
        .application_name("data-assistant-mcp");

    if server_options.is_empty() {
        options
    } else {
        options.options(server_options)
    }
}

// Values are decoded from the binary wire format, so every type needs an
// explicit arm. Anything not listed is refused by name.
fn column_value(row: &PgRow, index: usize) -> Result<Value, DatabaseError> {
    let column = &row.columns()[index];
    match column.type_info().name() {
        "BOOL" => decode(row, index, |v: bool| json!(v)),
        "INT2" => decode(row, index, |v: i16| json!(v)),
        "INT4" => decode(row, index, |v: i32| json!(v)),
        "INT8" => decode(row, index, |v: i64| json!(v)),
        "OID" => decode(row, index, oid_to_json),
        "FLOAT4" => decode(row, index, float4_to_json),
        "FLOAT8" => decode(row, index, float_to_json),
        "NUMERIC" => decode(row, index, numeric_to_json),
        "MONEY" => decode(row, index, money_to_json),

        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            decode(row, index, |v: String| json!(v))
        }
        "UUID" => decode(row, index, |v: Uuid| json!(v)),
        "JSON" | "JSONB" => decode(row, index, |v: Value| v),
        "BYTEA" => decode(row, index, bytea_to_json),
        "INET" => decode(row, index, inet_to_json),
        "CIDR" => decode(row, index, cidr_to_json),

        "DATE" => decode(row, index, date_to_json),
        "TIME" => decode(row, index, time_to_json),
        "TIMETZ" => decode(row, index, timetz_to_json),
        "TIMESTAMP" => decode(row, index, timestamp_to_json),
        "TIMESTAMPTZ" => decode(row, index, timestamptz_to_json),
        "INTERVAL" => decode(row, index, interval_to_json),

        "BOOL[]" => decode_array(row, index, |v: bool| json!(v)),
        "INT2[]" => decode_array(row, index, |v: i16| json!(v)),
        "INT4[]" => decode_array(row, index, |v: i32| json!(v)),
        "INT8[]" => decode_array(row, index, |v: i64| json!(v)),
        "OID[]" => decode_array(row, index, oid_to_json),
        "FLOAT4[]" => decode_array(row, index, float4_to_json),
        "FLOAT8[]" => decode_array(row, index, float_to_json),
        "NUMERIC[]" => decode_array(row, index, numeric_to_json),
        "MONEY[]" => decode_array(row, index, money_to_json),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => {
            decode_array(row, index, |v: String| json!(v))
        }
        "UUID[]" => decode_array(row, index, |v: Uuid| json!(v)),
        "JSON[]" | "JSONB[]" => decode_array(row, index, |v: Value| v),
        "INET[]" => decode_array(row, index, inet_to_json),
        "CIDR[]" => decode_array(row, index, cidr_to_json),
        "DATE[]" => decode_array(row, index, date_to_json),
        "TIME[]" => decode_array(row, index, time_to_json),
        "TIMESTAMP[]" => decode_array(row, index, timestamp_to_json),
        "TIMESTAMPTZ[]" => decode_array(row, index, timestamptz_to_json),
        "INTERVAL[]" => decode_array(row, index, interval_to_json),

        // SELECT of a void function, e.g. pg_sleep()
        "VOID" => Ok(Value::Null),

        other => Err(DatabaseError::UnsupportedType {
            column: column.name().to_string(),
            type_name: other.to_string(),
        }),
    }
}

fn decode<'r, T, F>(row: &'r PgRow, index: usize, to_json: F) -> Result<Value, DatabaseError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
    F: FnOnce(T) -> Value,
{
    Ok(row
        .try_get::<Option<T>, _>(index)?
        .map(to_json)
        .unwrap_or(Value::Null))
}

/// One-dimensional arrays; NULL elements stay `null`
fn decode_array<T, F>(row: &PgRow, index: usize, to_json: F) -> Result<Value, DatabaseError>
where
    T: for<'a> Decode<'a, Postgres> + Type<Postgres> + PgHasArrayType,
    F: Fn(T) -> Value,
{
    decode(row, index, |items: Vec<Option<T>>| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map(&to_json).unwrap_or(Value::Null))
                .collect(),
        )
    })
}

/// A JSON number when the value survives the trip through f64 unchanged,
/// otherwise the exact decimal text.
fn numeric_to_json(d: Decimal) -> Value {
    match d.to_f64() {
        Some(f) if Decimal::from_f64(f) == Some(d) => json!(f),
        _ => json!(d.to_string()),
    }
}

/// Non-finite floats use PostgreSQL's spelling, since JSON numbers can't hold them
fn float_to_json(f: f64) -> Value {
    match serde_json::Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None if f.is_nan() => json!("NaN"),
        None if f > 0.0 => json!("Infinity"),
        None => json!("-Infinity"),
    }
}

// Widen through the shortest decimal text so 0.1f32 stays 0.1
fn float4_to_json(f: f32) -> Value {
    float_to_json(f.to_string().parse().unwrap_or(f64::from(f)))
}

// lc_monetary with two fractional digits, which covers the common locales
fn money_to_json(money: PgMoney) -> Value {
    numeric_to_json(money.to_decimal(2))
}

fn oid_to_json(oid: Oid) -> Value {
    json!(oid.0)
}

/// PostgreSQL's hex output format
fn bytea_to_json(bytes: Vec<u8>) -> Value {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    json!(format!("\\x{}", hex))
}

/// Host addresses print without their prefix length, like `inet` text output
fn inet_to_json(net: IpNetwork) -> Value {
    let host_prefix = match net {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    if net.prefix() == host_prefix {
        json!(net.ip().to_string())
    } else {
        json!(net.to_string())
    }
}

fn cidr_to_json(net: IpNetwork) -> Value {
    json!(net.to_string())
}

fn date_to_json(date: NaiveDate) -> Value {
    json!(date.format("%Y-%m-%d").to_string())
}

fn time_to_json(time: NaiveTime) -> Value {
    json!(time.format("%H:%M:%S%.f").to_string())
}

fn timetz_to_json(time: PgTimeTz<NaiveTime, FixedOffset>) -> Value {
    json!(format!("{}{}", time.time.format("%H:%M:%S%.f"), time.offset))
}

fn timestamp_to_json(dt: NaiveDateTime) -> Value {
    json!(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamptz_to_json(dt: DateTime<Utc>) -> Value {
    json!(dt.to_rfc3339())
}

fn interval_to_json(interval: PgInterval) -> Value {
    json!(interval_to_iso8601(&interval))
}

/// ISO 8601 duration, e.g. `P1Y2M3DT4H5M6.5S`
fn interval_to_iso8601(interval: &PgInterval) -> String {
    let years = interval.months / 12;
    let months = interval.months % 12;
    let whole_secs = interval.microseconds / 1_000_000;
    let micros = interval.microseconds % 1_000_000;

    let mut out = String::from("P");
    for (amount, unit) in [(years, 'Y'), (months, 'M'), (interval.days, 'D')] {
        if amount != 0 {
            out.push_str(&format!("{}{}", amount, unit));
        }
    }

    let mut time = String::new();
    for (amount, unit) in [(whole_secs / 3600, 'H'), (whole_secs % 3600 / 60, 'M')] {
        if amount != 0 {
            time.push_str(&format!("{}{}", amount, unit));
        }
    }
    let secs = whole_secs % 60;
    if micros != 0 {
        let sign = if secs == 0 && micros < 0 { "-" } else { "" };
        let fraction = format!("{:06}", micros.abs());
        time.push_str(&format!("{}{}.{}S", sign, secs, fraction.trim_end_matches('0')));
    } else if secs != 0 {
        time.push_str(&format!("{}S", secs));
    }

    if !time.is_empty() {
        out.push('T');
        out.push_str(&time);
    }
    if out == "P" {
        out.push_str("T0S");
    }
    out
}

fn row_to_record(row: &PgRow) -> Result<Row, DatabaseError> {
    let mut record = Row::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        record.insert(col.name().to_string(), column_value(row, i)?);
    }
    Ok(record)
}

#[async_trait]
impl Session for PostgresSession {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, DatabaseError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DatabaseError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;

        let rows = sqlx::query(TABLE_COLUMNS_SQL)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| -> Result<ColumnSchema, DatabaseError> {
                Ok(ColumnSchema {
                    column_name: row.try_get(0)?,
                    data_type: row.try_get(1)?,
                })
            })
            .collect()
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        match self.conn.lock().await.take() {
            Some(conn) => Ok(conn.close().await?),
            None => Ok(()),
        }
    }
}

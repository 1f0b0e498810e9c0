// src/db/user_repository.rs
// DOCUMENTATION: Database access layer for the users table
// PURPOSE: Run the fixed users query and map arbitrary rows to JSON

use crate::errors::BackendError;
use crate::models::UserRecord;
use crate::services::UserStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::types::Decimal;
use sqlx::{Column, Executor, PgPool, Row, TypeInfo, ValueRef};
use uuid::Uuid;

/// Row limit is part of the statement itself
pub const LIST_USERS_SQL: &str = "SELECT * FROM users LIMIT 10";

/// UserRepository: read access to the relational `users` table
/// DOCUMENTATION: Shares one bounded pool across concurrent requests
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    /// First rows of `users` in the table's scan order
    /// DOCUMENTATION: The pooled connection goes back to the pool whether
    /// the query succeeds or not
    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        // Unprepared statement: the simple query protocol delivers every
        // column as text, so types without a JSON mapping keep their text form
        let rows = (&self.pool).fetch_all(LIST_USERS_SQL).await?;
        rows.iter().map(row_to_record).collect()
    }
}

/// Map a row to an object keyed by column name, in column order
fn row_to_record(row: &PgRow) -> Result<UserRecord, BackendError> {
    let mut record = UserRecord::with_capacity(row.columns().len());
    for column in row.columns() {
        record.insert(column.name().to_string(), column_to_json(row, column)?);
    }
    Ok(record)
}

/// JSON for one column. Integers up to INT4, floats, booleans and JSON are
/// parsed; INT8 and NUMERIC stay decimal strings so JS clients keep full
/// precision; everything else is the server's text form.
fn column_to_json(row: &PgRow, column: &PgColumn) -> Result<Value, sqlx::Error> {
    let idx = column.ordinal();
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match column.type_info().name() {
        "BOOL" => Value::Bool(row.try_get(idx)?),
        "INT2" => json!(row.try_get::<i16, _>(idx)?),
        "INT4" => json!(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::String(row.try_get::<i64, _>(idx)?.to_string()),
        "FLOAT4" => float_to_json(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => float_to_json(row.try_get::<f64, _>(idx)?),
        "NUMERIC" => Value::String(row.try_get::<Decimal, _>(idx)?.to_string()),
        "UUID" => Value::String(row.try_get::<Uuid, _>(idx)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
        "TIMESTAMPTZ" => Value::String(
            row.try_get::<DateTime<Utc>, _>(idx)?
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<NaiveDateTime, _>(idx)?
                .format("%Y-%m-%dT%H:%M:%S%.3f")
                .to_string(),
        ),
        "BOOL[]" => json!(row.try_get::<Vec<bool>, _>(idx)?),
        "INT2[]" => json!(row.try_get::<Vec<i16>, _>(idx)?),
        "INT4[]" => json!(row.try_get::<Vec<i32>, _>(idx)?),
        "INT8[]" => json!(row
            .try_get::<Vec<i64>, _>(idx)?
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()),
        "FLOAT4[]" => Value::Array(
            row.try_get::<Vec<f32>, _>(idx)?
                .into_iter()
                .map(|v| float_to_json(f64::from(v)))
                .collect(),
        ),
        "FLOAT8[]" => Value::Array(
            row.try_get::<Vec<f64>, _>(idx)?
                .into_iter()
                .map(float_to_json)
                .collect(),
        ),
        "NUMERIC[]" => json!(row
            .try_get::<Vec<Decimal>, _>(idx)?
            .iter()
            .map(Decimal::to_string)
            .collect::<Vec<_>>()),
        "TEXT[]" | "VARCHAR[]" => json!(row.try_get::<Vec<String>, _>(idx)?),
        "UUID[]" => json!(row
            .try_get::<Vec<Uuid>, _>(idx)?
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()),
        "TIMESTAMPTZ[]" => json!(row
            .try_get::<Vec<DateTime<Utc>>, _>(idx)?
            .iter()
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .collect::<Vec<_>>()),
        // Text, dates, times, intervals, enums, bytea, inet and the rest
        other => match raw.as_str() {
            Ok(text) => Value::String(text.to_string()),
            Err(e) => {
                log::warn!("Column {} of type {} is not text: {}", column.name(), other, e);
                Value::Null
            }
        },
    };
    Ok(value)
}

fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

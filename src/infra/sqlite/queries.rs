use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;

use crate::domain::entities::filter::FilterOption;
use crate::domain::entities::value::{Row, Value};

pub fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(*value),
        Value::Real(value) => SqlValue::Real(*value),
        Value::Text(value) => SqlValue::Text(value.clone()),
        Value::Blob(bytes) => SqlValue::Blob(bytes.clone()),
    }
}

pub fn fetch_rows(conn: &Connection, sql: &str) -> Result<Vec<Row>> {
    let mut stmt = conn
        .prepare(sql)
        .context("failed to prepare grid row query")?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut result = stmt.query([]).context("failed to run grid row query")?;
    while let Some(row) = result.next().context("failed to read grid row")? {
        let mut values = Row::new();
        for (idx, column) in columns.iter().enumerate() {
            let value = row
                .get_ref(idx)
                .with_context(|| format!("failed to read column {column}"))?;
            values.push(column.clone(), to_value(value));
        }
        rows.push(values);
    }

    Ok(rows)
}

pub fn count_rows(conn: &Connection, sql: &str) -> Result<u64> {
    let total: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .context("failed to query filtered row count")?;
    Ok(total.max(0) as u64)
}

/// Reads `(value, label)` pairs, keeping the first label seen for each value.
pub fn fetch_pairs(conn: &Connection, sql: &str) -> Result<Vec<FilterOption>> {
    let mut stmt = conn
        .prepare(sql)
        .context("failed to prepare filter values query")?;
    let pairs = stmt
        .query_map([], |row| {
            Ok((to_value(row.get_ref(0)?), to_value(row.get_ref(1)?)))
        })
        .context("failed to query filter values")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect filter values")?;

    let mut seen = HashSet::new();
    let options = pairs
        .into_iter()
        .map(|(value, label)| FilterOption::new(value.to_string(), label.to_string()))
        .filter(|option| seen.insert(option.value.clone()))
        .collect();
    Ok(options)
}

/// Joins the columns of every row with `separator`.
pub fn fetch_joined(conn: &Connection, sql: &str, separator: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(sql)
        .context("failed to prepare identifier query")?;
    let width = stmt.column_count();

    let mut ids = Vec::new();
    let mut rows = stmt.query([]).context("failed to run identifier query")?;
    while let Some(row) = rows.next().context("failed to read identifier row")? {
        let mut parts = Vec::with_capacity(width);
        for idx in 0..width {
            parts.push(to_value(row.get_ref(idx)?).to_string());
        }
        ids.push(parts.join(separator));
    }

    Ok(ids)
}

pub fn fetch_scalar(conn: &Connection, sql: &str) -> Result<Value> {
    conn.query_row(sql, [], |row| Ok(to_value(row.get_ref(0)?)))
        .context("failed to evaluate aggregate expression")
}

/// Inserts one row with bound parameters and returns its row id.
pub fn insert_row(
    conn: &Connection,
    table_sql: &str,
    columns_sql: &[String],
    values: &[Value],
) -> Result<i64> {
    let sql = if columns_sql.is_empty() {
        format!("INSERT INTO {table_sql} DEFAULT VALUES")
    } else {
        let placeholders = (1..=values.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table_sql} ({}) VALUES ({placeholders})",
            columns_sql.join(", ")
        )
    };

    conn.execute(
        &sql,
        rusqlite::params_from_iter(values.iter().map(to_sql_value)),
    )
    .with_context(|| format!("failed to insert into {table_sql}"))?;

    Ok(conn.last_insert_rowid())
}

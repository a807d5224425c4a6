use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::domain::entities::field::{ColumnInfo, TableInfo, TypeKind};
use crate::infra::sqlite::definition::check_constraint_values;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    Ok(conn)
}

/// Column metadata of `table`, or `None` when no such table or view exists.
pub fn load_table_info(conn: &Connection, table: &str) -> Result<Option<TableInfo>> {
    let definition = conn
        .query_row(
            "SELECT name, COALESCE(sql, '')
             FROM sqlite_master
             WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            [table],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .with_context(|| format!("failed to look up table {table}"))?;

    let Some((name, create_sql)) = definition else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(
            "SELECT name, type, \"notnull\", pk
             FROM pragma_table_info(?1)
             ORDER BY cid ASC",
        )
        .context("failed to prepare table info query")?;

    let columns = stmt
        .query_map([&name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? != 0,
                row.get::<_, i64>(3)?,
            ))
        })
        .with_context(|| format!("failed to query columns of {name}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to collect columns of {name}"))?;

    let columns = columns
        .into_iter()
        .map(|(column, declared_type, not_null, pk_position)| {
            let allowed = check_constraint_values(&create_sql, &column);
            let mut kind = TypeKind::classify(&declared_type);
            if allowed.is_some() && kind != TypeKind::Set {
                kind = TypeKind::Enum;
            }
            ColumnInfo {
                name: column,
                declared_type,
                kind,
                not_null,
                pk_position,
                allowed_values: allowed.unwrap_or_default(),
            }
        })
        .collect();

    Ok(Some(TableInfo { name, columns }))
}

/// Primary-key columns in key order, else the columns of the first unique index.
///
/// Returns an empty list when the table has neither.
pub fn identifier_columns(conn: &Connection, info: &TableInfo) -> Result<Vec<String>> {
    let mut pk = info
        .columns
        .iter()
        .filter(|column| column.pk_position > 0)
        .collect::<Vec<_>>();
    if !pk.is_empty() {
        pk.sort_by_key(|column| column.pk_position);
        return Ok(pk.into_iter().map(|column| column.name.clone()).collect());
    }

    let mut index_stmt = conn
        .prepare("SELECT name FROM pragma_index_list(?1) WHERE \"unique\" = 1 ORDER BY seq DESC")
        .context("failed to prepare index list query")?;
    let indexes = index_stmt
        .query_map([&info.name], |row| row.get::<_, String>(0))
        .with_context(|| format!("failed to list indexes of {}", info.name))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to collect indexes of {}", info.name))?;

    let Some(index) = indexes.first() else {
        return Ok(Vec::new());
    };

    let mut column_stmt = conn
        .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno ASC")
        .context("failed to prepare index info query")?;
    let columns = column_stmt
        .query_map([index], |row| row.get::<_, Option<String>>(0))
        .with_context(|| format!("failed to read index {index}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to collect index {index}"))?;

    // Expression index members have no column name.
    Ok(columns.into_iter().flatten().collect())
}

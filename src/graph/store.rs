//! Connection store: SQL over the `connections` table.
//!
//! Plain functions over a borrowed rusqlite connection; callers run them
//! through [`crate::db::Db::with_connection`]. Uniqueness of
//! (relationship_name, from_id, to_id) is guaranteed by the table constraint,
//! which also serializes concurrent get-or-create calls.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Connection, DEFAULT_WEIGHT};
use crate::{RelgraphError, Result};

const COLUMNS: &str = "id, relationship_name, from_id, to_id, weight, created_at";

/// Keeps `IN (...)` lists well below SQLite's bound parameter limit.
const MAX_IN_PARAMS: usize = 500;

fn row_to_connection(row: &Row<'_>) -> rusqlite::Result<Connection> {
    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(Connection {
        id: row.get(0)?,
        relationship_name: row.get(1)?,
        from_id: row.get(2)?,
        to_id: row.get(3)?,
        weight: row.get(4)?,
        created_at,
    })
}

/// Insert the edge unless it exists. Returns the stored row and whether this
/// call inserted it. An existing row is returned untouched.
pub fn get_or_create(
    conn: &rusqlite::Connection,
    relationship: &str,
    from_id: i64,
    to_id: i64,
) -> Result<(Connection, bool)> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let inserted = conn.execute(
        "INSERT INTO connections (relationship_name, from_id, to_id, weight, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(relationship_name, from_id, to_id) DO NOTHING",
        params![relationship, from_id, to_id, DEFAULT_WEIGHT, created_at],
    )?;

    // A concurrent delete between the insert and this read leaves nothing to return.
    let connection = find_one(conn, relationship, from_id, to_id)?
        .ok_or(RelgraphError::Database(rusqlite::Error::QueryReturnedNoRows))?;
    Ok((connection, inserted == 1))
}

pub fn find_one(
    conn: &rusqlite::Connection,
    relationship: &str,
    from_id: i64,
    to_id: i64,
) -> Result<Option<Connection>> {
    let query = format!(
        "SELECT {COLUMNS} FROM connections \
         WHERE relationship_name = ?1 AND from_id = ?2 AND to_id = ?3"
    );
    let connection = conn
        .query_row(&query, params![relationship, from_id, to_id], row_to_connection)
        .optional()?;
    Ok(connection)
}

pub fn exists(
    conn: &rusqlite::Connection,
    relationship: &str,
    from_id: i64,
    to_id: i64,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM connections \
         WHERE relationship_name = ?1 AND from_id = ?2 AND to_id = ?3",
    )?;
    Ok(stmt.exists(params![relationship, from_id, to_id])?)
}

/// All connections of `relationship`, optionally filtered by either
/// endpoint (both filters AND together), in insertion order.
pub fn find(
    conn: &rusqlite::Connection,
    relationship: &str,
    from_id: Option<i64>,
    to_id: Option<i64>,
) -> Result<Vec<Connection>> {
    let mut query = format!("SELECT {COLUMNS} FROM connections WHERE relationship_name = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(relationship.to_string())];
    if let Some(id) = from_id {
        query.push_str(" AND from_id = ?");
        values.push(Box::new(id));
    }
    if let Some(id) = to_id {
        query.push_str(" AND to_id = ?");
        values.push(Box::new(id));
    }
    query.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_connection)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Destination ids of every edge leaving `from_id`.
pub fn target_ids(conn: &rusqlite::Connection, relationship: &str, from_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT to_id FROM connections \
         WHERE relationship_name = ?1 AND from_id = ?2 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![relationship, from_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, rusqlite::Error>>()?;
    Ok(ids)
}

/// Source ids of every edge arriving at `to_id`.
pub fn source_ids(conn: &rusqlite::Connection, relationship: &str, to_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT from_id FROM connections \
         WHERE relationship_name = ?1 AND to_id = ?2 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![relationship, to_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, rusqlite::Error>>()?;
    Ok(ids)
}

/// Distinct destination ids of every edge leaving any of `from_ids`.
pub fn successors(
    conn: &rusqlite::Connection,
    relationship: &str,
    from_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    for batch in from_ids.chunks(MAX_IN_PARAMS) {
        let placeholders = batch.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT DISTINCT to_id FROM connections \
             WHERE relationship_name = ? AND from_id IN ({})",
            placeholders
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(relationship.to_string())];
        for id in batch {
            values.push(Box::new(*id));
        }
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?;
        for row in rows {
            out.push(row?);
        }
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// Delete one connection. Returns false if it was already gone.
pub fn delete(conn: &rusqlite::Connection, connection: &Connection) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM connections \
         WHERE relationship_name = ?1 AND from_id = ?2 AND to_id = ?3",
        params![connection.relationship_name, connection.from_id, connection.to_id],
    )?;
    Ok(deleted > 0)
}

/// Delete every connection of `relationship`, returning the deleted rows.
pub fn delete_all(conn: &rusqlite::Connection, relationship: &str) -> Result<Vec<Connection>> {
    let query = format!(
        "DELETE FROM connections WHERE relationship_name = ?1 RETURNING {COLUMNS}"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params![relationship], row_to_connection)?;
    let mut deleted = Vec::new();
    for row in rows {
        deleted.push(row?);
    }
    deleted.sort_by_key(|c| c.id);
    Ok(deleted)
}

/// Connection count per relationship name, including names no longer
/// registered in this process.
pub fn count_by_relationship(conn: &rusqlite::Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT relationship_name, COUNT(*) FROM connections \
         GROUP BY relationship_name ORDER BY relationship_name",
    )?;
    let counts = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(counts)
}

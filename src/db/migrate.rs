//! Versioned schema migrations for the connection store.
//!
//! Files in the migrations directory are named `NNN_description.sql` and are
//! applied in version order, each in its own transaction. Applied versions are
//! recorded in `schema_migrations`.

use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{RelgraphError, Result};

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

fn applied_versions(conn: &Connection) -> Result<HashSet<u32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, u32>(0))?
        .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()?;
    Ok(versions)
}

/// `NNN_description.sql` files sorted by version. Two files sharing a
/// version are rejected.
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RelgraphError::Config(format!("Invalid migration filename: {}", path.display())))?
            .to_string();

        let version_str = name.split('_').next().unwrap_or_default();
        let version: u32 = version_str
            .parse()
            .map_err(|_| RelgraphError::Config(format!("Invalid migration version: {}", version_str)))?;

        let sql = fs::read_to_string(&path)?;
        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);
    if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(RelgraphError::Config(format!(
            "Migrations {} and {} share version {}",
            pair[0].name, pair[1].name, pair[0].version
        )));
    }

    Ok(migrations)
}

/// Apply pending migrations and return the names of those applied by this call.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<Vec<String>> {
    ensure_migrations_table(conn)?;

    let done = applied_versions(conn)?;
    let mut applied = Vec::new();

    for migration in load_migrations(migrations_dir)? {
        if done.contains(&migration.version) {
            log::debug!("Migration {} already applied", migration.name);
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql).map_err(|e| {
            RelgraphError::Config(format!("Migration {} failed: {}", migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        log::info!("Applied migration {} (version {})", migration.name, migration.version);
        applied.push(migration.name);
    }

    if applied.is_empty() {
        log::debug!("Connection schema up to date");
    } else {
        log::info!("Connection schema migrated: {}", applied.join(", "));
    }
    Ok(applied)
}

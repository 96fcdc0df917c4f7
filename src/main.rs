use anyhow::Result;
use clap::{Parser, Subcommand};
use relgraph::db::{migrate, Db};
use relgraph::graph::store;
use relgraph::{Config, EntityRef, RelationshipRegistry};

#[derive(Parser, Debug)]
#[command(name = "relgraph")]
#[command(about = "Inspect and edit the relationship graph defined in config.toml")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and verify the schema
    Migrate,
    /// List configured relationships
    Relationships,
    /// Create a connection (no-op if it exists)
    Connect {
        relationship: String,
        from_id: i64,
        to_id: i64,
    },
    /// Remove a connection
    Disconnect {
        relationship: String,
        from_id: i64,
        to_id: i64,
    },
    /// Check whether a connection exists
    Exists {
        relationship: String,
        from_id: i64,
        to_id: i64,
    },
    /// List connections, optionally filtered by one endpoint
    List {
        relationship: String,
        #[arg(long, conflicts_with = "to")]
        from: Option<i64>,
        #[arg(long)]
        to: Option<i64>,
        /// Print JSON instead of one line per connection
        #[arg(long)]
        json: bool,
    },
    /// Shortest directed distance between two entities
    Distance {
        relationship: String,
        from_id: i64,
        to_id: i64,
        /// Maximum number of hops (defaults to traversal.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove every connection of a relationship
    Clear { relationship: String },
    /// Connection counts per relationship
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.relgraph.log_level.as_str())
    ).init();

    log::debug!("Database path: {}", config.db_path().display());
    let db = Db::new(config.db_path());

    let migrations_dir = config.migrations_dir().to_path_buf();
    let applied = db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    let registry = config.relationship_registry()?;

    match args.command {
        Command::Migrate => {
            for name in &applied {
                println!("applied {}", name);
            }
            verify_database_schema(&db).await?;
        }
        Command::Relationships => {
            for relationship in registry.relationships() {
                println!("{}", relationship);
            }
        }
        Command::Connect { relationship, from_id, to_id } => {
            let (from, to) = endpoints(&registry, &relationship, from_id, to_id)?;
            let r = registry.get(&relationship)?;
            let connection = r.create_connection(&db, &from, &to).await?;
            println!("{} [{}]", r.describe(&connection), connection.created_at.to_rfc3339());
        }
        Command::Disconnect { relationship, from_id, to_id } => {
            let (from, to) = endpoints(&registry, &relationship, from_id, to_id)?;
            let r = registry.get(&relationship)?;
            match r.get_connection(&db, &from, &to).await? {
                Some(connection) => {
                    r.remove_connection(&db, &connection).await?;
                    println!("removed {}", r.describe(&connection));
                }
                None => println!("no such connection"),
            }
        }
        Command::Exists { relationship, from_id, to_id } => {
            let (from, to) = endpoints(&registry, &relationship, from_id, to_id)?;
            let exists = registry.get(&relationship)?.connection_exists(&db, &from, &to).await?;
            println!("{}", exists);
        }
        Command::List { relationship, from, to, json } => {
            let r = registry.get(&relationship)?;
            let connections = match (from, to) {
                (Some(id), _) => r.connections_from(&db, &EntityRef::new(r.from_kind().clone(), id)).await?,
                (_, Some(id)) => r.connections_to(&db, &EntityRef::new(r.to_kind().clone(), id)).await?,
                (None, None) => r.connections(&db).await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&connections)?);
            } else {
                for connection in &connections {
                    println!("{} weight={}", r.describe(connection), connection.weight);
                }
            }
        }
        Command::Distance { relationship, from_id, to_id, limit } => {
            let (from, to) = endpoints(&registry, &relationship, from_id, to_id)?;
            let limit = limit.unwrap_or(config.traversal.default_limit);
            let distance = registry
                .get(&relationship)?
                .distance_between(&db, &from, &to, limit)
                .await?;
            match distance {
                Some(d) => println!("{}", d),
                None => println!("not connected within {} hop(s)", limit),
            }
        }
        Command::Clear { relationship } => {
            let removed = registry.get(&relationship)?.remove_all(&db).await?;
            println!("removed {} connection(s)", removed);
        }
        Command::Stats => {
            let counts = db.with_connection(|conn| store::count_by_relationship(conn)).await?;
            if counts.is_empty() {
                println!("No connections stored.");
            }
            for (name, count) in counts {
                let marker = if registry.contains(&name) { "" } else { " (undefined)" };
                println!("{:<50} {:>10}{}", name, count, marker);
            }
        }
    }

    Ok(())
}

/// Entity references for the relationship's pinned kinds
fn endpoints(
    registry: &RelationshipRegistry,
    relationship: &str,
    from_id: i64,
    to_id: i64,
) -> Result<(EntityRef, EntityRef)> {
    let r = registry.get(relationship)?;
    Ok((
        EntityRef::new(r.from_kind().clone(), from_id),
        EntityRef::new(r.to_kind().clone(), to_id),
    ))
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use relgraph::RelgraphError;

    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'index')")?;
        let objects: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for expected in ["connections", "schema_migrations", "idx_connections_to"] {
            if !objects.iter().any(|o| o == expected) {
                log::error!("Missing schema object: {}", expected);
                return Err(RelgraphError::Config(format!("Missing schema object: {}", expected)));
            }
            log::debug!("✓ {} exists", expected);
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(RelgraphError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(RelgraphError::Config(format!("Database integrity check failed: {}", integrity)));
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::info!("✓ Schema OK, {} migration(s) applied", applied.len());
        Ok(())
    }).await?;

    println!("schema OK");
    Ok(())
}

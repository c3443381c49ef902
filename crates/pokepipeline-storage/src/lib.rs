//! PokePipeline storage layer
//!
//! Idempotent writes of extracted pokemon records into SQLite:
//!
//! ```text
//! pokemon ──┬── pokemon_types ──── types
//!           ├── pokemon_abilities ─ abilities
//!           └── stats
//! evolutions (chain_id, from_species, to_species)
//! ```
//!
//! ## Write discipline
//!
//! - All writes go through a [`StoreTx`], one per pokemon. Dropping it without
//!   [`StoreTx::commit`] rolls everything back.
//! - Every write is an upsert: repeating it with the same key leaves one row
//!   holding the latest values.
//! - `types`/`abilities` are lookup-or-create by unique name. This assumes a
//!   single writer; concurrent writers would need insert-then-reselect on the
//!   unique-violation instead of check-then-insert.

pub mod schema;


use pokepipeline_ingest::{BasicInfo, EvolutionEdge, StatRow};
pub use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{kind} `{name}` could not be resolved to an id")]
    UnresolvedReference { kind: ReferenceKind, name: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

// ============================================================================
// Reference values
// ============================================================================

/// The shared, deduplicated lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Type,
    Ability,
}

impl ReferenceKind {
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Type => "types",
            ReferenceKind::Ability => "abilities",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Type => f.write_str("type"),
            ReferenceKind::Ability => f.write_str("ability"),
        }
    }
}

/// Per-association attributes; the variant also picks the association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAttrs {
    Type { slot: i64 },
    Ability { slot: i64, is_hidden: bool },
}

fn lookup_reference(conn: &Connection, kind: ReferenceKind, name: &str) -> Result<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE name = ?1", kind.table());
    Ok(conn
        .query_row(&sql, params![name], |row| row.get(0))
        .optional()?)
}

// ============================================================================
// Store
// ============================================================================

/// One SQLite database holding the normalized schema.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

/// Dump of one table, rows in primary-key order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDump {
    pub table: &'static str,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Store {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// In-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        // Must run outside a transaction or SQLite ignores it.
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(schema::SCHEMA)?;
        tracing::debug!(path = ?self.path, "storage schema ready");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start the transaction for one pokemon's worth of writes.
    pub fn begin(&mut self) -> Result<StoreTx<'_>> {
        Ok(StoreTx {
            tx: self.conn.transaction()?,
        })
    }

    pub fn reference_id_by_name(&self, kind: ReferenceKind, name: &str) -> Result<Option<i64>> {
        lookup_reference(&self.conn, kind, name)
    }

    /// Row count per table, in schema order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        schema::TABLES
            .iter()
            .map(|&(table, _)| {
                let sql = format!("SELECT COUNT(*) FROM {table}");
                let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
                Ok::<_, StoreError>((table, count))
            })
            .collect()
    }

    /// Full contents of every table, deterministically ordered.
    pub fn snapshot(&self) -> Result<Vec<TableDump>> {
        let mut dumps = Vec::with_capacity(schema::TABLES.len());
        for &(table, order_by) in schema::TABLES {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT * FROM {table} ORDER BY {order_by}"))?;
            let width = stmt.column_count();
            let rows = stmt
                .query_map([], |row| {
                    (0..width)
                        .map(|i| row.get::<_, SqlValue>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            dumps.push(TableDump { table, rows });
        }
        Ok(dumps)
    }
}

// ============================================================================
// Transaction-scoped writes
// ============================================================================

/// Writes for one pokemon. Rolled back on drop unless committed.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    /// Insert the pokemon row or overwrite every column of the existing one.
    ///
    /// Uses `ON CONFLICT DO UPDATE` rather than `INSERT OR REPLACE` so the row
    /// is never deleted and its association rows are not cascaded away.
    pub fn upsert_entity(&self, basic: &BasicInfo, evolution_chain_id: Option<i64>) -> Result<()> {
        self.tx.execute(
            "INSERT INTO pokemon (id, name, height, weight, base_experience, species_url, evolution_chain_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                height = excluded.height,
                weight = excluded.weight,
                base_experience = excluded.base_experience,
                species_url = excluded.species_url,
                evolution_chain_id = excluded.evolution_chain_id",
            params![
                basic.id,
                basic.name,
                basic.height,
                basic.weight,
                basic.base_experience,
                basic.species_url,
                evolution_chain_id,
            ],
        )?;
        Ok(())
    }

    /// Drop the pokemon's type, ability and stat rows before they are rewritten,
    /// so a re-fetch fully replaces them.
    pub fn clear_entity_links(&self, entity_id: i64) -> Result<()> {
        for table in ["pokemon_types", "pokemon_abilities", "stats"] {
            self.tx.execute(
                &format!("DELETE FROM {table} WHERE pokemon_id = ?1"),
                params![entity_id],
            )?;
        }
        Ok(())
    }

    /// Resolve a type/ability to its id, creating the row on first sight.
    ///
    /// - With an upstream id: insert-or-ignore by id (first writer wins the
    ///   name) and return the id. If the name is already held by a different
    ///   id, that existing id is returned instead.
    /// - Without one: look up by name, else insert and return the new rowid.
    pub fn upsert_reference_value(
        &self,
        kind: ReferenceKind,
        id: Option<i64>,
        name: &str,
    ) -> Result<i64> {
        let table = kind.table();

        let Some(id) = id else {
            if let Some(existing) = lookup_reference(&self.tx, kind, name)? {
                return Ok(existing);
            }
            self.tx.execute(
                &format!("INSERT INTO {table} (name) VALUES (?1)"),
                params![name],
            )?;
            return Ok(self.tx.last_insert_rowid());
        };

        let inserted = self.tx.execute(
            &format!("INSERT OR IGNORE INTO {table} (id, name) VALUES (?1, ?2)"),
            params![id, name],
        )?;
        if inserted > 0 {
            return Ok(id);
        }

        let id_taken: bool = self.tx.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            params![id],
            |row| row.get(0),
        )?;
        if id_taken {
            return Ok(id);
        }

        let existing =
            lookup_reference(&self.tx, kind, name)?.ok_or_else(|| StoreError::UnresolvedReference {
                kind,
                name: name.to_string(),
            })?;
        tracing::warn!(
            %kind,
            name,
            upstream_id = id,
            stored_id = existing,
            "name already stored under another id; reusing it"
        );
        Ok(existing)
    }

    /// Insert or overwrite one pokemon <-> type/ability association.
    pub fn link_entity_reference(&self, entity_id: i64, ref_id: i64, attrs: LinkAttrs) -> Result<()> {
        match attrs {
            LinkAttrs::Type { slot } => self.tx.execute(
                "INSERT OR REPLACE INTO pokemon_types (pokemon_id, type_id, slot)
                 VALUES (?1, ?2, ?3)",
                params![entity_id, ref_id, slot],
            )?,
            LinkAttrs::Ability { slot, is_hidden } => self.tx.execute(
                "INSERT OR REPLACE INTO pokemon_abilities (pokemon_id, ability_id, slot, is_hidden)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, ref_id, slot, is_hidden],
            )?,
        };
        Ok(())
    }

    pub fn upsert_stat(&self, entity_id: i64, stat: &StatRow) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO stats (pokemon_id, stat_name, base_stat, effort)
             VALUES (?1, ?2, ?3, ?4)",
            params![entity_id, stat.name, stat.base_stat, stat.effort],
        )?;
        Ok(())
    }

    /// Insert-or-replace each edge of a chain. Returns the number written.
    pub fn upsert_evolution_edges(&self, chain_id: i64, edges: &[EvolutionEdge]) -> Result<usize> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT OR REPLACE INTO evolutions (chain_id, from_species, to_species)
             VALUES (?1, ?2, ?3)",
        )?;
        for edge in edges {
            stmt.execute(params![chain_id, edge.from_species, edge.to_species])?;
        }
        Ok(edges.len())
    }

    pub fn reference_id_by_name(&self, kind: ReferenceKind, name: &str) -> Result<Option<i64>> {
        lookup_reference(&self.tx, kind, name)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

//! SQLite store for blueprints, contracts, values and audit logs
//!
//! The database lives in `.accord/accord.db` by default. Every write that
//! touches more than one row runs inside a single transaction, so a failed
//! operation never leaves partial rows behind.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    AuditLogEntry, Blueprint, BlueprintId, Contract, ContractFilter, ContractId, ContractStatus,
    ContractValue, Field, FieldId, ValueId,
};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database schema version {found} is not supported (expected {expected})")]
    UnsupportedSchema { found: i32, expected: i32 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Connection to the Accord database
pub struct Database {
    /// Path to the SQLite file, `None` for in-memory databases
    path: Option<PathBuf>,

    conn: Connection,
}

impl Database {
    /// Schema version - bump when the schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (and if needed creates) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // WAL keeps readers unblocked while the server writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut db = Self { path, conn };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Ensures the schema exists and matches this build
    fn ensure_schema(&mut self) -> Result<()> {
        let current = self.schema_version()?;

        if current == 0 {
            self.create_schema()?;
        } else if current != Self::SCHEMA_VERSION {
            return Err(DatabaseError::UnsupportedSchema {
                found: current,
                expected: Self::SCHEMA_VERSION,
            }
            .into());
        }

        Ok(())
    }

    /// Gets the current schema version
    fn schema_version(&self) -> Result<i32> {
        let result: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    /// Creates the schema from scratch
    fn create_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute_batch(
            "
            CREATE TABLE blueprints (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE fields (
                id TEXT PRIMARY KEY,
                blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                field_type TEXT NOT NULL,
                label TEXT NOT NULL,
                position_x REAL NOT NULL DEFAULT 0,
                position_y REAL NOT NULL DEFAULT 0,
                required INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE contracts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE RESTRICT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE contract_values (
                id TEXT PRIMARY KEY,
                contract_id TEXT NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
                field_id TEXT NOT NULL REFERENCES fields(id),
                value TEXT,
                updated_at TEXT NOT NULL,
                UNIQUE (contract_id, field_id)
            );

            -- Audit rows outlive their contract, so no foreign key here
            CREATE TABLE contract_audit_logs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                contract_id TEXT NOT NULL,
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                reason TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX idx_fields_blueprint ON fields(blueprint_id, ordinal);
            CREATE INDEX idx_contracts_blueprint ON contracts(blueprint_id);
            CREATE INDEX idx_contracts_status ON contracts(status);
            CREATE INDEX idx_audit_contract ON contract_audit_logs(contract_id, seq);
            ",
        )?;

        tx.execute_batch(&format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION))?;
        tx.commit()?;

        debug!(version = Self::SCHEMA_VERSION, "Created database schema");
        Ok(())
    }

    /// Returns the path to the database file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Blueprints
    // =========================================================================

    /// Inserts a blueprint together with its fields
    pub fn insert_blueprint(&mut self, blueprint: &Blueprint) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO blueprints (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                blueprint.id.to_string(),
                blueprint.name,
                blueprint.description,
                blueprint.created_at.to_rfc3339(),
                blueprint.updated_at.to_rfc3339(),
            ],
        )?;
        insert_fields(&tx, &blueprint.fields)?;

        tx.commit()?;
        Ok(())
    }

    /// Updates name/description and, when `fields` is given, replaces every field.
    ///
    /// Returns false without writing anything if fields were supplied but a
    /// contract references the blueprint by the time the write lock is held.
    pub fn update_blueprint(
        &mut self,
        id: &BlueprintId,
        name: Option<&str>,
        description: Option<&str>,
        fields: Option<&[Field]>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if fields.is_some() {
            let contracts: i64 = tx.query_row(
                "SELECT COUNT(*) FROM contracts WHERE blueprint_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )?;
            if contracts > 0 {
                return Ok(false);
            }
        }

        tx.execute(
            "UPDATE blueprints
             SET name = COALESCE(?2, name),
                 description = COALESCE(?3, description),
                 updated_at = ?4
             WHERE id = ?1",
            params![id.to_string(), name, description, updated_at.to_rfc3339()],
        )?;

        if let Some(fields) = fields {
            tx.execute(
                "DELETE FROM fields WHERE blueprint_id = ?1",
                params![id.to_string()],
            )?;
            insert_fields(&tx, fields)?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// Deletes a blueprint and its fields; returns false if it did not exist
    pub fn delete_blueprint(&mut self, id: &BlueprintId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM blueprints WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Loads a blueprint with its fields and contract count
    pub fn blueprint(&self, id: &BlueprintId) -> Result<Option<Blueprint>> {
        let row = self
            .conn
            .query_row(
                "SELECT b.id, b.name, b.description, b.created_at, b.updated_at,
                        (SELECT COUNT(*) FROM contracts c WHERE c.blueprint_id = b.id)
                 FROM blueprints b WHERE b.id = ?1",
                params![id.to_string()],
                blueprint_from_row,
            )
            .optional()?;

        match row {
            Some(mut blueprint) => {
                blueprint.fields = self.fields_for(&blueprint.id)?;
                Ok(Some(blueprint))
            }
            None => Ok(None),
        }
    }

    /// Lists all blueprints, newest first
    pub fn list_blueprints(&self) -> Result<Vec<Blueprint>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.name, b.description, b.created_at, b.updated_at,
                    (SELECT COUNT(*) FROM contracts c WHERE c.blueprint_id = b.id)
             FROM blueprints b
             ORDER BY b.created_at DESC, b.rowid DESC",
        )?;

        let mut blueprints = stmt
            .query_map([], blueprint_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for blueprint in &mut blueprints {
            blueprint.fields = self.fields_for(&blueprint.id)?;
        }

        Ok(blueprints)
    }

    /// Counts contracts instantiated from a blueprint
    pub fn contract_count(&self, id: &BlueprintId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM contracts WHERE blueprint_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Loads the fields of a blueprint in order
    fn fields_for(&self, id: &BlueprintId) -> Result<Vec<Field>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, blueprint_id, field_type, label, position_x, position_y, required, created_at
             FROM fields WHERE blueprint_id = ?1
             ORDER BY ordinal",
        )?;

        let fields = stmt
            .query_map(params![id.to_string()], |row| {
                Ok(Field {
                    id: col(row, 0)?,
                    blueprint_id: col(row, 1)?,
                    field_type: col(row, 2)?,
                    label: row.get(3)?,
                    position_x: row.get(4)?,
                    position_y: row.get(5)?,
                    required: row.get(6)?,
                    created_at: col(row, 7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fields)
    }

    // =========================================================================
    // Contracts
    // =========================================================================

    /// Inserts a contract together with its initial values
    pub fn insert_contract(&mut self, contract: &Contract, values: &[ContractValue]) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO contracts (id, name, blueprint_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                contract.id.to_string(),
                contract.name,
                contract.blueprint_id.to_string(),
                contract.status.as_str(),
                contract.created_at.to_rfc3339(),
                contract.updated_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO contract_values (id, contract_id, field_id, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for value in values {
                stmt.execute(params![
                    value.id.to_string(),
                    value.contract_id.to_string(),
                    value.field_id.to_string(),
                    value.value,
                    contract.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Loads a contract row
    pub fn contract(&self, id: &ContractId) -> Result<Option<Contract>> {
        let contract = self
            .conn
            .query_row(
                "SELECT id, name, blueprint_id, status, created_at, updated_at
                 FROM contracts WHERE id = ?1",
                params![id.to_string()],
                contract_from_row,
            )
            .optional()?;

        Ok(contract)
    }

    /// Lists contracts matching `filter`, newest first
    pub fn list_contracts(&self, filter: &ContractFilter) -> Result<Vec<Contract>> {
        let status = filter.status.map(|s| s.as_str());
        let blueprint_id = filter.blueprint_id.as_ref().map(|b| b.to_string());

        let mut stmt = self.conn.prepare(
            "SELECT id, name, blueprint_id, status, created_at, updated_at
             FROM contracts
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR blueprint_id = ?2)
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let contracts = stmt
            .query_map(params![status, blueprint_id], contract_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(contracts)
    }

    /// Loads the stored values of a contract
    pub fn values_for(&self, id: &ContractId) -> Result<Vec<ContractValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contract_id, field_id, value
             FROM contract_values WHERE contract_id = ?1
             ORDER BY rowid",
        )?;

        let values = stmt
            .query_map(params![id.to_string()], |row| {
                Ok(ContractValue {
                    id: col(row, 0)?,
                    contract_id: col(row, 1)?,
                    field_id: col(row, 2)?,
                    value: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values)
    }

    /// Upserts values keyed by (contract, field) as one batch.
    ///
    /// Returns false without writing anything if the contract is missing or
    /// has reached a terminal status by the time the batch runs.
    pub fn upsert_values<'a>(
        &mut self,
        id: &ContractId,
        values: impl IntoIterator<Item = (&'a FieldId, Option<&'a str>)>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let tx = self.conn.transaction()?;

        let status: Option<ContractStatus> = tx
            .query_row(
                "SELECT status FROM contracts WHERE id = ?1",
                params![id.to_string()],
                |row| col(row, 0),
            )
            .optional()?;

        match status {
            Some(status) if !status.is_terminal() => {}
            _ => return Ok(false),
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO contract_values (id, contract_id, field_id, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (contract_id, field_id)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;

            for (field_id, value) in values {
                stmt.execute(params![
                    ValueId::new(&field_id.to_string(), now).to_string(),
                    id.to_string(),
                    field_id.to_string(),
                    value,
                    now.to_rfc3339(),
                ])?;
            }
        }

        tx.execute(
            "UPDATE contracts SET updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), now.to_rfc3339()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Moves a contract from `entry.from_status` to `entry.to_status` and
    /// appends the audit row, atomically.
    ///
    /// The update only matches while the stored status still equals
    /// `entry.from_status`; returns false (and writes nothing) otherwise.
    pub fn apply_transition(&mut self, entry: &AuditLogEntry) -> Result<bool> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE contracts SET status = ?3, updated_at = ?4
             WHERE id = ?1 AND status = ?2",
            params![
                entry.contract_id.to_string(),
                entry.from_status.as_str(),
                entry.to_status.as_str(),
                entry.created_at.to_rfc3339(),
            ],
        )?;

        if updated == 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO contract_audit_logs (id, contract_id, from_status, to_status, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id.to_string(),
                entry.contract_id.to_string(),
                entry.from_status.as_str(),
                entry.to_status.as_str(),
                entry.reason,
                entry.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Deletes a contract (and its values) unless it is terminal.
    ///
    /// Returns false if nothing was deleted.
    pub fn delete_contract(&mut self, id: &ContractId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM contracts WHERE id = ?1 AND status NOT IN (?2, ?3)",
            params![
                id.to_string(),
                ContractStatus::Locked.as_str(),
                ContractStatus::Revoked.as_str(),
            ],
        )?;
        Ok(deleted > 0)
    }

    /// Lists the audit rows of a contract, newest first
    pub fn audit_logs(&self, id: &ContractId) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contract_id, from_status, to_status, reason, created_at
             FROM contract_audit_logs WHERE contract_id = ?1
             ORDER BY seq DESC",
        )?;

        let entries = stmt
            .query_map(params![id.to_string()], |row| {
                Ok(AuditLogEntry {
                    id: col(row, 0)?,
                    contract_id: col(row, 1)?,
                    from_status: col(row, 2)?,
                    to_status: col(row, 3)?,
                    reason: row.get(4)?,
                    created_at: col(row, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Query: contract counts grouped by status
    pub fn status_counts(&self) -> Result<Vec<(ContractStatus, usize)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM contracts GROUP BY status")?;

        let mut counts = stmt
            .query_map([], |row| Ok((col(row, 0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<Result<Vec<(ContractStatus, usize)>, _>>()?;
        counts.sort();

        Ok(counts)
    }
}

fn insert_fields(conn: &Connection, fields: &[Field]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO fields (id, blueprint_id, ordinal, field_type, label, position_x, position_y, required, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for (ordinal, field) in fields.iter().enumerate() {
        stmt.execute(params![
            field.id.to_string(),
            field.blueprint_id.to_string(),
            ordinal as i64,
            field.field_type.as_str(),
            field.label,
            field.position_x,
            field.position_y,
            field.required,
            field.created_at.to_rfc3339(),
        ])?;
    }

    Ok(())
}

fn blueprint_from_row(row: &Row<'_>) -> rusqlite::Result<Blueprint> {
    Ok(Blueprint {
        id: col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        fields: Vec::new(),
        created_at: col(row, 3)?,
        updated_at: col(row, 4)?,
        contract_count: row.get::<_, i64>(5)? as usize,
    })
}

fn contract_from_row(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: col(row, 0)?,
        name: row.get(1)?,
        blueprint_id: col(row, 2)?,
        status: col(row, 3)?,
        created_at: col(row, 4)?,
        updated_at: col(row, 5)?,
    })
}

/// Reads a text column and parses it into a domain type
fn col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuditLogEntry, FieldSpec, FieldType};
    use tempfile::TempDir;

    fn make_blueprint(specs: &[FieldSpec]) -> Blueprint {
        let now = Utc::now();
        let id = BlueprintId::new("NDA", now);
        Blueprint {
            fields: specs.iter().map(|s| Field::from_spec(&id, s, now)).collect(),
            id,
            name: "NDA".to_string(),
            description: Some("Standard NDA".to_string()),
            created_at: now,
            updated_at: now,
            contract_count: 0,
        }
    }

    fn value(contract: &Contract, field: &Field, text: &str) -> ContractValue {
        ContractValue {
            id: ValueId::new(text, Utc::now()),
            contract_id: contract.id.clone(),
            field_id: field.id.clone(),
            value: Some(text.to_string()),
        }
    }

    fn seeded() -> (Database, Blueprint, Contract) {
        let mut db = Database::open_in_memory().unwrap();
        let bp = make_blueprint(&[
            FieldSpec::new(FieldType::Text, "Company").required(),
            FieldSpec::new(FieldType::Checkbox, "Mutual"),
        ]);
        db.insert_blueprint(&bp).unwrap();

        let contract = Contract::new("Acme NDA", bp.id.clone());
        db.insert_contract(&contract, &[value(&contract, &bp.fields[0], "Acme")])
            .unwrap();

        (db, bp, contract)
    }

    #[test]
    fn open_creates_file_with_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accord.db");
        let db = Database::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(db.schema_version().unwrap(), Database::SCHEMA_VERSION);

        // Reopening keeps the schema
        drop(db);
        assert!(Database::open(&path).is_ok());
    }

    #[test]
    fn blueprint_roundtrip_keeps_field_order() {
        let mut db = Database::open_in_memory().unwrap();
        let bp = make_blueprint(&[
            FieldSpec::new(FieldType::Text, "Zeta"),
            FieldSpec::new(FieldType::Date, "Alpha").required(),
            FieldSpec::new(FieldType::Signature, "Mid").at(2.0, 3.5),
        ]);
        db.insert_blueprint(&bp).unwrap();

        let loaded = db.blueprint(&bp.id).unwrap().unwrap();
        let labels: Vec<_> = loaded.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(loaded.fields[2].position_y, 3.5);
        assert!(loaded.fields[1].required);
        assert_eq!(loaded.contract_count, 0);
    }

    #[test]
    fn upsert_leaves_one_row_with_latest_value() {
        let (mut db, bp, contract) = seeded();
        let field = &bp.fields[1].id;

        assert!(db.upsert_values(&contract.id, [(field, Some("yes"))], Utc::now()).unwrap());
        assert!(db.upsert_values(&contract.id, [(field, Some("no"))], Utc::now()).unwrap());

        let values = db.values_for(&contract.id).unwrap();
        let matching: Vec<_> = values.iter().filter(|v| &v.field_id == field).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].value.as_deref(), Some("no"));
    }

    #[test]
    fn transition_writes_status_and_audit_together() {
        let (mut db, _bp, contract) = seeded();
        let entry = AuditLogEntry::record(
            &contract.id,
            ContractStatus::Created,
            ContractStatus::Approved,
            Some("Looks good".to_string()),
        );

        assert!(db.apply_transition(&entry).unwrap());
        assert_eq!(
            db.contract(&contract.id).unwrap().unwrap().status,
            ContractStatus::Approved
        );

        let logs = db.audit_logs(&contract.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].from_status, ContractStatus::Created);
        assert_eq!(logs[0].reason.as_deref(), Some("Looks good"));
    }

    #[test]
    fn stale_transition_writes_nothing() {
        let (mut db, _bp, contract) = seeded();
        let stale = AuditLogEntry::record(
            &contract.id,
            ContractStatus::Approved,
            ContractStatus::Sent,
            None,
        );

        assert!(!db.apply_transition(&stale).unwrap());
        assert_eq!(
            db.contract(&contract.id).unwrap().unwrap().status,
            ContractStatus::Created
        );
        assert!(db.audit_logs(&contract.id).unwrap().is_empty());
    }

    #[test]
    fn terminal_contract_is_not_deleted_or_written() {
        let (mut db, bp, contract) = seeded();
        let revoke = AuditLogEntry::record(
            &contract.id,
            ContractStatus::Created,
            ContractStatus::Revoked,
            None,
        );
        assert!(db.apply_transition(&revoke).unwrap());

        assert!(!db.delete_contract(&contract.id).unwrap());
        assert!(!db
            .upsert_values(&contract.id, [(&bp.fields[1].id, Some("x"))], Utc::now())
            .unwrap());
        assert_eq!(db.values_for(&contract.id).unwrap().len(), 1);
    }

    #[test]
    fn deleting_contract_cascades_values_but_keeps_audit() {
        let (mut db, _bp, contract) = seeded();
        let entry = AuditLogEntry::record(
            &contract.id,
            ContractStatus::Created,
            ContractStatus::Approved,
            None,
        );
        db.apply_transition(&entry).unwrap();

        assert!(db.delete_contract(&contract.id).unwrap());
        assert!(db.contract(&contract.id).unwrap().is_none());
        assert!(db.values_for(&contract.id).unwrap().is_empty());
        assert_eq!(db.audit_logs(&contract.id).unwrap().len(), 1);
    }

    #[test]
    fn blueprint_with_contracts_cannot_be_deleted() {
        let (mut db, bp, _contract) = seeded();

        assert_eq!(db.contract_count(&bp.id).unwrap(), 1);
        assert!(db.delete_blueprint(&bp.id).is_err());
        assert!(db.blueprint(&bp.id).unwrap().is_some());
    }

    #[test]
    fn replacing_fields_drops_old_identities() {
        let mut db = Database::open_in_memory().unwrap();
        let bp = make_blueprint(&[FieldSpec::new(FieldType::Text, "Old")]);
        db.insert_blueprint(&bp).unwrap();

        let replacement = vec![Field::from_spec(
            &bp.id,
            &FieldSpec::new(FieldType::Date, "New"),
            Utc::now(),
        )];
        assert!(db
            .update_blueprint(&bp.id, Some("Renamed"), None, Some(&replacement), Utc::now())
            .unwrap());

        let loaded = db.blueprint(&bp.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert_eq!(loaded.description.as_deref(), Some("Standard NDA"));
        assert_eq!(loaded.fields.len(), 1);
        assert_eq!(loaded.fields[0].id, replacement[0].id);
        assert_ne!(loaded.fields[0].id, bp.fields[0].id);
    }

    #[test]
    fn fields_of_a_used_blueprint_are_not_replaced() {
        let (mut db, bp, _contract) = seeded();

        let replacement = vec![Field::from_spec(
            &bp.id,
            &FieldSpec::new(FieldType::Text, "New"),
            Utc::now(),
        )];
        let written = db
            .update_blueprint(&bp.id, Some("Renamed"), None, Some(&replacement), Utc::now())
            .unwrap();
        assert!(!written);

        let loaded = db.blueprint(&bp.id).unwrap().unwrap();
        assert_eq!(loaded.name, "NDA");
        assert_eq!(loaded.fields, bp.fields);

        // Renaming alone is still allowed
        assert!(db
            .update_blueprint(&bp.id, Some("Renamed"), None, None, Utc::now())
            .unwrap());
        assert_eq!(db.blueprint(&bp.id).unwrap().unwrap().name, "Renamed");
    }

    #[test]
    fn deleting_unused_blueprint_removes_its_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let bp = make_blueprint(&[
            FieldSpec::new(FieldType::Text, "Company"),
            FieldSpec::new(FieldType::Signature, "Signature"),
        ]);
        db.insert_blueprint(&bp).unwrap();

        assert!(db.delete_blueprint(&bp.id).unwrap());

        let remaining: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM fields WHERE blueprint_id = ?1",
                params![bp.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(db.blueprint(&bp.id).unwrap().is_none());
    }

    #[test]
    fn list_contracts_filters() {
        let (mut db, bp, contract) = seeded();
        let other = Contract::new("Beta NDA", bp.id.clone());
        db.insert_contract(&other, &[]).unwrap();
        let entry = AuditLogEntry::record(
            &other.id,
            ContractStatus::Created,
            ContractStatus::Approved,
            None,
        );
        db.apply_transition(&entry).unwrap();

        let created = db
            .list_contracts(&ContractFilter {
                status: Some(ContractStatus::Created),
                blueprint_id: None,
            })
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, contract.id);

        let all = db
            .list_contracts(&ContractFilter {
                status: None,
                blueprint_id: Some(bp.id.clone()),
            })
            .unwrap();
        assert_eq!(all.len(), 2);

        let counts = db.status_counts().unwrap();
        assert_eq!(
            counts,
            vec![(ContractStatus::Created, 1), (ContractStatus::Approved, 1)]
        );
    }
}

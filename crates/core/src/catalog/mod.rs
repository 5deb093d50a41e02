pub mod schema;

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::*;
use crate::error::{Error, Result};

const RECORD_COLUMNS: &str =
    "id, name, birth_date, address, social_handle, contact_number, photo_reference";

/// SQLite-backed table of records. Holds no business rules: uniqueness of the
/// natural key is enforced by the schema, everything else by the caller.
///
/// Every method opens its own transaction scope and either commits it or lets
/// it roll back on drop, so no statement outlives the call that issued it.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let catalog = Self { conn };
        catalog.initialize()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn };
        catalog.initialize()?;
        Ok(catalog)
    }

    /// Ensure tables exist and the schema version is compatible. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        schema::initialize(&tx)?;
        schema::migrate(&tx)?;
        tx.commit()?;
        Ok(())
    }

    // ── Records ──────────────────────────────────────────────────────

    /// Id of the first record whose natural key matches exactly, if any.
    pub fn find(&self, key: &NaturalKey<'_>) -> Result<Option<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        let id = find_in(&tx, key)?;
        tx.commit()?;
        Ok(id)
    }

    /// Insert a new row and return its id.
    pub fn insert(&self, fields: &RecordFields, photo_reference: &str) -> Result<i64> {
        let key = fields.natural_key();
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT INTO records (name, birth_date, address, social_handle, contact_number, photo_reference)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.name,
                key.birth_date,
                key.address,
                key.social_handle,
                key.contact_number,
                photo_reference,
            ],
        );
        match inserted {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => {
                let existing_id = find_in(&tx, &key)?;
                Err(Error::DuplicateRecord { existing_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite every column of the row with the given id.
    pub fn update(&self, id: i64, fields: &RecordFields, photo_reference: &str) -> Result<()> {
        let key = fields.natural_key();
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE records
             SET name=?1, birth_date=?2, address=?3, social_handle=?4, contact_number=?5, photo_reference=?6
             WHERE id=?7",
            params![
                key.name,
                key.birth_date,
                key.address,
                key.social_handle,
                key.contact_number,
                photo_reference,
                id,
            ],
        );
        match updated {
            Ok(0) => Err(Error::RecordNotFound(id)),
            Ok(_) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                let existing_id = find_in(&tx, &key)?;
                Err(Error::DuplicateRecord { existing_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: i64) -> Result<Record> {
        let tx = self.conn.unchecked_transaction()?;
        let record = tx
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
                params![id],
                record_from_row,
            )
            .optional()?
            .ok_or(Error::RecordNotFound(id))?;
        tx.commit()?;
        Ok(record)
    }

    /// All records in ascending id (insertion) order.
    pub fn list(&self) -> Result<Vec<Record>> {
        let tx = self.conn.unchecked_transaction()?;
        let records = {
            let mut stmt = tx.prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id"))?;
            let rows = stmt
                .query_map([], record_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        tx.commit()?;
        Ok(records)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::RecordNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Config ───────────────────────────────────────────────────

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn find_in(conn: &Connection, key: &NaturalKey<'_>) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM records
             WHERE name=?1 AND birth_date=?2 AND address=?3 AND social_handle=?4 AND contact_number=?5
             ORDER BY id LIMIT 1",
            params![
                key.name,
                key.birth_date,
                key.address,
                key.social_handle,
                key.contact_number,
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        fields: RecordFields {
            name: row.get(1)?,
            birth_date: row.get(2)?,
            address: loaded_text(row.get(3)?),
            social_handle: loaded_text(row.get(4)?),
            contact_number: loaded_text(row.get(5)?),
        },
        photo_reference: row.get(6)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ana() -> RecordFields {
        RecordFields::new("Ana", NaiveDate::from_ymd_opt(1990, 5, 1).unwrap())
            .with_address("123 St")
            .with_social_handle("@ana")
            .with_contact_number("555-0100")
    }

    // ── Record tests ─────────────────────────────────────────────

    #[test]
    fn test_insert_and_get() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "k_ana.png").unwrap();
        assert!(id > 0);

        let record = catalog.get(id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.fields, ana());
        assert_eq!(record.photo_reference, "k_ana.png");
    }

    #[test]
    fn test_get_not_found() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog.get(99).unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(99)));
    }

    #[test]
    fn test_optional_fields_round_trip_as_none() {
        let catalog = Catalog::open_in_memory().unwrap();
        let fields = RecordFields::new("Bo", NaiveDate::from_ymd_opt(2000, 1, 2).unwrap());
        let id = catalog.insert(&fields, "k.png").unwrap();
        let record = catalog.get(id).unwrap();
        assert_eq!(record.fields.address, None);
        assert_eq!(record.fields.social_handle, None);
        assert_eq!(record.fields.contact_number, None);
    }

    #[test]
    fn test_find_exact_match_only() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "k.png").unwrap();

        assert_eq!(catalog.find(&ana().natural_key()).unwrap(), Some(id));

        let mut lower = ana();
        lower.name = "ana".to_string();
        assert_eq!(catalog.find(&lower.natural_key()).unwrap(), None);

        let mut spaced = ana();
        spaced.address = Some("123 St ".to_string());
        assert_eq!(catalog.find(&spaced.natural_key()).unwrap(), None);
    }

    #[test]
    fn test_insert_duplicate_rejected_by_constraint() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "a.png").unwrap();
        let err = catalog.insert(&ana(), "b.png").unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord { existing_id: Some(e) } if e == id));
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn test_list_ordered_by_id() {
        let catalog = Catalog::open_in_memory().unwrap();
        let a = catalog.insert(&ana(), "a.png").unwrap();
        let b = catalog
            .insert(&ana().with_contact_number("555-0101"), "b.png")
            .unwrap();
        let c = catalog
            .insert(&ana().with_contact_number("555-0102"), "c.png")
            .unwrap();

        let ids: Vec<i64> = catalog.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_list_rereads_current_state() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(catalog.list().unwrap().is_empty());
        catalog.insert(&ana(), "a.png").unwrap();
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_overwrites_fields() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "a.png").unwrap();
        let changed = ana().with_contact_number("555-0199");
        catalog.update(id, &changed, "b.png").unwrap();

        let record = catalog.get(id).unwrap();
        assert_eq!(record.fields, changed);
        assert_eq!(record.photo_reference, "b.png");
    }

    #[test]
    fn test_update_not_found() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog.update(5, &ana(), "a.png").unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(5)));
    }

    #[test]
    fn test_update_into_existing_key_rejected() {
        let catalog = Catalog::open_in_memory().unwrap();
        let first = catalog.insert(&ana(), "a.png").unwrap();
        let other = ana().with_contact_number("555-0101");
        let second = catalog.insert(&other, "b.png").unwrap();

        let err = catalog.update(second, &ana(), "b.png").unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord { existing_id: Some(e) } if e == first));
        assert_eq!(catalog.get(second).unwrap().fields, other);
    }

    #[test]
    fn test_delete() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "a.png").unwrap();
        catalog.delete(id).unwrap();
        assert_eq!(catalog.count().unwrap(), 0);
        assert!(matches!(catalog.delete(id).unwrap_err(), Error::RecordNotFound(_)));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let catalog = Catalog::open_in_memory().unwrap();
        let first = catalog.insert(&ana(), "a.png").unwrap();
        catalog.delete(first).unwrap();
        let second = catalog.insert(&ana(), "a.png").unwrap();
        assert!(second > first);
    }

    // ── Config tests ─────────────────────────────────────────────

    #[test]
    fn test_set_and_get_config() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.get_config("photo_dir").unwrap(), None);
        catalog.set_config("photo_dir", "/a").unwrap();
        catalog.set_config("photo_dir", "/b").unwrap();
        assert_eq!(catalog.get_config("photo_dir").unwrap(), Some("/b".to_string()));
    }

    // ── Schema version tracking ─────────────────────────────────

    #[test]
    fn test_schema_version_set_on_fresh_db() {
        let catalog = Catalog::open_in_memory().unwrap();
        let version = catalog.get_config("schema_version").unwrap();
        assert_eq!(version, Some("1".to_string()));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert(&ana(), "a.png").unwrap();
        catalog.initialize().unwrap();
        catalog.initialize().unwrap();

        let tables: i64 = catalog
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'records'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn test_reject_future_schema_version() {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('schema_version', '999')",
            [],
        )
        .unwrap();

        let err = schema::migrate(&conn).unwrap_err();
        assert!(matches!(err, Error::SchemaTooNew { db: 999, code: 1 }));
    }

    // ── Schema structure pinning ────────────────────────────────

    #[test]
    fn test_catalog_tables_exist() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut stmt = catalog
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(tables, vec!["config", "records"]);
    }

    #[test]
    fn test_records_columns() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut stmt = catalog
            .conn
            .prepare("SELECT name FROM pragma_table_info('records') ORDER BY cid")
            .unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            columns,
            vec![
                "id", "name", "birth_date", "address", "social_handle",
                "contact_number", "photo_reference",
            ]
        );
    }

    #[test]
    fn test_birth_date_stored_as_iso_string() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&ana(), "a.png").unwrap();
        let raw: String = catalog
            .conn
            .query_row("SELECT birth_date FROM records WHERE id = ?1", params![id], |r| r.get(0))
            .unwrap();
        assert_eq!(raw, "1990-05-01");
    }

    #[test]
    fn test_data_survives_close_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested/catalog.db");

        let id;
        {
            let catalog = Catalog::open(&db_path).unwrap();
            id = catalog.insert(&ana(), "a.png").unwrap();
            catalog.set_config("photo_dir", "/photos").unwrap();
        }
        {
            let catalog = Catalog::open(&db_path).unwrap();
            assert_eq!(catalog.get(id).unwrap().fields, ana());
            assert_eq!(catalog.get_config("photo_dir").unwrap(), Some("/photos".to_string()));
        }
    }
}

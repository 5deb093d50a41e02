use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            birth_date      DATE NOT NULL,
            address         TEXT NOT NULL DEFAULT '',
            social_handle   TEXT NOT NULL DEFAULT '',
            contact_number  TEXT NOT NULL DEFAULT '',
            photo_reference TEXT NOT NULL,
            UNIQUE (name, birth_date, address, social_handle, contact_number)
        );

        CREATE INDEX IF NOT EXISTS idx_records_photo ON records(photo_reference);

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Stamp the schema version, refusing catalogs written by a newer build.
pub fn migrate(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match stored.and_then(|v| v.parse::<u32>().ok()) {
        Some(db) if db > SCHEMA_VERSION => Err(Error::SchemaTooNew {
            db,
            code: SCHEMA_VERSION,
        }),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO config (key, value) VALUES ('schema_version', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
    }
}

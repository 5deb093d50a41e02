pub mod audit;
pub mod catalog;
pub mod domain;
pub mod duplicates;
pub mod error;
pub mod photo_store;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use audit::AuditReport;
use catalog::Catalog;
use domain::*;
use error::{Error, Result};
use photo_store::PhotoStore;

const PHOTO_DIR_KEY: &str = "photo_dir";

/// The record service: keeps the `records` table and the photo directory in
/// step. A live record always references an existing photo file; a failed
/// create or update never leaves a row pointing at nothing.
pub struct Roster {
    catalog: Catalog,
    photos: PhotoStore,
}

impl Roster {
    /// Build a service from an already opened catalog and photo store.
    pub fn new(catalog: Catalog, photos: PhotoStore) -> Self {
        Self { catalog, photos }
    }

    /// Open or create a roster at the given catalog path.
    ///
    /// The photo directory is `photo_dir` if given, else the one stored in the
    /// catalog config, else `photos/` next to the catalog file.
    pub fn open(catalog_path: &Path, photo_dir: Option<&Path>) -> Result<Self> {
        let catalog = Catalog::open(catalog_path)?;
        let dir = match photo_dir {
            Some(dir) => dir.to_path_buf(),
            None => match catalog.get_config(PHOTO_DIR_KEY)? {
                Some(stored) => PathBuf::from(stored),
                None => catalog_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join("photos"),
            },
        };
        let photos = PhotoStore::open(&dir)?;
        debug!(catalog = %catalog_path.display(), photos = %dir.display(), "roster opened");
        Ok(Self { catalog, photos })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    // ── Configuration ────────────────────────────────────────────

    /// Persist the photo directory used by later `open` calls.
    pub fn set_photo_dir(&self, path: &Path) -> Result<()> {
        let canonical = path
            .canonicalize()
            .map_err(|_| Error::PhotoDirNotFound(path.to_path_buf()))?;
        if !canonical.is_dir() {
            return Err(Error::PhotoDirNotFound(path.to_path_buf()));
        }
        self.catalog
            .set_config(PHOTO_DIR_KEY, &canonical.to_string_lossy())
    }

    pub fn get_photo_dir(&self) -> Result<Option<PathBuf>> {
        Ok(self.catalog.get_config(PHOTO_DIR_KEY)?.map(PathBuf::from))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub fn is_duplicate(&self, fields: &RecordFields) -> Result<bool> {
        duplicates::is_duplicate(&self.catalog, fields)
    }

    /// Store a new record and its photo.
    ///
    /// Rejected duplicates cause no side effects. If the row cannot be written
    /// after the photo was saved, the photo is removed again before the
    /// storage error is returned.
    pub fn create(&self, fields: RecordFields, photo: &PhotoUpload) -> Result<Record> {
        let fields = fields.normalized();
        fields.validate()?;
        photo.validate()?;

        if let Some(existing_id) = duplicates::find_duplicate(&self.catalog, &fields)? {
            debug!(existing_id, "duplicate submission rejected");
            return Err(Error::DuplicateRecord {
                existing_id: Some(existing_id),
            });
        }

        let key = self.photos.save(&photo.bytes, &photo.name)?;
        let id = match self.catalog.insert(&fields, &key) {
            Ok(id) => id,
            Err(e) => {
                self.discard_photo(&key, &e);
                return Err(e);
            }
        };

        info!(id, photo = %key, "record created");
        Ok(Record {
            id,
            fields,
            photo_reference: key,
        })
    }

    /// Replace every field of record `id`, and its photo if one is given.
    ///
    /// A new photo is saved before the row changes and the old file is removed
    /// only after the row points at the new one. Duplicate checking is a
    /// create-time policy; the storage constraint still rejects an update that
    /// collides with another record.
    pub fn update(
        &self,
        id: i64,
        fields: RecordFields,
        photo: Option<&PhotoUpload>,
    ) -> Result<Record> {
        let existing = self.catalog.get(id)?;
        self.replace(existing, fields, photo)
    }

    /// Apply a partial edit on top of the stored record.
    pub fn edit(&self, id: i64, patch: &RecordPatch, photo: Option<&PhotoUpload>) -> Result<Record> {
        let existing = self.catalog.get(id)?;
        let fields = patch.apply(&existing);
        self.replace(existing, fields, photo)
    }

    fn replace(
        &self,
        existing: Record,
        fields: RecordFields,
        photo: Option<&PhotoUpload>,
    ) -> Result<Record> {
        let id = existing.id;
        let fields = fields.normalized();
        fields.validate()?;

        let new_key = match photo {
            Some(upload) => {
                upload.validate()?;
                Some(self.photos.save(&upload.bytes, &upload.name)?)
            }
            None => None,
        };
        let reference = new_key
            .clone()
            .unwrap_or_else(|| existing.photo_reference.clone());

        if let Err(e) = self.catalog.update(id, &fields, &reference) {
            if let Some(key) = &new_key {
                self.discard_photo(key, &e);
            }
            return Err(e);
        }

        if new_key.is_some() {
            if let Err(e) = self.photos.delete(&existing.photo_reference) {
                warn!(
                    id,
                    photo = %existing.photo_reference,
                    error = %e,
                    "old photo could not be removed after update; file leaked"
                );
            }
        }

        info!(id, photo_changed = new_key.is_some(), "record updated");
        Ok(Record {
            id,
            fields,
            photo_reference: reference,
        })
    }

    /// Remove record `id` and then its photo.
    ///
    /// Once the row is gone the operation has succeeded; a photo that cannot
    /// be removed is reported as [`DeleteOutcome::PhotoLeaked`].
    pub fn delete(&self, id: i64) -> Result<DeleteOutcome> {
        let record = self.catalog.get(id)?;
        self.catalog.delete(id)?;

        match self.photos.delete(&record.photo_reference) {
            Ok(()) => {
                info!(id, "record deleted");
                Ok(DeleteOutcome::Removed(record))
            }
            Err(cause) => {
                warn!(
                    id,
                    photo = %record.photo_reference,
                    error = %cause,
                    "record deleted but its photo could not be removed"
                );
                Ok(DeleteOutcome::PhotoLeaked { record, cause })
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn get(&self, id: i64) -> Result<Record> {
        self.catalog.get(id)
    }

    /// All records in insertion order.
    pub fn list_all(&self) -> Result<Vec<Record>> {
        self.catalog.list()
    }

    pub fn count(&self) -> Result<usize> {
        self.catalog.count()
    }

    pub fn read_photo(&self, id: i64) -> Result<Vec<u8>> {
        let record = self.catalog.get(id)?;
        self.photos.read(&record.photo_reference)
    }

    pub fn photo_path(&self, id: i64) -> Result<PathBuf> {
        let record = self.catalog.get(id)?;
        self.photos.path(&record.photo_reference)
    }

    // ── Consistency ──────────────────────────────────────────────

    /// Report orphaned photo files and records with missing photos.
    pub fn audit(&self) -> Result<AuditReport> {
        let records = self.catalog.list()?;
        let keys = self.photos.list_keys()?;
        Ok(audit::compare(&records, &keys))
    }

    /// Delete photo files no record references. Returns the removed keys.
    pub fn prune_orphans(&self) -> Result<Vec<String>> {
        let report = self.audit()?;
        let mut removed = Vec::with_capacity(report.orphaned_photos.len());
        for key in report.orphaned_photos {
            self.photos.delete(&key)?;
            removed.push(key);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "orphaned photos pruned");
        }
        Ok(removed)
    }

    /// Compensating step: drop a photo saved for a write that then failed.
    fn discard_photo(&self, key: &str, cause: &Error) {
        match self.photos.delete(key) {
            Ok(()) => debug!(photo = %key, error = %cause, "rolled back saved photo"),
            Err(rollback) => warn!(
                photo = %key,
                error = %cause,
                rollback_error = %rollback,
                "could not roll back saved photo; file leaked"
            ),
        }
    }
}

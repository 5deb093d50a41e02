use std::collections::HashSet;

use crate::domain::Record;

/// Disagreements between the record table and the photo directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Photo files no record references.
    pub orphaned_photos: Vec<String>,
    /// Records whose referenced photo file is missing: (record id, key).
    pub missing_photos: Vec<(i64, String)>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_photos.is_empty() && self.missing_photos.is_empty()
    }
}

/// Compare records against the keys present in the photo store.
pub fn compare(records: &[Record], stored_keys: &[String]) -> AuditReport {
    let stored: HashSet<&str> = stored_keys.iter().map(String::as_str).collect();
    let referenced: HashSet<&str> = records.iter().map(|r| r.photo_reference.as_str()).collect();

    let orphaned_photos = stored_keys
        .iter()
        .filter(|k| !referenced.contains(k.as_str()))
        .cloned()
        .collect();

    let missing_photos = records
        .iter()
        .filter(|r| !stored.contains(r.photo_reference.as_str()))
        .map(|r| (r.id, r.photo_reference.clone()))
        .collect();

    AuditReport {
        orphaned_photos,
        missing_photos,
    }
}

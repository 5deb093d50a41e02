use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical on-disk form of a birth date (ISO 8601 calendar date).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The editable fields of a record. Everything except `id` and the photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub name: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub social_handle: Option<String>,
    pub contact_number: Option<String>,
}

impl RecordFields {
    pub fn new(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            birth_date,
            address: None,
            social_handle: None,
            contact_number: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_social_handle(mut self, handle: impl Into<String>) -> Self {
        self.social_handle = Some(handle.into());
        self
    }

    pub fn with_contact_number(mut self, number: impl Into<String>) -> Self {
        self.contact_number = Some(number.into());
        self
    }

    /// Collapse `Some("")` into `None` so the value equals what storage returns.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.address,
            &mut self.social_handle,
            &mut self.contact_number,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        self
    }

    /// Reject field sets that cannot be stored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRecord("name is required".to_string()));
        }
        Ok(())
    }

    /// The five columns used for duplicate detection, in their stored form.
    pub fn natural_key(&self) -> NaturalKey<'_> {
        NaturalKey {
            name: &self.name,
            birth_date: self.birth_date.format(DATE_FORMAT).to_string(),
            address: stored_text(&self.address),
            social_handle: stored_text(&self.social_handle),
            contact_number: stored_text(&self.contact_number),
        }
    }
}

/// (name, birth_date, address, social_handle, contact_number) exactly as the
/// `records` table holds them. Comparison is byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey<'a> {
    pub name: &'a str,
    pub birth_date: String,
    pub address: &'a str,
    pub social_handle: &'a str,
    pub contact_number: &'a str,
}

/// Absent optional text is stored as the empty string.
pub(crate) fn stored_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub(crate) fn loaded_text(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A persisted person entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    pub fields: RecordFields,
    pub photo_reference: String,
}

/// Partial edit of a record. `None` keeps the current value; an empty string
/// clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub social_handle: Option<String>,
    pub contact_number: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge onto the current fields of `record`.
    pub fn apply(&self, record: &Record) -> RecordFields {
        let current = &record.fields;
        RecordFields {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            birth_date: self.birth_date.unwrap_or(current.birth_date),
            address: merge(&self.address, &current.address),
            social_handle: merge(&self.social_handle, &current.social_handle),
            contact_number: merge(&self.contact_number, &current.contact_number),
        }
    }
}

fn merge(patch: &Option<String>, current: &Option<String>) -> Option<String> {
    match patch {
        Some(v) if v.is_empty() => None,
        Some(v) => Some(v.clone()),
        None => current.clone(),
    }
}

/// Photo formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoFormat {
    Jpeg,
    Png,
}

impl PhotoFormat {
    /// Detect format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        }
    }
}

impl fmt::Display for PhotoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded photo: raw bytes plus the client-side file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub name: String,
}

impl PhotoUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
        }
    }

    /// Load an upload from a local file, keeping its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { bytes, name })
    }

    /// Check the extension is an accepted type and the bytes agree with it.
    pub fn validate(&self) -> Result<PhotoFormat> {
        let by_name = PhotoFormat::from_file_name(&self.name)
            .ok_or_else(|| Error::UnsupportedFormat(self.name.clone()))?;

        let sniffed = image::guess_format(&self.bytes)
            .map_err(|_| Error::UnsupportedFormat(self.name.clone()))?;
        match PhotoFormat::from_image_format(sniffed) {
            Some(by_content) if by_content == by_name => Ok(by_name),
            _ => Err(Error::PhotoFormatMismatch {
                name: self.name.clone(),
                detected: format!("{sniffed:?}"),
            }),
        }
    }
}

/// Result of deleting a record.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// Row and photo file are both gone.
    Removed(Record),
    /// Row is gone but its photo file could not be removed.
    PhotoLeaked { record: Record, cause: Error },
}

impl DeleteOutcome {
    pub fn record(&self) -> &Record {
        match self {
            Self::Removed(record) | Self::PhotoLeaked { record, .. } => record,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record() -> Record {
        Record {
            id: 7,
            fields: RecordFields::new("Ana", date(1990, 5, 1))
                .with_address("123 St")
                .with_social_handle("@ana")
                .with_contact_number("555-0100"),
            photo_reference: "abc_ana.png".to_string(),
        }
    }

    // ── RecordFields ────────────────────────────────────────────

    #[test]
    fn test_natural_key_uses_canonical_date_and_empty_optionals() {
        let fields = RecordFields::new("Bo", date(2001, 2, 3));
        let key = fields.natural_key();
        assert_eq!(key.birth_date, "2001-02-03");
        assert_eq!(key.address, "");
        assert_eq!(key.social_handle, "");
        assert_eq!(key.contact_number, "");
    }

    #[test]
    fn test_normalized_collapses_empty_strings() {
        let fields = RecordFields::new("Bo", date(2001, 2, 3))
            .with_address("")
            .with_contact_number("1");
        let fields = fields.normalized();
        assert_eq!(fields.address, None);
        assert_eq!(fields.contact_number.as_deref(), Some("1"));
    }

    #[test]
    fn test_validate_requires_name() {
        assert!(RecordFields::new("  ", date(2000, 1, 1)).validate().is_err());
        assert!(RecordFields::new("Ana", date(2000, 1, 1)).validate().is_ok());
    }

    // ── RecordPatch ─────────────────────────────────────────────

    #[test]
    fn test_patch_contact_only() {
        let rec = record();
        let patch = RecordPatch {
            contact_number: Some("555-0199".to_string()),
            ..Default::default()
        };
        let merged = patch.apply(&rec);
        assert_eq!(merged.contact_number.as_deref(), Some("555-0199"));
        assert_eq!(merged.name, "Ana");
        assert_eq!(merged.address.as_deref(), Some("123 St"));
        assert_eq!(merged.birth_date, date(1990, 5, 1));
    }

    #[test]
    fn test_patch_empty_string_clears_optional() {
        let patch = RecordPatch {
            social_handle: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(patch.apply(&record()).social_handle, None);
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let rec = record();
        let patch = RecordPatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.apply(&rec), rec.fields);
    }

    // ── Photo formats ───────────────────────────────────────────

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(PhotoFormat::from_file_name("a.jpg"), Some(PhotoFormat::Jpeg));
        assert_eq!(PhotoFormat::from_file_name("a.JPEG"), Some(PhotoFormat::Jpeg));
        assert_eq!(PhotoFormat::from_file_name("a.Png"), Some(PhotoFormat::Png));
        assert_eq!(PhotoFormat::from_file_name("a.gif"), None);
        assert_eq!(PhotoFormat::from_file_name("noext"), None);
    }

    #[test]
    fn test_upload_validate_accepts_matching_content() {
        assert_eq!(PhotoUpload::new(PNG, "me.png").validate().unwrap(), PhotoFormat::Png);
        assert_eq!(PhotoUpload::new(JPEG, "me.jpg").validate().unwrap(), PhotoFormat::Jpeg);
    }

    #[test]
    fn test_upload_validate_rejects_mismatch() {
        let err = PhotoUpload::new(PNG, "me.jpg").validate().unwrap_err();
        assert!(matches!(err, Error::PhotoFormatMismatch { .. }));
    }

    #[test]
    fn test_upload_validate_rejects_unknown() {
        let err = PhotoUpload::new(b"plain text".to_vec(), "me.png").validate().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        let err = PhotoUpload::new(PNG, "me.bmp").validate().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}

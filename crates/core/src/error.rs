use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("a record with the same information already exists")]
    DuplicateRecord { existing_id: Option<i64> },

    #[error("record not found: {0}")]
    RecordNotFound(i64),

    #[error("photo not found: {0}")]
    PhotoNotFound(String),

    #[error("photo IO error on {key}: {source}")]
    PhotoIo {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid photo key: {0:?}")]
    InvalidPhotoKey(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unsupported photo format: {0} (expected .jpg, .jpeg or .png)")]
    UnsupportedFormat(String),

    #[error("photo content does not match its extension: {name} looks like {detected}")]
    PhotoFormatMismatch { name: String, detected: String },

    #[error("photo directory does not exist: {}", .0.display())]
    PhotoDirNotFound(PathBuf),

    #[error("catalog schema version {db} is newer than supported version {code}")]
    SchemaTooNew { db: u32, code: u32 },
}

impl Error {
    /// True for failures the operator can fix by entering different data.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateRecord { .. })
    }

    /// True when a record id or photo key does not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound(_) | Error::PhotoNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::DuplicateRecord { existing_id: Some(1) }.is_duplicate());
        assert!(Error::RecordNotFound(3).is_not_found());
        assert!(Error::PhotoNotFound("k".into()).is_not_found());
        assert!(!Error::InvalidRecord("x".into()).is_not_found());
    }

    #[test]
    fn test_display_mentions_id() {
        let err = Error::RecordNotFound(42);
        assert_eq!(err.to_string(), "record not found: 42");
    }
}

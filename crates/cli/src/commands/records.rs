use std::path::Path;

use anyhow::{Context, Result};
use roster_core::domain::{DeleteOutcome, PhotoUpload, RecordFields, RecordPatch};
use roster_core::error::Error;
use roster_core::Roster;

pub fn add(roster: &Roster, fields: RecordFields, photo: &Path) -> Result<()> {
    let upload = PhotoUpload::from_path(photo)
        .with_context(|| format!("reading photo {}", photo.display()))?;

    match roster.create(fields, &upload) {
        Ok(record) => println!("Saved record #{} ({}).", record.id, record.fields.name),
        Err(Error::DuplicateRecord { existing_id }) => match existing_id {
            Some(id) => println!("Warning: record #{id} already holds the same information."),
            None => println!("Warning: a record with the same information already exists."),
        },
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn edit(roster: &Roster, id: i64, patch: RecordPatch, photo: Option<&Path>) -> Result<()> {
    if patch.is_empty() && photo.is_none() {
        println!("Nothing to change.");
        return Ok(());
    }

    let upload = photo
        .map(|p| PhotoUpload::from_path(p).with_context(|| format!("reading photo {}", p.display())))
        .transpose()?;

    let record = roster.edit(id, &patch, upload.as_ref())?;
    println!("Updated record #{}.", record.id);
    Ok(())
}

pub fn rm(roster: &Roster, id: i64) -> Result<()> {
    match roster.delete(id)? {
        DeleteOutcome::Removed(record) => {
            println!("Deleted record #{} ({}).", record.id, record.fields.name)
        }
        DeleteOutcome::PhotoLeaked { record, cause } => {
            println!("Deleted record #{} ({}).", record.id, record.fields.name);
            println!(
                "Warning: photo {} was not removed: {cause}",
                record.photo_reference
            );
        }
    }
    Ok(())
}

pub fn export_photo(roster: &Roster, id: i64, out: &Path) -> Result<()> {
    let bytes = roster.read_photo(id)?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use roster_core::Roster;

pub fn set(roster: &Roster, path: PathBuf) -> Result<()> {
    roster.set_photo_dir(&path)?;
    if let Some(resolved) = roster.get_photo_dir()? {
        println!("Photo directory set to: {}", resolved.display());
        println!("Existing photos are not moved; copy them over before the next run.");
    }
    Ok(())
}

pub fn show(roster: &Roster) -> Result<()> {
    match roster.get_photo_dir()? {
        Some(path) => println!("Photo directory: {}", path.display()),
        None => println!(
            "No photo directory stored. Using {} (set one with `roster photos set <path>`).",
            roster.photos().root().display()
        ),
    }
    Ok(())
}

use anyhow::Result;
use roster_core::Roster;

pub fn run(roster: &Roster, prune: bool) -> Result<()> {
    let report = roster.audit()?;

    if report.is_consistent() {
        println!("All {} records have their photo; no stray files.", roster.count()?);
        return Ok(());
    }

    for (id, key) in &report.missing_photos {
        println!("  record #{id}: photo missing ({key})");
    }
    for key in &report.orphaned_photos {
        println!("  orphaned file: {key}");
    }

    if prune {
        let removed = roster.prune_orphans()?;
        println!("Removed {} orphaned file(s).", removed.len());
    } else if !report.orphaned_photos.is_empty() {
        println!(
            "{} orphaned file(s). Run `roster audit --prune` to delete them.",
            report.orphaned_photos.len()
        );
    }
    Ok(())
}

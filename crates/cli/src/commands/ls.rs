use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use roster_core::domain::{Record, DATE_FORMAT};
use roster_core::Roster;

pub fn run(roster: &Roster, json: bool) -> Result<()> {
    let records = roster.list_all()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records yet. Use `roster add` to create one.");
        return Ok(());
    }

    println!("{}", records_table(&records));
    println!();
    println!("  {} records", records.len());
    Ok(())
}

pub fn show(roster: &Roster, id: i64) -> Result<()> {
    let record = roster.get(id)?;
    let photo = roster.photo_path(id)?;

    println!("Record #{}", record.id);
    println!("{}", "-".repeat(60));
    for (label, value) in detail_lines(&record) {
        println!("  {label:<16} {value}");
    }
    let marker = if photo.is_file() { "" } else { " [MISSING]" };
    println!("  {:<16} {}{}", "Photo", photo.display(), marker);
    Ok(())
}

pub(crate) fn records_table(records: &[Record]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Birth Date"),
        Cell::new("Address"),
        Cell::new("Social"),
        Cell::new("Contact"),
        Cell::new("Photo"),
    ]);

    for record in records {
        let row: Vec<Cell> = std::iter::once(Cell::new(record.id))
            .chain(detail_lines(record).into_iter().map(|(_, v)| Cell::new(v)))
            .chain(std::iter::once(Cell::new(&record.photo_reference)))
            .collect();
        table.add_row(row);
    }
    table
}

fn detail_lines(record: &Record) -> Vec<(&'static str, String)> {
    let f = &record.fields;
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    vec![
        ("Name", f.name.clone()),
        ("Birth Date", f.birth_date.format(DATE_FORMAT).to_string()),
        ("Address", or_dash(&f.address)),
        ("Social", or_dash(&f.social_handle)),
        ("Contact", or_dash(&f.contact_number)),
    ]
}

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use roster_core::domain::{RecordFields, RecordPatch};
use roster_core::Roster;
use tracing_subscriber::EnvFilter;

/// Roster — people records with photos
#[derive(Parser)]
#[command(name = "roster", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, env = "ROSTER_CATALOG", default_value_t = default_catalog_path())]
    catalog: String,

    /// Directory holding photo files (overrides the stored setting)
    #[arg(long, env = "ROSTER_PHOTOS")]
    photos: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new record with its photo
    Add {
        #[command(flatten)]
        fields: NewFields,
        /// Photo file (.jpg, .jpeg or .png)
        #[arg(long)]
        photo: PathBuf,
    },
    /// List all records
    Ls {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record in detail
    Show { id: i64 },
    /// Change fields or the photo of a record
    Edit {
        id: i64,
        #[command(flatten)]
        patch: PatchFields,
        /// Replacement photo file
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Delete a record and its photo
    Rm { id: i64 },
    /// Copy a record's photo to a file
    Photo {
        id: i64,
        /// Destination file
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Check that records and photo files agree
    Audit {
        /// Delete photo files no record references
        #[arg(long)]
        prune: bool,
    },
    /// Manage the photo directory setting
    Photos {
        #[command(subcommand)]
        action: PhotosAction,
    },
}

#[derive(Args)]
struct NewFields {
    #[arg(long)]
    name: String,
    /// Birth date as YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    birth_date: NaiveDate,
    #[arg(long)]
    address: Option<String>,
    /// Social media handle
    #[arg(long)]
    social: Option<String>,
    /// Contact phone number
    #[arg(long)]
    contact: Option<String>,
}

impl From<NewFields> for RecordFields {
    fn from(f: NewFields) -> Self {
        RecordFields {
            name: f.name,
            birth_date: f.birth_date,
            address: f.address,
            social_handle: f.social,
            contact_number: f.contact,
        }
    }
}

/// Edited fields; an empty string clears an optional field.
#[derive(Args)]
struct PatchFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_date)]
    birth_date: Option<NaiveDate>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    social: Option<String>,
    #[arg(long)]
    contact: Option<String>,
}

impl From<PatchFields> for RecordPatch {
    fn from(f: PatchFields) -> Self {
        RecordPatch {
            name: f.name,
            birth_date: f.birth_date,
            address: f.address,
            social_handle: f.social,
            contact_number: f.contact,
        }
    }
}

#[derive(Subcommand)]
enum PhotosAction {
    /// Store the photo directory in the catalog
    Set {
        /// Path to an existing directory
        path: PathBuf,
    },
    /// Show the configured photo directory
    Show,
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, roster_core::domain::DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn default_catalog_path() -> String {
    dirs_path().to_string_lossy().to_string()
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".roster").join("catalog.db")
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog_path = PathBuf::from(&cli.catalog);
    let roster = Roster::open(&catalog_path, cli.photos.as_deref())?;

    match cli.command {
        Commands::Add { fields, photo } => commands::records::add(&roster, fields.into(), &photo)?,
        Commands::Ls { json } => commands::ls::run(&roster, json)?,
        Commands::Show { id } => commands::ls::show(&roster, id)?,
        Commands::Edit { id, patch, photo } => {
            commands::records::edit(&roster, id, patch.into(), photo.as_deref())?
        }
        Commands::Rm { id } => commands::records::rm(&roster, id)?,
        Commands::Photo { id, out } => commands::records::export_photo(&roster, id, &out)?,
        Commands::Audit { prune } => commands::audit::run(&roster, prune)?,
        Commands::Photos { action } => match action {
            PhotosAction::Set { path } => commands::photos::set(&roster, path)?,
            PhotosAction::Show => commands::photos::show(&roster)?,
        },
    }

    Ok(())
}

use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use folio::driver::{AutoDriver, DoctorReport};
use folio::error::{FolioError, Result};
use folio::model::{Envelope, Record};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays pipeable. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "folio=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn default_root() -> PathBuf {
    ProjectDirs::from("com", "folio", "folio")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.unwrap_or_else(default_root);
    let db = AutoDriver::open(&root)?;

    match cli.command {
        Commands::Put { collection, json } => handle_put(&db, &collection, &json),
        Commands::Get { collection, id } => handle_get(&db, &collection, &id),
        Commands::Update {
            collection,
            id,
            json,
        } => handle_update(&db, &collection, &id, &json),
        Commands::Rm { collection, id } => handle_rm(&db, &collection, id.as_deref()),
        Commands::List { collection } => handle_list(&db, &collection),
        Commands::Doctor => handle_doctor(&db),
    }
}

fn parse_payload(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(FolioError::InvalidPayload)
}

fn handle_put(db: &AutoDriver, collection: &str, json: &str) -> Result<()> {
    let payload = parse_payload(json)?;
    let id = db.write(collection, &payload)?;
    println!("{}", id);
    Ok(())
}

fn handle_get(db: &AutoDriver, collection: &str, id: &str) -> Result<()> {
    let envelope: Envelope<Value> = db.read(collection, id)?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn handle_update(db: &AutoDriver, collection: &str, id: &str, json: &str) -> Result<()> {
    let payload = parse_payload(json)?;
    let record = db.update(collection, id, &payload)?;
    print_record(&record);
    Ok(())
}

fn handle_rm(db: &AutoDriver, collection: &str, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            db.delete(collection, id)?;
            println!("{} {}/{}", "Deleted".green(), collection, id);
        }
        None => {
            db.delete_collection(collection)?;
            println!("{} collection {}", "Deleted".green(), collection);
        }
    }
    Ok(())
}

fn handle_list(db: &AutoDriver, collection: &str) -> Result<()> {
    let mut records: Vec<Envelope<Value>> = db.read_all_as(collection)?;
    records.sort_by(|a, b| sort_key(&a.record).cmp(&sort_key(&b.record)));
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Numeric ids first, in numeric order; anything else after, by name.
fn sort_key(record: &Record) -> (u64, &str) {
    (record.id.parse().unwrap_or(u64::MAX), record.id.as_str())
}

fn handle_doctor(db: &AutoDriver) -> Result<()> {
    let report = db.doctor()?;
    print_report(&report);
    Ok(())
}

fn print_record(record: &Record) {
    println!(
        "{} {}  created {}  updated {}",
        "Updated".green(),
        record.id.bold(),
        record.created_at.to_rfc3339().dimmed(),
        record.updated_at.to_rfc3339()
    );
}

fn print_report(report: &DoctorReport) {
    println!(
        "Removed {} leftover temp file(s)",
        report.removed_temp_files.to_string().bold()
    );
    if report.corrupt_records.is_empty() {
        println!("{}", "No corrupt records".green());
        return;
    }
    println!("{}", "Corrupt records:".yellow());
    for path in &report.corrupt_records {
        println!("  {}", path.display());
    }
}

//! Bikesales CLI - Assemble the bike sales order-line table
//!
//! # Main Commands
//!
//! ```bash
//! bikesales assemble --db sales.db -o orderlines.csv   # Build the flat table
//! bikesales serve                                       # Start HTTP server (port 3000)
//! ```
//!
//! # Store Commands
//!
//! ```bash
//! bikesales import --db sales.db --table bikes bikes.csv   # Load a CSV as a record set
//! bikesales tables --db sales.db                           # List record sets
//! bikesales validate orderlines.json                       # Check records against the schema
//! bikesales schema                                         # Show the output columns
//! ```
//!
//! `--db` falls back to `BIKESALES_DATABASE` (a `.env` file is read first).

use bikesales::{
    assemble, parse_csv_file_auto, save_table, validate_records, validation, write_table,
    AssemblerConfig, OutputFormat, RecordSource, RowPolicy, SourceSession, SqliteStore,
    StoreConfig, OUTPUT_COLUMNS,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bikesales")]
#[command(about = "Assemble bike sales order lines into one flat table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join order lines with products and shops into the 13-column table
    Assemble {
        /// Database path or sqlite:/// URL (default: $BIKESALES_DATABASE)
        #[arg(long)]
        db: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Drop rows with data-quality errors instead of aborting
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Load a CSV file into the store as a record set
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Database path or sqlite:/// URL (default: $BIKESALES_DATABASE)
        #[arg(long)]
        db: Option<String>,

        /// Record set name (default: file stem)
        #[arg(short, long)]
        table: Option<String>,

        /// Do not add the positional index column
        #[arg(long)]
        no_index: bool,
    },

    /// List record sets in the store
    Tables {
        /// Database path or sqlite:/// URL (default: $BIKESALES_DATABASE)
        #[arg(long)]
        db: Option<String>,
    },

    /// Validate JSON records against the assembled record schema
    Validate {
        /// Input JSON file (array of records)
        input: PathBuf,
    },

    /// Show the output columns
    Schema {
        /// Print the full JSON schema instead
        #[arg(long)]
        json: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database path or sqlite:/// URL (default: $BIKESALES_DATABASE)
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble {
            db,
            output,
            format,
            skip_invalid,
        } => cmd_assemble(db.as_deref(), output.as_deref(), format, skip_invalid),

        Commands::Import {
            input,
            db,
            table,
            no_index,
        } => cmd_import(&input, db.as_deref(), table.as_deref(), no_index),

        Commands::Tables { db } => cmd_tables(db.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Schema { json } => cmd_schema(json),

        Commands::Serve { port, db } => cmd_serve(port, db.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn store_config(db: Option<&str>) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let config = match db {
        Some(conn) => StoreConfig::from_connection_string(conn)?,
        None => StoreConfig::from_env()?,
    };
    Ok(config)
}

fn cmd_assemble(
    db: Option<&str>,
    output: Option<&Path>,
    format: OutputFormat,
    skip_invalid: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(store_config(db)?);
    let config = AssemblerConfig::from_env();
    let policy = if skip_invalid { RowPolicy::SkipAndLog } else { RowPolicy::Abort };

    let assembly = assemble(&store, &config)?;
    let total = assembly.len();
    let table = assembly.into_table(policy)?;

    eprintln!("\n📊 Results: {} of {} order lines assembled", table.len(), total);

    match output {
        Some(path) => {
            save_table(&table, format, path)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_table(&table, format, stdout.lock())?;
        }
    }

    Ok(())
}

fn cmd_import(
    input: &Path,
    db: Option<&str>,
    table: Option<&str>,
    no_index: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing CSV: {}", input.display());

    let result = parse_csv_file_auto(input, table)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.table.columns.join(", "));

    let store = SqliteStore::new(store_config(db)?);
    let index_column = AssemblerConfig::from_env().index_column;
    let index = if no_index { None } else { Some(index_column.as_str()) };
    let written = store.import_table(&result.table, index)?;

    eprintln!("✅ Wrote {} rows to '{}'", written, result.table.name);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_tables(db: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(store_config(db)?);
    let mut session = store.open()?;
    let tables = session.list_tables()?;
    session.close()?;

    if tables.is_empty() {
        eprintln!("📋 No record sets in {}", store.describe());
        return Ok(());
    }

    eprintln!("📋 Record sets in {} ({}):", store.describe(), tables.len());
    for name in tables {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let records: Vec<Value> = serde_json::from_str(&content)?;

    let invalid = validate_records(&records);
    for (i, errors) in invalid.iter().take(5) {
        eprintln!("\n❌ Record {} invalid:", i);
        for err in errors.iter().take(3) {
            eprintln!("   - {}", err);
        }
    }

    eprintln!(
        "\n📊 Results: {} valid, {} invalid",
        records.len() - invalid.len(),
        invalid.len()
    );

    if !invalid.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_schema(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, validation::assembled_record_schema())?;
        writeln!(stdout)?;
    } else {
        for column in OUTPUT_COLUMNS {
            writeln!(stdout, "{}", column)?;
        }
    }
    Ok(())
}

async fn cmd_serve(port: u16, db: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let state = bikesales::server::AppState {
        store: store_config(db)?,
        assembler: AssemblerConfig::from_env(),
    };
    bikesales::server::start_server(port, state).await?;
    Ok(())
}

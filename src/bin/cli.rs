//! textdb CLI
//!
//! Inspects table files without knowing their row types.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use textdb::storage::TableFile;
use tracing_subscriber::{fmt, EnvFilter};

/// textdb CLI
#[derive(Parser, Debug)]
#[command(name = "textdb-cli")]
#[command(about = "Inspect and verify textdb table files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the header and row statistics of a table file
    Inspect {
        /// Path to the .tbl file
        file: PathBuf,
    },

    /// Check header, checksum and ids; exits non-zero on any problem
    Verify {
        /// Path to the .tbl file
        file: PathBuf,
    },

    /// Print every row as tab-separated, unescaped fields
    Dump {
        /// Path to the .tbl file
        file: PathBuf,

        /// Print at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,textdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> textdb::Result<ExitCode> {
    match command {
        Commands::Inspect { file } => {
            let inspection = TableFile::at(&file).inspect()?;
            let header = &inspection.header;

            println!("file:            {}", file.display());
            println!("table:           {}", header.table);
            println!("format version:  {}", header.format_version);
            println!("schema version:  {}", header.schema_version);
            println!("next id:         {}", header.next_id);
            println!("declared rows:   {}", header.row_count);
            println!("actual rows:     {}", inspection.records.len());
            match inspection.stored_crc {
                Some(crc) => println!(
                    "checksum:        {:08x} ({})",
                    crc,
                    if crc == inspection.computed_crc { "ok" } else { "MISMATCH" }
                ),
                None => println!("checksum:        missing"),
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify { file } => {
            let inspection = TableFile::at(&file).inspect()?;
            let problems = inspection.problems();

            if problems.is_empty() {
                println!("{}: ok ({} rows)", file.display(), inspection.records.len());
                return Ok(ExitCode::SUCCESS);
            }

            for problem in &problems {
                println!("{}: {}", file.display(), problem);
            }
            tracing::warn!(problems = problems.len(), "verification failed");
            Ok(ExitCode::FAILURE)
        }

        Commands::Dump { file, limit } => {
            let inspection = TableFile::at(&file).inspect()?;
            let limit = limit.unwrap_or(usize::MAX);

            for record in inspection.records.iter().take(limit) {
                match record.fields() {
                    Ok(fields) => println!("{}", fields.join("\t")),
                    Err(e) => println!("# line {}: {}", record.line, e),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

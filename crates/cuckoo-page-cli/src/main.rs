//! `cuckoo-page` command-line entry point.
//!
//! A thin wrapper around the cuckoo-page library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Opens the page file and runs one operation on it

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cuckoo_page::{CuckooTable, InsertStatus, RemoveStatus, TableConfig, TableFile};
use std::path::{Path, PathBuf};

/// Inspect and edit file-backed cuckoo pages.
#[derive(Debug, Parser)]
#[command(name = "cuckoo-page", version, about)]
struct Cli {
    /// Displacement rounds an insert may perform before the page is full
    #[arg(
        long,
        global = true,
        env = "CUCKOO_PAGE_MAX_DISPLACEMENTS",
        default_value_t = cuckoo_page::config::DEFAULT_MAX_DISPLACEMENTS
    )]
    max_displacements: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new zeroed page file
    Init {
        /// Page file to create
        file: PathBuf,
    },
    /// Insert a key/value association
    Insert {
        /// Page file
        file: PathBuf,
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_number)]
        key: u64,
        /// Value (decimal or 0x-prefixed hex, 1 to 2^48-1)
        #[arg(value_parser = parse_number)]
        value: u64,
    },
    /// Print every value stored under a key
    Lookup {
        /// Page file
        file: PathBuf,
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_number)]
        key: u64,
    },
    /// Remove an exact key/value association
    Remove {
        /// Page file
        file: PathBuf,
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_number)]
        key: u64,
        /// Value (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_number)]
        value: u64,
    },
    /// Print occupancy statistics
    Stats {
        /// Page file
        file: PathBuf,
    },
    /// Split a page into two new page files around its median association
    Split {
        /// Page file to split (left unchanged)
        file: PathBuf,
        /// New page file for associations below the divider
        lower: PathBuf,
        /// New page file for the divider and everything above it
        upper: PathBuf,
    },
}

/// Parse a decimal or `0x`-prefixed hexadecimal `u64`.
fn parse_number(input: &str) -> Result<u64, String> {
    let trimmed = input.trim().replace('_', "");
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{input}': {e}"))
}

fn open(file: &Path) -> Result<TableFile> {
    TableFile::open(file).with_context(|| format!("failed to open page {}", file.display()))
}

fn run(cli: Cli) -> Result<()> {
    let config = TableConfig::new().with_max_displacements(cli.max_displacements);

    match cli.command {
        Command::Init { file } => {
            TableFile::create(&file)
                .with_context(|| format!("failed to create page {}", file.display()))?;
            println!("created {}", file.display());
        }
        Command::Insert { file, key, value } => {
            let mut page = open(&file)?;
            // A chain that ends full has already moved residents around, so
            // run it on a copy and only store the result when it succeeds.
            let mut words = page.to_buffer();
            let mut table = CuckooTable::with_config(&mut *words, config)?;
            match table.insert(key, value)? {
                InsertStatus::Inserted => {
                    drop(table);
                    page.write_buffer(&words)?;
                    page.flush()?;
                    println!("inserted {key:#018x} => {value:#x}");
                }
                InsertStatus::Full => bail!(
                    "page is full, {key:#018x} => {value:#x} was not inserted; \
                     split the page and insert it again"
                ),
            }
        }
        Command::Lookup { file, key } => {
            let mut page = open(&file)?;
            let values = page.table_with_config(config)?.lookup(key);
            if values.is_empty() {
                bail!("key {key:#018x} not found");
            }
            for value in values {
                println!("{value:#x}");
            }
        }
        Command::Remove { file, key, value } => {
            let mut page = open(&file)?;
            let status = page.table_with_config(config)?.remove(key, value)?;
            page.flush()?;
            match status {
                RemoveStatus::Removed => println!("removed {key:#018x} => {value:#x}"),
                RemoveStatus::NotFound => bail!("{key:#018x} => {value:#x} not found"),
            }
        }
        Command::Stats { file } => {
            let mut page = open(&file)?;
            let stats = page.table_with_config(config)?.stats();
            println!("file:           {}", file.display());
            println!("table1 entries: {}", stats.first_entries);
            println!("table2 entries: {}", stats.second_entries);
            println!("full buckets:   {}", stats.full_buckets);
            println!(
                "load factor:    {:.4} of {}",
                stats.load_factor(),
                cuckoo_page::TABLE_CAPACITY
            );
        }
        Command::Split { file, lower, upper } => {
            let mut source = open(&file)?;
            let mut lower_page = TableFile::create(&lower)
                .with_context(|| format!("failed to create page {}", lower.display()))?;
            let mut upper_page = TableFile::create(&upper)
                .with_context(|| format!("failed to create page {}", upper.display()))?;

            let divider = {
                let table = source.table_with_config(config)?;
                let mut lower_table = lower_page.table_with_config(config)?;
                let mut upper_table = upper_page.table_with_config(config)?;
                table.split(&mut lower_table, &mut upper_table)?
            };
            lower_page.flush()?;
            upper_page.flush()?;

            tracing::info!(
                "Split {} into {} and {}",
                file.display(),
                lower.display(),
                upper.display()
            );
            println!("divider {:#018x} => {:#x}", divider.key, divider.value);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

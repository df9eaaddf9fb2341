use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use secram::config::DEFAULT_RECORDS_PER_CONTAINER;
use secram::render::{format_record, write_header};
use secram::{convert_bam, QueryEngine, RecordIter, SecramConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "secram", about = "Encrypted columnar pileup storage for aligned reads")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a coordinate-sorted BAM file into SECRAM.
    Convert {
        /// Input BAM file.
        input: PathBuf,
        /// Reference FASTA matching the BAM header.
        reference: PathBuf,
        /// Output SECRAM file; the index is written to `<output>.secrai`.
        output: PathBuf,
        /// File holding the master key.
        #[arg(long)]
        key_file: PathBuf,
        /// Records per indexed container.
        #[arg(long, default_value_t = DEFAULT_RECORDS_PER_CONTAINER)]
        records_per_container: usize,
        /// Accept unsorted input instead of rejecting out-of-order reads.
        #[arg(long)]
        no_order_check: bool,
    },
    /// Print the records of a region (`name`, or `name:start-end`, 0-based inclusive).
    Query {
        /// SECRAM file.
        file: PathBuf,
        /// Region to print.
        region: String,
        /// File holding the master key.
        #[arg(long)]
        key_file: PathBuf,
    },
    /// Print every record.
    View {
        /// SECRAM file.
        file: PathBuf,
        /// File holding the master key.
        #[arg(long)]
        key_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            reference,
            output,
            key_file,
            records_per_container,
            no_order_check,
        } => {
            let key = read_key(&key_file)?;
            let config = SecramConfig::default()
                .with_records_per_container(records_per_container)
                .with_order_check(!no_order_check);
            convert_bam(&input, &reference, &output, &key, &config)?;
        }
        Commands::Query {
            file,
            region,
            key_file,
        } => run_query(&file, &region, &key_file)?,
        Commands::View { file, key_file } => {
            let key = read_key(&key_file)?;
            let mut engine = open_engine(&file, &key)?;
            let references = engine.header().references.clone();
            print_records(&references, engine.scan()?)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_query(file: &Path, region: &str, key_file: &Path) -> Result<()> {
    let key = read_key(key_file)?;
    let mut engine = open_engine(file, &key)?;
    let references = engine.header().references.clone();
    let (name, bounds) = parse_region(region)?;
    let (start, end) = match bounds {
        Some(bounds) => bounds,
        None => {
            let id = references
                .id_of(&name)
                .with_context(|| format!("reference '{name}' is not in {}", file.display()))?;
            let length = references.get(id).map_or(0, |entry| entry.length);
            let last = length.saturating_sub(1);
            (0, u32::try_from(last).unwrap_or(u32::MAX))
        }
    };
    let records = engine
        .query(&name, start, end)
        .with_context(|| format!("query {region} failed"))?;
    print_records(&references, records)
}

fn open_engine(file: &Path, key: &[u8]) -> Result<QueryEngine<io::BufReader<fs::File>>> {
    QueryEngine::open_path(file, key).with_context(|| format!("failed to open {}", file.display()))
}

fn print_records<R: io::Read + io::Seek>(
    references: &secram::genomics::ReferenceDictionary,
    records: RecordIter<'_, R>,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_header(&mut out)?;
    for record in records {
        let record = record.context("failed to read record")?;
        out.write_all(format_record(references, &record).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Split `name` or `name:start-end`; names may themselves contain colons.
///
/// A suffix without a dash belongs to the name. One with a dash must be a
/// valid range.
fn parse_region(region: &str) -> Result<(String, Option<(u32, u32)>)> {
    let Some((name, range)) = region.rsplit_once(':') else {
        return Ok((region.to_string(), None));
    };
    let Some((start, end)) = range.split_once('-') else {
        return Ok((region.to_string(), None));
    };
    if name.is_empty() {
        bail!("region {region} has no reference name");
    }
    let parse = |bound: &str, which: &str| {
        bound
            .replace(',', "")
            .parse::<u32>()
            .with_context(|| format!("region {region} has an invalid {which} '{bound}'"))
    };
    let (start, end) = (parse(start, "start")?, parse(end, "end")?);
    if start > end {
        bail!("region {region} ends before it starts");
    }
    Ok((name.to_string(), Some((start, end))))
}

fn read_key(path: &Path) -> Result<Vec<u8>> {
    let mut key = fs::read(path).with_context(|| format!("failed to read key {}", path.display()))?;
    while key.last().is_some_and(|b| b.is_ascii_whitespace()) {
        key.pop();
    }
    if key.is_empty() {
        bail!("key file {} is empty", path.display());
    }
    Ok(key)
}

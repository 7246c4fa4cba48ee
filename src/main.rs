use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use exo_payload::data::loader::CatalogFormat;
use exo_payload::table::ColumnData;
use exo_payload::tasks::{LoadTargetList, MergeChannelsOutput, PreparePayload, Task};

#[derive(Parser)]
#[command(name = "exo-payload")]
#[command(about = "Build or reload a payload and inspect a target catalog")]
struct Cli {
    /// Payload description (.xml) or stored run (*.h5)
    #[arg(short, long)]
    payload: PathBuf,

    /// Store file for the built channels
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target catalog (.csv or .xlsx)
    #[arg(short, long)]
    targets: Option<PathBuf>,

    /// Read the catalog with the star-only spreadsheet layout
    #[arg(long, requires = "targets")]
    legacy: bool,

    /// Print the targets whose star or planet name matches
    #[arg(short, long, requires = "targets")]
    search: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let prepared = PreparePayload {
        payload_file: &cli.payload,
        output: cli.output.as_deref(),
    }
    .run()
    .with_context(|| format!("preparing payload {}", cli.payload.display()))?;

    let (wl_min, wl_max) = &prepared.wl_range;
    println!("wavelength range: {wl_min} – {wl_max}");

    let table = MergeChannelsOutput {
        channels: &prepared.channels,
    }
    .run()
    .context("merging channel tables")?;

    for ch in prepared.channels.iter() {
        let rows = ch.table.as_ref().map_or(0, |t| t.row_count());
        println!("{:<16} {:<12} {rows:>5} rows", ch.name(), ch.kind().to_string());
    }
    if let Some(col) = table.column("Wavelength") {
        if let ColumnData::Float(wl) = &col.data {
            let lo = wl.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = wl.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            println!("merged table: {} rows, {lo:.3}–{hi:.3} um", table.row_count());
        }
    }

    if let Some(path) = &cli.targets {
        let format = cli.legacy.then_some(CatalogFormat::LegacySpreadsheet);
        let targets = LoadTargetList {
            target_list: path,
            format,
        }
        .run()
        .with_context(|| format!("loading target list {}", path.display()))?;
        println!("{} targets", targets.len());

        if let Some(query) = &cli.search {
            for t in targets.search_target(query) {
                println!("  [{}] {}", t.id, t.name);
            }
        }
    }

    Ok(())
}

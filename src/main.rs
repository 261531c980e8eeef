use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use replay_traces::data::filter::{
    map_counts, select_map, select_tick_rows, sort_by_tick_count, top_k_players, trace,
};
use replay_traces::data::writer::preview_sequences;
use replay_traces::{
    collate_plan_par, load_columnar, load_packed, BatchPlan, ColumnarFormat, LoaderConfig,
    MetadataTable, SequenceDataset, SequenceStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Columnar,
    Packed,
}

#[derive(Parser, Debug)]
#[command(about = "Inspect recorded per-tick gameplay traces")]
struct Cli {
    /// Data directory holding sequences.<ext> and ticks.<ext> (or the packed file)
    #[arg(default_value = "data/out")]
    directory: PathBuf,

    /// Storage backend to read
    #[arg(short, long, value_enum, default_value_t = Backend::Columnar)]
    backend: Backend,

    /// JSON loader config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read .parquet tables instead of .arrow
    #[arg(long)]
    parquet: bool,

    /// List the sequences recorded on this map
    #[arg(short, long)]
    map: Option<String>,

    /// How many maps / players / sequences to list
    #[arg(short, long, default_value_t = 15)]
    top: usize,

    /// Print the first N rows of the sequence table
    #[arg(long)]
    head: Option<usize>,

    /// Collate the store into shuffled batches of this size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Shuffle seed for --batch-size
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if cli.parquet {
        config.format = ColumnarFormat::Parquet;
    }

    let store = match cli.backend {
        Backend::Columnar => {
            let tables = load_columnar(&cli.directory, &config)
                .with_context(|| format!("loading tables from {}", cli.directory.display()))?;
            report_metadata(&tables.sequences, cli.top);

            if let Some(map) = &cli.map {
                let on_map = select_map(&tables.sequences, map);
                let ids = on_map.sequence_ids();
                let rows = select_tick_rows(&tables.ticks, &ids);
                println!("\n{} sequences / {} ticks on {map}:", ids.len(), rows.len());
                for row in sort_by_tick_count(&on_map).iter().take(cli.top) {
                    let path = trace(&rows, row.sequence_id);
                    println!(
                        "  id={:<8} player={:<20} ticks={:<6} start={:?} end={:?}",
                        row.sequence_id,
                        row.player_name,
                        row.tick_count,
                        path.first(),
                        path.last()
                    );
                }
            }

            tables.to_store(&config)?
        }
        Backend::Packed => {
            let file = if cli.directory.is_file() {
                cli.directory.clone()
            } else {
                cli.directory.join(&config.packed_file_name)
            };
            let store = load_packed(&file, &config)
                .with_context(|| format!("loading packed sequences from {}", file.display()))?;
            report_metadata(&store.metadata(), cli.top);
            store
        }
    };

    if let Some(rows) = cli.head {
        println!("\n{}", preview_sequences(&store, rows)?);
    }

    println!("\nN={} sequences, maximum sequence length: {}", store.len(), store.max_length());

    if let Some(batch_size) = cli.batch_size {
        report_batches(&store, batch_size, cli.seed)?;
    }
    Ok(())
}

fn report_metadata(table: &MetadataTable, top: usize) {
    println!("sequences per map:");
    for (map, count) in map_counts(table).into_iter().take(top) {
        println!("  {map:<48} {count}");
    }

    println!("\nplayers by recorded ticks:");
    for (player, ticks) in top_k_players(table, top, true) {
        println!("  {player:<24} {ticks}");
    }

    println!("\nlongest sequences:");
    for row in sort_by_tick_count(table).iter().take(5) {
        println!(
            "  id={:<8} map={:<32} player={:<20} ticks={}",
            row.sequence_id, row.map_name, row.player_name, row.tick_count
        );
    }
}

fn report_batches(store: &SequenceStore, batch_size: usize, seed: u64) -> Result<()> {
    let plan = BatchPlan::shuffled(store.len(), batch_size, seed);
    let batches = collate_plan_par(store, &plan, store.max_length()).context("collating batches")?;
    info!("collated {} batches", batches.len());

    if let Some(first) = batches.first() {
        println!(
            "{} batches, first batch shape {:?}, players {:?}",
            batches.len(),
            first.ticks.shape(),
            first.player_names
        );
    }
    Ok(())
}

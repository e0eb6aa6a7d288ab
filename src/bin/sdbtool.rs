//! Store exercise and inspection tool
//!
//! Opens (or creates) a store, optionally appends random samples, and
//! prints the aggregates, records, and moving averages.

use chrono::DateTime;
use clap::Parser;
use rand::Rng;
use seriesdb::{Store, Value, WindowCache};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sdbtool")]
#[command(about = "Exercise and inspect seriesdb store files")]
struct Args {
    /// Path to the store file
    #[arg(short = 'p', long)]
    path: PathBuf,

    /// Store name recorded in the header (10 bytes max)
    #[arg(short = 'n', long)]
    name: String,

    /// Append this many random samples in [-1, 1] before inspecting
    #[arg(short = 'a', long, default_value = "0")]
    append: u32,

    /// Dump every record, not just the summary
    #[arg(short = 'd', long)]
    dump: bool,

    /// Print a moving average over this window for every index
    #[arg(short = 'w', long)]
    window: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut store = Store::open(&args.path, &args.name)?;

    if args.append > 0 {
        let mut rng = rand::thread_rng();
        for _ in 0..args.append {
            let sample: Value = rng.gen_range(-1.0..=1.0);
            store.append(sample)?;
        }
        info!(count = args.append, "appended random samples");
    }

    println!("{}", serde_json::to_string_pretty(&store.summary())?);
    println!("variance: {}", store.variance());
    println!("stddev:   {}", store.stddev());
    println!("median:   {}", store.median());

    if args.dump {
        for index in 0..store.count() {
            if let Some(record) = store.record(index)? {
                let stamp = DateTime::from_timestamp(record.timestamp as i64, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| record.timestamp.to_string());
                println!(
                    "[{index}] {stamp} value={} sum={}",
                    record.value, record.running_sum
                );
            }
        }
    }

    if let Some(window) = args.window {
        let mut cache = WindowCache::new();
        for index in 0..store.count() {
            let sma = cache.moving_average(&mut store, index, window);
            println!("[{index}] sma({window}) = {sma}");
        }
    }

    store.close()?;
    Ok(())
}

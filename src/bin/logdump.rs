//! FlatDB Log Dump
//!
//! Offline inspection of a write-ahead log left behind by a store.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use flatdb::wal::{FrameLayout, LogReader, RecordType};
use tracing_subscriber::{fmt, EnvFilter};

/// FlatDB log inspector
#[derive(Parser, Debug)]
#[command(name = "flatdb-logdump")]
#[command(about = "Inspect FlatDB write-ahead log files")]
#[command(version)]
struct Args {
    /// Log file to read
    #[arg(short, long)]
    log: PathBuf,

    /// Frame layout the log was written with
    #[arg(short = 'f', long, value_enum, default_value_t = Layout::PosU32ValU64)]
    layout: Layout,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layout {
    /// 4-byte position, 8-byte value
    PosU32ValU64,
    /// 8-byte position, 4-byte value
    PosU64ValU32,
}

impl From<Layout> for FrameLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::PosU32ValU64 => FrameLayout::PosU32ValU64,
            Layout::PosU64ValU32 => FrameLayout::PosU64ValU32,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every frame
    Frames,

    /// Print batch structure and what a replay would do
    Summary,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatdb=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let reader = match LogReader::open(&args.log, args.layout.into()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", args.log.display(), e);
            std::process::exit(1);
        }
    };

    match args.command {
        Commands::Frames => dump_frames(reader),
        Commands::Summary => summarize(reader),
    }
}

fn dump_frames(reader: LogReader) {
    for (n, frame) in reader.enumerate() {
        match frame {
            Ok(record) => println!(
                "{:>8}  {:<5}  pos={:<12} value={}",
                n,
                format!("{:?}", record.record_type),
                record.position,
                record.value
            ),
            Err(e) => {
                println!("{:>8}  error: {}", n, e);
                break;
            }
        }
    }
}

fn summarize(reader: LogReader) {
    let mut committed = 0u64;
    let mut committed_entries = 0u64;
    let mut open_entries: Option<u64> = None;
    let mut problem: Option<String> = None;

    for frame in reader {
        let record = match frame {
            Ok(record) => record,
            Err(e) => {
                problem = Some(e.to_string());
                break;
            }
        };
        match (record.record_type, open_entries) {
            (RecordType::Begin, None) => open_entries = Some(0),
            (RecordType::Entry, Some(n)) => open_entries = Some(n + 1),
            (RecordType::End, Some(n)) => {
                committed += 1;
                committed_entries += n;
                open_entries = None;
            }
            (kind, _) => {
                problem = Some(format!("{:?} frame out of sequence", kind));
                break;
            }
        }
    }

    println!("committed batches: {}", committed);
    println!("committed entries: {}", committed_entries);
    if let Some(n) = open_entries {
        println!("uncommitted batch: {} entries (discarded on replay)", n);
    }
    if let Some(p) = problem {
        println!("replay stops at: {}", p);
    }
}

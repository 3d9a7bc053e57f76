use clap::Parser;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, error, info};

mod process;
mod record;
mod stats;

#[derive(Parser, Debug)]
#[command(name = "vlan-reader")]
#[command(about = "Decode VLAN tags from captured skb snapshots or pcap frames", long_about = None)]
struct Args {
    /// JSON-lines file of captured descriptor snapshots
    #[arg(short, long, value_name = "FILE", conflicts_with = "pcap")]
    snapshots: Option<PathBuf>,

    /// pcap/pcapng file to scan for inline 802.1Q tags
    #[arg(short, long, value_name = "FILE")]
    pcap: Option<PathBuf>,

    /// print each decoded event
    #[arg(short, long)]
    dump_events: bool,

    /// print statistics at the end
    #[arg(long)]
    stats: bool,
}

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let stats = stats::Stats::default();

    let result = if let Some(path) = &args.snapshots {
        info!("Replaying descriptor snapshots: {:?}", path);
        replay_snapshots(path, &args, &stats)
    } else if let Some(path) = &args.pcap {
        info!("Reading PCAP file: {:?}", path);
        scan_pcap(path, &args, &stats)
    } else {
        Err("one of --snapshots or --pcap is required".to_string())
    };

    if let Err(e) = result {
        error!("Failed to process input: {}", e);
        std::process::exit(1);
    }
    if args.stats {
        println!("{stats}");
    }
    info!("Processing completed!");
}

/// Replay a JSON-lines descriptor capture record by record.
fn replay_snapshots(path: &PathBuf, args: &Args, stats: &stats::Stats) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("Cannot open {:?}: {}", path, e))?;
    let reader = BufReader::new(file);

    let mut local_stats = stats::LocalStats::new();
    let mut count = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Read error at line {}: {}", lineno + 1, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<record::SnapshotRecord>(&line) {
            Ok(rec) => {
                count += 1;
                process::process_snapshot(count, &rec, &mut local_stats, stats, args.dump_events);
            }
            Err(e) => {
                // Malformed capture lines are counted, not fatal.
                debug!("Skipping malformed record at line {}: {}", lineno + 1, e);
                local_stats.malformed += 1;
            }
        }
    }

    // Final flush of local stats
    local_stats.flush(stats);

    info!("Total records processed: {}", count);
    Ok(())
}

/// Scan a capture file for inline 802.1Q tags, frame by frame.
fn scan_pcap(path: &PathBuf, args: &Args, stats: &stats::Stats) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("Cannot open {:?}: {}", path, e))?;

    let mut local_stats = stats::LocalStats::new();
    let mut count = 0;

    // Try to create a PCAPNG reader first
    match PcapNGReader::new(65536, file) {
        Ok(mut reader) => {
            info!("Detected PCAPNG format");
            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                                count += 1;
                                process::process_frame(
                                    count,
                                    epb.data,
                                    &mut local_stats,
                                    stats,
                                    args.dump_events,
                                );
                            }
                            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                                count += 1;
                                process::process_frame(
                                    count,
                                    spb.data,
                                    &mut local_stats,
                                    stats,
                                    args.dump_events,
                                );
                            }
                            _ => {
                                // Section headers, interface descriptions, etc.
                            }
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Refill failed: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAPNG: {:?}", e));
                    }
                }
            }
        }
        Err(_) => {
            let file = File::open(path).map_err(|e| format!("Cannot open {:?}: {}", path, e))?;

            // Try legacy PCAP format
            let mut reader = LegacyPcapReader::new(65536, file)
                .map_err(|e| format!("Failed to create PCAP reader: {:?}", e))?;

            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        if let PcapBlockOwned::Legacy(packet) = block {
                            count += 1;
                            process::process_frame(
                                count,
                                packet.data,
                                &mut local_stats,
                                stats,
                                args.dump_events,
                            );
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Refill failed: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAP: {:?}", e));
                    }
                }
            }
        }
    }

    // Final flush of local stats
    local_stats.flush(stats);

    info!("Total frames processed: {}", count);
    Ok(())
}

//! Keyboard RTC Sync CLI
//!
//! Writes the current (or overridden) date/time to the onboard clock of a
//! HID keyboard by sending a 32-byte clock-set command to its vendor
//! interface.
//!
//! Usage:
//!   kbclock                          # Sync to the host clock
//!   kbclock -d 2025-05-20 -t 18:30:00
//!   kbclock list                     # Show matching HID interfaces

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::info;

use kbclock::{ClockSync, HidapiBackend, SyncConfig, TargetTime};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keyboard onboard clock synchronization
#[derive(Parser)]
#[command(name = "kbclock", version = VERSION, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the date (YYYY-MM-DD); defaults to today
    #[arg(short, long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Override the time (HH:MM:SS); defaults to the current time
    #[arg(short, long, value_parser = parse_time)]
    time: Option<NaiveTime>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List HID interfaces matching the keyboard's VID/PID
    List,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| "expected YYYY-MM-DD".to_string())
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| "expected HH:MM:SS".to_string())
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = SyncConfig::default();
    let sync = ClockSync::new(HidapiBackend::new()?, config);

    match cli.command {
        Some(Commands::List) => do_list(&sync),
        None => do_sync(&sync, cli.date, cli.time),
    }
}

fn do_sync(
    sync: &ClockSync<HidapiBackend>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
) -> Result<()> {
    let now = Local::now().naive_local();
    let target = NaiveDateTime::new(
        date.unwrap_or_else(|| now.date()),
        time.unwrap_or_else(|| now.time()),
    );

    info!("Syncing keyboard clock to {}", target.format("%Y-%m-%d %H:%M:%S"));
    sync.sync(&TargetTime::from(target))?;
    info!("Clock synchronized");

    Ok(())
}

fn do_list(sync: &ClockSync<HidapiBackend>) -> Result<()> {
    let candidates = sync.candidates()?;

    if candidates.is_empty() {
        println!("No matching HID interfaces found.");
        return Ok(());
    }

    println!("Found {} matching interface(s):", candidates.len());
    for device in &candidates {
        let iface = device
            .interface_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into());
        let marker = if sync.is_target_interface(device) {
            " <- target"
        } else {
            ""
        };
        println!(
            "  VID:PID {:04X}:{:04X} iface={} path={}{}",
            device.vendor_id,
            device.product_id,
            iface,
            device.path_string(),
            marker
        );
    }

    Ok(())
}

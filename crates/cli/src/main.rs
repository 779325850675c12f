//! SDRAM controller model CLI.
//!
//! This binary provides a single entry point for the controller model. It performs:
//! 1. **Run:** Drive controller and device model with generated traffic, optionally
//!    printing a per-cycle JSON trace, then print statistics.
//! 2. **Check:** Run the built-in property checks, selected by dotted name prefix.

use std::io::{self, BufWriter, Write};
use std::{fs, process};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sdrctl_core::config::Config;
use sdrctl_core::sim::{Simulator, TraceEntry, TrafficGenerator};
use sdrctl_core::verify;

#[derive(Parser, Debug)]
#[command(
    name = "sdrctl",
    author,
    version,
    about = "Cycle-accurate SDR SDRAM controller model",
    long_about = "Simulate the controller against a behavioral SDRAM model, or run the built-in checks.\n\nLog verbosity follows RUST_LOG (default: info).\n\nExamples:\n  sdrctl run --requests 2000 --write-ratio 0.3\n  sdrctl run --config part.json --trace > trace.jsonl\n  sdrctl check refresh\n  sdrctl check --list"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run generated traffic through the controller and the device model.
    Run {
        /// JSON configuration file; built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<String>,

        /// Cycle budget for draining all requests.
        #[arg(long, default_value_t = 10_000_000)]
        cycles: u64,

        /// Number of transactions to generate.
        #[arg(short, long, default_value_t = 1_000)]
        requests: usize,

        /// Traffic generator seed.
        #[arg(short, long, default_value_t = 1)]
        seed: u64,

        /// Fraction of generated transactions that are writes.
        #[arg(short, long, default_value_t = 0.5)]
        write_ratio: f64,

        /// Print one JSON object per cycle to stdout.
        #[arg(long)]
        trace: bool,

        /// Statistics sections to print (summary, commands, refresh, traffic).
        #[arg(long = "stats", value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Run built-in checks; all of them when no name is given.
    Check {
        /// Check names or dotted prefixes (e.g. `refresh`, `controller.init`).
        names: Vec<String>,

        /// List the available checks and exit.
        #[arg(short, long)]
        list: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Run {
            config,
            cycles,
            requests,
            seed,
            write_ratio,
            trace,
            stats,
        } => cmd_run(config.as_deref(), cycles, requests, seed, write_ratio, trace, &stats),
        Commands::Check { names, list } => cmd_check(&names, list),
    };
    process::exit(code);
}

fn load_config(path: Option<&str>) -> Result<Config, String> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    Config::from_json(&text).map_err(|e| format!("{path}: {e}"))
}

/// Runs generated traffic until the queue drains; returns the process exit code.
fn cmd_run(
    config_path: Option<&str>,
    cycles: u64,
    requests: usize,
    seed: u64,
    write_ratio: f64,
    trace: bool,
    sections: &[String],
) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let mut sim = match Simulator::new(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid configuration: {e}");
            return 1;
        }
    };
    let params = *sim.controller().params();
    let traffic = TrafficGenerator::new(
        seed,
        params.layout,
        config.geometry.word_bits,
        params.burst_words,
        write_ratio,
    );
    for txn in traffic.take(requests) {
        sim.submit(txn);
    }
    tracing::info!(requests, seed, write_ratio, "simulation started");

    let result = if trace {
        let mut out = BufWriter::new(io::stdout().lock());
        let mut write_error = None;
        let result = sim.run_until_idle_with(cycles, |tick| {
            if write_error.is_none() {
                write_error = write_trace_line(&mut out, &TraceEntry::from(tick)).err();
            }
        });
        if let Some(e) = write_error.or_else(|| out.flush().err()) {
            eprintln!("Error: trace output failed: {e}");
            return 1;
        }
        result
    } else {
        sim.run_until_idle(cycles)
    };

    let code = match result {
        Ok(completions) => {
            tracing::info!(completed = completions.len(), cycles = sim.cycle(), "simulation finished");
            0
        }
        Err(e) => {
            eprintln!("\n[!] {e}");
            1
        }
    };
    if !trace {
        sim.stats().print_sections(sections);
    }
    code
}

fn write_trace_line(out: &mut impl Write, entry: &TraceEntry) -> io::Result<()> {
    serde_json::to_writer(&mut *out, entry)?;
    writeln!(out)
}

/// Runs the selected checks; returns the process exit code.
fn cmd_check(names: &[String], list: bool) -> i32 {
    if list {
        for check in verify::CHECKS {
            println!("{:<22} {}", check.name, check.description);
        }
        return 0;
    }

    let selected = verify::select(names);
    if selected.is_empty() {
        eprintln!("Error: no check matches {names:?} (see `sdrctl check --list`)");
        return 2;
    }

    let mut failed = 0;
    for check in &selected {
        match check.run() {
            Ok(summary) => println!("PASS  {:<22} {summary}", check.name),
            Err(e) => {
                println!("FAIL  {:<22} {e}", check.name);
                failed += 1;
            }
        }
    }
    println!(
        "\n{} passed, {} failed",
        selected.len() - failed,
        failed
    );
    i32::from(failed != 0)
}

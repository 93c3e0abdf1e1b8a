use std::fs::canonicalize;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use crate::cli::args::Args;
use crate::config::{parse_sweep_config, SweepMode};
use crate::paths::{sweep_name, SweepPaths};
use crate::simulator::Ltspice;
use crate::sweep::run_sweep;
use crate::Result;

pub mod args;

pub const BANNER: &str = r"
 =====================================================
   sweepgen -- automated LTspice parameter sweeps
 =====================================================
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)?;

    println!("{}", BANNER);
    println!("Starting parameter sweep...\n");

    let config = parse_sweep_config(&config_path)?;

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(sweep_name(&config)?)
    };
    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    println!("Configuration file: {:?}", &config_path);
    println!("Output directory: {:?}\n", &work_dir);
    println!("Sweep parameters:");
    println!("\tMode: {:?}", config.mode);
    println!("\tNetlist style: {:?}", config.style);
    println!("\tMetric set: {:?}", config.metrics);
    println!("\tTemplate: {:?}", config.template);
    println!("\tSwept parameters: {}", config.params.len());
    if config.mode == SweepMode::Sampled {
        println!("\tSamples: {}", config.samples.unwrap_or_default());
    }
    println!();

    let paths = SweepPaths::new(&work_dir, &config)?;
    let mut sim = Ltspice::builder()
        .ltspice_path(config.ltspice.clone())
        .netlist_path(paths.netlist.clone())
        .log_path(paths.log.clone())
        .work_dir(work_dir)
        .build()?;

    let summary = run_sweep(&config, &paths, &mut sim)?;

    println!(
        "\n{} {} rows written, {} combinations skipped",
        "Sweep complete:".green().bold(),
        summary.completed,
        summary.skipped
    );
    println!("Results table: {:?}", &paths.results);

    Ok(())
}

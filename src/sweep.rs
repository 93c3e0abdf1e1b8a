use std::fs;
use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;

use crate::config::{ParamSpec, SweepConfig, SweepMode};
use crate::paths::SweepPaths;
use crate::simulator::{SimulationError, Simulator};
use crate::template::NetlistPatcher;
use crate::Result;

/// Row counts for a finished sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Combinations that produced a results row.
    pub completed: usize,
    /// Combinations skipped because the simulator produced no log.
    pub skipped: usize,
}

/// Drives the full sweep: for each combination, render the template,
/// invoke the simulator, scrape the log, and append a results row.
///
/// A simulator timeout skips that combination and continues; template or
/// artifact read failures abort the sweep.
pub fn run_sweep<S: Simulator>(
    config: &SweepConfig,
    paths: &SweepPaths,
    sim: &mut S,
) -> Result<SweepSummary> {
    let template = fs::read_to_string(&config.template)
        .with_context(|| format!("failed to read template {:?}", config.template))?;

    let patcher = NetlistPatcher::new(config.style, &config.params)?;
    patcher.check(&template)?;

    let (points, total) = enumerate(config, paths)?;

    let mut wtr = csv::Writer::from_path(&paths.results)
        .with_context(|| format!("failed to create results table {:?}", paths.results))?;
    let header: Vec<&str> = config
        .params
        .iter()
        .map(|p| p.name.as_str())
        .chain(config.metrics.columns().iter().copied())
        .collect();
    wtr.write_record(&header)?;
    wtr.flush()?;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap(),
    );

    let mut summary = SweepSummary::default();
    for values in points {
        let point = describe(&config.params, &values);
        pb.set_message(point.clone());
        log::debug!("running simulation for {}", point);

        let rendered = patcher.render(&template, &values)?;
        fs::write(&paths.netlist, rendered)
            .with_context(|| format!("failed to write netlist {:?}", paths.netlist))?;

        match sim.run() {
            Ok(()) => {
                let log_text = fs::read_to_string(&paths.log)
                    .with_context(|| format!("failed to read simulator log {:?}", paths.log))?;
                let metrics = config.metrics.extract(&log_text);

                let mut record: Vec<String> =
                    values.iter().map(|v| v.to_string()).collect();
                record.extend(
                    metrics
                        .into_iter()
                        .map(|m| m.map(|v| v.to_string()).unwrap_or_default()),
                );
                wtr.write_record(&record)?;
                wtr.flush()?;
                summary.completed += 1;
            }
            Err(SimulationError::LogTimeout { path, timeout }) => {
                log::warn!(
                    "no log at {:?} after {:?}; skipping {}",
                    path,
                    timeout,
                    point
                );
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(summary)
}

/// Builds the combination stream and its (saturating) length.
///
/// Exhaustive mode iterates the Cartesian product lazily in declaration
/// order, first-declared parameter varying slowest. Sampled mode pairs
/// index i across the per-parameter draw arrays.
fn enumerate(
    config: &SweepConfig,
    paths: &SweepPaths,
) -> Result<(Box<dyn Iterator<Item = Vec<f64>>>, u64)> {
    match config.mode {
        SweepMode::Exhaustive => {
            let sequences = config.expand_sequences()?;
            let total = sequences
                .iter()
                .map(|s| s.len() as u64)
                .try_fold(1u64, u64::checked_mul)
                .unwrap_or(u64::MAX);
            let points = sequences.into_iter().multi_cartesian_product();
            Ok((Box::new(points), total))
        }
        SweepMode::Sampled => {
            let n = config.samples.context("sampled mode requires a sample count")?;
            let arrays = config.draw_samples()?;
            if let Some(param_log) = &paths.param_log {
                write_param_log(param_log, &config.params, &arrays, n)?;
            }
            let points = (0..n).map(move |i| {
                arrays.iter().map(|a| a[i]).collect::<Vec<f64>>()
            });
            Ok((Box::new(points), n as u64))
        }
    }
}

/// Records the raw draw arrays to a secondary table, one row per sample.
fn write_param_log(
    path: &Path,
    params: &[ParamSpec],
    arrays: &[Vec<f64>],
    n: usize,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create parameter log {:?}", path))?;
    wtr.write_record(params.iter().map(|p| p.name.as_str()))?;
    for i in 0..n {
        wtr.write_record(arrays.iter().map(|a| a[i].to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn describe(params: &[ParamSpec], values: &[f64]) -> String {
    params
        .iter()
        .zip(values)
        .map(|(p, v)| format!("{}={}", p.name, v))
        .join(" ")
}

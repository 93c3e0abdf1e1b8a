use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use derive_builder::Builder;
use thiserror::Error;

/// Interval between checks for the simulator's log file.
pub const LOG_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for the log file before giving up on a run.
pub const LOG_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("i/o error while driving the simulator: {0}")]
    Io(#[from] std::io::Error),

    #[error("simulator log {path:?} not found after {timeout:?}")]
    LogTimeout { path: PathBuf, timeout: Duration },
}

/// One simulation run against the current modified netlist.
///
/// `LogTimeout` is the per-combination failure the sweep runner skips
/// over; any other error aborts the sweep.
pub trait Simulator {
    fn run(&mut self) -> Result<(), SimulationError>;
}

/// Drives LTspice in batch mode. Coordination with the simulator is
/// entirely through the filesystem: the run is complete once the log
/// file appears next to the netlist.
#[derive(Debug, Clone, Builder)]
pub struct Ltspice {
    /// Path to the LTspice binary.
    pub ltspice_path: PathBuf,
    /// Netlist the simulator is launched against.
    pub netlist_path: PathBuf,
    /// Log file LTspice writes next to the netlist.
    pub log_path: PathBuf,
    /// Directory receiving captured stdout/stderr.
    pub work_dir: PathBuf,
    #[builder(default = "LOG_TIMEOUT")]
    pub timeout: Duration,
    #[builder(default = "LOG_POLL_INTERVAL")]
    pub poll_interval: Duration,
}

impl Ltspice {
    #[inline]
    pub fn builder() -> LtspiceBuilder {
        LtspiceBuilder::default()
    }
}

impl Simulator for Ltspice {
    fn run(&mut self) -> Result<(), SimulationError> {
        // A log left over from a previous run would satisfy the poll below
        // before this run has produced anything; remove it first.
        if self.log_path.exists() {
            fs::remove_file(&self.log_path)?;
        }

        let out_file = fs::File::create(self.work_dir.join("ltspice.out"))?;
        let err_file = fs::File::create(self.work_dir.join("ltspice.err"))?;

        let status = Command::new(&self.ltspice_path)
            .arg("-b")
            .arg(&self.netlist_path)
            .stdout(out_file)
            .stderr(err_file)
            .current_dir(&self.work_dir)
            .status()?;
        if !status.success() {
            // The log poll below is the actual success signal.
            log::warn!("ltspice exited with {}", status);
        }

        let start = Instant::now();
        while !self.log_path.exists() {
            if start.elapsed() > self.timeout {
                return Err(SimulationError::LogTimeout {
                    path: self.log_path.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(self.poll_interval);
        }

        Ok(())
    }
}

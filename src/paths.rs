use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::config::SweepConfig;

pub fn out_netlist(work_dir: impl AsRef<Path>, stem: &str, ext: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}_modified.{}", stem, ext))
}

pub fn out_log(work_dir: impl AsRef<Path>, stem: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}_modified.log", stem))
}

pub fn out_results(work_dir: impl AsRef<Path>, stem: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}_results.csv", stem))
}

/// Default work-dir name when the CLI is not given one.
pub fn sweep_name(config: &SweepConfig) -> Result<String> {
    Ok(format!("{}_sweep", template_stem(config)?))
}

/// The fixed paths one sweep reuses for every combination.
pub struct SweepPaths {
    /// Modified netlist, overwritten per combination.
    pub netlist: PathBuf,
    /// Completion artifact LTspice writes next to the netlist.
    pub log: PathBuf,
    /// Results table.
    pub results: PathBuf,
    /// Secondary table of raw parameter draws (sampled mode).
    pub param_log: Option<PathBuf>,
}

impl SweepPaths {
    pub fn new(work_dir: impl AsRef<Path>, config: &SweepConfig) -> Result<Self> {
        let work_dir = work_dir.as_ref();
        let stem = template_stem(config)?;
        let ext = config
            .template
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("net");
        Ok(Self {
            netlist: out_netlist(work_dir, &stem, ext),
            log: out_log(work_dir, &stem),
            results: out_results(work_dir, &stem),
            param_log: config.param_log.as_ref().map(|p| work_dir.join(p)),
        })
    }
}

fn template_stem(config: &SweepConfig) -> Result<String> {
    config
        .template
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
        .ok_or_else(|| anyhow!("template path {:?} has no file name", config.template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetlistStyle, SweepMode};
    use crate::extract::MetricSet;

    fn config_with_template(template: &str) -> SweepConfig {
        SweepConfig {
            mode: SweepMode::Exhaustive,
            style: NetlistStyle::Param,
            metrics: MetricSet::Simple,
            template: PathBuf::from(template),
            ltspice: PathBuf::from("ltspice"),
            samples: None,
            seed: None,
            param_log: None,
            params: vec![],
        }
    }

    #[test]
    fn test_paths_derive_from_template_stem() {
        let config = config_with_template("designs/two_stage_opamp.asc");
        let paths = SweepPaths::new("/tmp/work", &config).unwrap();
        assert_eq!(
            paths.netlist,
            PathBuf::from("/tmp/work/two_stage_opamp_modified.asc")
        );
        assert_eq!(
            paths.log,
            PathBuf::from("/tmp/work/two_stage_opamp_modified.log")
        );
        assert_eq!(
            paths.results,
            PathBuf::from("/tmp/work/two_stage_opamp_results.csv")
        );
        assert!(paths.param_log.is_none());
    }

    #[test]
    fn test_sweep_name() {
        let config = config_with_template("two_stage_opamp.asc");
        assert_eq!(sweep_name(&config).unwrap(), "two_stage_opamp_sweep");
    }
}

use anyhow::{bail, Context, Result};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::MetricSet;

/// Absolute slack used when expanding a range, so accumulated rounding
/// error cannot drop the endpoint of e.g. `180n..2u step 20n`.
pub const RANGE_TOLERANCE: f64 = 1e-15;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Full Cartesian product of every declared value sequence.
    Exhaustive,
    /// `samples` index-aligned random draws from per-parameter bounds.
    Sampled,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetlistStyle {
    /// Rewrite `.param NAME=value` declarations in place.
    Param,
    /// Replace literal `{NAME}` tokens.
    Placeholder,
}

/// Physical unit of a swept parameter. Determines the scale factor and
/// suffix applied when patching a `.param` declaration.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Width,
    Length,
    Current,
    Capacitance,
}

impl ParamKind {
    pub fn scale(&self) -> f64 {
        match self {
            ParamKind::Width => 1.0,
            ParamKind::Length => 1e9,
            ParamKind::Current => 1e6,
            ParamKind::Capacitance => 1e15,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            ParamKind::Width => "",
            ParamKind::Length => "n",
            ParamKind::Current => "u",
            ParamKind::Capacitance => "f",
        }
    }
}

/// The values one parameter takes over the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSpec {
    /// Explicit list of values, in sweep order.
    List(Vec<f64>),
    /// Regularly spaced values with inclusive endpoints.
    Range { start: f64, stop: f64, step: f64 },
    /// Bounds for uniform random draws (sampled mode only).
    Uniform { min: f64, max: f64 },
}

impl ValueSpec {
    /// Expands a list or range into its concrete value sequence.
    pub fn expand(&self, name: &str) -> Result<Vec<f64>> {
        match self {
            ValueSpec::List(values) => {
                if values.is_empty() {
                    bail!("parameter {} declares an empty value list", name);
                }
                Ok(values.clone())
            }
            ValueSpec::Range { start, stop, step } => {
                if *step <= 0.0 {
                    bail!("parameter {} declares a non-positive range step", name);
                }
                if stop < start {
                    bail!("parameter {} declares a range with stop < start", name);
                }
                let count = ((stop - start + RANGE_TOLERANCE) / step).floor() as usize + 1;
                Ok((0..count).map(|k| start + k as f64 * step).collect())
            }
            ValueSpec::Uniform { .. } => bail!(
                "parameter {} declares sampling bounds, which are only valid in sampled mode",
                name
            ),
        }
    }

    /// Draws `n` independent uniform values from the declared bounds.
    pub fn draw(&self, name: &str, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        match self {
            ValueSpec::Uniform { min, max } => {
                if min >= max {
                    bail!("parameter {} declares bounds with min >= max", name);
                }
                let dist = Uniform::new_inclusive(*min, *max);
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
            _ => bail!(
                "parameter {} must declare uniform bounds in sampled mode",
                name
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub values: ValueSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub mode: SweepMode,
    pub style: NetlistStyle,
    #[serde(default)]
    pub metrics: MetricSet,
    /// Circuit template the sweep patches before each run.
    pub template: PathBuf,
    /// Path to the LTspice binary.
    pub ltspice: PathBuf,
    /// Number of random draws per parameter (sampled mode only).
    #[serde(default)]
    pub samples: Option<usize>,
    /// Seed for the sampled-mode RNG. Unset means seed from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Secondary table recording the raw random draws (sampled mode only).
    #[serde(default)]
    pub param_log: Option<PathBuf>,
    /// Swept parameters. Declaration order is sweep order and column order.
    pub params: Vec<ParamSpec>,
}

pub fn parse_sweep_config(path: impl AsRef<Path>) -> Result<SweepConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read sweep config {:?}", path))?;
    let config: SweepConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse sweep config {:?}", path))?;
    config.validate()?;
    Ok(config)
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            bail!("sweep config declares no parameters");
        }

        let mut names = HashSet::new();
        for param in &self.params {
            if !names.insert(param.name.as_str()) {
                bail!("parameter {} is declared more than once", param.name);
            }
        }

        match self.mode {
            SweepMode::Exhaustive => {
                for param in &self.params {
                    if matches!(param.values, ValueSpec::Uniform { .. }) {
                        bail!(
                            "parameter {} declares sampling bounds but mode is exhaustive",
                            param.name
                        );
                    }
                }
            }
            SweepMode::Sampled => {
                match self.samples {
                    Some(n) if n > 0 => {}
                    _ => bail!("sampled mode requires samples > 0"),
                }
                for param in &self.params {
                    if !matches!(param.values, ValueSpec::Uniform { .. }) {
                        bail!(
                            "parameter {} must declare uniform bounds in sampled mode",
                            param.name
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Concrete value sequences for exhaustive mode, in declaration order.
    pub fn expand_sequences(&self) -> Result<Vec<Vec<f64>>> {
        self.params
            .iter()
            .map(|p| p.values.expand(&p.name))
            .collect()
    }

    /// Index-aligned draw arrays for sampled mode, one per parameter.
    pub fn draw_samples(&self) -> Result<Vec<Vec<f64>>> {
        let n = self
            .samples
            .context("sampled mode requires a sample count")?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.params
            .iter()
            .map(|p| p.values.draw(&p.name, n, &mut rng))
            .collect()
    }
}

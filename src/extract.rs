use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref GAIN: Regex = Regex::new(r"gain:\s.*?\(([\d.]+)dB").unwrap();
    static ref GAIN_PHASE: Regex = Regex::new(r"gain:\s.*?\(([\d.]+)dB,([\d.\-]+)°\)").unwrap();
    static ref UGBW: Regex = Regex::new(r"ugbw:\s.*?AT\s([\d.e+]+)").unwrap();
    static ref PM: Regex = Regex::new(r"pm:\s.*?\([^,]+,\s*([\d.\-]+)°\)").unwrap();
    static ref PM_DB: Regex = Regex::new(r"pm:\s.*?\(([\d.]+)dB,([\d.\-]+)°\)").unwrap();
}

/// The set of metric patterns scraped from one LTspice log, fixed per
/// sweep variant. Column order here is column order in the results table.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSet {
    /// Gain (dB), unity-gain bandwidth (Hz), phase margin (degrees).
    #[default]
    Simple,
    /// Adds the gain phase and splits the phase-margin line into its
    /// decibel and degree components.
    Extended,
}

impl MetricSet {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MetricSet::Simple => &["Gain", "UGBW", "PM"],
            MetricSet::Extended => &["Gain", "Gain_Phase", "UGBW", "PM_db", "PM_PH"],
        }
    }

    /// Scrapes the log text. One slot per column; a slot is `None` when its
    /// pattern finds no match, which is not an error.
    pub fn extract(&self, log: &str) -> Vec<Option<f64>> {
        match self {
            MetricSet::Simple => vec![
                capture(&GAIN, log, 1),
                capture(&UGBW, log, 1),
                capture(&PM, log, 1),
            ],
            MetricSet::Extended => vec![
                capture(&GAIN_PHASE, log, 1),
                capture(&GAIN_PHASE, log, 2),
                capture(&UGBW, log, 1),
                capture(&PM_DB, log, 1),
                capture(&PM_DB, log, 2),
            ],
        }
    }
}

fn capture(re: &Regex, text: &str, group: usize) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const LOG: &str = "\
Circuit: two_stage_opamp_modified

gain: V(out)/V(in+)=(12.34dB,-1.2°)
ugbw: mag(V(out)/V(in+))=1 AT 1.23e+06
pm: V(out)/V(in+)=(3.01dB,45.6°)

Total elapsed time: 0.512 seconds.
";

    #[test]
    fn test_extract_simple_metrics() {
        let metrics = MetricSet::Simple.extract(LOG);
        assert_eq!(metrics.len(), 3);
        assert_relative_eq!(metrics[0].unwrap(), 12.34);
        assert_relative_eq!(metrics[1].unwrap(), 1.23e6);
        assert_relative_eq!(metrics[2].unwrap(), 45.6);
    }

    #[test]
    fn test_extract_extended_metrics() {
        let metrics = MetricSet::Extended.extract(LOG);
        assert_eq!(metrics.len(), 5);
        assert_relative_eq!(metrics[0].unwrap(), 12.34);
        assert_relative_eq!(metrics[1].unwrap(), -1.2);
        assert_relative_eq!(metrics[2].unwrap(), 1.23e6);
        assert_relative_eq!(metrics[3].unwrap(), 3.01);
        assert_relative_eq!(metrics[4].unwrap(), 45.6);
    }

    #[test]
    fn test_missing_label_leaves_slot_empty() {
        let log = LOG.replace("ugbw:", "xxxx:");
        let metrics = MetricSet::Simple.extract(&log);
        assert!(metrics[0].is_some());
        assert!(metrics[1].is_none());
        assert!(metrics[2].is_some());
    }

    #[test]
    fn test_garbage_log_yields_all_empty() {
        let metrics = MetricSet::Simple.extract("no measurements here");
        assert_eq!(metrics, vec![None, None, None]);
    }

    #[test]
    fn test_column_arity_matches_extraction() {
        for set in [MetricSet::Simple, MetricSet::Extended] {
            assert_eq!(set.columns().len(), set.extract(LOG).len());
        }
    }
}

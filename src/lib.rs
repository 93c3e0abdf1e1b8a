pub use anyhow::{anyhow, Result};

pub mod cli;
pub mod config;
pub mod extract;
pub mod paths;
pub mod simulator;
pub mod sweep;
pub mod template;

//! Config command: show where the config lives and what it resolves to.

use anyhow::Result;
use cloudlink_core::config::{self, CloudlinkConfig};

pub fn run_config(cfg: &CloudlinkConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}

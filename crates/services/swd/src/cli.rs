//! Command-line interface for the scanwatch daemon.

use clap::Parser;
use std::path::PathBuf;

use sw_config::ScanwatchConfig;

use crate::prelude::*;

/// Command-line interface for the scanwatch daemon.
#[derive(Parser, Debug)]
#[command(name = "swd")]
#[command(about = "scanwatch daemon - launch scans and stream their progress live")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SWD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the API listens on, overrides the configuration file
    #[arg(short, long, env = "SWD_ADDRESS")]
    pub address: Option<String>,

    /// Toolkit checkout holding the scanner, overrides the configuration file
    #[arg(short, long, env = "SWD_TOOLKIT_ROOT")]
    pub toolkit_root: Option<PathBuf>,
}

impl Cli {
    /// Load the configuration file, if any, and apply command-line overrides.
    pub fn load_config(&self) -> Result<ScanwatchConfig> {
        let mut config = match &self.config {
            Some(path) => ScanwatchConfig::from_file(path)?,
            None => ScanwatchConfig::default(),
        };
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(root) = &self.toolkit_root {
            config.toolkit.root = root.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn overrides_apply_on_top_of_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\naddress = \"0.0.0.0:80\"\n[toolkit]\nroot = \"/opt/a\"").unwrap();
        let config_path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["swd", "--config", config_path, "--toolkit-root", "/opt/b"])
            .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.server.address, "0.0.0.0:80");
        assert_eq!(config.toolkit.root, PathBuf::from("/opt/b"));
    }

    #[test]
    fn missing_config_file_fails() {
        let cli = Cli::try_parse_from(["swd", "--config", "/nonexistent/swd.toml"]).unwrap();
        assert!(matches!(cli.load_config(), Err(Error::Config(_))));
    }
}

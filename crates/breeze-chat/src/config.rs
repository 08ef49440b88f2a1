//! Host configuration: the config file plus command line overrides

use breeze_handler::BreezeConfig;
use std::path::Path;

/// Load configuration from file and CLI overrides
pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<BreezeConfig> {
    let mut config = BreezeConfig::load(Path::new(config_path))?;

    if let Some(root) = &cli.extensions {
        config.install.root = Some(root.clone());
    }

    if cli.use_cwd {
        config.install.use_cwd_for_extra = true;
    }

    Ok(config)
}

//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command. `config_path` is the file settings were loaded
/// from (or would be).
pub fn run_config(action: &ConfigAction, config_path: &Path, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "{} already exists. Use --force to overwrite.",
                    config_path.display()
                ));
                return Ok(());
            }

            settings.save_to(config_path)?;
            Output::success(&format!("Wrote config to {}", config_path.display()));
            Output::info("Set import.media_dir before running 'earshot import'.");
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

//! Config subcommand handlers.

use casparlink_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let mut cfg = config::load(global)?;
            // Show where the routing config really lives, not just the override.
            cfg.store.path = Some(cfg.store_path());
            print!("{}", render(&cfg)?);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let written = casparlink_config::save_config(&Config::default(), Some(&path))?;
            eprintln!("Wrote default configuration");
            println!("{}", written.display());
            Ok(())
        }
    }
}

fn render(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })
}

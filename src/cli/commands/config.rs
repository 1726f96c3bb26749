//! Config Command
//!
//! Manage llm-dispatch configuration.
//!
//! Usage:
//!   llm-dispatch config show [-g] [-f json]
//!   llm-dispatch config path
//!   llm-dispatch config init [-g] [--force]

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        let config = ConfigLoader::load()?;
        println!("{}", ConfigLoader::render(&config, format == "json")?);
        return Ok(());
    }

    let out = Output::new();
    match ConfigLoader::global_config_path() {
        Some(path) if path.exists() => {
            println!("# Global Config: {}\n", path.display());
            println!("{}", std::fs::read_to_string(&path)?);
        }
        Some(_) => {
            out.warning("No global config found.");
            out.info("Run 'llm-dispatch config init --global' to create one.");
        }
        None => out.error("Cannot determine global config directory."),
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let out = Output::new();
    out.header("Configuration paths");
    for (label, path) in ConfigLoader::paths() {
        match path {
            Some(path) => out.presence(label, path.display(), path.exists()),
            None => out.presence(label, "(not available)", false),
        }
    }
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let out = Output::new();
    out.success(if global {
        "Initialized global configuration"
    } else {
        "Initialized project configuration"
    });
    out.field("Config", path.display());
    Ok(())
}

//! Show or write the configuration file.

use std::process::ExitCode;

use scenecast_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, write: bool) -> anyhow::Result<ExitCode> {
    let path = config_file_path();
    if write {
        config.save()?;
        println!("Configuration written to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

//! List output formats.

use std::process::ExitCode;

use scenecast_encoder::CodecProfile;

pub fn run() -> anyhow::Result<ExitCode> {
    println!("{:<10} {:<5} {:<10} Description", "Format", "Ext", "Codec");
    println!("{}", "-".repeat(60));
    for profile in CodecProfile::ALL {
        println!(
            "{:<10} {:<5} {:<10} {}",
            profile.name(),
            profile.extension(),
            profile.codec(),
            profile.description()
        );
    }
    Ok(ExitCode::SUCCESS)
}

//! Check that the external programs a render needs can be started.

use std::process::ExitCode;

use scenecast_capture_engine::BridgeRenderer;
use scenecast_common::config::{config_file_path, AppConfig};
use scenecast_encoder::EncoderSession;

pub async fn run(config: &AppConfig) -> anyhow::Result<ExitCode> {
    println!("Scenecast System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config file: {}", config_path.display());
    } else {
        println!("[--] Config file: {} (using defaults)", config_path.display());
    }

    let encoder_ok = EncoderSession::is_available(&config.encoder.program).await;
    if encoder_ok {
        println!("[OK] Encoder: {}", config.encoder.program);
    } else {
        println!(
            "[FAIL] Encoder: '{}' could not be run. Install ffmpeg or set encoder.program.",
            config.encoder.program
        );
    }

    let bridge_ok = BridgeRenderer::is_available(&config.bridge.program).await;
    if bridge_ok {
        println!(
            "[OK] Renderer bridge: {} {}",
            config.bridge.program,
            config.bridge.args.join(" ")
        );
    } else {
        println!(
            "[FAIL] Renderer bridge: '{}' could not be run. Install Node.js or set bridge.program.",
            config.bridge.program
        );
    }

    println!();
    if encoder_ok && bridge_ok {
        println!("All required programs are available. Scenecast is ready.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Some required programs are missing. See above for fixes.");
        Ok(ExitCode::FAILURE)
    }
}

mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./castforged.toml",
        "~/.config/castforged/config.toml",
        "/etc/castforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let negotiation = &config.negotiation;

    if negotiation.max_audio_channels == 0 {
        anyhow::bail!("negotiation.max_audio_channels cannot be 0");
    }
    if negotiation.video_codecs.is_empty() || negotiation.audio_codecs.is_empty() {
        anyhow::bail!("negotiation codec tables cannot be empty");
    }
    if negotiation.resolutions.is_empty() {
        anyhow::bail!("negotiation.resolutions cannot be empty");
    }
    if negotiation
        .resolutions
        .windows(2)
        .any(|pair| pair[0].pixels() <= pair[1].pixels())
    {
        anyhow::bail!("negotiation.resolutions must be listed from highest to lowest");
    }
    if negotiation.max_width == Some(0) {
        anyhow::bail!("negotiation.max_width cannot be 0");
    }

    for (class, policy) in [
        ("manifest", &config.retry.manifest),
        ("segment", &config.retry.segment),
    ] {
        policy
            .validate()
            .with_context(|| format!("Invalid retry.{} policy", class))?;
    }

    if config.telemetry.interval_secs == 0 {
        anyhow::bail!("telemetry.interval_secs cannot be 0");
    }

    Ok(())
}

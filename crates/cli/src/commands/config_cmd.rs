//! `coderelay config`: Configuration inspection.

use coderelay_config::AppConfig;
use std::path::Path;

const REDACTED: &str = "[REDACTED]";

pub fn run(
    config_path: Option<&Path>,
    default: bool,
    path_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if path_only {
        println!("{}", super::config_file(config_path).display());
        return Ok(());
    }

    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = super::load_config(config_path)?;
    let missing = config.require_runtime_secrets().err();
    print!("{}", toml::to_string_pretty(&redacted(config))?);

    if let Some(e) = missing {
        eprintln!("\n  ⚠️  {e}; `coderelay serve` will refuse to start");
    }
    Ok(())
}

/// Replace every secret that is set with a placeholder.
fn redacted(mut config: AppConfig) -> AppConfig {
    for secret in [
        &mut config.api_key,
        &mut config.slack.bot_token,
        &mut config.slack.signing_secret,
    ] {
        if secret.is_some() {
            *secret = Some(REDACTED.into());
        }
    }
    config
}

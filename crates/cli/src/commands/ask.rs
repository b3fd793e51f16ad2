//! `coderelay ask`: One question, one answer, no Slack involved.

use coderelay_agent::InferenceInvoker;
use coderelay_channels::to_mrkdwn;
use coderelay_config::AppConfig;
use coderelay_core::message::{ChatMessage, PromptSequence};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    question: &str,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    // Check for API key early: give a clear error
    if config.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    HUGGINGFACE_API_KEY=hf_...");
        eprintln!("    CODERELAY_API_KEY=...        (generic)");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = coderelay_providers::build_from_config(&config);
    let invoker = InferenceInvoker::from_config(provider, &config);

    let prompt = PromptSequence::new(
        &config.assistant.system_prompt,
        Vec::<ChatMessage>::new(),
        question,
    );
    let answer = invoker.invoke(prompt).await?;

    if raw {
        println!("{answer}");
    } else {
        println!("{}", to_mrkdwn(&answer));
    }
    Ok(())
}

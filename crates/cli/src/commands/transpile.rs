//! `coderelay transpile`: Markdown on stdin, Slack mrkdwn on stdout.

use std::io::{Read, Write};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut markdown = String::new();
    std::io::stdin().read_to_string(&mut markdown)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(coderelay_channels::to_mrkdwn(&markdown).as_str().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

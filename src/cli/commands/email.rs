use anyhow::Context;

use crate::config::Config;
use crate::email::{self, EmailError, EmailMessage, format_for_email};
use crate::state::SharedState;

pub async fn cmd_email_results(config: Config, to: &str, query: &str) -> anyhow::Result<()> {
    let to = email::validate_address(to)?;

    if !config.email.enabled {
        return Err(EmailError::Disabled)
            .context("Set [email] enabled = true in config.toml to send results");
    }

    let state = SharedState::new(config).await?;
    let outcome = send(&state, to, query).await;
    state.shutdown().await?;
    outcome?;

    println!("✓ Results for '{query}' sent to {to}");
    Ok(())
}

async fn send(state: &SharedState, to: &str, query: &str) -> anyhow::Result<()> {
    let results = state.aggregator.search(query).await?;
    let document = format_for_email(&results, query.trim())?;
    let message = EmailMessage::new(state.mailer.sender(), to, document);
    state.mailer.send(&message).await?;
    Ok(())
}

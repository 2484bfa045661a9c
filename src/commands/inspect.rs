use anyhow::{Context, Result};
use std::sync::Arc;

use hsched::config::Config;
use hsched::index::{InMemoryIndex, ResourceIndex};
use hsched::onion::OnionUrl;
use hsched::scheduler::{Decision, DecisionEngine};

use super::run::index_client;

/// Validate a URL and print its fingerprint, without touching the network
pub fn check_url(url: &str) -> Result<()> {
    let parsed = OnionUrl::parse(url).with_context(|| format!("{url} cannot be scheduled"))?;

    println!("URL:         {parsed}");
    println!("Host:        {}", parsed.host());
    println!("Fingerprint: {}", parsed.fingerprint());
    Ok(())
}

/// Run one scheduling decision against the index; nothing is published
pub async fn decide(config: &Config, url: &str, offline: bool) -> Result<()> {
    let index: Arc<dyn ResourceIndex> = if offline {
        Arc::new(InMemoryIndex::new())
    } else {
        Arc::new(index_client(config)?)
    };

    let policy = config.refresh_policy();
    let engine = DecisionEngine::new(index, policy);
    let decision = engine
        .decide(url)
        .await
        .with_context(|| format!("Failed to decide on {url}"))?;

    println!("URL:           {url}");
    println!("Refresh delay: {policy}");
    match decision {
        Decision::Schedule => println!("Decision:      schedule"),
        Decision::Skip => println!("Decision:      skip (indexed inside the freshness window)"),
        Decision::Invalid(reason) => println!("Decision:      invalid ({reason})"),
    }

    Ok(())
}

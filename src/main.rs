mod ui;

use anyhow::{Context, Result};
use stationfinder::config::AppConfig;
use stationfinder::controller::spawn_controller;
use stationfinder::models::FilterSelection;
use stationfinder::radio_browser::RadioBrowserClient;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = tokio::task::spawn_blocking(AppConfig::load)
        .await
        .context("Join config load task")?
        .context("Failed to load config")?;

    let client = Arc::new(RadioBrowserClient::new(
        config.server.clone(),
        config.last_server.clone(),
    )?);
    let selection = FilterSelection::with_country(config.initial_country.clone());
    let handle = spawn_controller(client.clone(), selection, ui::console::print_choice);

    let mut state_rx = handle.state_rx.clone();
    tokio::spawn(async move {
        loop {
            if state_rx.changed().await.is_err() {
                return;
            }
            let served = {
                let st = state_rx.borrow_and_update();
                !st.loading_results && st.error.is_none()
            };
            if served {
                break;
            }
        }
        remember_server(&client, config).await;
    });

    ui::console::run(handle).await
}

/// Persists the mirror that served the first successful search.
async fn remember_server(client: &RadioBrowserClient, mut config: AppConfig) {
    let Some(server) = client.current_server().await else {
        return;
    };
    if !config.remember_server(&server) {
        return;
    }
    match tokio::task::spawn_blocking(move || config.save_atomic()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = ?e, "failed to save config"),
        Err(e) => warn!(error = ?e, "config save task failed"),
    }
}

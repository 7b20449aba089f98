//! Runs the release pipeline for the push described by the environment.
//!
//! Reads `GITHUB_REF`, `GITHUB_EVENT_PATH`, `GITHUB_TOKEN` and
//! `PYPI_API_TOKEN`, plus the settings read by
//! [`PipelineConfig::from_env_map`]. Prints the run result as JSON and exits
//! non-zero when the run failed.

use anyhow::{Context, Result};
use releaseflow::config::PipelineConfig;
use releaseflow::core::ReleaseEvent;
use releaseflow::credentials::ReleaseCredentials;
use releaseflow::errors::ConfigError;
use releaseflow::events::LoggingEventSink;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

fn require(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

async fn read_event(vars: &HashMap<String, String>) -> Result<ReleaseEvent> {
    let git_ref = require(vars, "GITHUB_REF")?;

    let Some(path) = vars.get("GITHUB_EVENT_PATH").filter(|p| !p.is_empty()) else {
        warn!("GITHUB_EVENT_PATH not set; release body will be empty");
        return Ok(ReleaseEvent::new(git_ref, ""));
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading event payload {path}"))?;
    let payload: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing event payload {path}"))?;
    Ok(ReleaseEvent::from_push_payload(git_ref, &payload))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let vars: HashMap<String, String> = std::env::vars().collect();
    let config = PipelineConfig::from_env_map(&vars).context("loading configuration")?;
    let rule = config.trigger_rule().context("compiling trigger rule")?;
    let event = read_event(&vars).await?;

    // Tokens are only needed once the trigger fires.
    let credentials = if rule.matches(&event.git_ref) {
        ReleaseCredentials::new(
            require(&vars, "GITHUB_TOKEN")?,
            require(&vars, "PYPI_API_TOKEN")?,
        )
    } else {
        ReleaseCredentials::new("", "")
    };

    let pipeline = config
        .build_pipeline(credentials)
        .context("building pipeline")?
        .with_event_sink(Arc::new(LoggingEventSink::default()));

    info!(repository = %config.repository, git_ref = %event.git_ref, "Starting release run");
    let result = pipeline.run(&event, &rule).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    std::process::exit(result.exit_code());
}

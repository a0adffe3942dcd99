use std::time::Duration;

use serde_json::Value;

use crate::cli::output::output;
use crate::cli::OutputFormat;
use crate::config::config;

pub async fn handle(url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://localhost:{}", config().server.port));
    let endpoint = format!("{}/health", base.trim_end_matches('/'));

    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let response = client.get(&endpoint).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        anyhow::bail!("{} returned {}: {}", endpoint, status, body);
    }

    output(output_format, &body, |_| println!("{} is healthy", base))
}

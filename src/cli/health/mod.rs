//! Health command - prints the parser health report as JSON

use crate::infrastructure::services::HealthStatus;

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap(Some("warn"))?;
    let processor = crate::build_processor(&config).await?;

    let report = processor.health_check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status == HealthStatus::Unhealthy {
        anyhow::bail!("no parser variant is working");
    }

    Ok(())
}

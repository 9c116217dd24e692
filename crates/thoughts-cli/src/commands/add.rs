use std::path::Path;
use std::time::Duration;

use thoughts_core::models::Location;

use crate::commands::common::{open_service, resolve_thought_text};
use crate::error::CliError;

/// How long a capture waits for its place name before the process exits.
pub const ENRICHMENT_WAIT: Duration = Duration::from_secs(15);

pub async fn run_add(
    text_parts: &[String],
    lat: Option<f64>,
    lon: Option<f64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let text = resolve_thought_text(text_parts, service.settings().input_mode())?;
    let location = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Location::new(lat, lon)),
        _ => None,
    };

    let captured = service.capture(&text, location).await?;
    println!("{}", captured.thought.id);

    if let Some(enrichment) = captured.enrichment {
        match tokio::time::timeout(ENRICHMENT_WAIT, enrichment).await {
            Ok(Ok(Some(name))) => eprintln!("📍 {name}"),
            Ok(Ok(None)) => {}
            Ok(Err(error)) => tracing::warn!("Location lookup task failed: {}", error),
            Err(_) => tracing::warn!("Gave up waiting for the location name"),
        }
    }

    if let Some(status) = captured.sync {
        eprintln!("{status}");
    }
    Ok(())
}

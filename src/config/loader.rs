use std::fs;
use std::path::Path;

use crate::error::{Result, SwarmError};

use super::SimulationConfig;

/// Loads a scenario from a `.toml`, `.yaml` or `.yml` file.
///
/// The file is validated before it is returned.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let config: SimulationConfig = match extension.as_str() {
        "toml" => toml::from_str(&content)?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        other => {
            return Err(SwarmError::Config(format!(
                "unsupported config format '{}' for {} (expected .toml, .yaml or .yml)",
                other,
                path.display()
            )))
        }
    };

    config.validate()?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

use anyhow::Result;
use eots_core::EotsConfig;

/// Prints the merged configuration as JSON.
///
/// # Errors
/// Returns an error if the configuration cannot be serialized.
pub fn run_show_config(config: &EotsConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

use crate::config::EotsConfig;
use crate::error::EotsResult;

const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";
const ENV_PREFIX: &str = "EOTS_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging `config/Config.toml`, `EOTS_`-prefixed
    /// environment variables and `config/Config.json`.
    ///
    /// Missing files are skipped, so with nothing on disk this returns the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged configuration
    /// fails validation.
    pub fn load() -> EotsResult<EotsConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration rooted at a specific TOML file. A JSON file with the
    /// same stem in the same directory is joined last.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged configuration
    /// fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> EotsResult<EotsConfig> {
        let path = path.as_ref();
        Self::extract(Figment::new().merge(Toml::file(path)), path)
    }

    /// Loads configuration with a profile overlay (`config/Config.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged configuration
    /// fails validation.
    pub fn load_with_profile(profile: &str) -> EotsResult<EotsConfig> {
        Self::load_profile_from(DEFAULT_CONFIG_PATH, profile)
    }

    /// Loads `path` with the `<stem>.<profile>.toml` overlay next to it.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or the merged configuration
    /// fails validation.
    pub fn load_profile_from(path: impl AsRef<Path>, profile: &str) -> EotsResult<EotsConfig> {
        let base = path.as_ref();
        let figment = Figment::new()
            .merge(Toml::file(base))
            .merge(Toml::file(profile_path(base, profile)));
        Self::extract(figment, base)
    }

    fn extract(figment: Figment, base: &Path) -> EotsResult<EotsConfig> {
        let config: EotsConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file(base.with_extension("json")))
            .extract()?;

        config.validate()?;
        tracing::debug!(path = %base.display(), symbol = %config.data.symbol, "configuration loaded");
        Ok(config)
    }
}

fn profile_path(base: &Path, profile: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Config");
    base.with_file_name(format!("{stem}.{profile}.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.metrics.dte_max, 45.0);
        assert_eq!(config.metrics.supplementary.atr_period, 14);
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        fs::write(
            &path,
            "[data]\nsymbol = \"QQQ\"\n\n[metrics]\ndte_max = 21.0\n\n[metrics.flow]\nmin_history = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(config.data.symbol, "QQQ");
        assert_eq!(config.metrics.dte_max, 21.0);
        assert_eq!(config.metrics.flow.min_history, 5);
        assert_eq!(config.metrics.flow.history_window, 200);
    }

    #[test]
    fn json_only_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let toml = dir.path().join("Config.toml");
        fs::write(&toml, "[metrics]\ndte_max = 30.0\n").unwrap();
        fs::write(
            dir.path().join("Config.json"),
            r#"{"metrics":{"dte_max":10.0,"contract_multiplier":50.0}}"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from(&toml).unwrap();
        assert_eq!(config.metrics.dte_max, 30.0);
        assert_eq!(config.metrics.contract_multiplier, 50.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        fs::write(&path, "[metrics]\ndte_max = -1.0\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("dte_max"));
    }

    #[test]
    fn profile_overlays_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        fs::write(&path, "[data]\nsymbol = \"QQQ\"\n\n[metrics]\ndte_max = 30.0\n").unwrap();
        fs::write(dir.path().join("Config.prod.toml"), "[metrics]\ndte_max = 7.0\n").unwrap();

        let config = ConfigLoader::load_profile_from(&path, "prod").unwrap();
        assert_eq!(config.data.symbol, "QQQ");
        assert_eq!(config.metrics.dte_max, 7.0);
    }

    #[test]
    fn profile_path_sits_next_to_base() {
        let path = profile_path(Path::new("config/Config.toml"), "prod");
        assert_eq!(path, PathBuf::from("config/Config.prod.toml"));
    }
}

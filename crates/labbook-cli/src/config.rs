use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use labbook_core::report::ReportOptions;
use labbook_core::search;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LabbookConfig {
    #[serde(default)]
    pub notebook: NotebookSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub charts: ChartsSection,
    #[serde(default)]
    pub search: SearchSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NotebookSection {
    pub data_dir: Option<String>,

    /// User ID used when `--as` is not given
    pub default_user: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub attachment_width_inches: f64,
    pub chart_width_inches: f64,
    pub timestamp_format: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        let defaults = ReportOptions::default();
        Self {
            attachment_width_inches: defaults.attachment_width_inches,
            chart_width_inches: defaults.chart_width_inches,
            timestamp_format: defaults.timestamp_format,
        }
    }
}

impl ReportSection {
    pub fn options(&self) -> ReportOptions {
        ReportOptions {
            attachment_width_inches: self.attachment_width_inches,
            chart_width_inches: self.chart_width_inches,
            timestamp_format: self.timestamp_format.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsSection {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartsSection {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub default_limit: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            default_limit: search::DEFAULT_LIMIT,
        }
    }
}

impl SearchSection {
    /// Configured default, clamped to the search cap.
    pub fn limit(&self) -> usize {
        self.default_limit.clamp(1, search::MAX_LIMIT)
    }
}

impl LabbookConfig {
    pub fn new(data_dir: &Path, default_user: Option<i64>) -> Self {
        Self {
            notebook: NotebookSection {
                data_dir: Some(data_dir.to_string_lossy().to_string()),
                default_user,
            },
            ..Self::default()
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    xdg_data_dir()
}

pub fn read_config(path: &Path) -> anyhow::Result<LabbookConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &LabbookConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("labbook"));
        }
    }
    Ok(home_dir()?.join(".config").join("labbook"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("labbook"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("labbook"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LabbookConfig =
            toml::from_str("[charts]\nwidth = 640\n").expect("config should parse");
        assert_eq!(config.charts.width, 640);
        assert_eq!(config.charts.height, 600);
        assert_eq!(config.report.timestamp_format, "%Y-%m-%d %H:%M");
        assert_eq!(config.search.limit(), 50);
        assert!(config.notebook.data_dir.is_none());
    }

    #[test]
    fn test_search_limit_is_capped() {
        let config: LabbookConfig =
            toml::from_str("[search]\ndefault_limit = 5000\n").expect("config should parse");
        assert_eq!(config.search.limit(), 200);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        write_config(&path, &LabbookConfig::new(Path::new("/tmp/lab"), Some(1)))
            .expect("write should succeed");
        let config = read_config(&path).expect("read should succeed");
        assert_eq!(config.notebook.data_dir.as_deref(), Some("/tmp/lab"));
        assert_eq!(config.notebook.default_user, Some(1));
        assert_eq!(config.report.chart_width_inches, 5.5);
    }
}

//! Service configuration loaded once from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use officekit_io_xlsx::SpecXlsxExportOptions;

use crate::spec::ServiceError;

/// Config file looked up when `--config` is not given.
pub const C_CONFIG_PATH_DEFAULT: &str = "config.toml";

/// Extensions per document kind.
pub const C_EXT_EXCEL: &str = ".xlsx";
pub const C_EXT_WORD: &str = ".docx";
pub const C_EXT_PDF: &str = ".pdf";

/// Default request-level template id for spreadsheet exports.
pub const C_TEMPLATE_ID_DEFAULT: &str = "default";

/// Templates whose file name starts with this prefix are lock files.
pub const C_TEMPLATE_LOCK_PREFIX: &str = "~";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SpecServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecTemplateConfig {
    /// Root holding `excel/`, `word/` and `pdf/` template directories.
    pub path: PathBuf,
}

impl Default for SpecTemplateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./templates"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecLogConfig {
    /// `env_logger` filter, e.g. `info` or `officekit_io_xlsx=debug`.
    pub level: String,
}

impl Default for SpecLogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecFetchConfig {
    pub timeout_secs: u64,
    pub bytes_max: usize,
    /// Render bundled example rows when a sheet carries no `items`.
    pub if_use_example_data: bool,
}

impl Default for SpecFetchConfig {
    fn default() -> Self {
        let opts = SpecXlsxExportOptions::default();
        Self {
            timeout_secs: opts.fetch_timeout.as_secs(),
            bytes_max: opts.bytes_fetch_max,
            if_use_example_data: opts.if_use_example_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecBatchConfig {
    /// Upper bound of batch workers; `None` uses available parallelism.
    pub num_workers_max: Option<usize>,
}

/// Immutable service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecServiceConfig {
    pub server: SpecServerConfig,
    pub template: SpecTemplateConfig,
    pub log: SpecLogConfig,
    pub fetch: SpecFetchConfig,
    pub batch: SpecBatchConfig,
}

impl SpecServiceConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ServiceError> {
        toml::from_str(text).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Read `path`; `None` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ServiceError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text).map(Some)
    }

    /// Load `path`; a missing file falls back to defaults with a warning.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        match Self::read(path)? {
            Some(cfg) => {
                info!("loaded config from {}", path.display());
                Ok(cfg)
            }
            None => {
                warn!("config file {} not found; using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn to_xlsx_options(&self) -> SpecXlsxExportOptions {
        SpecXlsxExportOptions {
            fetch_timeout: Duration::from_secs(self.fetch.timeout_secs),
            bytes_fetch_max: self.fetch.bytes_max,
            if_use_example_data: self.fetch.if_use_example_data,
        }
    }

    /// `host:port` reported by `health`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = SpecServiceConfig::from_toml_str(
            r#"
[server]
port = 9000

[template]
path = "/srv/templates"

[batch]
num_workers_max = 3
"#,
        )
        .expect("parse");
        assert_eq!(cfg.address(), "0.0.0.0:9000");
        assert_eq!(cfg.template.path, PathBuf::from("/srv/templates"));
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.batch.num_workers_max, Some(3));
        assert_eq!(cfg.to_xlsx_options(), SpecXlsxExportOptions::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        assert_eq!(SpecServiceConfig::read(&path).expect("read"), None);
        let cfg = SpecServiceConfig::load(&path).expect("load");
        assert_eq!(cfg, SpecServiceConfig::default());
        assert_eq!(cfg.template.path, PathBuf::from("./templates"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = SpecServiceConfig::from_toml_str("[server\nport = 1").expect_err("bad toml");
        assert!(matches!(err, ServiceError::Config(_)));
    }
}

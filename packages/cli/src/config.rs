use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tei_parser::SerializeOptions;

pub const DEFAULT_CONFIG_NAME: &str = "tei.config.json";

/// tei-annotate configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Indentation unit for written markup
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Directory for edited documents when `--out` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write `<?xml ...?>` at the top of output
    #[serde(default = "default_xml_declaration")]
    pub xml_declaration: bool,
}

fn default_indent() -> String {
    "  ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_xml_declaration() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Load config from an explicit path, which must exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            indent: self.indent.clone(),
            xml_declaration: self.xml_declaration,
        }
    }

    /// Where an edited copy of `input` goes when no `--out` is given
    pub fn out_path(&self, cwd: &str, input: &Path) -> Option<PathBuf> {
        let out_dir = self.out_dir.as_ref()?;
        let file_name = input.file_name()?;
        Some(PathBuf::from(cwd).join(out_dir).join(file_name))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            out_dir: None,
            log_level: default_log_level(),
            xml_declaration: default_xml_declaration(),
        }
    }
}

/// Configuration for the Lanes server.
/// Reads server.json from ~/.config/lanes/server.json (or platform equivalent).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Largest accepted single upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Most files accepted in one multipart image upload.
    #[serde(default = "default_max_upload_files")]
    pub max_upload_files: usize,
}

fn default_port() -> u16 {
    3456
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_upload_files() -> usize {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            data_dir: default_data_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            max_upload_files: default_max_upload_files(),
        }
    }
}

/// Default config path: ~/.config/lanes/server.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lanes")
        .join("server.json")
}

/// Load config from path. Returns default if the file doesn't exist or
/// cannot be parsed.
pub fn load_config(path: &Path) -> ServerConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(
                target: "lanes.config",
                "Failed to parse config {}: {}",
                path.display(),
                e
            );
            ServerConfig::default()
        }),
        Err(_) => {
            log::info!(
                target: "lanes.config",
                "No config at {}, using defaults",
                path.display()
            );
            ServerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("server.json"));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3456);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, r#"{ "port": 9000, "dataDir": "/srv/lanes" }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/lanes"));
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.max_upload_files, 2);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, "port = 9000").unwrap();
        assert_eq!(load_config(&path), ServerConfig::default());
    }
}

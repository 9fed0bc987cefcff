use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_ADMIN_TOOL: &str = "gpio-admin";
pub const DEFAULT_SYSFS_PATH: &str = "/sys/class/gpio";
pub const DEFAULT_BOARD_INFO: &str = "/proc/cpuinfo";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub unix_socket: Option<String>,
    pub host: Option<String>,
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GpioConfig {
    /// Privileged helper invoked as `<admin_tool> export|unexport <line>`.
    pub admin_tool: String,
    pub sysfs_path: PathBuf,
    /// Platform file carrying the `Revision` field.
    pub board_info: PathBuf,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            admin_tool: DEFAULT_ADMIN_TOOL.to_string(),
            sysfs_path: PathBuf::from(DEFAULT_SYSFS_PATH),
            board_info: PathBuf::from(DEFAULT_BOARD_INFO),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, AppError> {
        serde_json::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid config json: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_section_defaults_when_omitted() {
        let cfg =
            AppConfig::from_json(r#"{ "http": { "host": "localhost:8080", "path": "/api" } }"#)
                .unwrap();
        assert_eq!(cfg.gpio.admin_tool, "gpio-admin");
        assert_eq!(cfg.gpio.sysfs_path, PathBuf::from("/sys/class/gpio"));
        assert_eq!(cfg.gpio.board_info, PathBuf::from("/proc/cpuinfo"));
    }

    #[test]
    fn partial_gpio_section_keeps_other_defaults() {
        let cfg = AppConfig::from_json(
            r#"{
                "http": { "unix_socket": "/run/gpio.sock", "path": "/" },
                "gpio": { "admin_tool": "/usr/local/bin/gpio-admin" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.gpio.admin_tool, "/usr/local/bin/gpio-admin");
        assert_eq!(cfg.gpio.sysfs_path, PathBuf::from("/sys/class/gpio"));
        assert_eq!(cfg.http.unix_socket.as_deref(), Some("/run/gpio.sock"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = AppConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}

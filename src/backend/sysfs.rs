use std::io;
use std::path::Path;

use log::debug;
use tokio::fs;
use tokio::process::Command;

use crate::error::CommandError;
use crate::gpio::GpioBackend;

/// Exports lines through a setuid helper such as `gpio-admin` and talks to
/// the kernel's sysfs GPIO attributes directly.
pub struct SysfsBackend {
    admin_tool: String,
}

impl SysfsBackend {
    pub fn new(admin_tool: impl Into<String>) -> Self {
        Self {
            admin_tool: admin_tool.into(),
        }
    }

    async fn run_admin_tool(&self, action: &str, line: u32) -> Result<(), CommandError> {
        debug!("Running {} {action} {line}", self.admin_tool);
        let output = Command::new(&self.admin_tool)
            .arg(action)
            .arg(line.to_string())
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: self.admin_tool.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CommandError::Exit {
                program: self.admin_tool.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

impl GpioBackend for SysfsBackend {
    async fn export(&self, line: u32) -> Result<(), CommandError> {
        self.run_admin_tool("export", line).await
    }

    async fn unexport(&self, line: u32) -> Result<(), CommandError> {
        self.run_admin_tool("unexport", line).await
    }

    async fn read_attribute(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn write_attribute(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents).await
    }
}

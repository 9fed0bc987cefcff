use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::DEFAULT_ADMIN_TOOL;
use crate::error::CommandError;
use crate::gpio::GpioBackend;

/// A single request that reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Export(u32),
    Unexport(u32),
    Read(PathBuf),
    Write(PathBuf, String),
}

/// In-memory stand-in for the export helper and the sysfs attribute tree.
///
/// Exporting a line creates its `direction` (initially `in`) and `value`
/// attributes, unexporting removes them. Every call is recorded.
pub struct MockGpioBackend {
    sysfs_path: PathBuf,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    attributes: HashMap<PathBuf, String>,
    calls: Vec<BackendCall>,
    failing_lines: HashMap<u32, String>, // stderr to report
    read_only: bool,
}

impl MockGpioBackend {
    pub fn new(sysfs_path: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_path: sysfs_path.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Makes export and unexport of `line` exit non-zero with `stderr`.
    pub fn fail_command(&self, line: u32, stderr: impl Into<String>) {
        self.state.lock().failing_lines.insert(line, stderr.into());
    }

    /// Rejects every attribute write with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    /// Changes an attribute behind the manager's back.
    pub fn set_attribute(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.state
            .lock()
            .attributes
            .insert(path.into(), contents.into());
    }

    pub fn attribute(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state.lock().attributes.get(path.as_ref()).cloned()
    }

    pub fn is_exported(&self, line: u32) -> bool {
        self.state
            .lock()
            .attributes
            .contains_key(&self.attribute_path(line, "direction"))
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    fn attribute_path(&self, line: u32, attribute: &str) -> PathBuf {
        self.sysfs_path.join(format!("gpio{line}")).join(attribute)
    }

    fn exit_error(stderr: String) -> CommandError {
        CommandError::Exit {
            program: DEFAULT_ADMIN_TOOL.to_string(),
            code: Some(1),
            stderr,
        }
    }
}

impl GpioBackend for MockGpioBackend {
    async fn export(&self, line: u32) -> Result<(), CommandError> {
        let direction = self.attribute_path(line, "direction");
        let value = self.attribute_path(line, "value");
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Export(line));

        if let Some(stderr) = state.failing_lines.get(&line) {
            return Err(Self::exit_error(stderr.clone()));
        }
        if state.attributes.contains_key(&direction) {
            return Err(Self::exit_error(format!(
                "gpio-admin: could not export GPIO {line}: Device or resource busy\n"
            )));
        }

        state.attributes.insert(direction, "in\n".to_string());
        state.attributes.insert(value, "0\n".to_string());
        Ok(())
    }

    async fn unexport(&self, line: u32) -> Result<(), CommandError> {
        let direction = self.attribute_path(line, "direction");
        let value = self.attribute_path(line, "value");
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Unexport(line));

        if let Some(stderr) = state.failing_lines.get(&line) {
            return Err(Self::exit_error(stderr.clone()));
        }
        if state.attributes.remove(&direction).is_none() {
            return Err(Self::exit_error(format!(
                "gpio-admin: could not unexport GPIO {line}: Invalid argument\n"
            )));
        }

        state.attributes.remove(&value);
        Ok(())
    }

    async fn read_attribute(&self, path: &Path) -> io::Result<String> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Read(path.to_path_buf()));

        state
            .attributes
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    async fn write_attribute(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(BackendCall::Write(path.to_path_buf(), contents.to_string()));

        if state.read_only {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if !state.attributes.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        // The kernel refuses to drive a line configured as an input.
        if path.ends_with("value") {
            let direction = path.with_file_name("direction");
            if state.attributes.get(&direction).map(|d| d.trim()) == Some("in") {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
        }

        state
            .attributes
            .insert(path.to_path_buf(), format!("{}\n", contents.trim_end()));
        Ok(())
    }
}

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, error, warn};
use serde::Serialize;

use crate::error::{AppError, CommandError};
use crate::pins::{Level, PinNumber, PinTable, ResolvedPin};

const DIRECTION_ATTRIBUTE: &str = "direction";
const VALUE_ATTRIBUTE: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    #[default]
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Accepts `in`/`input` and `out`/`output` in any case, ignoring
    /// surrounding whitespace. Empty or absent input means `out`.
    pub fn normalize(direction: Option<&str>) -> Result<Self, AppError> {
        let raw = direction.unwrap_or_default();
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" | "input" => Ok(Direction::In),
            "out" | "output" | "" => Ok(Direction::Out),
            _ => Err(AppError::InvalidDirection(raw.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Direction {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::normalize(Some(s))
    }
}

/// The OS side of pin control: a privileged helper that exports and
/// unexports GPIO lines, and the attribute files under the GPIO sysfs tree.
pub trait GpioBackend: Send + Sync {
    fn export(&self, line: u32) -> impl Future<Output = Result<(), CommandError>> + Send;
    fn unexport(&self, line: u32) -> impl Future<Output = Result<(), CommandError>> + Send;
    fn read_attribute(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;
    fn write_attribute(
        &self,
        path: &Path,
        contents: &str,
    ) -> impl Future<Output = io::Result<()>> + Send;
}

/// Header-pin addressed GPIO control.
///
/// Holds no per-pin state: whether a pin is exported, its direction and its
/// value are always queried from the backend.
pub struct GpioManager<B: GpioBackend> {
    pins: Arc<PinTable>,
    backend: Arc<B>,
    sysfs_path: PathBuf,
}

impl<B: GpioBackend> GpioManager<B> {
    pub fn new(pins: Arc<PinTable>, backend: Arc<B>, sysfs_path: impl Into<PathBuf>) -> Self {
        Self {
            pins,
            backend,
            sysfs_path: sysfs_path.into(),
        }
    }

    pub fn pins(&self) -> &PinTable {
        &self.pins
    }

    fn attribute_path(&self, pin: ResolvedPin, attribute: &str) -> PathBuf {
        self.sysfs_path.join(format!("gpio{}", pin.line)).join(attribute)
    }

    /// Exports the pin, then configures its direction (`out` when omitted).
    pub async fn open<P: PinNumber>(
        &self,
        pin: P,
        direction: Option<&str>,
    ) -> Result<(), AppError> {
        let pin = self.pins.validate_pin(&pin)?;
        let direction = Direction::normalize(direction)?;

        debug!("Exporting pin {}", pin.header);
        if let Err(source) = self.backend.export(pin.line).await {
            log_command_error("open", pin.header, &source);
            return Err(AppError::Claim {
                pin: pin.header,
                source,
            });
        }

        self.write_direction(pin, direction).await.inspect_err(|e| {
            warn!(
                "Pin {} was exported but setting its direction failed: {e}",
                pin.header
            )
        })
    }

    pub async fn export<P: PinNumber>(
        &self,
        pin: P,
        direction: Option<&str>,
    ) -> Result<(), AppError> {
        self.open(pin, direction).await
    }

    pub async fn close<P: PinNumber>(&self, pin: P) -> Result<(), AppError> {
        let pin = self.pins.validate_pin(&pin)?;

        debug!("Unexporting pin {}", pin.header);
        self.backend.unexport(pin.line).await.map_err(|source| {
            log_command_error("close", pin.header, &source);
            AppError::Release {
                pin: pin.header,
                source,
            }
        })
    }

    pub async fn unexport<P: PinNumber>(&self, pin: P) -> Result<(), AppError> {
        self.close(pin).await
    }

    pub async fn set_direction<P: PinNumber, D: AsRef<str>>(
        &self,
        pin: P,
        direction: D,
    ) -> Result<(), AppError> {
        let pin = self.pins.validate_pin(&pin)?;
        let direction = Direction::normalize(Some(direction.as_ref()))?;

        self.write_direction(pin, direction).await
    }

    pub async fn get_direction<P: PinNumber>(&self, pin: P) -> Result<Direction, AppError> {
        let pin = self.pins.validate_pin(&pin)?;
        let contents = self.read_attribute(pin, DIRECTION_ATTRIBUTE).await?;

        Direction::normalize(Some(contents.trim()))
    }

    pub async fn read<P: PinNumber>(&self, pin: P) -> Result<u8, AppError> {
        let pin = self.pins.validate_pin(&pin)?;
        let contents = self.read_attribute(pin, VALUE_ATTRIBUTE).await?;

        contents.trim().parse::<u8>().map_err(|_| {
            AppError::InvalidValue(format!(
                "pin {} reported non-numeric value {:?}",
                pin.header,
                contents.trim()
            ))
        })
    }

    /// Drives the pin high for any truthy `value`, low otherwise.
    pub async fn write<P: PinNumber, L: Level>(
        &self,
        pin: P,
        value: L,
    ) -> Result<(), AppError> {
        let pin = self.pins.validate_pin(&pin)?;
        let value = if value.is_high() { "1" } else { "0" };

        self.write_attribute(pin, VALUE_ATTRIBUTE, value).await
    }

    async fn write_direction(
        &self,
        pin: ResolvedPin,
        direction: Direction,
    ) -> Result<(), AppError> {
        self.write_attribute(pin, DIRECTION_ATTRIBUTE, direction.as_str())
            .await
    }

    async fn read_attribute(&self, pin: ResolvedPin, attribute: &str) -> Result<String, AppError> {
        let path = self.attribute_path(pin, attribute);
        debug!("Reading {}", path.display());
        let result = self.backend.read_attribute(&path).await;
        result.map_err(|source| AppError::Io { path, source })
    }

    async fn write_attribute(
        &self,
        pin: ResolvedPin,
        attribute: &str,
        contents: &str,
    ) -> Result<(), AppError> {
        let path = self.attribute_path(pin, attribute);
        debug!("Writing {contents:?} to {}", path.display());
        let result = self.backend.write_attribute(&path, contents).await;
        result.map_err(|source| AppError::Io { path, source })
    }
}

fn log_command_error(method: &str, pin: u32, err: &CommandError) {
    error!("{}", command_error_message(method, pin, err));
}

fn command_error_message(method: &str, pin: u32, err: &CommandError) -> String {
    let stderr = err.stderr().trim_end();
    if stderr.is_empty() {
        format!("Error when trying to {method} pin {pin}: {err}")
    } else {
        format!("Error when trying to {method} pin {pin}: {err}\n{stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failures_are_logged_with_method_pin_and_stderr() {
        let err = CommandError::Exit {
            program: "gpio-admin".into(),
            code: Some(1),
            stderr: "gpio-admin: failed to change group ownership\n".into(),
        };
        assert_eq!(
            command_error_message("open", 7, &err),
            "Error when trying to open pin 7: gpio-admin exited with code 1\n\
             gpio-admin: failed to change group ownership"
        );

        let err = CommandError::Spawn {
            program: "gpio-admin".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let message = command_error_message("close", 11, &err);
        assert!(message.starts_with("Error when trying to close pin 11: failed to run gpio-admin"));
        assert!(!message.contains('\n'));
    }

    #[test]
    fn input_synonyms_normalize_to_in() {
        for raw in ["in", "input", "IN", "  Input  ", "INPUT\n"] {
            assert_eq!(Direction::normalize(Some(raw)).unwrap(), Direction::In);
        }
    }

    #[test]
    fn output_synonyms_and_empty_normalize_to_out() {
        for raw in [Some("out"), Some("output"), Some("OUT "), Some(""), Some("   "), None] {
            assert_eq!(Direction::normalize(raw).unwrap(), Direction::Out);
        }
    }

    #[test]
    fn unknown_direction_is_rejected() {
        for raw in ["high", "o", "inout", "1"] {
            match Direction::normalize(Some(raw)) {
                Err(AppError::InvalidDirection(got)) => assert_eq!(got, raw),
                other => panic!("expected InvalidDirection for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn direction_parses_and_displays_canonically() {
        assert_eq!("Output".parse::<Direction>().unwrap(), Direction::Out);
        assert_eq!(Direction::In.to_string(), "in");
        assert_eq!(Direction::default(), Direction::Out);
        assert_eq!(serde_json::to_string(&Direction::In).unwrap(), "\"in\"");
    }
}

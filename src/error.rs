use std::io;
use std::path::PathBuf;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Pin number isn't valid: {0}")]
    InvalidPin(String),
    #[error("Direction must be 'input' or 'output', got {0:?}")]
    InvalidDirection(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Failed to export pin {pin}: {source}")]
    Claim {
        pin: u32,
        #[source]
        source: CommandError,
    },
    #[error("Failed to unexport pin {pin}: {source}")]
    Release {
        pin: u32,
        #[source]
        source: CommandError,
    },
    #[error("GPIO attribute {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read board info {}: {source}", path.display())]
    BoardInfo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of the external export/unexport helper.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} {}", exit_description(*code))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl CommandError {
    /// Captured standard error of the helper, empty if it never ran.
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Spawn { .. } => "",
            CommandError::Exit { stderr, .. } => stderr,
        }
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPin(_) => StatusCode::NOT_FOUND,
            AppError::InvalidDirection(_) | AppError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            AppError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                StatusCode::FORBIDDEN
            }
            AppError::Claim { .. }
            | AppError::Release { .. }
            | AppError::Io { .. }
            | AppError::BoardInfo { .. }
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_failure_reports_plain_code() {
        let err = CommandError::Exit {
            program: "gpio-admin".into(),
            code: Some(2),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "gpio-admin exited with code 2");

        let err = CommandError::Exit {
            program: "gpio-admin".into(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "gpio-admin was terminated by a signal");
    }
}

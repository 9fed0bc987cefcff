mod backend;
mod config;
mod error;
mod gpio;
mod pins;
mod routes;

pub use config::{AppConfig, GpioConfig, HttpConfig};
pub use error::{AppError, CommandError};
pub use gpio::{Direction, GpioBackend, GpioManager};
pub use pins::{Level, PinNumber, PinTable, ResolvedPin, board_revision};
pub use routes::AppState;

#[cfg(feature = "hardware-gpio")]
pub use backend::SysfsBackend;
pub use backend::{BackendCall, MockGpioBackend};

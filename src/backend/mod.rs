pub mod mock;
#[cfg(feature = "hardware-gpio")]
pub mod sysfs;

pub use mock::{BackendCall, MockGpioBackend};
#[cfg(feature = "hardware-gpio")]
pub use sysfs::SysfsBackend;

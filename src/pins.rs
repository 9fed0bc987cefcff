use std::fs;
use std::path::Path;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::AppError;

/// Header pin -> GPIO line for the original board layout.
const DEFAULT_PIN_MAP: [(u32, u32); 17] = [
    (3, 0),
    (5, 1),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 21),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
];

/// Entries that differ on revision 2 / 512MB boards.
const REV2_PIN_MAP: [(u32, u32); 3] = [(3, 2), (5, 3), (13, 27)];

/// Revisions above this use [`REV2_PIN_MAP`].
const LAST_REV1_REVISION: u64 = 3;

/// Immutable mapping from header pins to GPIO lines.
#[derive(Debug, Clone)]
pub struct PinTable {
    lines: FxHashMap<u32, u32>,
    revision: Option<u64>,
}

/// A header pin that passed validation, together with its GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPin {
    pub header: u32,
    pub(crate) line: u32,
}

impl PinTable {
    /// Reads the board identification file and builds the matching table.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| AppError::BoardInfo {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_board_info(&text);
        match table.revision {
            Some(rev) => info!("Detected board revision {rev:#x}"),
            None => info!("No board revision in {}, using default pin table", path.display()),
        }
        Ok(table)
    }

    pub fn from_board_info(text: &str) -> Self {
        Self::for_revision(board_revision(text))
    }

    pub fn for_revision(revision: Option<u64>) -> Self {
        let mut lines: FxHashMap<u32, u32> = DEFAULT_PIN_MAP.into_iter().collect();
        if revision.is_some_and(|rev| rev > LAST_REV1_REVISION) {
            lines.extend(REV2_PIN_MAP);
        }
        Self { lines, revision }
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// All addressable header pins, ascending.
    pub fn header_pins(&self) -> Vec<u32> {
        let mut pins: Vec<u32> = self.lines.keys().copied().collect();
        pins.sort_unstable();
        pins
    }

    pub(crate) fn line(&self, header: u32) -> Option<u32> {
        self.lines.get(&header).copied()
    }

    pub fn validate_pin<P: PinNumber + ?Sized>(&self, pin: &P) -> Result<ResolvedPin, AppError> {
        let header = pin.header_pin()?;
        let line = self
            .line(header)
            .ok_or_else(|| AppError::InvalidPin(header.to_string()))?;
        debug!("Header pin {header} resolves to GPIO line {line}");
        Ok(ResolvedPin { header, line })
    }
}

/// Extracts the hexadecimal `Revision` value from `/proc/cpuinfo` style text.
///
/// Returns `None` when the field is missing or its value is not hex, in which
/// case the default table applies.
pub fn board_revision(text: &str) -> Option<u64> {
    let (_, value) = text
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Revision")?;
    let token = value
        .trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()?;
    u64::from_str_radix(token, 16).ok()
}

/// Anything that can name a header pin.
///
/// Strings must hold a plain base-10 integer; surrounding whitespace is ignored.
pub trait PinNumber {
    fn header_pin(&self) -> Result<u32, AppError>;
}

macro_rules! impl_pin_number {
    ($($ty:ty),*) => {
        $(
            impl PinNumber for $ty {
                fn header_pin(&self) -> Result<u32, AppError> {
                    u32::try_from(*self).map_err(|_| AppError::InvalidPin(self.to_string()))
                }
            }
        )*
    };
}

impl_pin_number!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl PinNumber for str {
    fn header_pin(&self) -> Result<u32, AppError> {
        let digits = self.trim();
        // Plain decimal only: no sign and no leading zeros, so "07" and "+7" are not pin 7.
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return Err(AppError::InvalidPin(self.to_string()));
        }
        digits
            .parse::<u32>()
            .map_err(|_| AppError::InvalidPin(self.to_string()))
    }
}

impl PinNumber for String {
    fn header_pin(&self) -> Result<u32, AppError> {
        self.as_str().header_pin()
    }
}

impl<T: PinNumber + ?Sized> PinNumber for &T {
    fn header_pin(&self) -> Result<u32, AppError> {
        (**self).header_pin()
    }
}

/// Truthiness of a value written to a pin.
pub trait Level {
    fn is_high(&self) -> bool;
}

impl Level for bool {
    fn is_high(&self) -> bool {
        *self
    }
}

macro_rules! impl_level {
    ($($ty:ty),*) => {
        $(
            impl Level for $ty {
                fn is_high(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

impl_level!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Level for str {
    fn is_high(&self) -> bool {
        !self.is_empty()
    }
}

impl Level for String {
    fn is_high(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Level> Level for Option<T> {
    fn is_high(&self) -> bool {
        self.as_ref().is_some_and(Level::is_high)
    }
}

impl<T: Level + ?Sized> Level for &T {
    fn is_high(&self) -> bool {
        (**self).is_high()
    }
}

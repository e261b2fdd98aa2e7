//! Type-safe command builders
//!
//! Each command owns the command byte and the three argument bytes of a
//! [`FeatureReport`]; applying it never touches the remaining padding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::{cmd, FeatureReport};

/// A command that can be written into a feature report
pub trait ReportCommand {
    /// Command byte (e.g., b'n' for SET_COLOR_NOW)
    const CMD: u8;

    /// The three argument bytes following the command byte
    fn args(&self) -> [u8; 3];

    /// Overwrite command and argument bytes of `report`
    fn apply(&self, report: &mut FeatureReport) {
        report.set_command(Self::CMD, self.args());
    }
}

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// Error for color strings that are not `#RRGGBB`, `0xRRGGBB` or `RRGGBB`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRgbError(String);

impl fmt::Display for ParseRgbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}', expected #RRGGBB", self.0)
    }
}

impl std::error::Error for ParseRgbError {}

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseRgbError(s.to_string()));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| ParseRgbError(s.to_string()))?;
        Ok(Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// SET_COLOR_NOW command ('n'): switch the LED to a color immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetColorNow {
    pub color: Rgb,
}

impl SetColorNow {
    pub fn new(color: Rgb) -> Self {
        Self { color }
    }
}

impl ReportCommand for SetColorNow {
    const CMD: u8 = cmd::SET_COLOR_NOW;

    fn args(&self) -> [u8; 3] {
        [self.color.r, self.color.g, self.color.b]
    }
}

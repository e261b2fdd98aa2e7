//! Protocol constants and feature report layout for blink(1) devices
//!
//! Every command travels as HID feature report 1:
//!
//! ```text
//! offset  0      1      2     3     4     5..8
//!        [id=1] [cmd]  [a0]  [a1]  [a2]  [firmware-defined]
//! ```
//!
//! The report is 8 data bytes behind the report id on every hardware
//! revision (mk1, mk2, mk3). The default template is the report id followed
//! by zeros; bytes a command does not own are left as the template has them.

use std::fmt;

use crate::error::TransportError;

/// Feature report id used for all commands
pub const REPORT_ID: u8 = 1;

/// Full report length including the report id byte
pub const REPORT_LEN: usize = 9;

/// Command bytes (ASCII, as the firmware defines them)
pub mod cmd {
    /// Set RGB now, no fade
    pub const SET_COLOR_NOW: u8 = b'n';

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            SET_COLOR_NOW => "SET_COLOR_NOW",
            _ => "UNKNOWN",
        }
    }
}

/// Byte offsets within a feature report
pub mod offset {
    pub const REPORT_ID: usize = 0;
    pub const COMMAND: usize = 1;
    pub const ARG0: usize = 2;
    pub const ARG1: usize = 3;
    pub const ARG2: usize = 4;
}

/// One feature report buffer, always exactly [`REPORT_LEN`] bytes
#[derive(Clone, PartialEq, Eq)]
pub struct FeatureReport {
    buf: [u8; REPORT_LEN],
}

impl FeatureReport {
    /// Documented default layout: report id, then zero padding
    pub fn template() -> Self {
        let mut buf = [0u8; REPORT_LEN];
        buf[offset::REPORT_ID] = REPORT_ID;
        Self { buf }
    }

    /// Wrap bytes handed out by a device abstraction
    ///
    /// The length must be [`REPORT_LEN`] and byte 0 must be [`REPORT_ID`];
    /// everything else is preserved untouched.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        let buf: [u8; REPORT_LEN] = bytes.try_into().map_err(|_| {
            TransportError::InvalidReport(format!(
                "expected {} bytes, got {}",
                REPORT_LEN,
                bytes.len()
            ))
        })?;
        if buf[offset::REPORT_ID] != REPORT_ID {
            return Err(TransportError::InvalidReport(format!(
                "expected report id {}, got {}",
                REPORT_ID,
                buf[offset::REPORT_ID]
            )));
        }
        Ok(Self { buf })
    }

    /// Report id (always [`REPORT_ID`])
    pub fn report_id(&self) -> u8 {
        self.buf[offset::REPORT_ID]
    }

    /// Command byte currently in the report
    pub fn command(&self) -> u8 {
        self.buf[offset::COMMAND]
    }

    /// Write a command byte and its three arguments, leaving the rest alone
    pub fn set_command(&mut self, cmd: u8, args: [u8; 3]) {
        self.buf[offset::COMMAND] = cmd;
        self.buf[offset::ARG0] = args[0];
        self.buf[offset::ARG1] = args[1];
        self.buf[offset::ARG2] = args[2];
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for FeatureReport {
    fn default() -> Self {
        Self::template()
    }
}

impl fmt::Debug for FeatureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureReport({} {:02X?})", cmd::name(self.command()), self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_layout() {
        let report = FeatureReport::template();
        assert_eq!(report.as_bytes(), &[1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(report.report_id(), REPORT_ID);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let err = FeatureReport::from_bytes(&[1, 0, 0]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidReport(_)));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_report_id() {
        let err = FeatureReport::from_bytes(&[0; REPORT_LEN]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidReport(_)));
    }

    #[test]
    fn test_set_command_preserves_padding() {
        let mut report =
            FeatureReport::from_bytes(&[1, 0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44])
                .unwrap();
        report.set_command(cmd::SET_COLOR_NOW, [1, 2, 3]);
        assert_eq!(
            report.as_bytes(),
            &[1, b'n', 1, 2, 3, 0x11, 0x22, 0x33, 0x44]
        );
    }
}

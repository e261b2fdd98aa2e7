//! Transport layer for thingM blink(1) notification lights
//!
//! This crate owns everything that touches the OS HID subsystem:
//!
//! - the fixed device filter (VID 0x27B8, PID 0x01ED, usage page 0xFF00, usage 0x0001)
//! - the feature report layout and command encoding
//! - a hidapi-backed [`DeviceBackend`] for enumeration and open
//! - a polling hot-plug watcher that turns enumeration snapshots into
//!   [`DiscoveryEvent`]s
//!
//! ```text
//! [HidApiBackend]  ← implements DeviceBackend (enumerate / open)
//!        |
//! [PollingWatcher] ← diffs snapshots into Added / Updated / Removed
//!        |
//! [blink1::Blink1Registry]
//! ```

pub mod command;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod types;
pub mod watcher;

mod hid;

pub use command::{ParseRgbError, ReportCommand, Rgb, SetColorNow};
pub use error::TransportError;
pub use filter::{DeviceFilter, PRODUCT_ID, USAGE_ID, USAGE_PAGE, VENDOR_ID};
pub use hid::{HidApiBackend, HidFeatureDevice};
pub use protocol::{FeatureReport, REPORT_ID, REPORT_LEN};
pub use types::{DeviceDescriptor, DiscoveryEvent};
pub use watcher::{diff_snapshots, PollingWatcher, DEFAULT_POLL_INTERVAL};

use std::sync::Arc;

use async_trait::async_trait;

/// An opened connection to one device
///
/// Implementations must be safe to share between tasks; concurrent sends are
/// serialized by the implementation.
#[async_trait]
pub trait FeatureDevice: Send + Sync {
    /// Default feature report for `report_id`
    ///
    /// Command encoders start from this buffer and only overwrite the bytes
    /// they own.
    fn create_feature_report(&self, report_id: u8) -> Result<FeatureReport, TransportError>;

    /// Send a feature report
    ///
    /// # Returns
    /// Report length on success, report id included (hidapi does not report
    /// a byte count for feature reports)
    async fn send_feature_report(&self, report: &FeatureReport) -> Result<usize, TransportError>;

    /// Release the OS handle. Closing twice is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Enumeration and open of matching devices
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// List currently attached devices that pass the filter
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// Open a device for read/write
    async fn open_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Arc<dyn FeatureDevice>, TransportError>;
}

//! blink(1) device handle
//!
//! A [`Blink1`] represents one attached device. The HID connection is opened
//! on first use, at most once, even when several tasks race on the first
//! `set_color`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blink1_transport::{
    DeviceBackend, DeviceDescriptor, FeatureDevice, ReportCommand, Rgb, SetColorNow, REPORT_ID,
};
use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::Blink1Config;
use crate::error::Blink1Error;

/// Handle to one blink(1) device
///
/// Connection lifecycle is unopened → opened → closed. A failed or timed-out
/// open leaves the handle unopened, so the next call tries again.
pub struct Blink1 {
    id: String,
    descriptor: RwLock<DeviceDescriptor>,
    backend: Arc<dyn DeviceBackend>,
    connection: OnceCell<Arc<dyn FeatureDevice>>,
    closed: AtomicBool,
    detached: AtomicBool,
    open_timeout: Duration,
    send_timeout: Duration,
}

impl Blink1 {
    /// Create a handle without touching the device
    pub fn new(
        descriptor: DeviceDescriptor,
        backend: Arc<dyn DeviceBackend>,
        config: &Blink1Config,
    ) -> Self {
        Self {
            id: descriptor.id.clone(),
            descriptor: RwLock::new(descriptor),
            backend,
            connection: OnceCell::new(),
            closed: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            open_timeout: config.open_timeout(),
            send_timeout: config.send_timeout(),
        }
    }

    /// Platform device identifier (registry key)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the current descriptor
    pub fn descriptor(&self) -> DeviceDescriptor {
        self.descriptor.read().clone()
    }

    /// Whether the HID connection has been opened
    pub fn is_open(&self) -> bool {
        self.connection.initialized()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether the device has been unplugged
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub(crate) fn update_descriptor(&self, fresh: &DeviceDescriptor) {
        self.descriptor.write().update_from(fresh);
    }

    pub(crate) fn mark_detached(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn ensure_usable(&self) -> Result<(), Blink1Error> {
        if self.is_closed() {
            return Err(Blink1Error::Closed);
        }
        if self.is_detached() {
            return Err(Blink1Error::Detached(self.id.clone()));
        }
        Ok(())
    }

    /// Open the connection on first use
    async fn connection(&self) -> Result<&Arc<dyn FeatureDevice>, Blink1Error> {
        self.connection
            .get_or_try_init(|| async {
                let descriptor = self.descriptor();
                debug!("Opening {}", descriptor.id);
                let device =
                    match tokio::time::timeout(self.open_timeout, self.backend.open_device(&descriptor))
                        .await
                    {
                        Ok(result) => result?,
                        Err(_) => return Err(Blink1Error::Timeout { operation: "open" }),
                    };
                // close() may have run while the open was in flight
                if self.is_closed() {
                    device.close().await?;
                    debug!("Closed {} after open", descriptor.id);
                    return Err(Blink1Error::Closed);
                }
                Ok(device)
            })
            .await
    }

    /// Switch the LED to `color` immediately
    ///
    /// # Returns
    /// Report length, report id included, once the OS accepted the report
    pub async fn set_color(&self, color: Rgb) -> Result<usize, Blink1Error> {
        self.ensure_usable()?;
        let device = self.connection().await?;
        if self.is_closed() {
            // close() found the cell empty while the open was finishing
            device.close().await?;
            return Err(Blink1Error::Closed);
        }

        let mut report = device.create_feature_report(REPORT_ID)?;
        SetColorNow::new(color).apply(&mut report);
        debug!("{}: set color {} -> {:?}", self.id, color, report);

        let written = tokio::time::timeout(self.send_timeout, device.send_feature_report(&report))
            .await
            .map_err(|_| Blink1Error::Timeout {
                operation: "send_feature_report",
            })??;
        Ok(written)
    }

    /// Same as [`Blink1::set_color`] with separate channels
    pub async fn set_rgb(&self, r: u8, g: u8, b: u8) -> Result<usize, Blink1Error> {
        self.set_color(Rgb::new(r, g, b)).await
    }

    /// Turn the LED off
    pub async fn off(&self) -> Result<usize, Blink1Error> {
        self.set_color(Rgb::BLACK).await
    }

    /// Release the HID connection
    ///
    /// No I/O happens if the connection was never opened. Later color calls
    /// fail with [`Blink1Error::Closed`]. An open still in flight when this
    /// runs is closed again by the task that started it, and its report is
    /// never sent.
    pub async fn close(&self) -> Result<(), Blink1Error> {
        self.closed.store(true, Ordering::Release);
        if let Some(device) = self.connection.get() {
            device.close().await?;
            debug!("Closed {}", self.id);
        }
        Ok(())
    }
}

impl fmt::Debug for Blink1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blink1")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("closed", &self.is_closed())
            .field("detached", &self.is_detached())
            .finish()
    }
}

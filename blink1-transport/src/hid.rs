//! hidapi backend for blink(1) devices
//!
//! hidapi calls block, so enumeration, open and report transfer are pushed
//! onto tokio's blocking pool. That keeps the async callers honest about
//! where they suspend.

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::Arc;

use async_trait::async_trait;
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::filter::DeviceFilter;
use crate::protocol::{FeatureReport, REPORT_ID};
use crate::types::DeviceDescriptor;
use crate::{DeviceBackend, FeatureDevice};

/// HID device discovery and open via hidapi
pub struct HidApiBackend {
    api: Arc<Mutex<HidApi>>,
    filter: DeviceFilter,
    /// Raw OS paths from the last enumeration, keyed by descriptor id
    paths: Arc<Mutex<HashMap<String, CString>>>,
}

impl HidApiBackend {
    /// Create a backend matching blink(1) devices
    pub fn new() -> Result<Self, TransportError> {
        Self::with_filter(DeviceFilter::BLINK1)
    }

    /// Create a backend with a custom filter
    pub fn with_filter(filter: DeviceFilter) -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Arc::new(Mutex::new(api)),
            filter,
            paths: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

/// The descriptor id is the path as text. Paths that are not valid UTF-8
/// are converted lossily, so opening uses the raw path recorded at
/// enumeration time instead of the id.
fn descriptor_from_info(info: &hidapi::DeviceInfo) -> DeviceDescriptor {
    DeviceDescriptor {
        id: info.path().to_string_lossy().to_string(),
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        usage_page: info.usage_page(),
        usage: info.usage(),
        serial: info.serial_number().map(|s| s.to_string()),
        manufacturer: info.manufacturer_string().map(|s| s.to_string()),
        product_name: info.product_string().map(|s| s.to_string()),
        release_number: info.release_number(),
    }
}

/// Refresh hidapi's device list and collect the interfaces matching `filter`
/// together with their raw paths
fn enumerate(
    api: &Mutex<HidApi>,
    filter: DeviceFilter,
) -> Result<Vec<(DeviceDescriptor, CString)>, TransportError> {
    let mut api = api.lock();
    api.refresh_devices()?;
    Ok(api
        .device_list()
        .filter(|d| filter.matches(d.vendor_id(), d.product_id(), d.usage_page(), d.usage()))
        .map(|d| (descriptor_from_info(d), d.path().to_owned()))
        .collect())
}

/// Path to open for `id`: the raw enumerated path if known, else the id itself
fn resolve_path(paths: &HashMap<String, CString>, id: &str) -> Result<CString, TransportError> {
    match paths.get(id) {
        Some(path) => Ok(path.clone()),
        None => CString::new(id).map_err(|_| TransportError::DeviceNotFound(id.to_string())),
    }
}

#[async_trait]
impl DeviceBackend for HidApiBackend {
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let api = Arc::clone(&self.api);
        let filter = self.filter;

        let found = tokio::task::spawn_blocking(move || enumerate(&api, filter)).await??;

        let mut paths = self.paths.lock();
        paths.clear();
        let devices = found
            .into_iter()
            .map(|(descriptor, path)| {
                paths.insert(descriptor.id.clone(), path);
                descriptor
            })
            .collect::<Vec<_>>();
        drop(paths);

        debug!("Enumerated {} matching devices", devices.len());
        Ok(devices)
    }

    async fn open_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Arc<dyn FeatureDevice>, TransportError> {
        let path = resolve_path(&self.paths.lock(), &descriptor.id)?;
        let api = Arc::clone(&self.api);

        let device =
            tokio::task::spawn_blocking(move || api.lock().open_path(path.as_c_str())).await??;

        info!("Opened {} at {}", descriptor.display_name(), descriptor.id);
        Ok(Arc::new(HidFeatureDevice::new(device, descriptor.id.clone())))
    }
}

/// An opened blink(1) HID connection
///
/// The inner `Option` is taken on close; a closed device reports
/// `Disconnected` instead of touching a stale handle.
pub struct HidFeatureDevice {
    device: Arc<Mutex<Option<HidDevice>>>,
    id: String,
}

impl HidFeatureDevice {
    pub fn new(device: HidDevice, id: String) -> Self {
        Self {
            device: Arc::new(Mutex::new(Some(device))),
            id,
        }
    }
}

#[async_trait]
impl FeatureDevice for HidFeatureDevice {
    fn create_feature_report(&self, report_id: u8) -> Result<FeatureReport, TransportError> {
        if report_id != REPORT_ID {
            return Err(TransportError::InvalidReport(format!(
                "unsupported report id {report_id}"
            )));
        }
        Ok(FeatureReport::template())
    }

    async fn send_feature_report(&self, report: &FeatureReport) -> Result<usize, TransportError> {
        let device = Arc::clone(&self.device);
        let buf = report.as_bytes().to_vec();
        debug!("Sending feature report to {}: {:02X?}", self.id, buf);

        tokio::task::spawn_blocking(move || -> Result<usize, TransportError> {
            let guard = device.lock();
            let device = guard.as_ref().ok_or(TransportError::Disconnected)?;
            device.send_feature_report(&buf)?;
            Ok(buf.len())
        })
        .await?
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.device.lock().take().is_some() {
            debug!("Closed {}", self.id);
        }
        Ok(())
    }
}

//! In-memory device backend for registry and handle tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blink1::{DeviceBackend, DeviceDescriptor, FeatureDevice, FeatureReport, TransportError};

/// Template with non-zero bytes everywhere a command could write, so tests
/// can tell "overwritten" from "left alone".
pub const TEMPLATE: [u8; 9] = [1, 0xAA, 0xBB, 0xCC, 0xDD, 0x5A, 0x5A, 0x5A, 0x5A];

pub fn descriptor(id: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        id: id.to_string(),
        vendor_id: 0x27B8,
        product_id: 0x01ED,
        usage_page: 0xFF00,
        usage: 0x0001,
        serial: Some("3b2e1a40".into()),
        manufacturer: Some("ThingM".into()),
        product_name: Some("blink(1) mk3".into()),
        release_number: 3,
    }
}

#[derive(Default)]
pub struct FakeDevice {
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub closes: AtomicUsize,
    pub fail_send: AtomicBool,
    pub send_delay: Mutex<Option<Duration>>,
}

impl FakeDevice {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl FeatureDevice for FakeDevice {
    fn create_feature_report(&self, report_id: u8) -> Result<FeatureReport, TransportError> {
        assert_eq!(report_id, 1);
        FeatureReport::from_bytes(&TEMPLATE)
    }

    async fn send_feature_report(&self, report: &FeatureReport) -> Result<usize, TransportError> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let bytes = report.as_bytes().to_vec();
        let len = bytes.len();
        self.sent.lock().unwrap().push(bytes);
        Ok(len)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub attached: Mutex<Vec<DeviceDescriptor>>,
    pub device: Arc<FakeDevice>,
    pub opens: AtomicUsize,
    pub fail_open: AtomicBool,
    pub open_delay: Mutex<Option<Duration>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn set_attached(&self, devices: Vec<DeviceDescriptor>) {
        *self.attached.lock().unwrap() = devices;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl DeviceBackend for FakeBackend {
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        Ok(self.attached.lock().unwrap().clone())
    }

    async fn open_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Arc<dyn FeatureDevice>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::DeviceNotFound(descriptor.id.clone()));
        }
        Ok(Arc::clone(&self.device) as Arc<dyn FeatureDevice>)
    }
}

//! Common types for transport layer

use serde::{Deserialize, Serialize};

/// Identity and display metadata of one enumerated HID interface
///
/// `id` is the platform device path. It is stable for as long as the device
/// stays attached and is the key the registry uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Platform device path (hidraw node, IOService path, or Windows device interface)
    pub id: String,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// HID usage page of the matched collection
    pub usage_page: u16,
    /// HID usage of the matched collection
    pub usage: u16,
    /// Serial number if available
    pub serial: Option<String>,
    /// Manufacturer string if available
    pub manufacturer: Option<String>,
    /// Product name if available
    pub product_name: Option<String>,
    /// bcdDevice; distinguishes mk1/mk2/mk3 hardware
    pub release_number: u16,
}

impl DeviceDescriptor {
    /// Human-readable label for logs
    pub fn display_name(&self) -> String {
        let product = self.product_name.as_deref().unwrap_or("blink(1)");
        match &self.serial {
            Some(serial) => format!("{product} ({serial})"),
            None => product.to_string(),
        }
    }

    /// Overwrite metadata with a fresher descriptor for the same device
    ///
    /// The identifier is kept as-is.
    pub fn update_from(&mut self, other: &DeviceDescriptor) {
        self.vendor_id = other.vendor_id;
        self.product_id = other.product_id;
        self.usage_page = other.usage_page;
        self.usage = other.usage;
        self.serial = other.serial.clone();
        self.manufacturer = other.manufacturer.clone();
        self.product_name = other.product_name.clone();
        self.release_number = other.release_number;
    }
}

/// Discovery events for hot-plug support
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A matching device was attached
    Added(DeviceDescriptor),
    /// Metadata of an attached device changed
    Updated(DeviceDescriptor),
    /// The device with this id was detached
    Removed(String),
}

impl DiscoveryEvent {
    /// Device id the event refers to
    pub fn id(&self) -> &str {
        match self {
            Self::Added(d) | Self::Updated(d) => &d.id,
            Self::Removed(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_for_every_kind() {
        let descriptor = DeviceDescriptor {
            id: "/dev/hidraw2".into(),
            ..Default::default()
        };
        assert_eq!(DiscoveryEvent::Added(descriptor.clone()).id(), "/dev/hidraw2");
        assert_eq!(DiscoveryEvent::Updated(descriptor).id(), "/dev/hidraw2");
        assert_eq!(DiscoveryEvent::Removed("/dev/hidraw2".into()).id(), "/dev/hidraw2");
    }
}

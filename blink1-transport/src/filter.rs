//! Device filter - which HID interfaces count as a blink(1)
//!
//! A blink(1) exposes a single vendor-defined HID collection. All four of
//! vendor ID, product ID, usage page and usage must match; the filter is
//! fixed and not user-configurable.


/// thingM vendor ID
pub const VENDOR_ID: u16 = 0x27B8;

/// blink(1) product ID (all hardware revisions)
pub const PRODUCT_ID: u16 = 0x01ED;

/// Vendor-defined usage page of the feature report collection
pub const USAGE_PAGE: u16 = 0xFF00;

/// Usage within [`USAGE_PAGE`]
pub const USAGE_ID: u16 = 0x0001;

/// VID/PID/usage tuple a HID interface is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
}

impl DeviceFilter {
    /// The blink(1) filter
    pub const BLINK1: Self = Self {
        vendor_id: VENDOR_ID,
        product_id: PRODUCT_ID,
        usage_page: USAGE_PAGE,
        usage: USAGE_ID,
    };

    /// Check raw interface identifiers against the filter
    #[inline]
    pub fn matches(&self, vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> bool {
        self.vendor_id == vendor_id
            && self.product_id == product_id
            && self.usage_page == usage_page
            && self.usage == usage
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::BLINK1
    }
}

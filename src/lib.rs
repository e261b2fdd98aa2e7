//! Hot-plug aware control of thingM blink(1) USB notification lights
//!
//! [`Blink1Registry`] tracks attached devices and hands out one [`Blink1`]
//! handle per device; [`Blink1::set_color`] sends the "set color now"
//! feature report.
//!
//! ```ignore
//! let registry = Blink1Registry::start(Blink1Config::default())?;
//! let mut events = registry.subscribe();
//! while let Ok(RegistryEvent::DeviceAdded(device)) = events.recv().await {
//!     device.set_color(Rgb::RED).await?;
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod registry;

pub use config::Blink1Config;
pub use device::Blink1;
pub use error::Blink1Error;
pub use registry::{Blink1Registry, RegistryEvent};

// Re-export transport types consumers need for colors, custom backends and fake sources
pub use blink1_transport::{
    DeviceBackend, DeviceDescriptor, DiscoveryEvent, FeatureDevice, FeatureReport, Rgb,
    TransportError,
};

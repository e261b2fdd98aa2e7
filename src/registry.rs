//! Device registry
//!
//! [`Blink1Registry`] keeps one [`Blink1`] handle per attached device and
//! publishes add/remove notifications. It is fed by a stream of
//! [`DiscoveryEvent`]s, normally from a [`PollingWatcher`] over hidapi.
//!
//! ```text
//! [PollingWatcher] --mpsc--> [watch loop] --apply--> devices map
//!                                             \--broadcast--> subscribers
//! ```
//!
//! Removing a device does not close its connection. The handle is marked
//! detached so new color calls fail fast, in-flight calls finish, and the OS
//! handle is released by [`Blink1::close`] or when the last `Arc` drops.

use std::collections::HashMap;
use std::sync::Arc;

use blink1_transport::{
    DeviceBackend, DeviceDescriptor, DiscoveryEvent, HidApiBackend, PollingWatcher,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Blink1Config;
use crate::device::Blink1;
use crate::error::Blink1Error;

/// Device lifecycle notification
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A device was attached and registered
    DeviceAdded(Arc<Blink1>),
    /// A device was detached and unregistered
    DeviceRemoved(Arc<Blink1>),
}

impl RegistryEvent {
    /// Handle the event refers to
    pub fn device(&self) -> &Arc<Blink1> {
        match self {
            Self::DeviceAdded(device) | Self::DeviceRemoved(device) => device,
        }
    }
}

struct Inner {
    devices: RwLock<HashMap<String, Arc<Blink1>>>,
    events: broadcast::Sender<RegistryEvent>,
    backend: Arc<dyn DeviceBackend>,
    config: Blink1Config,
}

impl Inner {
    fn apply(&self, event: DiscoveryEvent) -> Result<(), Blink1Error> {
        match event {
            DiscoveryEvent::Added(descriptor) => self.add(descriptor),
            DiscoveryEvent::Updated(descriptor) => self.update(&descriptor),
            DiscoveryEvent::Removed(id) => self.remove(&id),
        }
    }

    fn add(&self, descriptor: DeviceDescriptor) -> Result<(), Blink1Error> {
        let device = {
            let mut devices = self.devices.write();
            if devices.contains_key(&descriptor.id) {
                return Err(Blink1Error::DuplicateDevice(descriptor.id));
            }
            let device = Arc::new(Blink1::new(
                descriptor,
                Arc::clone(&self.backend),
                &self.config,
            ));
            devices.insert(device.id().to_string(), Arc::clone(&device));
            device
        };

        info!(
            "Device added: {} at {}",
            device.descriptor().display_name(),
            device.id()
        );
        // No subscribers is not an error
        let _ = self.events.send(RegistryEvent::DeviceAdded(device));
        Ok(())
    }

    fn update(&self, descriptor: &DeviceDescriptor) -> Result<(), Blink1Error> {
        let devices = self.devices.read();
        let device = devices
            .get(&descriptor.id)
            .ok_or_else(|| Blink1Error::UnknownDevice(descriptor.id.clone()))?;
        device.update_descriptor(descriptor);
        debug!("Device updated: {}", descriptor.id);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), Blink1Error> {
        let device = self
            .devices
            .write()
            .remove(id)
            .ok_or_else(|| Blink1Error::UnknownDevice(id.to_string()))?;
        device.mark_detached();

        info!("Device removed: {}", id);
        let _ = self.events.send(RegistryEvent::DeviceRemoved(device));
        Ok(())
    }
}

struct WatchTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    watcher: Option<JoinHandle<()>>,
}

impl WatchTask {
    /// The loop ends by itself once its source is dropped
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Whether `slot` holds a live loop. A finished loop is cleared.
fn occupied(slot: &mut Option<WatchTask>) -> bool {
    if slot.as_ref().is_some_and(|task| !task.is_running()) {
        if let Some(watcher) = slot.take().and_then(|task| task.watcher) {
            watcher.abort();
        }
    }
    slot.is_some()
}

/// Registry of attached blink(1) devices
///
/// The map is the single source of truth for which devices exist; all
/// mutation goes through [`Blink1Registry::apply`].
pub struct Blink1Registry {
    inner: Arc<Inner>,
    watch_task: Mutex<Option<WatchTask>>,
}

impl Blink1Registry {
    /// Create an idle registry. Nothing is enumerated until a source is attached.
    pub fn new(backend: Arc<dyn DeviceBackend>, config: Blink1Config) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                devices: RwLock::new(HashMap::new()),
                events,
                backend,
                config,
            }),
            watch_task: Mutex::new(None),
        }
    }

    /// Open hidapi and start watching for blink(1) devices
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: Blink1Config) -> Result<Self, Blink1Error> {
        config.validate()?;
        let backend = Arc::new(HidApiBackend::new()?);
        let registry = Self::new(backend, config);
        registry.watch_backend()?;
        Ok(registry)
    }

    /// Attach a polling watcher over this registry's backend
    pub fn watch_backend(&self) -> Result<(), Blink1Error> {
        let mut slot = self.watch_task.lock();
        if occupied(&mut slot) {
            return Err(Blink1Error::AlreadyWatching);
        }
        let watcher = PollingWatcher::new(
            Arc::clone(&self.inner.backend),
            self.inner.config.poll_interval(),
        );
        let (rx, watcher) = watcher.spawn(self.inner.config.event_capacity);
        *slot = Some(self.spawn_loop(rx, Some(watcher)));
        Ok(())
    }

    /// Attach an arbitrary notification source
    ///
    /// Events are applied in the order they are received. Errors are logged
    /// and the loop keeps going; it ends when the sender side is dropped or
    /// on [`Blink1Registry::shutdown`]. Once it has ended a new source can be
    /// attached.
    pub fn watch(&self, events: mpsc::Receiver<DiscoveryEvent>) -> Result<(), Blink1Error> {
        let mut slot = self.watch_task.lock();
        if occupied(&mut slot) {
            return Err(Blink1Error::AlreadyWatching);
        }
        *slot = Some(self.spawn_loop(events, None));
        Ok(())
    }

    fn spawn_loop(
        &self,
        mut events: mpsc::Receiver<DiscoveryEvent>,
        watcher: Option<JoinHandle<()>>,
    ) -> WatchTask {
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let id = event.id().to_string();
                match inner.apply(event) {
                    Ok(()) => {}
                    Err(e @ Blink1Error::DuplicateDevice(_)) => {
                        error!("Rejected add notification for {}: {}", id, e)
                    }
                    Err(e) => warn!("Registry out of sync at {}: {}", id, e),
                }
            }
            debug!("Registry watch loop ended");
        });

        WatchTask {
            shutdown,
            handle,
            watcher,
        }
    }

    /// Stop watching and wait for the background tasks to finish
    ///
    /// Registered devices stay in the map.
    pub async fn shutdown(&self) {
        let task = self.watch_task.lock().take();
        let Some(task) = task else {
            return;
        };

        let _ = task.shutdown.send(());
        if let Err(e) = task.handle.await {
            warn!("Registry watch loop failed: {}", e);
        }
        // The loop dropped its receiver, so the watcher sees a closed channel
        if let Some(watcher) = task.watcher {
            if let Err(e) = watcher.await {
                warn!("Hot-plug watcher failed: {}", e);
            }
        }
        info!("Registry stopped");
    }

    /// Apply one discovery event
    ///
    /// # Errors
    /// - [`Blink1Error::DuplicateDevice`] for an add on a registered id;
    ///   nothing is replaced and no event fires
    /// - [`Blink1Error::UnknownDevice`] for an update or remove on an id that
    ///   is not registered
    pub fn apply(&self, event: DiscoveryEvent) -> Result<(), Blink1Error> {
        self.inner.apply(event)
    }

    /// Subscribe to add/remove notifications
    ///
    /// Drop the receiver to unsubscribe. A receiver that falls more than
    /// `event_capacity` events behind gets `RecvError::Lagged` and skips ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    /// Point-in-time snapshot of registered devices, in no particular order
    pub fn devices(&self) -> Vec<Arc<Blink1>> {
        self.inner.devices.read().values().cloned().collect()
    }

    /// Look up a device by id
    pub fn get(&self, id: &str) -> Option<Arc<Blink1>> {
        self.inner.devices.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.devices.read().is_empty()
    }

    /// Whether a notification source is attached and its loop still runs
    pub fn is_watching(&self) -> bool {
        occupied(&mut self.watch_task.lock())
    }

    pub fn config(&self) -> &Blink1Config {
        &self.inner.config
    }
}

impl Drop for Blink1Registry {
    fn drop(&mut self) {
        if let Some(task) = self.watch_task.get_mut().take() {
            task.handle.abort();
            if let Some(watcher) = task.watcher {
                watcher.abort();
            }
        }
    }
}

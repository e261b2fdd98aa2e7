//! Hot-plug watcher
//!
//! Polls a [`DeviceBackend`] and turns consecutive enumeration snapshots
//! into [`DiscoveryEvent`]s. The first poll reports every attached device as
//! added.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::types::{DeviceDescriptor, DiscoveryEvent};
use crate::DeviceBackend;

/// Default time between enumerations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Compute events that turn `known` into `current`
///
/// Events come out as removals, then metadata updates, then additions.
/// Removals are sorted by id; additions keep enumeration order. Duplicate ids
/// in `current` are collapsed to their first occurrence.
pub fn diff_snapshots(
    known: &HashMap<String, DeviceDescriptor>,
    current: &[DeviceDescriptor],
) -> Vec<DiscoveryEvent> {
    let mut seen = HashSet::new();
    let current: Vec<&DeviceDescriptor> = current
        .iter()
        .filter(|d| seen.insert(d.id.as_str()))
        .collect();

    let mut removed: Vec<&String> = known
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .collect();
    removed.sort();

    let mut events: Vec<DiscoveryEvent> = removed
        .into_iter()
        .map(|id| DiscoveryEvent::Removed(id.clone()))
        .collect();

    for device in &current {
        if let Some(old) = known.get(&device.id) {
            if old != *device {
                events.push(DiscoveryEvent::Updated((*device).clone()));
            }
        }
    }

    for device in &current {
        if !known.contains_key(&device.id) {
            events.push(DiscoveryEvent::Added((*device).clone()));
        }
    }

    events
}

/// Polling hot-plug source
pub struct PollingWatcher {
    backend: Arc<dyn DeviceBackend>,
    interval: Duration,
    known: HashMap<String, DeviceDescriptor>,
}

impl PollingWatcher {
    pub fn new(backend: Arc<dyn DeviceBackend>, interval: Duration) -> Self {
        Self {
            backend,
            interval,
            known: HashMap::new(),
        }
    }

    /// Enumerate once and return what changed since the previous poll
    ///
    /// On error the known snapshot is kept, so the next successful poll
    /// reports the accumulated difference.
    pub async fn poll(&mut self) -> Result<Vec<DiscoveryEvent>, TransportError> {
        let current = self.backend.list_devices().await?;
        let events = diff_snapshots(&self.known, &current);
        self.known = current.into_iter().map(|d| (d.id.clone(), d)).collect();
        Ok(events)
    }

    /// Run the watcher on the tokio runtime
    ///
    /// The task ends when the returned receiver is dropped.
    pub fn spawn(self, capacity: usize) -> (mpsc::Receiver<DiscoveryEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(mut self, tx: mpsc::Sender<DiscoveryEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Hot-plug watcher started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = ticker.tick() => {}
            }

            let events = match self.poll().await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Device enumeration failed, retrying next tick: {}", e);
                    continue;
                }
            };

            for event in events {
                debug!("Discovery event: {:?}", event);
                if tx.send(event).await.is_err() {
                    info!("Hot-plug watcher stopped");
                    return;
                }
            }
        }

        info!("Hot-plug watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.to_string(),
            vendor_id: 0x27B8,
            product_id: 0x01ED,
            usage_page: 0xFF00,
            usage: 0x0001,
            serial: Some(format!("serial-{id}")),
            manufacturer: Some("ThingM".into()),
            product_name: Some("blink(1) mk3".into()),
            release_number: 3,
        }
    }

    fn snapshot(devices: &[DeviceDescriptor]) -> HashMap<String, DeviceDescriptor> {
        devices.iter().map(|d| (d.id.clone(), d.clone())).collect()
    }

    #[test]
    fn test_first_snapshot_adds_everything() {
        let current = vec![descriptor("a"), descriptor("b")];
        let events = diff_snapshots(&HashMap::new(), &current);
        assert_eq!(
            events,
            vec![
                DiscoveryEvent::Added(descriptor("a")),
                DiscoveryEvent::Added(descriptor("b")),
            ]
        );
    }

    #[test]
    fn test_unchanged_snapshot_is_quiet() {
        let devices = vec![descriptor("a")];
        assert!(diff_snapshots(&snapshot(&devices), &devices).is_empty());
    }

    #[test]
    fn test_removed_then_updated_then_added() {
        let known = snapshot(&[descriptor("a"), descriptor("b")]);
        let mut changed = descriptor("b");
        changed.serial = Some("reflashed".into());
        let current = vec![changed.clone(), descriptor("c")];

        let events = diff_snapshots(&known, &current);
        assert_eq!(
            events,
            vec![
                DiscoveryEvent::Removed("a".into()),
                DiscoveryEvent::Updated(changed),
                DiscoveryEvent::Added(descriptor("c")),
            ]
        );
    }

    /// Backend that replays a fixed sequence of enumeration results
    struct ScriptedBackend {
        script: parking_lot::Mutex<std::collections::VecDeque<Option<Vec<DeviceDescriptor>>>>,
    }

    #[async_trait::async_trait]
    impl DeviceBackend for ScriptedBackend {
        async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
            match self.script.lock().pop_front().flatten() {
                Some(devices) => Ok(devices),
                None => Err(TransportError::HidError("enumeration failed".into())),
            }
        }

        async fn open_device(
            &self,
            descriptor: &DeviceDescriptor,
        ) -> Result<Arc<dyn crate::FeatureDevice>, TransportError> {
            Err(TransportError::DeviceNotFound(descriptor.id.clone()))
        }
    }

    #[tokio::test]
    async fn test_poll_keeps_snapshot_across_errors() {
        let backend = Arc::new(ScriptedBackend {
            script: parking_lot::Mutex::new(
                vec![Some(vec![descriptor("a")]), None, Some(vec![])].into(),
            ),
        });
        let mut watcher = PollingWatcher::new(backend, DEFAULT_POLL_INTERVAL);

        assert_eq!(
            watcher.poll().await.unwrap(),
            vec![DiscoveryEvent::Added(descriptor("a"))]
        );
        assert!(watcher.poll().await.is_err());
        assert_eq!(
            watcher.poll().await.unwrap(),
            vec![DiscoveryEvent::Removed("a".into())]
        );
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let current = vec![descriptor("a"), descriptor("a")];
        let events = diff_snapshots(&HashMap::new(), &current);
        assert_eq!(events.len(), 1);
    }
}

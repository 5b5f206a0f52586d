//! Reclamation Module
//!
//! Soft values and the memory manager that may clear them.
//!
//! A [`SoftValue`] keeps its value in a shared cell. The [`MemoryPressure`]
//! service holds weak handles to every cell created by a reclaimable map and,
//! when asked to shed, empties cells and posts the owning entry's id on that
//! map's notification queue. The map drains the queue on its next operation
//! and unlinks the dead entries directly by id.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::info;

use crate::cache::EntryId;
use crate::error::{CacheError, Result};

/// Tracked handles are swept for dead cells after this many registrations.
const PRUNE_INTERVAL: u64 = 1024;

// == Reclaimable ==
/// A value holder the memory manager can empty.
pub trait Reclaimable: Send + Sync {
    /// Clears the held value and notifies its owner.
    ///
    /// Returns false if the value was already gone.
    fn reclaim(&self) -> bool;
}

struct SoftCell<V> {
    value: Mutex<Option<V>>,
    entry: EntryId,
    notify: Sender<EntryId>,
}

impl<V: Send> Reclaimable for SoftCell<V> {
    fn reclaim(&self) -> bool {
        if self.value.lock().take().is_none() {
            return false;
        }
        // The receiving map may already be gone; nothing left to purge then.
        let _ = self.notify.send(self.entry);
        true
    }
}

// == Soft Value ==
/// Value behind a reclaimable indirection.
pub struct SoftValue<V> {
    cell: Arc<SoftCell<V>>,
}

impl<V: Clone> SoftValue<V> {
    /// Returns a copy of the value unless it has been reclaimed.
    pub fn get(&self) -> Option<V> {
        self.cell.value.lock().clone()
    }
}

impl<V> SoftValue<V> {
    pub fn take(&self) -> Option<V> {
        self.cell.value.lock().take()
    }

    pub fn is_reclaimed(&self) -> bool {
        self.cell.value.lock().is_none()
    }

    /// Empties the cell without posting a notification.
    pub fn release(&self) {
        self.cell.value.lock().take();
    }
}

impl<V> fmt::Debug for SoftValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftValue")
            .field("entry", &self.cell.entry)
            .field("reclaimed", &self.is_reclaimed())
            .finish()
    }
}

// == Reclaim Queue ==
/// Per-map notification queue for reclaimed entries.
pub struct ReclaimQueue {
    sender: Sender<EntryId>,
    receiver: Receiver<EntryId>,
    pressure: Arc<MemoryPressure>,
}

impl ReclaimQueue {
    pub fn new(pressure: Arc<MemoryPressure>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            pressure,
        }
    }

    /// Wraps `value` for the entry `entry` and registers it with the memory manager.
    pub fn soft<V: Send + 'static>(&self, value: V, entry: EntryId) -> SoftValue<V> {
        let cell = Arc::new(SoftCell {
            value: Mutex::new(Some(value)),
            entry,
            notify: self.sender.clone(),
        });
        let tracked: Arc<dyn Reclaimable> = cell.clone();
        self.pressure.track(Arc::downgrade(&tracked));
        SoftValue { cell }
    }

    /// Takes every pending notification without blocking.
    pub fn drain(&self) -> Vec<EntryId> {
        self.receiver.try_iter().collect()
    }
}

impl fmt::Debug for ReclaimQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReclaimQueue")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

// == Memory Pressure ==
/// Memory manager for soft values.
///
/// Shedding clears the oldest tracked values first.
#[derive(Default)]
pub struct MemoryPressure {
    tracked: Mutex<VecDeque<Weak<dyn Reclaimable>>>,
    registrations: AtomicU64,
    reclaimed: AtomicU64,
}

impl MemoryPressure {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, cell: Weak<dyn Reclaimable>) {
        let mut tracked = self.tracked.lock();
        tracked.push_back(cell);
        let seen = self.registrations.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % PRUNE_INTERVAL == 0 {
            tracked.retain(|weak| weak.strong_count() > 0);
        }
    }

    /// Number of soft values still alive.
    pub fn tracked(&self) -> usize {
        self.tracked
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Reclaims the oldest `fraction` of tracked soft values.
    ///
    /// `fraction` must lie in `(0, 1]`. Returns how many values were cleared.
    pub fn shed(&self, fraction: f64) -> Result<usize> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(CacheError::InvalidArgument(format!(
                "Shed fraction must be in (0, 1], got {}",
                fraction
            )));
        }

        let victims: Vec<Arc<dyn Reclaimable>> = {
            let mut tracked = self.tracked.lock();
            tracked.retain(|weak| weak.strong_count() > 0);
            let count = ((tracked.len() as f64) * fraction).ceil() as usize;
            let count = count.min(tracked.len());
            tracked
                .drain(..count)
                .filter_map(|weak| weak.upgrade())
                .collect()
        };

        let cleared = victims.iter().filter(|cell| cell.reclaim()).count();
        self.reclaimed.fetch_add(cleared as u64, Ordering::Relaxed);
        info!("Memory pressure: reclaimed {} soft values", cleared);
        Ok(cleared)
    }

    /// Reclaims every tracked soft value.
    pub fn shed_all(&self) -> usize {
        // 1.0 is always in range
        self.shed(1.0).unwrap_or_default()
    }

    /// Total values cleared over the lifetime of this manager.
    pub fn total_reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPressure")
            .field("tracked", &self.tracked.lock().len())
            .field("reclaimed", &self.total_reclaimed())
            .finish()
    }
}

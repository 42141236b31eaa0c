//! Admission control for frame fetches
//!
//! A counting semaphore whose capacity follows `QualitySettings::max_concurrent_loads`.
//! The capacity is read on every acquisition attempt, so a change applies to the
//! next acquire. Permits already held when the capacity shrinks are honored until
//! they are dropped.

use crate::quality::QualityReader;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug)]
pub struct AdmissionGate {
    settings: QualityReader,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
    released: Notify,
}

/// A held admission slot; released exactly once when dropped
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    pub fn new(settings: QualityReader) -> Self {
        Self {
            settings,
            in_use: AtomicUsize::new(0),
            peak_in_use: AtomicUsize::new(0),
            released: Notify::new(),
        }
    }

    /// Current capacity as read from the shared settings
    pub fn capacity(&self) -> usize {
        self.settings.max_concurrent_loads()
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Highest number of permits held at once since creation
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use.load(Ordering::Acquire)
    }

    /// Take a slot if one is free under the current capacity
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let capacity = self.capacity();
        let mut current = self.in_use.load(Ordering::Acquire);
        loop {
            if current >= capacity {
                return None;
            }
            match self.in_use.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.peak_in_use.fetch_max(current + 1, Ordering::AcqRel);
                    return Some(GatePermit { gate: self });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Wait until a slot is free. Cancel-safe: dropping the future takes nothing.
    pub async fn acquire(&self) -> GatePermit<'_> {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let mut settings_changed = self.settings.watcher();
            if let Some(permit) = self.try_acquire() {
                return permit;
            }

            debug!(
                "Admission gate full ({}/{}), waiting",
                self.in_use(),
                self.capacity()
            );
            let publisher_gone = tokio::select! {
                _ = released.as_mut() => false,
                changed = settings_changed.changed() => changed.is_err(),
            };
            if publisher_gone {
                // Capacity is frozen from here on; only a release can free a slot.
                released.as_mut().await;
            }
        }
    }

    fn release(&self) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        self.released.notify_waiters();
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{quality_channel, QualitySettings, QualityTier};
    use std::sync::Arc;
    use std::time::Duration;

    fn settings_with_capacity(capacity: usize) -> QualitySettings {
        let mut settings = QualitySettings::for_tier(QualityTier::Medium);
        settings.max_concurrent_loads = capacity;
        settings
    }

    #[test]
    fn test_try_acquire_respects_capacity() {
        let (_publisher, reader) = quality_channel(settings_with_capacity(2));
        let gate = AdmissionGate::new(reader);

        let a = gate.try_acquire();
        let b = gate.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(gate.try_acquire().is_none());

        drop(a);
        assert_eq!(gate.in_use(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_shrinking_capacity_honors_held_permits() {
        let (publisher, reader) = quality_channel(settings_with_capacity(3));
        let gate = AdmissionGate::new(reader);

        let held: Vec<_> = (0..3).filter_map(|_| gate.try_acquire()).collect();
        assert_eq!(held.len(), 3);

        publisher.publish(settings_with_capacity(1));
        assert_eq!(gate.in_use(), 3);
        assert!(gate.try_acquire().is_none());

        drop(held);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_release() {
        let (_publisher, reader) = quality_channel(settings_with_capacity(1));
        let gate = Arc::new(AdmissionGate::new(reader));

        let permit = gate.try_acquire().unwrap();
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
                gate.in_use()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(permit);

        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_capacity_increase() {
        let (publisher, reader) = quality_channel(settings_with_capacity(1));
        let gate = Arc::new(AdmissionGate::new(reader));

        let _held = gate.try_acquire().unwrap();
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(settings_with_capacity(2));

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after capacity grows")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_acquire_leaks_nothing() {
        let (_publisher, reader) = quality_channel(settings_with_capacity(1));
        let gate = AdmissionGate::new(reader);

        let held = gate.try_acquire().unwrap();
        let attempt = tokio::time::timeout(Duration::from_millis(10), gate.acquire()).await;
        assert!(attempt.is_err());

        drop(held);
        assert_eq!(gate.in_use(), 0);
    }
}

//! In-flight load ledger.
//!
//! One entry per package name currently being loaded. The first caller to
//! acquire a name gets a [`LedgerGuard`]; later callers get a receiver that
//! resolves when the guard is dropped, on every exit path. Waiters must
//! re-check residency after the release instead of trusting what they saw
//! before waiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bundlekit_core::FetchError;
use tokio::sync::watch;
use tokio::time::Instant;

type Slots = Arc<Mutex<HashMap<String, watch::Sender<()>>>>;

/// Per-package mutual exclusion for loads.
#[derive(Debug, Clone, Default)]
pub struct LoadLedger {
    slots: Slots,
}

/// Outcome of [`LoadLedger::acquire`].
#[derive(Debug)]
pub enum LedgerSlot {
    /// The caller owns the name until the guard drops.
    Acquired(LedgerGuard),
    /// Another caller owns the name.
    Busy(LedgerWait),
}

/// Exclusive claim on one package name.
#[derive(Debug)]
pub struct LedgerGuard {
    slots: Slots,
    name: String,
}

impl Drop for LedgerGuard {
    fn drop(&mut self) {
        // Dropping the sender wakes every waiter
        lock(&self.slots).remove(&self.name);
    }
}

/// Handle for waiting until a busy name is released.
#[derive(Debug)]
pub struct LedgerWait {
    release: watch::Receiver<()>,
}

impl LedgerWait {
    /// Wait for the release, failing with [`FetchError::Timeout`] once
    /// `deadline` passes.
    pub async fn released_by(mut self, deadline: Option<Instant>) -> Result<(), FetchError> {
        let released = async move {
            while self.release.changed().await.is_ok() {}
        };
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, released)
                .await
                .map_err(|_| FetchError::Timeout),
            None => {
                released.await;
                Ok(())
            }
        }
    }
}

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, watch::Sender<()>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoadLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, or get a handle to wait for the current owner.
    pub fn acquire(&self, name: &str) -> LedgerSlot {
        let mut slots = lock(&self.slots);
        if let Some(sender) = slots.get(name) {
            return LedgerSlot::Busy(LedgerWait {
                release: sender.subscribe(),
            });
        }
        let (sender, _) = watch::channel(());
        slots.insert(name.to_string(), sender);
        LedgerSlot::Acquired(LedgerGuard {
            slots: Arc::clone(&self.slots),
            name: name.to_string(),
        })
    }

    /// Whether `name` is being loaded.
    pub fn is_in_flight(&self, name: &str) -> bool {
        lock(&self.slots).contains_key(name)
    }

    /// Names being loaded.
    pub fn in_flight(&self) -> Vec<String> {
        lock(&self.slots).keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_acquire_waits_for_release() {
        let ledger = LoadLedger::new();
        let LedgerSlot::Acquired(guard) = ledger.acquire("p") else {
            panic!("first acquire must succeed");
        };
        let LedgerSlot::Busy(wait) = ledger.acquire("p") else {
            panic!("second acquire must wait");
        };
        assert!(ledger.is_in_flight("p"));

        let waiter = tokio::spawn(wait.released_by(None));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap().unwrap();
        assert!(!ledger.is_in_flight("p"));
        assert!(matches!(ledger.acquire("p"), LedgerSlot::Acquired(_)));
    }

    #[tokio::test]
    async fn test_release_on_early_return() {
        let ledger = LoadLedger::new();
        let failing = || -> Result<(), &'static str> {
            let _guard = match ledger.acquire("p") {
                LedgerSlot::Acquired(guard) => guard,
                LedgerSlot::Busy(_) => return Err("busy"),
            };
            Err("download failed")
        };
        assert_eq!(failing(), Err("download failed"));
        assert!(ledger.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_wait_honours_deadline() {
        let ledger = LoadLedger::new();
        let _guard = ledger.acquire("p");
        let LedgerSlot::Busy(wait) = ledger.acquire("p") else {
            panic!("second acquire must wait");
        };
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(wait.released_by(Some(deadline)).await, Err(FetchError::Timeout));
    }

    #[test]
    fn test_names_are_independent() {
        let ledger = LoadLedger::new();
        let _a = ledger.acquire("a");
        assert!(matches!(ledger.acquire("b"), LedgerSlot::Acquired(_)));
    }
}

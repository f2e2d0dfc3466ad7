//! Bounded pool of automated browser processes.
//!
//! Acquisition is a coarse polling semaphore: reuse a free handle, launch a
//! new one while under capacity, otherwise sleep a fixed interval and retry
//! until the acquisition timeout elapses or the caller cancels.

use crate::error::{BrowserError, Result};
use crate::launcher::{BrowserInstance, BrowserLauncher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Pool sizing and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of concurrently open browsers
    pub capacity: usize,
    /// Uses after which a browser is closed on release
    pub max_uses: u32,
    /// Upper bound on time spent waiting in `acquire`
    pub acquire_timeout: Duration,
    /// Sleep between acquisition attempts while saturated
    pub poll_interval: Duration,
}

impl PoolSettings {
    /// Settings from the `[browser]` config section.
    #[must_use]
    pub fn from_config(config: &aivis_core::BrowserConfig) -> Self {
        Self {
            capacity: config.pool_size,
            max_uses: config.max_uses_per_browser,
            acquire_timeout: config.acquire_timeout(),
            poll_interval: config.acquire_poll_interval(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&aivis_core::BrowserConfig::default())
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub in_use: usize,
    pub launching: usize,
}

struct Slot<I> {
    id: u64,
    instance: Arc<I>,
    uses: u32,
    in_use: bool,
    created_at: Instant,
}

struct PoolState<I> {
    slots: Vec<Slot<I>>,
    /// Launches in flight; counted against capacity
    launching: usize,
    next_id: u64,
}

impl<I: BrowserInstance> PoolState<I> {
    /// Drop idle handles whose process has disconnected.
    fn prune_disconnected(&mut self) {
        let before = self.slots.len();
        self.slots
            .retain(|slot| slot.in_use || slot.instance.is_connected());
        let pruned = before - self.slots.len();
        if pruned > 0 {
            tracing::warn!("Pruned {} disconnected browser(s) from pool", pruned);
        }
    }
}

enum Attempt<I> {
    Reused(u64, Arc<I>),
    Launch,
    Saturated,
}

struct PoolInner<L: BrowserLauncher> {
    launcher: L,
    settings: PoolSettings,
    state: Mutex<PoolState<L::Instance>>,
    shutdown: CancellationToken,
}

impl<L: BrowserLauncher> PoolInner<L> {
    /// Launch into a reserved slot and register the browser as leased.
    async fn launch_slot(&self) -> Result<(u64, Arc<L::Instance>)> {
        let launched = self.launcher.launch().await;

        let mut state = self.state.lock().await;
        state.launching -= 1;
        let instance = Arc::new(launched?);

        if self.shutdown.is_cancelled() {
            drop(state);
            if let Err(e) = instance.close().await {
                tracing::debug!("Failed to close browser launched during shutdown: {}", e);
            }
            return Err(BrowserError::Cancelled);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.slots.push(Slot {
            id,
            instance: Arc::clone(&instance),
            uses: 1,
            in_use: true,
            created_at: Instant::now(),
        });
        tracing::debug!("Browser {} launched ({} in pool)", id, state.slots.len());
        Ok((id, instance))
    }

    async fn release_slot(&self, id: u64) {
        let evicted = {
            let mut state = self.state.lock().await;
            let Some(index) = state.slots.iter().position(|slot| slot.id == id) else {
                return;
            };

            let slot = &mut state.slots[index];
            slot.in_use = false;

            if slot.uses >= self.settings.max_uses {
                tracing::info!(
                    "Recycling browser {} after {} uses ({:?} old)",
                    slot.id,
                    slot.uses,
                    slot.created_at.elapsed()
                );
                Some(state.slots.remove(index).instance)
            } else if !slot.instance.is_connected() {
                tracing::warn!("Released browser {} is disconnected, evicting", slot.id);
                Some(state.slots.remove(index).instance)
            } else {
                None
            }
        };

        if let Some(instance) = evicted {
            if let Err(e) = instance.close().await {
                tracing::debug!("Failed to close recycled browser: {}", e);
            }
        }
    }
}

/// Pool of browser processes shared by all engines.
///
/// Cloning is cheap; clones share the same handle set.
pub struct BrowserPool<L: BrowserLauncher> {
    inner: Arc<PoolInner<L>>,
}

impl<L: BrowserLauncher> Clone for BrowserPool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: BrowserLauncher> BrowserPool<L> {
    /// Create an empty pool. Browsers are launched lazily.
    #[must_use]
    pub fn new(launcher: L, settings: PoolSettings) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                launcher,
                settings,
                state: Mutex::new(PoolState {
                    slots: Vec::new(),
                    launching: 0,
                    next_id: 0,
                }),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Pool settings.
    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.inner.settings
    }

    /// Acquire a browser, waiting up to the configured timeout.
    pub async fn acquire(&self) -> Result<PooledBrowser<L>> {
        self.acquire_with_cancel(&CancellationToken::new()).await
    }

    /// Acquire a browser, giving up early if `cancel` fires.
    pub async fn acquire_with_cancel(&self, cancel: &CancellationToken) -> Result<PooledBrowser<L>> {
        let timeout = self.inner.settings.acquire_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(lease) = self.try_acquire().await? {
                return Ok(lease);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("No browser became available within {:?}", timeout);
                return Err(BrowserError::PoolExhausted(timeout));
            }

            tracing::debug!("Waiting for available browser...");
            let wait = self.inner.settings.poll_interval.min(deadline - now);
            tokio::select! {
                () = cancel.cancelled() => return Err(BrowserError::Cancelled),
                () = self.inner.shutdown.cancelled() => return Err(BrowserError::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// One acquisition attempt: reuse, launch, or report saturation.
    async fn try_acquire(&self) -> Result<Option<PooledBrowser<L>>> {
        if self.inner.shutdown.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let attempt = {
            let mut state = self.inner.state.lock().await;
            state.prune_disconnected();

            let max_uses = self.inner.settings.max_uses;
            if let Some(slot) = state
                .slots
                .iter_mut()
                .find(|slot| !slot.in_use && slot.uses < max_uses)
            {
                slot.in_use = true;
                slot.uses += 1;
                Attempt::Reused(slot.id, Arc::clone(&slot.instance))
            } else if state.slots.len() + state.launching < self.inner.settings.capacity {
                state.launching += 1;
                Attempt::Launch
            } else {
                Attempt::Saturated
            }
        };

        match attempt {
            Attempt::Reused(id, instance) => Ok(Some(self.lease(id, instance))),
            Attempt::Saturated => Ok(None),
            Attempt::Launch => {
                // Detached: the slot is registered even if the acquirer is dropped
                let (tx, rx) = oneshot::channel();
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let launched = inner.launch_slot().await;
                    if let Err(Ok((id, _))) = tx.send(launched) {
                        tracing::debug!("Acquirer went away, parking browser {}", id);
                        inner.release_slot(id).await;
                    }
                });

                let (id, instance) = rx.await.map_err(|_| BrowserError::Disconnected)??;
                Ok(Some(self.lease(id, instance)))
            }
        }
    }

    fn lease(&self, id: u64, instance: Arc<L::Instance>) -> PooledBrowser<L> {
        PooledBrowser {
            pool: Arc::clone(&self.inner),
            id,
            instance,
            released: false,
        }
    }

    /// Return a browser to the pool, recycling it past the use threshold.
    pub async fn release(&self, lease: PooledBrowser<L>) {
        lease.release().await;
    }

    /// Current occupancy.
    pub async fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock().await;
        PoolStats {
            total: state.slots.len(),
            in_use: state.slots.iter().filter(|slot| slot.in_use).count(),
            launching: state.launching,
        }
    }

    /// Close every browser and refuse further acquisitions.
    pub async fn close_all(&self) {
        tracing::info!("Closing all browsers");
        self.inner.shutdown.cancel();

        let instances: Vec<_> = {
            let mut state = self.inner.state.lock().await;
            state.slots.drain(..).map(|slot| slot.instance).collect()
        };

        for instance in instances {
            if let Err(e) = instance.close().await {
                tracing::debug!("Failed to close browser during shutdown: {}", e);
            }
        }
    }
}

/// Exclusive lease on a pooled browser.
///
/// Call [`PooledBrowser::release`] when done. A lease dropped without release
/// is returned to the pool on a background task.
pub struct PooledBrowser<L: BrowserLauncher> {
    pool: Arc<PoolInner<L>>,
    id: u64,
    instance: Arc<L::Instance>,
    released: bool,
}

impl<L: BrowserLauncher> PooledBrowser<L> {
    /// The leased browser.
    #[must_use]
    pub fn browser(&self) -> &L::Instance {
        &self.instance
    }

    /// Pool-assigned handle id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return the browser to its pool.
    pub async fn release(mut self) {
        self.released = true;
        self.pool.release_slot(self.id).await;
    }
}

impl<L: BrowserLauncher> std::ops::Deref for PooledBrowser<L> {
    type Target = L::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl<L: BrowserLauncher> Drop for PooledBrowser<L> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let pool = Arc::clone(&self.pool);
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pool.release_slot(id).await });
            }
            Err(_) => tracing::warn!("Browser lease {} dropped outside a runtime", id),
        }
    }
}

//! Bounded free lists for unit shells and async adapter state
//!
//! Pools only amortize allocation: a shell is fully reset before it goes back
//! on a free list, and the `Rc` that gives a unit its identity is never
//! pooled, so reuse is not observable.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::unit::awaitable::{ASendState, ValueWrapper};
use crate::unit::state::{UnitKind, UnitShell};
use crate::util::config::PoolConfig;

/// Reset an object before it is made available for reuse.
pub trait Recycle: Send {
    fn recycle(&mut self);
}

/// Pool statistics.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Allocations that missed the free list
    pub fresh: AtomicUsize,
    /// Acquisitions served from the free list
    pub reused: AtomicUsize,
    /// Objects pushed back onto the free list
    pub released: AtomicUsize,
    /// Objects destroyed because the pool was full or disabled
    pub discarded: AtomicUsize,
}

impl PoolStats {
    #[inline]
    pub fn record_fresh(&self) {
        self.fresh.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn record_released(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
    }

    /// Plain-number copy of the counters
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            fresh: self.fresh.load(Ordering::SeqCst),
            reused: self.reused.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
            discarded: self.discarded.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatsSnapshot {
    pub fresh: usize,
    pub reused: usize,
    pub released: usize,
    pub discarded: usize,
}

/// A bounded LIFO free list of boxed objects.
#[derive(Debug)]
pub struct ShellPool<T> {
    free: Mutex<Vec<Box<T>>>,
    capacity: usize,
    enabled: bool,
    stats: PoolStats,
}

impl<T: Recycle> ShellPool<T> {
    pub fn new(
        capacity: usize,
        enabled: bool,
    ) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
            enabled,
            stats: PoolStats::default(),
        }
    }

    /// Pop a recycled object, or build a fresh one.
    pub fn acquire_with(
        &self,
        fresh: impl FnOnce() -> T,
    ) -> Box<T> {
        if self.enabled {
            if let Some(item) = self.free.lock().pop() {
                self.stats.record_reused();
                return item;
            }
        }
        self.stats.record_fresh();
        Box::new(fresh())
    }

    /// Return an object. It is reset and kept if there is room, dropped
    /// otherwise.
    pub fn release(
        &self,
        mut item: Box<T>,
    ) {
        if !self.enabled {
            self.stats.record_discarded();
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            item.recycle();
            free.push(item);
            self.stats.record_released();
        } else {
            self.stats.record_discarded();
        }
    }

    /// Drop every pooled object, returning how many were freed.
    pub fn drain(&self) -> usize {
        let mut free = self.free.lock();
        let n = free.len();
        free.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

/// Every free list used by the unit machinery.
///
/// One instance is usually shared (through `Arc`) by all execution contexts
/// of a process, but tests and embedders may create isolated ones.
#[derive(Debug)]
pub struct Pools {
    units: [ShellPool<UnitShell>; 3],
    asend: ShellPool<ASendState>,
    wrapped: ShellPool<ValueWrapper>,
}

impl Pools {
    pub fn new(config: &PoolConfig) -> Self {
        let unit_pool = || ShellPool::new(config.unit_capacity, config.enabled);
        Self {
            units: [unit_pool(), unit_pool(), unit_pool()],
            asend: ShellPool::new(config.adapter_capacity, true),
            wrapped: ShellPool::new(config.adapter_capacity, true),
        }
    }

    /// Pools with unit reuse switched off and default adapter capacity
    pub fn disabled() -> Self {
        Self::new(&PoolConfig::default())
    }

    pub(crate) fn acquire_unit(
        &self,
        kind: UnitKind,
    ) -> Box<UnitShell> {
        let pool = &self.units[kind.index()];
        let shell = pool.acquire_with(|| UnitShell::new(kind));
        debug!(kind = %kind, pooled = pool.len(), "acquire unit shell");
        shell
    }

    pub(crate) fn release_unit(
        &self,
        shell: Box<UnitShell>,
    ) {
        self.units[shell.kind.index()].release(shell);
    }

    pub(crate) fn acquire_asend(&self) -> Box<ASendState> {
        self.asend.acquire_with(ASendState::default)
    }

    pub(crate) fn release_asend(
        &self,
        state: Box<ASendState>,
    ) {
        self.asend.release(state);
    }

    pub(crate) fn acquire_wrapper(&self) -> Box<ValueWrapper> {
        self.wrapped.acquire_with(ValueWrapper::default)
    }

    pub(crate) fn release_wrapper(
        &self,
        wrapper: Box<ValueWrapper>,
    ) {
        self.wrapped.release(wrapper);
    }

    /// Shells currently pooled for `kind`
    pub fn unit_pool_len(
        &self,
        kind: UnitKind,
    ) -> usize {
        self.units[kind.index()].len()
    }

    pub fn unit_stats(
        &self,
        kind: UnitKind,
    ) -> PoolStatsSnapshot {
        self.units[kind.index()].stats().snapshot()
    }

    pub fn asend_stats(&self) -> PoolStatsSnapshot {
        self.asend.stats().snapshot()
    }

    pub fn wrapper_stats(&self) -> PoolStatsSnapshot {
        self.wrapped.stats().snapshot()
    }

    /// Empty every free list. Returns the total number of objects freed.
    pub fn drain(&self) -> usize {
        let units: usize = self.units.iter().map(ShellPool::drain).sum();
        let freed = units + self.asend.drain() + self.wrapped.drain();
        debug!(freed, "pools drained");
        freed
    }
}

impl Default for Pools {
    fn default() -> Self {
        Self::disabled()
    }
}

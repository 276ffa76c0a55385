// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keeps one pool alive per link/site, creating pools lazily and
//! recycling the ones the scheduler reports idle each pass.

use crate::pool::{DeletionPool, StagePool, TransferPool};
use fod_core::{LinkKey, StorageEndpoint};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct TransferPoolRegistry {
    max_concurrent: usize,
    pools: Mutex<HashMap<LinkKey, Arc<TransferPool>>>,
}

impl TransferPoolRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, link: &LinkKey) -> Arc<TransferPool> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(link) {
            return Arc::clone(pool);
        }
        let pool = Arc::new(TransferPool::new(link.clone(), self.max_concurrent));
        pools.insert(link.clone(), Arc::clone(&pool));
        pool
    }

    /// Recycle every pool that reports ready, dropping it from the registry.
    pub async fn recycle_idle(&self, hard: bool) {
        let snapshot: Vec<_> = self.pools.lock().values().cloned().collect();
        for pool in snapshot {
            if pool.ready_for_recycle().await {
                pool.recycle(hard).await;
                self.pools.lock().remove(pool.link());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }
}

pub struct DeletionPoolRegistry {
    max_concurrent: usize,
    pools: Mutex<HashMap<StorageEndpoint, Arc<DeletionPool>>>,
}

impl DeletionPoolRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, site: &StorageEndpoint) -> Arc<DeletionPool> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(site) {
            return Arc::clone(pool);
        }
        let pool = Arc::new(DeletionPool::new(site.clone(), self.max_concurrent));
        pools.insert(site.clone(), Arc::clone(&pool));
        pool
    }

    pub async fn recycle_idle(&self, hard: bool) {
        let snapshot: Vec<_> = self.pools.lock().values().cloned().collect();
        for pool in snapshot {
            if pool.ready_for_recycle().await {
                pool.recycle(hard).await;
                self.pools.lock().remove(pool.site());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }
}

pub struct StagePoolRegistry {
    max_concurrent: usize,
    pools: Mutex<HashMap<StorageEndpoint, Arc<StagePool>>>,
}

impl StagePoolRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, site: &StorageEndpoint) -> Arc<StagePool> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(site) {
            return Arc::clone(pool);
        }
        let pool = Arc::new(StagePool::new(site.clone(), self.max_concurrent));
        pools.insert(site.clone(), Arc::clone(&pool));
        pool
    }

    pub async fn recycle_idle(&self, hard: bool) {
        let snapshot: Vec<_> = self.pools.lock().values().cloned().collect();
        for pool in snapshot {
            if pool.ready_for_recycle().await {
                pool.recycle(hard).await;
                self.pools.lock().remove(pool.site());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_pool_for_the_same_link() {
        let registry = TransferPoolRegistry::new(4);
        let link = LinkKey::new("A", "B");
        let a = registry.get_or_create(&link);
        let b = registry.get_or_create(&link);
        assert!(Arc::ptr_eq(&a, &b));
    }
}

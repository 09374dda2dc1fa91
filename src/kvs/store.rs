//! Write-through cached key-value store.
//!
//! Every key has a cache slot that always holds its current value.  Reads
//! are served from the cache; writes go to durable storage first and only
//! touch the cache once the durable write succeeded.
//!
//! The cache and the storage handle sit behind one store-wide lock.
//! Mutating operations acquire it with a bounded wait and report
//! [`KvsError::Busy`] on timeout instead of blocking the caller forever.

use core::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::{KVS_MAX_VALUE_SIZE, KVS_NAMESPACE, KvsEntry, KvsError, KvsKey, KvsValue};
use crate::app::ports::StoragePort;

/// How a key's cache slot was populated at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Value present on durable storage, read at open or written since.
    Loaded,
    /// Default written through to durable storage.
    Seeded,
    /// Default seeding failed; the value only lives in RAM until the next
    /// successful `put`.
    RamOnly,
}

struct StoreInner<S> {
    storage: S,
    cache: [KvsValue; KvsKey::COUNT],
    origin: [EntryOrigin; KvsKey::COUNT],
}

/// The KVS store: cache + durable backend under one lock.
pub struct KeyValueStore<S: StoragePort> {
    inner: Mutex<StoreInner<S>>,
    lock_timeout: Duration,
}

impl<S: StoragePort> KeyValueStore<S> {
    /// Populate the cache from `storage`, seeding defaults where needed.
    ///
    /// Never fails: an entry that cannot be seeded is still served from RAM.
    pub fn open(storage: S, lock_timeout: Duration) -> Self {
        let mut inner = StoreInner {
            storage,
            cache: Default::default(),
            origin: [EntryOrigin::Seeded; KvsKey::COUNT],
        };

        for key in KvsKey::ALL {
            let origin = inner.load_or_seed(key);
            inner.origin[key.index()] = origin;
        }

        info!(
            "KVS: opened, {} loaded / {} seeded / {} RAM-only",
            inner.count(EntryOrigin::Loaded),
            inner.count(EntryOrigin::Seeded),
            inner.count(EntryOrigin::RamOnly),
        );

        Self {
            inner: Mutex::new(inner),
            lock_timeout,
        }
    }

    /// Current cached value of `key`.
    pub fn get(&self, key: KvsKey) -> KvsEntry {
        let inner = self.inner.lock();
        KvsEntry {
            key,
            value: inner.cache[key.index()].clone(),
        }
    }

    /// Validate, persist, then cache `value` under `key`.
    pub fn put(&self, key: KvsKey, value: &[u8]) -> Result<(), KvsError> {
        let staged = KvsValue::from_slice(value).map_err(|_| KvsError::ValueTooLarge)?;
        if !key.value_type().accepts(value) {
            debug!("KVS: rejected put on {} (type mismatch)", key);
            return Err(KvsError::TypeMismatch);
        }

        let mut inner = self.acquire()?;
        inner.write_through(key, staged)?;
        inner.origin[key.index()] = EntryOrigin::Loaded;
        debug!("KVS: {} updated ({} bytes)", key, value.len());
        Ok(())
    }

    /// Whether `key` is present and readable on durable storage.
    pub fn verify(&self, key: KvsKey) -> Result<bool, KvsError> {
        let inner = self.acquire()?;
        Ok(inner.storage.verify(KVS_NAMESPACE, key.nvs_key()).is_ok())
    }

    /// Factory reset: wipe the namespace and reseed every default.
    pub fn erase(&self) -> Result<(), KvsError> {
        let mut inner = self.acquire()?;
        inner.storage.erase_namespace(KVS_NAMESPACE).map_err(|e| {
            warn!("KVS: namespace erase failed: {}", e);
            KvsError::DurableIo
        })?;
        for key in KvsKey::ALL {
            let origin = inner.seed_default(key);
            inner.origin[key.index()] = origin;
        }
        info!("KVS: erased and reseeded");
        Ok(())
    }

    /// Copy of every cached entry, in key order.
    pub fn snapshot(&self) -> [KvsEntry; KvsKey::COUNT] {
        let inner = self.inner.lock();
        core::array::from_fn(|i| KvsEntry {
            key: KvsKey::ALL[i],
            value: inner.cache[i].clone(),
        })
    }

    /// How `key`'s current value got into the cache.
    pub fn origin(&self, key: KvsKey) -> EntryOrigin {
        self.inner.lock().origin[key.index()]
    }

    /// Tear the store down and hand the backend back.
    pub fn close(self) -> S {
        self.inner.into_inner().storage
    }

    fn acquire(&self) -> Result<parking_lot::MutexGuard<'_, StoreInner<S>>, KvsError> {
        self.inner.try_lock_for(self.lock_timeout).ok_or_else(|| {
            warn!("KVS: lock not acquired within {:?}", self.lock_timeout);
            KvsError::Busy
        })
    }
}

impl<S: StoragePort> StoreInner<S> {
    fn load_or_seed(&mut self, key: KvsKey) -> EntryOrigin {
        if self.storage.verify(KVS_NAMESPACE, key.nvs_key()).is_ok() {
            let mut buf = [0u8; KVS_MAX_VALUE_SIZE];
            match self.storage.read(KVS_NAMESPACE, key.nvs_key(), &mut buf) {
                Ok(len) if key.value_type().accepts(&buf[..len]) => {
                    if let Ok(value) = KvsValue::from_slice(&buf[..len]) {
                        self.cache[key.index()] = value;
                        return EntryOrigin::Loaded;
                    }
                }
                Ok(_) => warn!("KVS: stored {} fails its type check, reseeding", key),
                Err(e) => warn!("KVS: stored {} unreadable ({}), reseeding", key, e),
            }
        }
        self.seed_default(key)
    }

    fn seed_default(&mut self, key: KvsKey) -> EntryOrigin {
        let default = key.default_value();
        let mut value = KvsValue::new();
        // Length is checked at compile time next to `default_value`.
        let _ = value.extend_from_slice(default);

        let origin = match self.storage.write(KVS_NAMESPACE, key.nvs_key(), &value) {
            Ok(()) => EntryOrigin::Seeded,
            Err(e) => {
                warn!("KVS: seeding {} failed ({}), serving from RAM only", key, e);
                EntryOrigin::RamOnly
            }
        };
        self.cache[key.index()] = value;
        origin
    }

    fn write_through(&mut self, key: KvsKey, value: KvsValue) -> Result<(), KvsError> {
        self.storage
            .write(KVS_NAMESPACE, key.nvs_key(), &value)
            .map_err(|e| {
                warn!("KVS: durable write of {} failed: {}", key, e);
                KvsError::DurableIo
            })?;
        self.cache[key.index()] = value;
        Ok(())
    }

    fn count(&self, origin: EntryOrigin) -> usize {
        self.origin.iter().filter(|o| **o == origin).count()
    }
}

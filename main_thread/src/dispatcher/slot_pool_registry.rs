// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One [`ResponseSlotPool`] per result type. See [`SlotPoolRegistry`].

use super::ResponseSlotPool;
use std::{any::{Any, TypeId},
          collections::HashMap,
          sync::{Arc, Mutex, PoisonError}};

type ErasedPool = Arc<dyn Any + Send + Sync>;

/// Lazily created [`ResponseSlotPool`]s, keyed by the result type of the call.
///
/// [`call_val::<T>()`] needs slots that carry a `T`. Rather than boxing every value
/// into a `dyn Any`, each `T` gets its own pool of `ResponseSlot<T>`. Only the pool
/// handle is type-erased, and it is recovered with a single [`Arc::downcast()`] per
/// call:
///
/// ```text
/// TypeId::of::<()>             ──► Arc<ResponseSlotPool<()>>            (call)
/// TypeId::of::<i32>            ──► Arc<ResponseSlotPool<i32>>           (call_val)
/// TypeId::of::<Result<(), E>>  ──► Arc<ResponseSlotPool<Result<(), E>>> (call_err)
/// ```
///
/// [`call_val::<T>()`]: super::MainThreadHandle::call_val
#[derive(Debug)]
pub struct SlotPoolRegistry {
    capacity: usize,
    pools: Mutex<HashMap<TypeId, ErasedPool>>,
}

impl SlotPoolRegistry {
    /// Every pool created by this registry holds `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the pool for `T`, creating (and pre-filling) it on first use.
    pub fn pool_for<T: Send + 'static>(&self) -> Arc<ResponseSlotPool<T>> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(erased) = pools.get(&TypeId::of::<T>())
            && let Ok(pool) = Arc::clone(erased).downcast::<ResponseSlotPool<T>>()
        {
            return pool;
        }

        // Only reached on first use: an entry under T's own TypeId always downcasts.
        let pool = Arc::new(ResponseSlotPool::<T>::new(self.capacity));
        let erased: ErasedPool = Arc::<ResponseSlotPool<T>>::clone(&pool);
        pools.insert(TypeId::of::<T>(), erased);
        pool
    }

    /// Number of distinct result types seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_type_shares_one_pool() {
        let registry = SlotPoolRegistry::new(3);
        assert!(registry.is_empty());

        let a = registry.pool_for::<i32>();
        let b = registry.pool_for::<i32>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert_eq!(a.capacity(), 3);
        assert_eq!(a.available(), 3);
    }

    #[test]
    fn test_distinct_types_get_distinct_pools() {
        let registry = SlotPoolRegistry::new(2);
        let _unit = registry.pool_for::<()>();
        let _int = registry.pool_for::<i32>();
        let _opt = registry.pool_for::<Option<i32>>();
        let _res = registry.pool_for::<Result<(), std::io::Error>>();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_loans_are_visible_through_registry() {
        let registry = SlotPoolRegistry::new(2);
        let loan = registry.pool_for::<String>().acquire();
        assert_eq!(registry.pool_for::<String>().available(), 1);
        drop(loan);
        assert_eq!(registry.pool_for::<String>().available(), 2);
    }
}

//! # IDs
//! Every document object carries an identity. This is implemented via the `ObjectID<T>` type, which hands out
//! process-unique IDs namespaced by the type T. Order of IDs is not guaranteed.
//!
//! To get a fresh ID, use `ObjectID<YourObjectTy>`'s `Default` impl. To eagerly acquire many ids, use
//! `ObjectID::many`. IDs read back out of a binary record are rebuilt with [`ObjectID::from_raw`], which
//! reserves them so that nothing allocated afterwards can collide.

use std::sync::atomic::{AtomicU64, Ordering};

// Next available raw ID, by namespace.
static ID_SERVER: parking_lot::RwLock<std::collections::BTreeMap<std::any::TypeId, AtomicU64>> =
    parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// Run `f` on the counter for namespace `T`, creating it (starting at 1) if needed.
fn with_counter<T: std::any::Any, R>(f: impl FnOnce(&AtomicU64) -> R) -> R {
    let ty = std::any::TypeId::of::<T>();
    let read = ID_SERVER.upgradable_read();
    if let Some(counter) = read.get(&ty) {
        f(counter)
    } else {
        // Only happens once per namespace.
        let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
        let counter = write.entry(ty).or_insert_with(|| AtomicU64::new(1));
        f(counter)
    }
}

/// Identity of an object within this execution of the program.
/// IDs with different types may share a value but should not be considered equal.
pub struct ObjectID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for ObjectID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for ObjectID<T> {}
impl<T: std::any::Any> PartialEq for ObjectID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for ObjectID<T> {}
impl<T: std::any::Any> PartialOrd for ObjectID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for ObjectID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

// Safety - it's just a u64. T is only a namespace marker and is never stored,
// so its Send/Sync-ness must not leak onto the ID.
unsafe impl<T: std::any::Any> Send for ObjectID<T> {}
unsafe impl<T: std::any::Any> Sync for ObjectID<T> {}

impl<T: std::any::Any> std::hash::Hash for ObjectID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> ObjectID<T> {
    /// Get the raw numeric value of this ID, as written into binary records.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    /// Allocate many IDs at once. Dropping the returned iterator early does *not* recycle the unused IDs.
    ///
    /// Exhausting the namespace terminates the process (panics under test).
    pub fn many(count: usize) -> impl ExactSizeIterator<Item = Self> {
        let count_u64 = count as u64;
        let start_id = with_counter::<T, _>(|counter| counter.fetch_add(count_u64, Ordering::Relaxed));

        #[allow(clippy::manual_assert)]
        if start_id.checked_add(count_u64).is_none() {
            #[cfg(not(test))]
            {
                log::error!("{} ID overflow! Aborting!", std::any::type_name::<T>());
                log::logger().flush();
                std::process::abort();
            }
            #[cfg(test)]
            {
                panic!("{} ID overflow! Aborting!", std::any::type_name::<T>())
            }
        }

        (0..count).map(move |idx| ObjectID {
            // Counters start at one and overflow was checked above, so this is never zero.
            id: std::num::NonZeroU64::MIN.saturating_add(start_id - 1 + idx as u64),
            _phantom: std::marker::PhantomData,
        })
    }
    /// Rebuild an ID from its raw value, as read from a record. `None` if `raw` is zero.
    ///
    /// The value is reserved: IDs allocated after this call will never equal it.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        let id = std::num::NonZeroU64::new(raw)?;
        with_counter::<T, _>(|counter| {
            counter.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        });
        Some(Self {
            id,
            _phantom: std::marker::PhantomData,
        })
    }
}
impl<T: std::any::Any> Default for ObjectID<T> {
    fn default() -> Self {
        let mut one = Self::many(1);
        // `many(1)` always yields exactly one element.
        match one.next() {
            Some(id) => id,
            None => unreachable!(),
        }
    }
}
impl<T: std::any::Any> std::fmt::Display for ObjectID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for ObjectID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

//! # Versioned objects
//!
//! Every mutable document entity embeds an [`Object`]: a stable identity and a version counter that ticks on
//! every committed change. Caches and redraw logic outside the core compare versions to find what changed -
//! nothing in here knows who's watching.

use crate::id::ObjectID;

/// Monotonic (wrapping) change counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Version(pub u32);

pub struct Object<T: std::any::Any> {
    id: ObjectID<T>,
    version: Version,
}
impl<T: std::any::Any> Object<T> {
    /// A new object with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(ObjectID::default())
    }
    /// An object taking on an existing identity, such as one read back from a record.
    #[must_use]
    pub fn with_id(id: ObjectID<T>) -> Self {
        Self {
            id,
            version: Version::default(),
        }
    }
    #[must_use]
    pub fn id(&self) -> ObjectID<T> {
        self.id
    }
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
    pub fn increment(&mut self) {
        self.version.0 = self.version.0.wrapping_add(1);
    }
}
impl<T: std::any::Any> Default for Object<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: std::any::Any> std::fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@v{}", self.id, self.version.0)
    }
}

/// An entity exposing its [`Object`] header.
pub trait Versioned: Sized + 'static {
    fn object(&self) -> &Object<Self>;
    fn object_mut(&mut self) -> &mut Object<Self>;

    fn id(&self) -> ObjectID<Self> {
        self.object().id()
    }
    fn version(&self) -> Version {
        self.object().version()
    }
    /// Signal that a change was committed.
    fn increment_version(&mut self) {
        self.object_mut().increment();
    }
}

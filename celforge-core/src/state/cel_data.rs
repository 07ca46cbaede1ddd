//! # Cel data
//!
//! The payload a cel places on the canvas: an image, where it goes, and how opaque it is. Linked cels share one
//! [`CelData`] through a [`CelDataRef`], so edits made through any of them are seen by all.

use crate::{
    clock::{self, Tick},
    geometry::{Point, Rect},
    image::ImageRef,
    object::{Object, Versioned},
};

pub type CelDataID = crate::id::ObjectID<CelData>;
pub type CelDataRef = std::sync::Arc<parking_lot::RwLock<CelData>>;

pub struct CelData {
    object: Object<CelData>,
    image: ImageRef,
    position: Point,
    opacity: u8,
    /// Clock of the last change to `position`.
    position_t: Tick,
    /// Clock of the last change to `opacity`.
    opacity_t: Tick,
}
impl Versioned for CelData {
    fn object(&self) -> &Object<Self> {
        &self.object
    }
    fn object_mut(&mut self) -> &mut Object<Self> {
        &mut self.object
    }
}
impl std::fmt::Debug for CelData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelData")
            .field("object", &self.object)
            .field("image", &self.image.read().id())
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .field("position_t", &self.position_t)
            .field("opacity_t", &self.opacity_t)
            .finish()
    }
}
impl CelData {
    /// Fully opaque, at the origin, with zeroed clocks.
    #[must_use]
    pub fn new(image: ImageRef) -> Self {
        Self::with_object(Object::new(), image)
    }
    #[must_use]
    pub fn with_object(object: Object<CelData>, image: ImageRef) -> Self {
        Self {
            object,
            image,
            position: Point::ZERO,
            opacity: u8::MAX,
            position_t: Tick::ZERO,
            opacity_t: Tick::ZERO,
        }
    }
    /// A copy with a new identity. Shares the image, see [`Self::create_copy`] for a deep copy.
    #[must_use]
    pub fn with_image(&self, image: ImageRef) -> Self {
        Self {
            object: Object::new(),
            image,
            position: self.position,
            opacity: self.opacity,
            position_t: self.position_t,
            opacity_t: self.opacity_t,
        }
    }
    /// A copy with a new identity and a new copy of the image.
    #[must_use]
    pub fn create_copy(&self) -> Self {
        let image = self.image.read().create_copy().into_ref();
        self.with_image(image)
    }
    #[must_use]
    pub fn into_ref(self) -> CelDataRef {
        std::sync::Arc::new(parking_lot::RwLock::new(self))
    }
    #[must_use]
    pub fn image(&self) -> &ImageRef {
        &self.image
    }
    /// Replace the image. The old one stays alive for as long as anyone else holds it.
    pub fn set_image(&mut self, image: ImageRef) {
        if !std::sync::Arc::ptr_eq(&self.image, &image) {
            self.image = image;
            self.increment_version();
        }
    }
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }
    #[must_use]
    pub fn opacity(&self) -> u8 {
        self.opacity
    }
    #[must_use]
    pub fn position_tick(&self) -> Tick {
        self.position_t
    }
    #[must_use]
    pub fn opacity_tick(&self) -> Tick {
        self.opacity_t
    }
    /// Area covered on the canvas.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.image.read().bounds().offset(self.position)
    }
    /// Move, advancing the position clock if it actually moved.
    pub fn set_position(&mut self, position: Point) {
        let changed = position != self.position;
        self.position_t = clock::advance(self.position_t, changed);
        if changed {
            self.position = position;
            self.increment_version();
        }
    }
    pub fn set_opacity(&mut self, opacity: u8) {
        let changed = opacity != self.opacity;
        self.opacity_t = clock::advance(self.opacity_t, changed);
        if changed {
            self.opacity = opacity;
            self.increment_version();
        }
    }
    /// Take on a position along with the clock it was set at, as when adopting a newer remote edit.
    pub fn adopt_position(&mut self, position: Point, tick: Tick) {
        self.position = position;
        self.position_t = tick;
        self.increment_version();
    }
    pub fn adopt_opacity(&mut self, opacity: u8, tick: Tick) {
        self.opacity = opacity;
        self.opacity_t = tick;
        self.increment_version();
    }
    /// Set fields verbatim, as read back from a record. Not a change.
    pub fn restore(&mut self, position: Point, opacity: u8, position_t: Tick, opacity_t: Tick) {
        self.position = position;
        self.opacity = opacity;
        self.restore_clocks(position_t, opacity_t);
    }
    pub fn restore_clocks(&mut self, position_t: Tick, opacity_t: Tick) {
        self.position_t = position_t;
        self.opacity_t = opacity_t;
    }
    /// Raise both field clocks to at least `floor`.
    pub fn floor_clocks(&mut self, floor: Tick) {
        self.position_t = self.position_t.max(floor);
        self.opacity_t = self.opacity_t.max(floor);
    }
}

/// Deep copies cel data, copying each distinct data and image once so that sharing is preserved in the copy.
#[derive(Default)]
pub struct DeepCopier {
    /// Raise copied clocks to at least this.
    floor: Option<Tick>,
    // Keyed by address. The sources outlive the copier, so addresses are stable.
    data: hashbrown::HashMap<*const parking_lot::RwLock<CelData>, CelDataRef>,
    images: hashbrown::HashMap<*const parking_lot::RwLock<crate::image::Image>, ImageRef>,
}
impl DeepCopier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Copies have every clock floored to `floor`.
    #[must_use]
    pub fn with_floor(floor: Tick) -> Self {
        Self {
            floor: Some(floor),
            ..Self::default()
        }
    }
    pub fn copy_data(&mut self, data: &CelDataRef) -> CelDataRef {
        let key = std::sync::Arc::as_ptr(data);
        if let Some(copy) = self.data.get(&key) {
            return copy.clone();
        }
        let source = data.read();
        let image = self.copy_image(source.image());
        let mut copy = source.with_image(image);
        if let Some(floor) = self.floor {
            copy.floor_clocks(floor);
        }
        let copy = copy.into_ref();
        self.data.insert(key, copy.clone());
        copy
    }
    pub fn copy_image(&mut self, image: &ImageRef) -> ImageRef {
        let key = std::sync::Arc::as_ptr(image);
        if let Some(copy) = self.images.get(&key) {
            return copy.clone();
        }
        let mut copy = image.read().create_copy();
        if let Some(floor) = self.floor {
            copy.floor_clock(floor);
        }
        let copy = copy.into_ref();
        self.images.insert(key, copy.clone());
        copy
    }
}

use super::{
    cel_data::{CelData, CelDataRef},
    layer::LayerID,
    Frame,
};
use crate::{
    geometry::{Point, Rect},
    image::ImageRef,
    object::{Object, Versioned},
};

pub type CelID = crate::id::ObjectID<Cel>;

/// One frame's placement of some [`CelData`] within a layer.
pub struct Cel {
    object: Object<Cel>,
    /// The layer this is inserted into, if any.
    layer: Option<LayerID>,
    frame: Frame,
    data: CelDataRef,
}
impl Versioned for Cel {
    fn object(&self) -> &Object<Self> {
        &self.object
    }
    fn object_mut(&mut self) -> &mut Object<Self> {
        &mut self.object
    }
}
impl std::fmt::Debug for Cel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cel")
            .field("object", &self.object)
            .field("layer", &self.layer)
            .field("frame", &self.frame)
            .field("data", &self.data.read().id())
            .finish()
    }
}
impl Cel {
    /// A detached cel showing `image`, with fresh data.
    #[must_use]
    pub fn new(frame: Frame, image: ImageRef) -> Self {
        Self::with_data(frame, CelData::new(image).into_ref())
    }
    #[must_use]
    pub fn with_data(frame: Frame, data: CelDataRef) -> Self {
        Self::with_object(Object::new(), frame, data)
    }
    #[must_use]
    pub fn with_object(object: Object<Cel>, frame: Frame, data: CelDataRef) -> Self {
        Self {
            object,
            layer: None,
            frame,
            data,
        }
    }
    /// A detached, independent copy: new data and new image.
    #[must_use]
    pub fn create_copy(&self, frame: Frame) -> Self {
        let data = self.data.read().create_copy().into_ref();
        Self::with_data(frame, data)
    }
    /// A detached cel sharing this one's data.
    #[must_use]
    pub fn create_link(&self, frame: Frame) -> Self {
        Self::with_data(frame, self.data.clone())
    }
    #[must_use]
    pub fn frame(&self) -> Frame {
        self.frame
    }
    /// Move to another frame. Only valid while detached, as the owning layer indexes cels by frame.
    pub fn set_frame(&mut self, frame: Frame) {
        debug_assert!(
            self.layer.is_none(),
            "set_frame on a cel inserted into a layer"
        );
        if let Some(layer) = self.layer {
            log::error!("ignoring set_frame({frame}) on {} still in {layer}", self.id());
            return;
        }
        if frame != self.frame {
            self.frame = frame;
            self.increment_version();
        }
    }
    #[must_use]
    pub fn layer(&self) -> Option<LayerID> {
        self.layer
    }
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.layer.is_some()
    }
    /// Only the owning layer tracks this.
    pub(super) fn set_layer(&mut self, layer: Option<LayerID>) {
        self.layer = layer;
    }
    #[must_use]
    pub fn data(&self) -> &CelDataRef {
        &self.data
    }
    /// Point at different data, releasing the old data if nobody else holds it.
    pub fn set_data_ref(&mut self, data: CelDataRef) {
        if !std::sync::Arc::ptr_eq(&self.data, &data) {
            self.data = data;
            self.increment_version();
        }
    }
    #[must_use]
    pub fn image(&self) -> ImageRef {
        self.data.read().image().clone()
    }
    #[must_use]
    pub fn position(&self) -> Point {
        self.data.read().position()
    }
    #[must_use]
    pub fn opacity(&self) -> u8 {
        self.data.read().opacity()
    }
    /// Visible to every cel linked to this one.
    pub fn set_position(&self, position: Point) {
        self.data.write().set_position(position);
    }
    pub fn set_opacity(&self, opacity: u8) {
        self.data.write().set_opacity(opacity);
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.data.read().bounds()
    }
    /// Whether both cels show the same data.
    #[must_use]
    pub fn shares_data_with(&self, other: &Cel) -> bool {
        std::sync::Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        color::Rgba,
        image::{Image, PixelFormat},
    };

    fn cel() -> Cel {
        Cel::new(Frame(0), Image::new(PixelFormat::Rgb, 4, 4).into_ref())
    }
    #[test]
    fn link_shares_pixels() {
        let a = cel();
        let b = a.create_link(Frame(3));
        assert!(a.shares_data_with(&b));
        assert_eq!(b.frame(), Frame(3));
        a.image().write().put(1, 1, Rgba::WHITE);
        assert_eq!(b.image().read().get::<Rgba>(1, 1), Some(Rgba::WHITE));
        a.set_position(Point::new(2, 2));
        assert_eq!(b.position(), Point::new(2, 2));
    }
    #[test]
    fn copy_is_independent() {
        let a = cel();
        let b = a.create_copy(Frame(1));
        assert!(!a.shares_data_with(&b));
        a.image().write().put(1, 1, Rgba::WHITE);
        assert_eq!(b.image().read().get::<Rgba>(1, 1), Some(Rgba::default()));
    }
    #[test]
    fn set_frame_while_detached() {
        let mut a = cel();
        a.set_frame(Frame(5));
        assert_eq!(a.frame(), Frame(5));
        assert_eq!(a.version().0, 1);
    }
    #[test]
    fn swap_data_ref() {
        let mut a = cel();
        let b = cel();
        let old = a.data().clone();
        a.set_data_ref(b.data().clone());
        assert!(a.shares_data_with(&b));
        // Old data lives on while held.
        assert_eq!(std::sync::Arc::strong_count(&old), 1);
    }
}

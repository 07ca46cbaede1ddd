//! # Sprite
//!
//! The root of the document model: canvas format and size, the frame count, a tree of layers, and the palette.

use super::{
    cel::Cel,
    cel_data::{CelDataID, CelDataRef, DeepCopier},
    layer::{ImageLayer, Layer, LayerID},
    palette::Palette,
    Frame,
};
use crate::{
    geometry::Rect,
    image::{ImageID, ImageRef, PixelFormat},
    object::{Object, Versioned},
};

pub type SpriteID = crate::id::ObjectID<Sprite>;

/// Pre-order walk over a layer tree.
pub struct Layers<'a> {
    stack: smallvec::SmallVec<[std::slice::Iter<'a, Layer>; 4]>,
}
impl<'a> Iterator for Layers<'a> {
    type Item = &'a Layer;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if let Some(layer) = top.next() {
                if let Some(group) = layer.group() {
                    self.stack.push(group.children().iter());
                }
                return Some(layer);
            }
            self.stack.pop();
        }
    }
}

fn find_mut(layers: &mut [Layer], id: LayerID) -> Option<&mut Layer> {
    for layer in layers {
        if layer.id() == id {
            return Some(layer);
        }
        if let Some(group) = layer.group_mut() {
            if let Some(found) = find_mut(&mut group.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_from(layers: &mut Vec<Layer>, id: LayerID) -> Option<Layer> {
    if let Some(idx) = layers.iter().position(|layer| layer.id() == id) {
        return Some(layers.remove(idx));
    }
    layers
        .iter_mut()
        .filter_map(Layer::group_mut)
        .find_map(|group| remove_from(&mut group.children, id))
}

fn for_each_image_layer(layers: &mut [Layer], f: &mut impl FnMut(&mut ImageLayer)) {
    for layer in layers {
        if let Some(image) = layer.image_mut() {
            f(image);
        } else if let Some(group) = layer.group_mut() {
            for_each_image_layer(&mut group.children, f);
        }
    }
}

pub struct Sprite {
    object: Object<Sprite>,
    format: PixelFormat,
    width: u32,
    height: u32,
    frames: u32,
    /// Bottom-first.
    layers: Vec<Layer>,
    pub palette: Palette,
}
impl Versioned for Sprite {
    fn object(&self) -> &Object<Self> {
        &self.object
    }
    fn object_mut(&mut self) -> &mut Object<Self> {
        &mut self.object
    }
}
impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sprite")
            .field("object", &self.object)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frames)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
impl Sprite {
    /// An empty sprite with a single frame and no layers.
    #[must_use]
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            object: Object::new(),
            format,
            width,
            height,
            frames: 1,
            layers: Vec::new(),
            palette: Palette::default(),
        }
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        use az::SaturatingAs;
        Rect::from_size(self.width.saturating_as(), self.height.saturating_as())
    }
    /// Total number of frames. Always at least one.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }
    /// Extend to at least `frames` frames, without moving any cels.
    pub fn ensure_frames(&mut self, frames: u32) -> bool {
        if frames > self.frames {
            self.frames = frames;
            self.increment_version();
            true
        } else {
            false
        }
    }
    /// Insert an empty frame before `at`, shifting later cels over.
    pub fn add_frame(&mut self, at: Frame) {
        let at = Frame(at.0.min(self.frames));
        self.frames = self.frames.saturating_add(1);
        for_each_image_layer(&mut self.layers, &mut |layer| layer.shift_frames(at, true));
        self.increment_version();
    }
    /// Remove frame `at` and every cel on it, shifting later cels back. The last frame can't be removed.
    ///
    /// Returns the removed cels, or `None` if the frame couldn't be removed.
    pub fn remove_frame(&mut self, at: Frame) -> Option<Vec<(LayerID, Cel)>> {
        if at.0 >= self.frames || self.frames == 1 {
            return None;
        }
        let mut removed = Vec::new();
        for_each_image_layer(&mut self.layers, &mut |layer| {
            // Removal detaches, so note the owner first.
            if let Some(owner) = layer.cel(at).and_then(Cel::layer) {
                if let Some(cel) = layer.remove_cel(at) {
                    removed.push((owner, cel));
                }
            }
            layer.shift_frames(Frame(at.0 + 1), false);
        });
        self.frames -= 1;
        self.increment_version();
        Some(removed)
    }
    /// Top-level layers, bottom-first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    pub(crate) fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }
    /// Every layer, groups before their children.
    #[must_use]
    pub fn iter_layers(&self) -> Layers<'_> {
        Layers {
            stack: smallvec::smallvec![self.layers.iter()],
        }
    }
    #[must_use]
    pub fn count_layers(&self) -> usize {
        self.iter_layers().count()
    }
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.iter_layers().find(|layer| layer.id() == id)
    }
    pub fn layer_mut(&mut self, id: LayerID) -> Option<&mut Layer> {
        find_mut(&mut self.layers, id)
    }
    /// The image layer `id`, or `None` if it's missing or a group.
    pub fn image_layer_mut(&mut self, id: LayerID) -> Option<&mut ImageLayer> {
        self.layer_mut(id)?.image_mut()
    }
    /// Add a layer on top of the top level.
    pub fn add_layer(&mut self, layer: Layer) -> LayerID {
        let id = layer.id();
        self.layers.push(layer);
        self.increment_version();
        id
    }
    /// Add a layer on top of `group`'s children. Gives it back if `group` isn't a group of this sprite.
    pub fn add_layer_into(&mut self, group: LayerID, layer: Layer) -> Result<LayerID, Layer> {
        let Some(group) = find_mut(&mut self.layers, group).and_then(Layer::group_mut) else {
            return Err(layer);
        };
        let id = layer.id();
        group.children.push(layer);
        self.increment_version();
        Ok(id)
    }
    /// Take a layer, and everything in it, out of the tree.
    pub fn remove_layer(&mut self, id: LayerID) -> Option<Layer> {
        let removed = remove_from(&mut self.layers, id)?;
        self.increment_version();
        Some(removed)
    }
    /// Find the image shown by any cel.
    #[must_use]
    pub fn find_image(&self, id: ImageID) -> Option<ImageRef> {
        self.iter_layers()
            .filter_map(Layer::image)
            .flat_map(ImageLayer::cels)
            .find_map(|cel| {
                let image = cel.image();
                let found = image.read().id() == id;
                found.then_some(image)
            })
    }
    #[must_use]
    pub fn find_cel_data(&self, id: CelDataID) -> Option<CelDataRef> {
        self.iter_layers()
            .filter_map(Layer::image)
            .flat_map(ImageLayer::cels)
            .find(|cel| cel.data().read().id() == id)
            .map(|cel| cel.data().clone())
    }
    /// Deep copy. Layers and the sprite keep their identity, everything else is new.
    /// Linked cels are still linked in the copy.
    #[must_use]
    pub fn fork(&self) -> Self {
        let mut copier = DeepCopier::new();
        Self {
            object: Object::with_id(self.id()),
            format: self.format,
            width: self.width,
            height: self.height,
            frames: self.frames,
            layers: self
                .layers
                .iter()
                .map(|layer| layer.copy_with(&mut copier, false))
                .collect(),
            palette: self.palette.clone(),
        }
    }
}

//! # Layers
//!
//! Image layers hold at most one [`Cel`] per frame. Group layers hold other layers, bottom-first.

use super::{
    cel::{Cel, CelID},
    cel_data::DeepCopier,
    Frame,
};
use crate::object::{Object, Versioned};

pub type LayerID = crate::id::ObjectID<Layer>;

bitflags::bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    pub struct LayerFlags: u8 {
        const VISIBLE = 0b0000_0001;
        const EDITABLE = 0b0000_0010;
        /// Cels can't be moved.
        const LOCK_MOVE = 0b0000_0100;
        const BACKGROUND = 0b0000_1000;
        /// Prefer linking cels when extending this layer over new frames.
        const CONTINUOUS = 0b0001_0000;
    }
}
impl Default for LayerFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::EDITABLE
    }
}

#[derive(Debug)]
pub struct ImageLayer {
    /// The layer this belongs to, stamped onto inserted cels.
    owner: LayerID,
    cels: std::collections::BTreeMap<Frame, Cel>,
}
impl ImageLayer {
    /// Insert a detached cel at its frame. Gives it back if the frame is already occupied.
    pub fn add_cel(&mut self, mut cel: Cel) -> Result<(), Cel> {
        use std::collections::btree_map::Entry;
        match self.cels.entry(cel.frame()) {
            Entry::Occupied(_) => Err(cel),
            Entry::Vacant(slot) => {
                cel.set_layer(Some(self.owner));
                slot.insert(cel);
                Ok(())
            }
        }
    }
    /// Take the cel at `frame` out, detached.
    pub fn remove_cel(&mut self, frame: Frame) -> Option<Cel> {
        let mut cel = self.cels.remove(&frame)?;
        cel.set_layer(None);
        Some(cel)
    }
    #[must_use]
    pub fn cel(&self, frame: Frame) -> Option<&Cel> {
        self.cels.get(&frame)
    }
    pub fn cel_mut(&mut self, frame: Frame) -> Option<&mut Cel> {
        self.cels.get_mut(&frame)
    }
    #[must_use]
    pub fn cel_by_id(&self, id: CelID) -> Option<&Cel> {
        self.cels.values().find(|cel| cel.id() == id)
    }
    /// Cels in frame order.
    pub fn cels(&self) -> impl DoubleEndedIterator<Item = &Cel> + '_ {
        self.cels.values()
    }
    #[must_use]
    pub fn cel_count(&self) -> usize {
        self.cels.len()
    }
    /// Number of *other* cels in this layer sharing `cel`'s data.
    #[must_use]
    pub fn links(&self, cel: &Cel) -> usize {
        self.cels
            .values()
            .filter(|other| other.frame() != cel.frame() && other.shares_data_with(cel))
            .count()
    }
    /// The earliest other cel sharing `cel`'s data.
    #[must_use]
    pub fn link_source(&self, cel: &Cel) -> Option<&Cel> {
        self.cels
            .values()
            .find(|other| other.frame() != cel.frame() && other.shares_data_with(cel))
    }
    /// Shift every cel at or past `at` by one frame, in either direction.
    pub(super) fn shift_frames(&mut self, at: Frame, forward: bool) {
        let moved = self.cels.split_off(&at);
        for (frame, mut cel) in moved {
            let frame = if forward {
                Frame(frame.0.saturating_add(1))
            } else {
                Frame(frame.0.saturating_sub(1))
            };
            // Briefly detached so the frame may change.
            let owner = cel.layer();
            cel.set_layer(None);
            cel.set_frame(frame);
            cel.set_layer(owner);
            self.cels.insert(frame, cel);
        }
    }
}

#[derive(Debug, Default)]
pub struct GroupLayer {
    /// Bottom-first.
    pub(super) children: Vec<Layer>,
}
impl GroupLayer {
    #[must_use]
    pub fn children(&self) -> &[Layer] {
        &self.children
    }
    pub(crate) fn children_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.children
    }
}

#[derive(Debug, strum::AsRefStr)]
pub enum LayerKind {
    Image(ImageLayer),
    Group(GroupLayer),
}
impl LayerKind {
    /// Whether two kinds are the same variant.
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug)]
pub struct Layer {
    object: Object<Layer>,
    pub name: String,
    pub flags: LayerFlags,
    kind: LayerKind,
}
impl Versioned for Layer {
    fn object(&self) -> &Object<Self> {
        &self.object
    }
    fn object_mut(&mut self) -> &mut Object<Self> {
        &mut self.object
    }
}
impl Layer {
    #[must_use]
    pub fn new_image(name: impl Into<String>) -> Self {
        Self::image_with_object(Object::new(), name)
    }
    pub(super) fn image_with_object(object: Object<Layer>, name: impl Into<String>) -> Self {
        let owner = object.id();
        Self {
            object,
            name: name.into(),
            flags: LayerFlags::default(),
            kind: LayerKind::Image(ImageLayer {
                owner,
                cels: std::collections::BTreeMap::new(),
            }),
        }
    }
    #[must_use]
    pub fn new_group(name: impl Into<String>) -> Self {
        Self::group_with_object(Object::new(), name)
    }
    pub(super) fn group_with_object(object: Object<Layer>, name: impl Into<String>) -> Self {
        Self {
            object,
            name: name.into(),
            flags: LayerFlags::default(),
            kind: LayerKind::Group(GroupLayer::default()),
        }
    }
    #[must_use]
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }
    #[must_use]
    pub fn image(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(image) => Some(image),
            LayerKind::Group(_) => None,
        }
    }
    pub fn image_mut(&mut self) -> Option<&mut ImageLayer> {
        match &mut self.kind {
            LayerKind::Image(image) => Some(image),
            LayerKind::Group(_) => None,
        }
    }
    #[must_use]
    pub fn group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(group) => Some(group),
            LayerKind::Image(_) => None,
        }
    }
    pub fn group_mut(&mut self) -> Option<&mut GroupLayer> {
        match &mut self.kind {
            LayerKind::Group(group) => Some(group),
            LayerKind::Image(_) => None,
        }
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }
    /// Deep copy of this layer and everything in it. Cels always get new identities, layers keep theirs
    /// unless `fresh_ids`.
    pub fn copy_with(&self, copier: &mut DeepCopier, fresh_ids: bool) -> Self {
        let object = if fresh_ids {
            Object::new()
        } else {
            Object::with_id(self.id())
        };
        let mut layer = match &self.kind {
            LayerKind::Image(source) => {
                let mut layer = Self::image_with_object(object, self.name.clone());
                if let LayerKind::Image(target) = &mut layer.kind {
                    for cel in source.cels() {
                        let mut copy = Cel::with_data(cel.frame(), copier.copy_data(cel.data()));
                        copy.set_layer(Some(target.owner));
                        target.cels.insert(cel.frame(), copy);
                    }
                }
                layer
            }
            LayerKind::Group(source) => {
                let mut layer = Self::group_with_object(object, self.name.clone());
                if let LayerKind::Group(target) = &mut layer.kind {
                    target.children = source
                        .children
                        .iter()
                        .map(|child| child.copy_with(copier, fresh_ids))
                        .collect();
                }
                layer
            }
        };
        layer.flags = self.flags;
        layer
    }
}

//! # Adding and removing cels
//!
//! [`AddCel`] and [`RemoveCel`] are the same pair of operations in opposite order. Removal captures a
//! snapshot of the cel on its way out: the cel record, preceded by its image and data records if no other cel
//! in the layer shares them. Insertion consumes that snapshot again, so while a cel is in the document the
//! document is the only copy.

use super::{Apply, CommandError, CommandState, Step};
use crate::{
    clock,
    io::{self, DecodeError, SubObjectsFromSprite},
    object::Versioned,
    state::{
        cel::{Cel, CelID},
        document::Document,
        layer::LayerID,
        Frame,
    },
};

/// One cel slot of one layer, and whatever is needed to fill it again.
#[derive(Debug)]
struct CelSlot {
    layer: LayerID,
    frame: Frame,
    /// The cel expected in the slot, once known.
    cel: Option<CelID>,
    /// A cel that has never been inserted.
    pending: Option<Cel>,
    /// Snapshot of the last removed cel.
    snapshot: Option<Vec<u8>>,
}
impl CelSlot {
    /// Capture the cel at the slot, then take it out of the document.
    fn remove(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let layer = document
            .sprite
            .layer(self.layer)
            .ok_or(CommandError::UnknownResource)?;
        let cels = layer.image().ok_or(CommandError::MismatchedState)?;
        let cel = cels.cel(self.frame).ok_or(CommandError::UnknownResource)?;
        if self.cel.is_some_and(|expected| expected != cel.id()) {
            return Err(CommandError::MismatchedState);
        }

        let mut snapshot = Vec::new();
        // Linked data is owned by the other cels, don't duplicate it.
        let has_data = cels.links(cel) == 0;
        snapshot.push(u8::from(has_data));
        if has_data {
            let data = cel.data().read();
            io::write_image(&mut snapshot, &data.image().read())?;
            io::write_cel_data(&mut snapshot, &data)?;
        }
        io::write_cel(&mut snapshot, cel)?;
        log::debug!(
            "captured {} of {} ({})",
            human_bytes::human_bytes(snapshot.len() as f64),
            cel.id(),
            if has_data { "with data" } else { "linked" }
        );
        self.cel = Some(cel.id());

        // Observers see it while it's still in place.
        document.notify_remove_cel(self.layer, self.frame);
        let layer = document
            .sprite
            .layer_mut(self.layer)
            .ok_or(CommandError::UnknownResource)?;
        layer
            .image_mut()
            .and_then(|cels| cels.remove_cel(self.frame))
            .ok_or(CommandError::UnknownResource)?;
        layer.increment_version();
        self.snapshot = Some(snapshot);
        Ok(())
    }
    /// Rebuild the cel chain from the snapshot.
    fn decode(&self, document: &Document) -> Result<Cel, CommandError> {
        let mut reader = self
            .snapshot
            .as_deref()
            .ok_or(CommandError::MismatchedState)?;
        let mut objects = SubObjectsFromSprite::new(&document.sprite);
        let has_data = io::read_u8(&mut reader).map_err(DecodeError::from)? != 0;
        if has_data {
            let image = io::read_image(&mut reader)?;
            objects.add_image(image.into_ref());
            let data = io::read_cel_data(&mut reader, &objects)?;
            objects.add_cel_data(data.into_ref());
        }
        Ok(io::read_cel(&mut reader, &objects)?)
    }
    /// Put the pending cel, or the one in the snapshot, into the slot.
    fn insert(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let from_snapshot = self.pending.is_none();
        let cel = match self.pending.take() {
            Some(cel) => cel,
            None => self.decode(document)?,
        };
        if cel.frame() != self.frame || self.cel.is_some_and(|expected| expected != cel.id()) {
            self.pending = (!from_snapshot).then_some(cel);
            return Err(CommandError::MismatchedState);
        }
        let Some(cels) = document.sprite.image_layer_mut(self.layer) else {
            self.pending = (!from_snapshot).then_some(cel);
            return Err(CommandError::UnknownResource);
        };
        if cels.cel(self.frame).is_some() {
            self.pending = (!from_snapshot).then_some(cel);
            return Err(CommandError::FrameOccupied(self.frame));
        }
        // Newly materialized pixels must not predate their insertion.
        cel.image().write().floor_clock(clock::now());
        self.cel = Some(cel.id());
        cels.add_cel(cel).map_err(|cel| CommandError::FrameOccupied(cel.frame()))?;
        if let Some(layer) = document.sprite.layer_mut(self.layer) {
            layer.increment_version();
        }
        self.snapshot = None;
        document.notify_add_cel(self.layer, self.frame);
        Ok(())
    }
}

/// Insert a cel into an image layer at the cel's frame.
#[derive(Debug)]
pub struct AddCel {
    pub(super) state: CommandState,
    slot: CelSlot,
}
impl AddCel {
    /// `cel` must not be in any layer yet.
    #[must_use]
    pub fn new(layer: LayerID, cel: Cel) -> Self {
        debug_assert!(!cel.is_attached());
        Self {
            state: CommandState::Fresh,
            slot: CelSlot {
                layer,
                frame: cel.frame(),
                cel: Some(cel.id()),
                pending: Some(cel),
                snapshot: None,
            },
        }
    }
    #[must_use]
    pub fn layer(&self) -> LayerID {
        self.slot.layer
    }
    #[must_use]
    pub fn frame(&self) -> Frame {
        self.slot.frame
    }
}
impl Apply for AddCel {
    fn apply(&mut self, document: &mut Document, step: Step) -> Result<(), CommandError> {
        match step {
            Step::Execute | Step::Redo => self.slot.insert(document),
            Step::Undo => self.slot.remove(document),
        }
    }
}

/// Take the cel at a frame out of an image layer.
#[derive(Debug)]
pub struct RemoveCel {
    pub(super) state: CommandState,
    slot: CelSlot,
}
impl RemoveCel {
    #[must_use]
    pub fn new(layer: LayerID, frame: Frame) -> Self {
        Self {
            state: CommandState::Fresh,
            slot: CelSlot {
                layer,
                frame,
                // Whatever is there at execute time.
                cel: None,
                pending: None,
                snapshot: None,
            },
        }
    }
    #[must_use]
    pub fn layer(&self) -> LayerID {
        self.slot.layer
    }
    #[must_use]
    pub fn frame(&self) -> Frame {
        self.slot.frame
    }
}
impl Apply for RemoveCel {
    fn apply(&mut self, document: &mut Document, step: Step) -> Result<(), CommandError> {
        match step {
            Step::Execute | Step::Redo => self.slot.remove(document),
            Step::Undo => self.slot.insert(document),
        }
    }
}

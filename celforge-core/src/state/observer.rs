//! # Observers
//!
//! Structural changes to a [`Document`](super::document::Document) are announced synchronously, from within
//! the command step that makes them, to every registered [`DocumentObserver`]. Observers that would rather not
//! run on the document's thread can [`subscribe`](super::document::Document::subscribe) to a channel of owned
//! [`DocumentChange`]s instead.

use super::{
    cel::{Cel, CelID},
    layer::{Layer, LayerID},
    sprite::{Sprite, SpriteID},
    Frame,
};
use crate::object::Versioned;

/// A cel, the layer it is in, and the sprite that layer is in.
///
/// For removals, this is fired while the cel is still in place.
#[derive(Copy, Clone)]
pub struct DocumentEvent<'a> {
    pub sprite: &'a Sprite,
    pub layer: &'a Layer,
    pub cel: &'a Cel,
}

pub trait DocumentObserver: Send + Sync {
    fn on_add_cel(&self, _event: &DocumentEvent<'_>) {}
    fn on_remove_cel(&self, _event: &DocumentEvent<'_>) {}
    /// Another sprite was merged into this one.
    fn on_sprite_merged(&self, _sprite: &Sprite) {}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DocumentChange {
    CelAdded {
        sprite: SpriteID,
        layer: LayerID,
        cel: CelID,
        frame: Frame,
    },
    CelRemoved {
        sprite: SpriteID,
        layer: LayerID,
        cel: CelID,
        frame: Frame,
    },
    SpriteMerged {
        sprite: SpriteID,
    },
}

/// Forwards every event over a channel.
pub struct ChannelObserver {
    sender: crossbeam::channel::Sender<DocumentChange>,
}
impl ChannelObserver {
    #[must_use]
    pub fn new(sender: crossbeam::channel::Sender<DocumentChange>) -> Self {
        Self { sender }
    }
    fn send(&self, change: DocumentChange) {
        // Receiver hung up, nothing to do.
        if self.sender.send(change).is_err() {
            log::trace!("dropped {change:?}, receiver gone");
        }
    }
}
impl DocumentObserver for ChannelObserver {
    fn on_add_cel(&self, event: &DocumentEvent<'_>) {
        self.send(DocumentChange::CelAdded {
            sprite: event.sprite.id(),
            layer: event.layer.id(),
            cel: event.cel.id(),
            frame: event.cel.frame(),
        });
    }
    fn on_remove_cel(&self, event: &DocumentEvent<'_>) {
        self.send(DocumentChange::CelRemoved {
            sprite: event.sprite.id(),
            layer: event.layer.id(),
            cel: event.cel.id(),
            frame: event.cel.frame(),
        });
    }
    fn on_sprite_merged(&self, sprite: &Sprite) {
        self.send(DocumentChange::SpriteMerged {
            sprite: sprite.id(),
        });
    }
}

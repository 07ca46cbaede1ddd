//! Core document model of a frame-based sprite editor: sprites, layers, cels and their pixel stores, with
//! undoable commands, clock-based merging and background loading.

pub mod clock;
pub mod color;
pub mod commands;
pub mod geometry;
pub mod id;
pub mod image;
pub mod io;
pub mod loader;
pub mod merge;
pub mod object;
pub mod queue;
pub mod settings;
pub mod state;

pub use clock::Tick;
pub use commands::{Command, CommandError};
pub use id::ObjectID;
pub use object::Versioned;
pub use queue::UndoHistory;
pub use state::{document::Document, sprite::Sprite, Frame};

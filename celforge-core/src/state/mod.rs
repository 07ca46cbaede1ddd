//! # State
//!
//! The document model. A [`sprite::Sprite`] owns a tree of [`layer::Layer`]s, image layers own one
//! [`cel::Cel`] per occupied frame, and each cel points at a (possibly shared) [`cel_data::CelData`] which in
//! turn points at its [`Image`](crate::image::Image).
//!
//! None of these types notify anyone when they change. Mutations that observers care about go through
//! [`crate::commands`] and [`document::Document`].

pub mod cel;
pub mod cel_data;
pub mod document;
pub mod layer;
pub mod observer;
pub mod palette;
pub mod sprite;

/// Index of an animation frame.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Frame(pub u32);
impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

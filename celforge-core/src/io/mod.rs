//! # Binary records
//!
//! Little-endian, fixed-width records for images, cel data, and cels. The same routines write undo snapshots
//! and the cel/image chunks of document files.
//!
//! Records refer to each other by raw id. Decoding reuses the recorded ids, so a cel read back from an undo
//! snapshot is the *same* cel, as far as anyone holding its id can tell.

pub mod records;

pub use records::{read_cel, read_cel_data, read_image, write_cel, write_cel_data, write_image};

use crate::{
    image::{ImageID, ImageRef},
    object::Versioned,
    state::{
        cel_data::{CelDataID, CelDataRef},
        sprite::Sprite,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unknown pixel format {0}")]
    UnknownPixelFormat(u8),
    #[error("zero is not a valid id")]
    InvalidID,
    #[error("bad image dimensions {0}x{1}")]
    BadDimensions(u32, u32),
    #[error("record refers to unknown image #{0}")]
    MissingImage(u64),
    #[error("record refers to unknown cel data #{0}")]
    MissingCelData(u64),
}

pub(crate) fn read_u8(r: &mut impl std::io::Read) -> std::io::Result<u8> {
    let mut byte = 0;
    r.read_exact(std::slice::from_mut(&mut byte))?;
    Ok(byte)
}
pub(crate) fn read_u32(r: &mut impl std::io::Read) -> std::io::Result<u32> {
    let mut bytes = [0; 4];
    r.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}
pub(crate) fn read_i32(r: &mut impl std::io::Read) -> std::io::Result<i32> {
    let mut bytes = [0; 4];
    r.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}
pub(crate) fn read_u64(r: &mut impl std::io::Read) -> std::io::Result<u64> {
    let mut bytes = [0; 8];
    r.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}
/// Read an id, reserving it so freshly allocated ids never collide with it.
pub(crate) fn read_id<T: std::any::Any>(
    r: &mut impl std::io::Read,
) -> Result<crate::id::ObjectID<T>, DecodeError> {
    crate::id::ObjectID::from_raw(read_u64(r)?).ok_or(DecodeError::InvalidID)
}

/// Resolves the ids records refer to.
pub trait SubObjects {
    fn image(&self, id: ImageID) -> Option<ImageRef>;
    fn cel_data(&self, id: CelDataID) -> Option<CelDataRef>;
}

/// Resolves ids against objects decoded earlier in the same stream, then against a sprite.
pub struct SubObjectsFromSprite<'a> {
    sprite: &'a Sprite,
    images: hashbrown::HashMap<ImageID, ImageRef>,
    cel_data: hashbrown::HashMap<CelDataID, CelDataRef>,
}
impl<'a> SubObjectsFromSprite<'a> {
    #[must_use]
    pub fn new(sprite: &'a Sprite) -> Self {
        Self {
            sprite,
            images: hashbrown::HashMap::new(),
            cel_data: hashbrown::HashMap::new(),
        }
    }
    pub fn add_image(&mut self, image: ImageRef) {
        let id = image.read().id();
        self.images.insert(id, image);
    }
    pub fn add_cel_data(&mut self, data: CelDataRef) {
        let id = data.read().id();
        self.cel_data.insert(id, data);
    }
}
impl SubObjects for SubObjectsFromSprite<'_> {
    fn image(&self, id: ImageID) -> Option<ImageRef> {
        self.images
            .get(&id)
            .cloned()
            .or_else(|| self.sprite.find_image(id))
    }
    fn cel_data(&self, id: CelDataID) -> Option<CelDataRef> {
        self.cel_data
            .get(&id)
            .cloned()
            .or_else(|| self.sprite.find_cel_data(id))
    }
}

//! # Images
//!
//! Fixed-format rectangular pixel buffers. The format is chosen at creation and never changes, nor does the size.
//! Pixels are accessed either typed, through [`Pixel`], or as raw row bytes for bulk copies.

use crate::{
    clock::Tick,
    color::{GrayA, Rgba, Trgba},
    geometry::Rect,
    object::{Object, Versioned},
    state::palette::Palette,
};

pub type ImageID = crate::id::ObjectID<Image>;
/// Shared handle to an image. Linked cels share one of these.
pub type ImageRef = std::sync::Arc<parking_lot::RwLock<Image>>;

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::AsRefStr,
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u8)]
pub enum PixelFormat {
    Rgb = 0,
    Grayscale = 1,
    Indexed = 2,
    /// [`Rgb`](Self::Rgb) plus a logical clock per pixel.
    TimestampedRgb = 3,
}
impl PixelFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb => std::mem::size_of::<Rgba>(),
            Self::Grayscale => std::mem::size_of::<GrayA>(),
            Self::Indexed => std::mem::size_of::<u8>(),
            Self::TimestampedRgb => std::mem::size_of::<Trgba>(),
        }
    }
    /// Whether pixels of this format carry a clock, and so take part in merges.
    #[must_use]
    pub const fn has_clock(self) -> bool {
        matches!(self, Self::TimestampedRgb)
    }
}

/// Typed pixel storage, one variant per [`PixelFormat`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PixelBuffer {
    Rgb(Vec<Rgba>),
    Grayscale(Vec<GrayA>),
    Indexed(Vec<u8>),
    TimestampedRgb(Vec<Trgba>),
}
impl PixelBuffer {
    #[must_use]
    pub fn zeroed(format: PixelFormat, len: usize) -> Self {
        match format {
            PixelFormat::Rgb => Self::Rgb(vec![Rgba::default(); len]),
            PixelFormat::Grayscale => Self::Grayscale(vec![GrayA::default(); len]),
            PixelFormat::Indexed => Self::Indexed(vec![0; len]),
            PixelFormat::TimestampedRgb => Self::TimestampedRgb(vec![Trgba::default(); len]),
        }
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        match self {
            Self::Rgb(_) => PixelFormat::Rgb,
            Self::Grayscale(_) => PixelFormat::Grayscale,
            Self::Indexed(_) => PixelFormat::Indexed,
            Self::TimestampedRgb(_) => PixelFormat::TimestampedRgb,
        }
    }
    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Rgb(v) => v.len(),
            Self::Grayscale(v) => v.len(),
            Self::Indexed(v) => v.len(),
            Self::TimestampedRgb(v) => v.len(),
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// View the pixels as native-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Rgb(v) => bytemuck::cast_slice(v),
            Self::Grayscale(v) => bytemuck::cast_slice(v),
            Self::Indexed(v) => v,
            Self::TimestampedRgb(v) => bytemuck::cast_slice(v),
        }
    }
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Rgb(v) => bytemuck::cast_slice_mut(v),
            Self::Grayscale(v) => bytemuck::cast_slice_mut(v),
            Self::Indexed(v) => v,
            Self::TimestampedRgb(v) => bytemuck::cast_slice_mut(v),
        }
    }
}

/// A pixel word of one specific format.
pub trait Pixel: bytemuck::Pod + PartialEq + std::fmt::Debug {
    const FORMAT: PixelFormat;
    /// The buffer's pixels, if it holds this format.
    fn slice(buffer: &PixelBuffer) -> Option<&[Self]>;
    fn slice_mut(buffer: &mut PixelBuffer) -> Option<&mut [Self]>;
    /// Append the little-endian encoding of this pixel.
    fn write_le(self, out: &mut Vec<u8>);
    /// Decode from exactly [`PixelFormat::bytes_per_pixel`] little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}
macro_rules! impl_pixel {
    ($ty:ty, $variant:ident, |$p:ident| $to_int:expr, |$i:ident| $from_int:expr, $int:ty) => {
        impl Pixel for $ty {
            const FORMAT: PixelFormat = PixelFormat::$variant;
            fn slice(buffer: &PixelBuffer) -> Option<&[Self]> {
                match buffer {
                    PixelBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
            fn slice_mut(buffer: &mut PixelBuffer) -> Option<&mut [Self]> {
                match buffer {
                    PixelBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
            fn write_le(self, out: &mut Vec<u8>) {
                let $p = self;
                let int: $int = $to_int;
                out.extend_from_slice(&int.to_le_bytes());
            }
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$int>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$int>()]);
                let $i = <$int>::from_le_bytes(raw);
                $from_int
            }
        }
    };
}
impl_pixel!(Rgba, Rgb, |p| p.0, |i| Rgba(i), u32);
impl_pixel!(GrayA, Grayscale, |p| p.0, |i| GrayA(i), u16);
impl_pixel!(u8, Indexed, |p| p, |i| i, u8);
impl_pixel!(Trgba, TimestampedRgb, |p| p.0, |i| Trgba(i), u64);

pub struct Image {
    object: Object<Image>,
    width: u32,
    height: u32,
    buffer: PixelBuffer,
}
impl Versioned for Image {
    fn object(&self) -> &Object<Self> {
        &self.object
    }
    fn object_mut(&mut self) -> &mut Object<Self> {
        &mut self.object
    }
}
impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("object", &self.object)
            .field("format", &self.format())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
impl Image {
    /// A new, zero-filled image.
    #[must_use]
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            object: Object::new(),
            width,
            height,
            buffer: PixelBuffer::zeroed(format, len),
        }
    }
    /// Assemble an image from parts. `None` if the buffer doesn't hold exactly `width * height` pixels.
    #[must_use]
    pub fn from_parts(
        object: Object<Image>,
        width: u32,
        height: u32,
        buffer: PixelBuffer,
    ) -> Option<Self> {
        (buffer.len() == width as usize * height as usize).then_some(Self {
            object,
            width,
            height,
            buffer,
        })
    }
    /// A deep copy of the pixels, as a new object.
    #[must_use]
    pub fn create_copy(&self) -> Self {
        Self {
            object: Object::new(),
            width: self.width,
            height: self.height,
            buffer: self.buffer.clone(),
        }
    }
    #[must_use]
    pub fn into_ref(self) -> ImageRef {
        std::sync::Arc::new(parking_lot::RwLock::new(self))
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.buffer.format()
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
        // Dimensions beyond i32::MAX can't be addressed by `Rect` anyway.
        use az::SaturatingAs;
        Rect::from_size(self.width.saturating_as(), self.height.saturating_as())
    }
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
    /// Approximate heap + inline footprint, in bytes.
    #[must_use]
    pub fn mem_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.buffer.as_bytes().len()
    }
    /// Bytes taken up by `w` pixels of one row.
    #[must_use]
    pub fn row_stride_size(&self, w: usize) -> usize {
        w * self.format().bytes_per_pixel()
    }
    fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        use az::CheckedAs;
        (y * i64::from(self.width) + x).checked_as()
    }
    /// Byte range of `w` pixels starting at (x, y), all within one row.
    fn row_range(&self, x: i32, y: i32, w: usize) -> Option<std::ops::Range<usize>> {
        let start = self.index_of(i64::from(x), i64::from(y))?;
        // Must not spill into the next row.
        if i64::from(x) + w as i64 > i64::from(self.width) {
            return None;
        }
        let bpp = self.format().bytes_per_pixel();
        Some(start * bpp..(start + w) * bpp)
    }
    /// All pixels, in native byte order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }
    /// Raw bytes of `w` pixels of row `y`, starting at column `x`.
    #[must_use]
    pub fn row_bytes(&self, x: i32, y: i32, w: usize) -> Option<&[u8]> {
        let range = self.row_range(x, y, w)?;
        self.buffer.as_bytes().get(range)
    }
    pub fn row_bytes_mut(&mut self, x: i32, y: i32, w: usize) -> Option<&mut [u8]> {
        let range = self.row_range(x, y, w)?;
        self.buffer.as_bytes_mut().get_mut(range)
    }
    /// All pixels, if this image is of format `P`.
    #[must_use]
    pub fn pixels<P: Pixel>(&self) -> Option<&[P]> {
        P::slice(&self.buffer)
    }
    pub fn pixels_mut<P: Pixel>(&mut self) -> Option<&mut [P]> {
        P::slice_mut(&mut self.buffer)
    }
    #[must_use]
    pub fn row<P: Pixel>(&self, y: u32) -> Option<&[P]> {
        let width = self.width as usize;
        let start = width.checked_mul(y as usize)?;
        (y < self.height)
            .then(|| self.pixels::<P>()?.get(start..start + width))
            .flatten()
    }
    #[must_use]
    pub fn get<P: Pixel>(&self, x: i32, y: i32) -> Option<P> {
        let idx = self.index_of(i64::from(x), i64::from(y))?;
        self.pixels::<P>()?.get(idx).copied()
    }
    /// Write one pixel. Returns false if out of bounds or of the wrong format.
    pub fn put<P: Pixel>(&mut self, x: i32, y: i32, pixel: P) -> bool {
        let Some(idx) = self.index_of(i64::from(x), i64::from(y)) else {
            return false;
        };
        match self.pixels_mut::<P>().and_then(|pixels| pixels.get_mut(idx)) {
            Some(slot) => {
                *slot = pixel;
                true
            }
            None => false,
        }
    }
    /// Fill every pixel with `value`. Returns false if of the wrong format.
    pub fn clear<P: Pixel>(&mut self, value: P) -> bool {
        match self.pixels_mut::<P>() {
            Some(pixels) => {
                pixels.fill(value);
                true
            }
            None => false,
        }
    }
    /// Clear to the "nothing here" value. For indexed images that is `palette`'s transparent entry.
    pub fn clear_to_transparent(&mut self, palette: &Palette) {
        match &mut self.buffer {
            PixelBuffer::Indexed(v) => v.fill(palette.transparent_index().unwrap_or(0)),
            other => other.as_bytes_mut().fill(0),
        }
    }
    /// Raise every pixel's clock to at least `floor`. No-op on formats without a clock.
    ///
    /// Returns whether any pixel changed.
    pub fn floor_clock(&mut self, floor: Tick) -> bool {
        let Some(pixels) = self.pixels_mut::<Trgba>() else {
            return false;
        };
        let mut changed = false;
        for pixel in pixels.iter_mut().filter(|pixel| pixel.tick() < floor) {
            *pixel = pixel.with_tick(floor);
            changed = true;
        }
        changed
    }
}

//! # Pixel values
//!
//! Packed, fixed-width pixel words for each [`PixelFormat`](crate::image::PixelFormat). The packing layout lives
//! here and only here - everything else goes through the constructors and accessors.

use crate::clock::Tick;

/// 8-bit straight-alpha color packed as `0xAABBGGRR`.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgba(pub u32);
impl Rgba {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    const R_SHIFT: u32 = 0;
    const G_SHIFT: u32 = 8;
    const B_SHIFT: u32 = 16;
    const A_SHIFT: u32 = 24;

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(
            (r as u32) << Self::R_SHIFT
                | (g as u32) << Self::G_SHIFT
                | (b as u32) << Self::B_SHIFT
                | (a as u32) << Self::A_SHIFT,
        )
    }
    #[must_use]
    pub const fn r(self) -> u8 {
        (self.0 >> Self::R_SHIFT) as u8
    }
    #[must_use]
    pub const fn g(self) -> u8 {
        (self.0 >> Self::G_SHIFT) as u8
    }
    #[must_use]
    pub const fn b(self) -> u8 {
        (self.0 >> Self::B_SHIFT) as u8
    }
    #[must_use]
    pub const fn a(self) -> u8 {
        (self.0 >> Self::A_SHIFT) as u8
    }
    /// Rec. 709 luma of the color channels, ignoring alpha.
    #[must_use]
    pub fn luma(self) -> u8 {
        let luma =
            (u32::from(self.r()) * 2126 + u32::from(self.g()) * 7152 + u32::from(self.b()) * 722)
                / 10000;
        // Weights sum to 10000, so this never exceeds 255.
        luma as u8
    }
}
impl std::fmt::Debug for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rgba({}, {}, {}, {})",
            self.r(),
            self.g(),
            self.b(),
            self.a()
        )
    }
}

/// 8-bit gray value with alpha, packed as `0xAAVV`.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GrayA(pub u16);
impl GrayA {
    #[must_use]
    pub const fn new(value: u8, alpha: u8) -> Self {
        Self(value as u16 | (alpha as u16) << 8)
    }
    /// Fully opaque gray.
    #[must_use]
    pub const fn opaque(value: u8) -> Self {
        Self::new(value, 255)
    }
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0 as u8
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// An [`Rgba`] color carrying the logical clock [`Tick`] of its last write.
///
/// Low 32 bits are the color, high 32 bits the tick.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Trgba(pub u64);
impl Trgba {
    const TICK_SHIFT: u32 = 32;
    const COLOR_MASK: u64 = 0x0000_0000_FFFF_FFFF;

    #[must_use]
    pub const fn new(color: Rgba, tick: Tick) -> Self {
        Self(color.0 as u64 | (tick.0 as u64) << Self::TICK_SHIFT)
    }
    #[must_use]
    pub const fn color(self) -> Rgba {
        Rgba((self.0 & Self::COLOR_MASK) as u32)
    }
    #[must_use]
    pub const fn tick(self) -> Tick {
        Tick((self.0 >> Self::TICK_SHIFT) as u32)
    }
    #[must_use]
    pub const fn with_tick(self, tick: Tick) -> Self {
        Self::new(self.color(), tick)
    }
    #[must_use]
    pub const fn with_color(self, color: Rgba) -> Self {
        Self::new(color, self.tick())
    }
}
impl std::fmt::Debug for Trgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Trgba({:?} @ {})", self.color(), self.tick().0)
    }
}

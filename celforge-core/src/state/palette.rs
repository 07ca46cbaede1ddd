use crate::color::Rgba;

/// Maximum number of entries, as indexed pixels are one byte wide.
pub const MAX_COLORS: usize = 256;

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba>,
}
impl Palette {
    /// Add a new color, returning it's index. `None` if the palette is full.
    #[must_use = "the index of the new color is the only way to refer to it"]
    pub fn push(&mut self, color: Rgba) -> Option<u8> {
        let idx = u8::try_from(self.colors.len()).ok()?;
        self.colors.push(color);
        Some(idx)
    }
    /// Get a color from it's index.
    #[must_use]
    pub fn get(&self, idx: u8) -> Option<Rgba> {
        self.colors.get(usize::from(idx)).copied()
    }
    /// Replace a color, returning the old one. `None` if there's no such entry.
    pub fn set(&mut self, idx: u8, to: Rgba) -> Option<Rgba> {
        self.colors
            .get_mut(usize::from(idx))
            .map(|color| std::mem::replace(color, to))
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Rgba> {
        self.colors.iter()
    }
    /// Index of the first fully transparent entry.
    #[must_use]
    pub fn transparent_index(&self) -> Option<u8> {
        self.colors
            .iter()
            .position(|color| color.a() == 0)
            .and_then(|idx| u8::try_from(idx).ok())
    }
}

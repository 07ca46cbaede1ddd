//! Integer pixel geometry: points, rectangles, regions, and blit clipping.

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}
impl Point {
    pub const ZERO: Self = Self { x: 0, y: 0 };
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Half-open rectangle, `[x, x + w) × [y, y + h)`. Non-positive sizes are empty.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
    #[must_use]
    pub const fn from_size(w: i32, h: i32) -> Self {
        Self::new(0, 0, w, h)
    }
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.w
    }
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.w as usize * self.h as usize
        }
    }
    #[must_use]
    pub fn offset(&self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.w, self.h)
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
    /// The overlap of both rectangles, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let rect = Self::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }
    /// The parts of `self` not covered by `other`, as up to four disjoint rectangles.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> smallvec::SmallVec<[Self; 4]> {
        let mut pieces = smallvec::SmallVec::new();
        if self.is_empty() {
            return pieces;
        }
        let Some(hole) = self.intersect(other) else {
            pieces.push(*self);
            return pieces;
        };
        // Full-width bands above and below, then the sides of the hole's rows.
        let candidates = [
            Self::new(self.x, self.y, self.w, hole.y - self.y),
            Self::new(self.x, hole.bottom(), self.w, self.bottom() - hole.bottom()),
            Self::new(self.x, hole.y, hole.x - self.x, hole.h),
            Self::new(hole.right(), hole.y, self.right() - hole.right(), hole.h),
        ];
        pieces.extend(candidates.into_iter().filter(|piece| !piece.is_empty()));
        pieces
    }
}

/// A set of pixels, stored as disjoint rectangles.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Region {
    rects: smallvec::SmallVec<[Rect; 4]>,
}
impl Region {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }
    /// Add `rect` to the region. Parts already covered are not duplicated.
    pub fn union_rect(&mut self, rect: Rect) {
        let mut pieces: smallvec::SmallVec<[Rect; 4]> = smallvec::smallvec![rect];
        for existing in &self.rects {
            pieces = pieces
                .iter()
                .flat_map(|piece| piece.subtract(existing))
                .collect();
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces.into_iter().filter(|piece| !piece.is_empty()));
    }
    pub fn union(&mut self, other: &Self) {
        for rect in &other.rects {
            self.union_rect(*rect);
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = &Rect> + '_ {
        self.rects.iter()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> usize {
        self.rects.iter().map(Rect::area).sum()
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|rect| rect.contains(point))
    }
}
impl FromIterator<Rect> for Region {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        let mut region = Self::new();
        for rect in iter {
            region.union_rect(rect);
        }
        region
    }
}
impl<'a> IntoIterator for &'a Region {
    type Item = &'a Rect;
    type IntoIter = std::slice::Iter<'a, Rect>;
    fn into_iter(self) -> Self::IntoIter {
        self.rects.iter()
    }
}

/// A blit of a `size` block from `src` in one surface to `dst` in another.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Clip {
    pub dst: Point,
    pub src: Point,
    pub size: [i32; 2],
}
impl Clip {
    #[must_use]
    pub fn new(dst: Point, src: Point, size: [i32; 2]) -> Self {
        Self { dst, src, size }
    }
    /// Shrink the blit so it stays within both surfaces. Returns false if nothing is left.
    pub fn clip(&mut self, dst_w: i32, dst_h: i32, src_w: i32, src_h: i32) -> bool {
        let [w, h] = &mut self.size;
        if self.src.x < 0 {
            *w += self.src.x;
            self.dst.x -= self.src.x;
            self.src.x = 0;
        }
        if self.src.y < 0 {
            *h += self.src.y;
            self.dst.y -= self.src.y;
            self.src.y = 0;
        }
        if self.dst.x < 0 {
            *w += self.dst.x;
            self.src.x -= self.dst.x;
            self.dst.x = 0;
        }
        if self.dst.y < 0 {
            *h += self.dst.y;
            self.src.y -= self.dst.y;
            self.dst.y = 0;
        }
        *w = (*w).min(src_w - self.src.x).min(dst_w - self.dst.x);
        *h = (*h).min(src_h - self.src.y).min(dst_h - self.dst.y);
        *w > 0 && *h > 0
    }
    /// The clipped area, in destination coordinates.
    #[must_use]
    pub fn dst_bounds(&self) -> Rect {
        Rect::new(self.dst.x, self.dst.y, self.size[0], self.size[1])
    }
    /// The clipped area, in source coordinates.
    #[must_use]
    pub fn src_bounds(&self) -> Rect {
        Rect::new(self.src.x, self.src.y, self.size[0], self.size[1])
    }
}

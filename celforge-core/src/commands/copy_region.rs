//! # Region copies
//!
//! [`CopyRegion`] moves a set of rectangles of pixels from one image into another. The pixels to be written
//! are captured when the command is built, and every step afterwards is the same swap of the captured pixels
//! with the live ones: executing swaps the source pixels in, undoing swaps the originals back, and so on.

use super::{Apply, CommandError, CommandState, Step};
use crate::{
    clock,
    color::Trgba,
    geometry::{Clip, Point, Region},
    image::{Image, ImageID},
    object::Versioned,
    state::document::Document,
};

#[derive(Debug)]
pub struct CopyRegion {
    pub(super) state: CommandState,
    image: ImageID,
    /// Destination-space, clipped to both images, disjoint.
    region: Region,
    /// Pixels to be written by the next swap, rect by rect, row by row.
    buffer: Vec<u8>,
    already_copied: bool,
}
impl CopyRegion {
    /// Copy `region` of `src`, in `src`'s coordinates, into `dst` offset by `dst_pos`.
    ///
    /// The source pixels are captured now. If `already_copied`, the caller has already written them into `dst`
    /// and executing does nothing. In that case `src` should hold what `dst` held *before*, so that undo has
    /// something to restore.
    ///
    /// A region that clips away entirely makes a command that does nothing.
    pub fn new(
        dst: &Image,
        src: &Image,
        region: &Region,
        dst_pos: Point,
        already_copied: bool,
    ) -> Result<Self, CommandError> {
        if dst.format() != src.format() {
            return Err(CommandError::FormatMismatch);
        }
        let [dst_w, dst_h] = [dst.bounds().w, dst.bounds().h];
        let [src_w, src_h] = [src.bounds().w, src.bounds().h];
        let clipped: Region = region
            .iter()
            .filter_map(|rect| {
                let mut clip = Clip::new(
                    Point::new(rect.x + dst_pos.x, rect.y + dst_pos.y),
                    Point::new(rect.x, rect.y),
                    [rect.w, rect.h],
                );
                clip.clip(dst_w, dst_h, src_w, src_h)
                    .then(|| clip.dst_bounds())
            })
            .collect();

        let mut buffer = Vec::with_capacity(clipped.area() * src.format().bytes_per_pixel());
        for rect in &clipped {
            // Clipping guarantees the rect is non-empty.
            let w: usize = az::cast(rect.w.unsigned_abs());
            for y in rect.y..rect.bottom() {
                let row = src
                    .row_bytes(rect.x - dst_pos.x, y - dst_pos.y, w)
                    .ok_or(CommandError::MismatchedState)?;
                buffer.extend_from_slice(row);
            }
        }
        log::trace!(
            "captured {} pixels in {} rects for {}",
            clipped.area(),
            clipped.iter().count(),
            dst.id()
        );
        Ok(Self {
            state: CommandState::Fresh,
            image: dst.id(),
            region: clipped,
            buffer,
            already_copied,
        })
    }
    #[must_use]
    pub fn image(&self) -> ImageID {
        self.image
    }
    /// The pixels affected, in the image's coordinates.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }
    /// Exchange the captured pixels with the live ones.
    fn swap(&mut self, document: &Document) -> Result<(), CommandError> {
        if self.region.is_empty() {
            return Ok(());
        }
        let image = document
            .sprite
            .find_image(self.image)
            .ok_or(CommandError::UnknownResource)?;
        let mut image = image.write();
        let has_clock = image.format().has_clock();
        let floor = clock::now();
        let mut offset = 0;
        for rect in &self.region {
            let w: usize = az::cast(rect.w.unsigned_abs());
            let stride = image.row_stride_size(w);
            for y in rect.y..rect.bottom() {
                let live = image
                    .row_bytes_mut(rect.x, y, w)
                    .ok_or(CommandError::MismatchedState)?;
                let saved = self
                    .buffer
                    .get_mut(offset..offset + stride)
                    .ok_or(CommandError::MismatchedState)?;
                if has_clock {
                    swap_stamped(live, saved, floor)?;
                } else {
                    live.swap_with_slice(saved);
                }
                offset += stride;
            }
        }
        image.increment_version();
        Ok(())
    }
}

/// Swap a row of clock-carrying pixels. Written pixels are stamped as edits, so they never lose to a
/// pre-existing clock in a later merge.
fn swap_stamped(live: &mut [u8], saved: &mut [u8], floor: clock::Tick) -> Result<(), CommandError> {
    // Rows of the live image are aligned, the buffer may not be.
    let live: &mut [Trgba] =
        bytemuck::try_cast_slice_mut(live).map_err(|_| CommandError::MismatchedState)?;
    for (pixel, saved) in live
        .iter_mut()
        .zip(saved.chunks_exact_mut(std::mem::size_of::<Trgba>()))
    {
        let existing = *pixel;
        let incoming: Trgba = bytemuck::pod_read_unaligned(saved);
        *pixel = clock::stamp_pixel(existing, incoming, floor);
        saved.copy_from_slice(bytemuck::bytes_of(&existing));
    }
    Ok(())
}

impl Apply for CopyRegion {
    fn apply(&mut self, document: &mut Document, step: Step) -> Result<(), CommandError> {
        match step {
            Step::Execute if self.already_copied => Ok(()),
            Step::Execute | Step::Undo | Step::Redo => self.swap(document),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clock::Tick,
        color::Rgba,
        commands::Command,
        geometry::Rect,
        image::{ImageRef, PixelFormat},
        state::{cel::Cel, layer::Layer, sprite::Sprite, Frame},
    };

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    /// A document showing one `format` image of the given size.
    fn doc_with_image(format: PixelFormat, w: u32, h: u32) -> (Document, ImageRef) {
        let mut sprite = Sprite::new(format, w, h);
        let layer = sprite.add_layer(Layer::new_image("a"));
        let image = Image::new(format, w, h).into_ref();
        sprite
            .image_layer_mut(layer)
            .unwrap()
            .add_cel(Cel::new(Frame(0), image.clone()))
            .unwrap();
        (Document::new(sprite), image)
    }
    fn filled(format: PixelFormat, w: u32, h: u32, color: Rgba) -> Image {
        let mut image = Image::new(format, w, h);
        image.clear(color);
        image
    }

    #[test]
    fn red_over_black_and_back() {
        let (mut doc, dst) = doc_with_image(PixelFormat::Rgb, 4, 4);
        dst.write().clear(Rgba::BLACK);
        let src = filled(PixelFormat::Rgb, 4, 4, RED);
        let region = Region::from_rect(Rect::from_size(4, 4));
        let mut copy = Command::from(
            CopyRegion::new(&dst.read(), &src, &region, Point::ZERO, false).unwrap(),
        );
        let version = dst.read().version();

        copy.execute(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == RED));
        assert!(dst.read().version() > version);

        copy.undo(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == Rgba::BLACK));

        copy.redo(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == RED));
    }
    #[test]
    fn offset_copy_touches_only_region() {
        let (mut doc, dst) = doc_with_image(PixelFormat::Rgb, 4, 4);
        dst.write().clear(Rgba::BLACK);
        let mut src = Image::new(PixelFormat::Rgb, 4, 4);
        for y in 0..4 {
            for x in 0..4 {
                src.put(x, y, Rgba::new(x as u8, y as u8, 7, 255));
            }
        }
        // src (0,0)..(2,2) lands at dst (1,2)..(3,4). Row 4 is off the canvas.
        let region = Region::from_rect(Rect::new(0, 0, 2, 3));
        let mut copy = Command::from(
            CopyRegion::new(&dst.read(), &src, &region, Point::new(1, 2), false).unwrap(),
        );
        copy.execute(&mut doc).unwrap();
        let image = dst.read();
        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..3).contains(&x) && (2..4).contains(&y);
                let expected = if inside {
                    Rgba::new((x - 1) as u8, (y - 2) as u8, 7, 255)
                } else {
                    Rgba::BLACK
                };
                assert_eq!(image.get::<Rgba>(x, y), Some(expected), "at {x},{y}");
            }
        }
        drop(image);
        copy.undo(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == Rgba::BLACK));
    }
    #[test]
    fn clipped_away_is_noop() {
        let (mut doc, dst) = doc_with_image(PixelFormat::Rgb, 4, 4);
        let src = filled(PixelFormat::Rgb, 4, 4, RED);
        let region = Region::from_rect(Rect::from_size(4, 4));
        let copy = CopyRegion::new(&dst.read(), &src, &region, Point::new(10, 0), false).unwrap();
        assert!(copy.region().is_empty());
        let mut copy = Command::from(copy);
        copy.execute(&mut doc).unwrap();
        copy.undo(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == Rgba::default()));
    }
    #[test]
    fn already_copied_skips_execute() {
        let (mut doc, dst) = doc_with_image(PixelFormat::Rgb, 2, 2);
        // The caller keeps the old pixels and paints by itself.
        let before = filled(PixelFormat::Rgb, 2, 2, Rgba::BLACK);
        dst.write().clear(RED);
        let region = Region::from_rect(Rect::from_size(2, 2));
        let mut copy = Command::from(
            CopyRegion::new(&dst.read(), &before, &region, Point::ZERO, true).unwrap(),
        );
        copy.execute(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == RED));
        copy.undo(&mut doc).unwrap();
        assert!(dst.read().pixels::<Rgba>().unwrap().iter().all(|&px| px == Rgba::BLACK));
    }
    #[test]
    fn format_mismatch() {
        let dst = Image::new(PixelFormat::Rgb, 2, 2);
        let src = Image::new(PixelFormat::Grayscale, 2, 2);
        let region = Region::from_rect(Rect::from_size(2, 2));
        assert!(matches!(
            CopyRegion::new(&dst, &src, &region, Point::ZERO, false),
            Err(CommandError::FormatMismatch)
        ));
    }
    #[test]
    fn missing_image() {
        let (mut doc, _) = doc_with_image(PixelFormat::Rgb, 2, 2);
        let elsewhere = Image::new(PixelFormat::Rgb, 2, 2);
        let region = Region::from_rect(Rect::from_size(2, 2));
        let mut copy = Command::from(
            CopyRegion::new(&elsewhere, &elsewhere, &region, Point::ZERO, false).unwrap(),
        );
        assert!(matches!(
            copy.execute(&mut doc),
            Err(CommandError::UnknownResource)
        ));
    }
    #[test]
    fn stamped_swap_is_color_exact() {
        let (mut doc, dst) = doc_with_image(PixelFormat::TimestampedRgb, 2, 1);
        let newer = Tick(u32::MAX - 10);
        // A pixel from the future still gets overwritten, and restored.
        dst.write().put(0, 0, Trgba::new(Rgba::BLACK, newer));
        let mut src = Image::new(PixelFormat::TimestampedRgb, 2, 1);
        src.put(0, 0, Trgba::new(RED, Tick(1)));
        src.put(1, 0, Trgba::new(RED, Tick(1)));
        let region = Region::from_rect(Rect::from_size(2, 1));
        let mut copy = Command::from(
            CopyRegion::new(&dst.read(), &src, &region, Point::ZERO, false).unwrap(),
        );

        let before = clock::now();
        copy.execute(&mut doc).unwrap();
        let after_execute: Vec<Trgba> = dst.read().pixels::<Trgba>().unwrap().to_vec();
        assert!(after_execute.iter().all(|px| px.color() == RED));
        assert!(after_execute[0].tick() > newer);
        assert!(after_execute[1].tick() >= before);

        copy.undo(&mut doc).unwrap();
        let image = dst.read();
        assert_eq!(image.get::<Trgba>(0, 0).unwrap().color(), Rgba::BLACK);
        assert_eq!(image.get::<Trgba>(1, 0).unwrap().color(), Rgba::TRANSPARENT);
        // Clocks never go backwards.
        assert!(image.get::<Trgba>(0, 0).unwrap().tick() > after_execute[0].tick());
    }
}

//! # Merging
//!
//! Reconciles two copies of a sprite that were edited independently, using the clocks carried by pixels and by
//! cel position and opacity. Every pixel the two copies have in common ends up with whichever color was written
//! last. Anything only the incoming copy has is imported wholesale.
//!
//! Layers are matched by id, or failing that by name and kind, among the children of already-matched parents.
//! Anything that doesn't line up (a layer of a different kind, images of different formats or without clocks)
//! is skipped without complaint.
//!
//! Merging is not a command and can't be undone.

use crate::{
    clock::{self, Tick},
    color::Trgba,
    object::Versioned,
    state::{
        cel::Cel,
        cel_data::{CelData, CelDataRef, DeepCopier},
        layer::{ImageLayer, Layer, LayerID},
        sprite::Sprite,
        Frame,
    },
};

/// What a merge did.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct MergeReport {
    /// Pixels whose color or clock changed.
    pub pixels_touched: usize,
    /// Pixels whose color changed.
    pub pixels_recolored: usize,
    pub cels_imported: usize,
    pub layers_imported: usize,
    pub frames_added: u32,
    /// Positions and opacities taken from the incoming sprite.
    pub cel_fields_updated: usize,
    /// Every cel imported, as the layer it landed in and its frame.
    pub imported: Vec<(LayerID, Frame)>,
}
impl MergeReport {
    /// Whether the target changed at all.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.pixels_touched != 0
            || self.cels_imported != 0
            || self.layers_imported != 0
            || self.frames_added != 0
            || self.cel_fields_updated != 0
    }
    /// Sum of every count, for noticing whether a step changed anything.
    fn tally(&self) -> usize {
        self.pixels_touched
            + self.cels_imported
            + self.layers_imported
            + self.frames_added as usize
            + self.cel_fields_updated
    }
}

/// Merge `incoming` into `target`. Returns whether `target` changed.
pub fn merge(target: &mut Sprite, incoming: &Sprite) -> bool {
    merge_with_report(target, incoming, clock::now()).changed()
}

/// Merge `incoming` into `target`, with every written clock raised to at least `floor`.
pub fn merge_with_report(target: &mut Sprite, incoming: &Sprite, floor: Tick) -> MergeReport {
    let mut report = MergeReport::default();
    let frames = target.frames();
    if target.ensure_frames(incoming.frames()) {
        report.frames_added = incoming.frames() - frames;
    }
    let mut merger = Merger {
        floor,
        report: &mut report,
        copier: DeepCopier::with_floor(floor),
    };
    merger.layers(target.layers_mut(), incoming.layers());

    if report.changed() {
        target.increment_version();
    }
    log::debug!(
        "Merged {} into {}: {} pixels touched ({} recolored), {} cels and {} layers imported",
        incoming.id(),
        target.id(),
        report.pixels_touched,
        report.pixels_recolored,
        report.cels_imported,
        report.layers_imported,
    );
    report
}

struct Merger<'r> {
    floor: Tick,
    report: &'r mut MergeReport,
    /// Shared across the whole merge, so that incoming cels linked to each other stay linked.
    copier: DeepCopier,
}
impl Merger<'_> {
    fn layers(&mut self, targets: &mut Vec<Layer>, incoming: &[Layer]) {
        // Only layers the target started with are candidates, each taken at most once.
        let mut taken = vec![false; targets.len()];
        for source in incoming {
            let matched = (0..taken.len())
                .find(|&idx| !taken[idx] && targets[idx].id() == source.id())
                .or_else(|| {
                    (0..taken.len()).find(|&idx| {
                        !taken[idx]
                            && targets[idx].name == source.name
                            && targets[idx].kind().same_kind(source.kind())
                    })
                });
            let Some(idx) = matched else {
                let copy = source.copy_with(&mut self.copier, true);
                self.record_import(&copy);
                self.report.layers_imported += 1;
                targets.push(copy);
                continue;
            };
            taken[idx] = true;
            let target = &mut targets[idx];
            if !target.kind().same_kind(source.kind()) {
                log::debug!(
                    "Not merging {:?}: {} vs {}",
                    source.name,
                    source.kind().as_ref(),
                    target.kind().as_ref()
                );
                continue;
            }
            let id = target.id();
            let before = self.report.tally();
            if let Some(incoming) = source.image() {
                if let Some(cels) = target.image_mut() {
                    self.cels(id, cels, incoming);
                }
            } else if let Some(incoming) = source.group() {
                if let Some(group) = target.group_mut() {
                    self.layers(group.children_mut(), incoming.children());
                }
            }
            if self.report.tally() != before {
                target.increment_version();
            }
        }
    }
    /// Note every cel of a freshly imported layer.
    fn record_import(&mut self, layer: &Layer) {
        if let Some(cels) = layer.image() {
            for cel in cels.cels() {
                self.report.imported.push((layer.id(), cel.frame()));
                self.report.cels_imported += 1;
            }
        } else if let Some(group) = layer.group() {
            for child in group.children() {
                self.record_import(child);
            }
        }
    }
    fn cels(&mut self, layer: LayerID, targets: &mut ImageLayer, incoming: &ImageLayer) {
        for source in incoming.cels() {
            let frame = source.frame();
            if let Some(target) = targets.cel(frame) {
                let data = target.data().clone();
                self.cel_data(&data, source.data());
                continue;
            }
            let copy = Cel::with_data(frame, self.copier.copy_data(source.data()));
            if targets.add_cel(copy).is_ok() {
                self.report.imported.push((layer, frame));
                self.report.cels_imported += 1;
            }
        }
    }
    fn cel_data(&mut self, target: &CelDataRef, incoming: &CelDataRef) {
        // Linked target data is merged again for every frame it appears on.
        if std::sync::Arc::ptr_eq(target, incoming) {
            return;
        }
        let mut target = target.write();
        let incoming = incoming.read();
        if incoming.position_tick() > target.position_tick() {
            target.adopt_position(incoming.position(), incoming.position_tick());
            self.report.cel_fields_updated += 1;
        }
        if incoming.opacity_tick() > target.opacity_tick() {
            target.adopt_opacity(incoming.opacity(), incoming.opacity_tick());
            self.report.cel_fields_updated += 1;
        }
        self.pixels(&target, &incoming);
    }
    /// Merge every pixel the two images have in common, by image coordinates.
    fn pixels(&mut self, target: &CelData, incoming: &CelData) {
        if std::sync::Arc::ptr_eq(target.image(), incoming.image()) {
            return;
        }
        let mut target = target.image().write();
        let incoming = incoming.image().read();
        if !target.format().has_clock() || target.format() != incoming.format() {
            log::trace!(
                "Not merging pixels of {} ({}) and {} ({})",
                target.id(),
                target.format().as_ref(),
                incoming.id(),
                incoming.format().as_ref()
            );
            return;
        }
        let width = target.width().min(incoming.width());
        let height = target.height().min(incoming.height());
        let mut touched = 0;
        for y in 0..height {
            let Some(source_row) = incoming.row::<Trgba>(y) else {
                continue;
            };
            let source_row = &source_row[..width as usize];
            let target_width = target.width() as usize;
            let Some(target_pixels) = target.pixels_mut::<Trgba>() else {
                return;
            };
            let start = y as usize * target_width;
            let target_row = &mut target_pixels[start..start + width as usize];
            for (existing, &theirs) in target_row.iter_mut().zip(source_row) {
                let merged = clock::merge_pixel(*existing, theirs, self.floor);
                if merged != *existing {
                    touched += 1;
                    if merged.color() != existing.color() {
                        self.report.pixels_recolored += 1;
                    }
                    *existing = merged;
                }
            }
        }
        if touched != 0 {
            self.report.pixels_touched += touched;
            target.increment_version();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        color::Rgba,
        geometry::Point,
        image::{Image, ImageRef, PixelFormat},
    };

    const RED: Rgba = Rgba::new(255, 0, 0, 255);
    const BLUE: Rgba = Rgba::new(0, 0, 255, 255);

    /// A sprite with one layer, with a `w`x`h` cel on frame 0 filled with `color` at `tick`.
    fn sprite_with(color: Rgba, tick: Tick, w: u32, h: u32) -> (Sprite, LayerID, ImageRef) {
        let mut sprite = Sprite::new(PixelFormat::TimestampedRgb, 4, 4);
        let layer = sprite.add_layer(Layer::new_image("paint"));
        let mut image = Image::new(PixelFormat::TimestampedRgb, w, h);
        image.clear(Trgba::new(color, tick));
        let image = image.into_ref();
        sprite
            .image_layer_mut(layer)
            .unwrap()
            .add_cel(Cel::new(Frame(0), image.clone()))
            .unwrap();
        (sprite, layer, image)
    }

    #[test]
    fn newer_pixel_wins() {
        let (mut a, _, a_image) = sprite_with(RED, Tick(100), 1, 1);
        let (b, _, _) = sprite_with(BLUE, Tick(150), 1, 1);
        assert!(merge(&mut a, &b));
        let px = a_image.read().get::<Trgba>(0, 0).unwrap();
        assert_eq!(px.color(), BLUE);
        assert!(px.tick() >= Tick(150));
    }
    #[test]
    fn older_pixel_loses_but_clock_floors() {
        let (mut a, _, a_image) = sprite_with(RED, Tick(150), 2, 2);
        let (b, _, _) = sprite_with(BLUE, Tick(100), 2, 2);
        let report = merge_with_report(&mut a, &b, Tick(120));
        assert_eq!(report.pixels_recolored, 0);
        // Clocks were already past the floor.
        assert_eq!(report.pixels_touched, 0);
        assert!(!report.changed());
        assert_eq!(a_image.read().get::<Trgba>(1, 1).unwrap(), Trgba::new(RED, Tick(150)));

        let report = merge_with_report(&mut a, &b, Tick(200));
        assert_eq!(report.pixels_touched, 4);
        assert_eq!(report.pixels_recolored, 0);
        assert_eq!(a_image.read().get::<Trgba>(1, 1).unwrap(), Trgba::new(RED, Tick(200)));
    }
    #[test]
    fn common_extent_only() {
        let (mut a, _, a_image) = sprite_with(RED, Tick(1), 3, 1);
        let (b, _, _) = sprite_with(BLUE, Tick(5), 2, 2);
        let report = merge_with_report(&mut a, &b, Tick::ZERO);
        assert_eq!(report.pixels_recolored, 2);
        let image = a_image.read();
        assert_eq!(image.get::<Trgba>(1, 0).unwrap().color(), BLUE);
        assert_eq!(image.get::<Trgba>(2, 0).unwrap().color(), RED);
    }
    #[test]
    fn matches_by_name_and_imports_the_rest() {
        let (mut a, a_layer, _) = sprite_with(RED, Tick(1), 1, 1);
        // Unrelated ids, same name.
        let (mut b, b_layer, _) = sprite_with(BLUE, Tick(5), 1, 1);
        assert_ne!(a_layer, b_layer);
        // B also has a cel on frame 2, linked to one on frame 3, and a layer A lacks.
        let cels = b.image_layer_mut(b_layer).unwrap();
        let cel = Cel::new(Frame(2), Image::new(PixelFormat::TimestampedRgb, 1, 1).into_ref());
        let link = cel.create_link(Frame(3));
        cels.add_cel(cel).unwrap();
        cels.add_cel(link).unwrap();
        b.add_layer(Layer::new_image("sketch"));
        b.ensure_frames(4);

        let report = merge_with_report(&mut a, &b, Tick(10));
        assert_eq!(report.frames_added, 3);
        assert_eq!(report.cels_imported, 2);
        assert_eq!(report.layers_imported, 1);
        assert_eq!(report.imported, [(a_layer, Frame(2)), (a_layer, Frame(3))]);
        assert_eq!(a.count_layers(), 2);
        assert_eq!(a.frames(), 4);

        let cels = a.layer(a_layer).unwrap().image().unwrap();
        let imported = cels.cel(Frame(2)).unwrap();
        assert_eq!(cels.links(imported), 1);
        // A copy, not the incoming's own data.
        assert!(!imported.shares_data_with(b.layer(b_layer).unwrap().image().unwrap().cel(Frame(2)).unwrap()));
        assert!(imported.image().read().get::<Trgba>(0, 0).unwrap().tick() >= Tick(10));
        assert_eq!(cels.cel(Frame(0)).unwrap().image().read().get::<Trgba>(0, 0).unwrap().color(), BLUE);
    }
    #[test]
    fn cel_fields_take_newer_clock() {
        let (mut a, a_layer, _) = sprite_with(RED, Tick(1), 1, 1);
        let b = a.fork();
        let a_cel = a.layer(a_layer).unwrap().image().unwrap().cel(Frame(0)).unwrap();
        let b_cel = b.layer(a_layer).unwrap().image().unwrap().cel(Frame(0)).unwrap();
        a_cel.data().write().adopt_position(Point::new(1, 1), Tick(50));
        b_cel.data().write().adopt_position(Point::new(9, 9), Tick(60));
        b_cel.data().write().adopt_opacity(10, Tick(40));
        a_cel.data().write().adopt_opacity(20, Tick(45));

        let report = merge_with_report(&mut a, &b, Tick::ZERO);
        assert_eq!(report.cel_fields_updated, 1);
        let a_cel = a.layer(a_layer).unwrap().image().unwrap().cel(Frame(0)).unwrap();
        assert_eq!(a_cel.position(), Point::new(9, 9));
        assert_eq!(a_cel.data().read().position_tick(), Tick(60));
        assert_eq!(a_cel.opacity(), 20);
    }
    #[test]
    fn kind_and_format_mismatch_are_skipped() {
        let mut a = Sprite::new(PixelFormat::Rgb, 1, 1);
        let layer = a.add_layer(Layer::new_image("x"));
        a.image_layer_mut(layer)
            .unwrap()
            .add_cel(Cel::new(Frame(0), Image::new(PixelFormat::Rgb, 1, 1).into_ref()))
            .unwrap();
        let mut b = a.fork();
        b.image_layer_mut(layer)
            .unwrap()
            .cel(Frame(0))
            .unwrap()
            .image()
            .write()
            .put(0, 0, BLUE);
        let report = merge_with_report(&mut a, &b, Tick::ZERO);
        assert_eq!(report.pixels_touched, 0);

        // Same name, but a group.
        let mut c = Sprite::new(PixelFormat::Rgb, 1, 1);
        c.add_layer(Layer::new_group("x"));
        let report = merge_with_report(&mut a, &c, Tick::ZERO);
        // Not matched by name, so imported alongside.
        assert_eq!(report.layers_imported, 1);
        assert_eq!(a.count_layers(), 2);
    }
    #[test]
    fn groups_recurse() {
        let mut a = Sprite::new(PixelFormat::TimestampedRgb, 1, 1);
        let group = a.add_layer(Layer::new_group("g"));
        let inner = a.add_layer_into(group, Layer::new_image("inner")).unwrap();
        let image = Image::new(PixelFormat::TimestampedRgb, 1, 1).into_ref();
        a.image_layer_mut(inner)
            .unwrap()
            .add_cel(Cel::new(Frame(0), image.clone()))
            .unwrap();
        let b = a.fork();
        b.layer(inner)
            .unwrap()
            .image()
            .unwrap()
            .cel(Frame(0))
            .unwrap()
            .image()
            .write()
            .put(0, 0, Trgba::new(BLUE, Tick(9)));
        assert!(merge(&mut a, &b));
        assert_eq!(image.read().get::<Trgba>(0, 0).unwrap().color(), BLUE);
    }
    #[test]
    fn linked_target_takes_newest_of_each_frame() {
        let black = Rgba::new(0, 0, 0, 255);
        let (mut a, a_layer, a_image) = sprite_with(black, Tick(10), 1, 1);
        let link = a.layer(a_layer).unwrap().image().unwrap().cel(Frame(0)).unwrap().create_link(Frame(1));
        a.image_layer_mut(a_layer).unwrap().add_cel(link).unwrap();
        a.ensure_frames(2);

        // Unlinked on this side.
        let (mut b, b_layer, _) = sprite_with(RED, Tick(200), 1, 1);
        let mut blue = Image::new(PixelFormat::TimestampedRgb, 1, 1);
        blue.clear(Trgba::new(BLUE, Tick(300)));
        b.image_layer_mut(b_layer)
            .unwrap()
            .add_cel(Cel::new(Frame(1), blue.into_ref()))
            .unwrap();
        b.ensure_frames(2);

        let report = merge_with_report(&mut a, &b, Tick::ZERO);
        assert_eq!(report.cels_imported, 0);
        let cels = a.layer(a_layer).unwrap().image().unwrap();
        let first = cels.cel(Frame(0)).unwrap();
        let second = cels.cel(Frame(1)).unwrap();
        assert!(first.shares_data_with(second));
        assert_eq!(second.image().read().get::<Trgba>(0, 0).unwrap(), Trgba::new(BLUE, Tick(300)));
        assert_eq!(a_image.read().get::<Trgba>(0, 0).unwrap(), Trgba::new(BLUE, Tick(300)));
    }
    #[test]
    fn duplicate_names_match_once() {
        let (mut a, a_layer, a_image) = sprite_with(RED, Tick(1), 1, 1);
        let (mut b, _, _) = sprite_with(BLUE, Tick(5), 1, 1);
        let second = b.add_layer(Layer::new_image("paint"));
        let mut green = Image::new(PixelFormat::TimestampedRgb, 1, 1);
        green.clear(Trgba::new(Rgba::new(0, 255, 0, 255), Tick(9)));
        b.image_layer_mut(second)
            .unwrap()
            .add_cel(Cel::new(Frame(0), green.into_ref()))
            .unwrap();
        // A third with nothing to match but the one just imported.
        b.add_layer(Layer::new_image("fresh"));
        b.add_layer(Layer::new_image("fresh"));

        let report = merge_with_report(&mut a, &b, Tick::ZERO);
        assert_eq!(report.layers_imported, 3);
        assert_eq!(a.count_layers(), 4);
        // The first "paint" merged, the second came in as its own layer.
        assert_eq!(a_image.read().get::<Trgba>(0, 0).unwrap().color(), BLUE);
        assert_eq!(report.imported.len(), 1);
        assert_ne!(report.imported[0].0, a_layer);
    }
}

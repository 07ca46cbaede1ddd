//! # Logical clock
//!
//! Edits are stamped with a coarse, wall-clock derived [`Tick`]. Ticks are used for last-writer-wins conflict
//! resolution when two copies of a document are merged, so they only need to order edits roughly: sixteen
//! ticks per second, counted from [`EPOCH_SECONDS`]. Successive edits on one host are kept strictly increasing
//! by [`advance`], independent of the wall clock's resolution.
//!
//! The tick is 32 bits wide and will wrap some time in 2031. Nothing handles that yet. A backwards-moving system
//! clock isn't detected either - edits made during the skew just look older than they are, until a later edit
//! advances past it.

use crate::color::Trgba;

/// Unix time, in seconds, of tick zero.
pub const EPOCH_SECONDS: i64 = 0x6565_2B00;
/// `log2` of the number of ticks per second.
pub const SUBSECOND_BITS: u32 = 4;

/// A logical clock value.
#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Debug,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
pub struct Tick(pub u32);
impl Tick {
    pub const ZERO: Self = Self(0);
    /// The next tick. Wraps back to zero past the end, along with everything else in 2031.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}
impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Convert a unix timestamp to a tick.
#[must_use]
pub fn from_unix_seconds(seconds: i64) -> Tick {
    // Truncation is the documented 2031 overflow.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Tick(((seconds - EPOCH_SECONDS) << SUBSECOND_BITS) as u32)
}

/// The current tick, from the system clock.
#[must_use]
pub fn now() -> Tick {
    from_unix_seconds(chrono::Utc::now().timestamp())
}

/// Compute the new clock of a field after a write.
///
/// An unchanged field keeps its clock. A changed field moves to `max(stored + 1, floor)`.
#[must_use]
pub fn advance_with(stored: Tick, changed: bool, floor: Tick) -> Tick {
    if changed {
        stored.next().max(floor)
    } else {
        stored
    }
}

/// [`advance_with`], using [`now`] as the floor.
#[must_use]
pub fn advance(stored: Tick, changed: bool) -> Tick {
    if changed {
        advance_with(stored, true, now())
    } else {
        stored
    }
}

/// Reconcile two versions of one pixel.
///
/// The color comes from whichever side has the newer clock, ties going to `existing`.
/// The result's clock is the newest of both clocks and `floor`.
#[must_use]
pub fn merge_pixel(existing: Trgba, incoming: Trgba, floor: Tick) -> Trgba {
    let color = if incoming.tick() > existing.tick() {
        incoming.color()
    } else {
        existing.color()
    };
    let tick = existing.tick().max(incoming.tick()).max(floor);
    Trgba::new(color, tick)
}

/// Overwrite `existing` with the color of `incoming`, as an edit.
///
/// The clock is advanced from `existing`'s as if the pixel were any other field: bumped by one if the color
/// actually changes, and never below `floor`. `incoming`'s own clock is ignored.
#[must_use]
pub fn stamp_pixel(existing: Trgba, incoming: Trgba, floor: Tick) -> Trgba {
    let changed = existing.color() != incoming.color();
    let bumped = if changed {
        existing.tick().next()
    } else {
        existing.tick()
    };
    Trgba::new(incoming.color(), bumped.max(floor))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Rgba;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);
    const BLUE: Rgba = Rgba::new(0, 0, 255, 255);

    #[test]
    fn unchanged_is_identity() {
        for v in [0, 1, 100, 0xFFFF, u32::MAX - 1, u32::MAX] {
            assert_eq!(advance(Tick(v), false), Tick(v));
            assert_eq!(advance_with(Tick(v), false, Tick(u32::MAX)), Tick(v));
        }
    }
    #[test]
    fn next_wraps() {
        assert_eq!(Tick(7).next(), Tick(8));
        assert_eq!(Tick(u32::MAX).next(), Tick::ZERO);
    }
    #[test]
    fn changed_is_monotonic() {
        let floor = Tick(1000);
        // Below the floor, jump to it.
        assert_eq!(advance_with(Tick(10), true, floor), floor);
        // At or above it, count up by one.
        assert_eq!(advance_with(Tick(1000), true, floor), Tick(1001));
        assert_eq!(advance_with(Tick(5000), true, floor), Tick(5001));

        let stored = now();
        let before = now();
        let advanced = advance(stored, true);
        assert!(advanced >= stored.next());
        assert!(advanced >= before);
    }
    #[test]
    fn successive_edits_strictly_increase() {
        let mut t = Tick::ZERO;
        for _ in 0..64 {
            let next = advance(t, true);
            assert!(next > t);
            t = next;
        }
    }
    #[test]
    fn sixteen_ticks_per_second() {
        let a = from_unix_seconds(EPOCH_SECONDS + 10);
        let b = from_unix_seconds(EPOCH_SECONDS + 11);
        assert_eq!(a, Tick(160));
        assert_eq!(b.0 - a.0, 16);
    }
    #[test]
    fn now_is_past_epoch() {
        // Good until the documented wrap.
        assert!(now() > from_unix_seconds(EPOCH_SECONDS));
    }
    #[test]
    fn merge_takes_newer_color_either_way() {
        let a = Trgba::new(RED, Tick(100));
        let b = Trgba::new(BLUE, Tick(150));
        let floor = Tick(7);
        assert_eq!(merge_pixel(a, b, floor).color(), BLUE);
        assert_eq!(merge_pixel(b, a, floor).color(), BLUE);
        assert_eq!(merge_pixel(a, b, floor).tick(), Tick(150));
        // Floor wins over both clocks.
        assert_eq!(merge_pixel(a, b, Tick(200)).tick(), Tick(200));
    }
    #[test]
    fn merge_tie_keeps_existing() {
        let a = Trgba::new(RED, Tick(100));
        let b = Trgba::new(BLUE, Tick(100));
        assert_eq!(merge_pixel(a, b, Tick::ZERO).color(), RED);
        assert_eq!(merge_pixel(b, a, Tick::ZERO).color(), BLUE);
    }
    #[test]
    fn stamp_always_writes_color() {
        let existing = Trgba::new(RED, Tick(500));
        // Incoming is "older", but a stamp is an edit, not a merge.
        let stamped = stamp_pixel(existing, Trgba::new(BLUE, Tick(1)), Tick(10));
        assert_eq!(stamped.color(), BLUE);
        assert_eq!(stamped.tick(), Tick(501));
        // Same color: clock only rises to the floor.
        let same = stamp_pixel(existing, Trgba::new(RED, Tick(1)), Tick(10));
        assert_eq!(same, existing);
        let floored = stamp_pixel(existing, Trgba::new(RED, Tick(1)), Tick(900));
        assert_eq!(floored.tick(), Tick(900));
    }
}

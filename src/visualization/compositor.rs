//! Per-pixel depth compositing of opaque masses and translucent dust
//!
//! Every screen coordinate owns one [`PixelCell`] behind its own lock:
//! - a [`MassPixel`], the nearest opaque write so far
//! - a [`DustChain`], non-overlapping translucent depth intervals
//!
//! Dust intervals that overlap are split so that every depth range at a
//! coordinate is covered by at most one interval, with overlapping parts
//! blended by opacity. After a frame is drawn every cell is drained.
//!
//! Depth `z` grows away from the camera; `z <= 0` means "not set".

use std::collections::TryReserveError;

use nalgebra::Vector3;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::CompositorError;

/// rgb with every channel in 0..=255
pub type Color = Vector3<f64>;

/// Any max range below this is treated as nonexistent
pub const MIN_DUST_MAX_RANGE: f64 = 0.0001;
/// Any range below this is invisible: 1/255 of the smallest max range
pub const MIN_DUST_RANGE: f64 = MIN_DUST_MAX_RANGE / 255.0;
/// Dust with more opacity than this fully hides what is behind it
pub const OPAQUE: f64 = 0.995;

/// Upper bound of split steps for one write, guards against float ping-pong
const MAX_SPLIT_STEPS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassPixel {
    pub color: Color,
    pub z: f64, // <= 0 is empty
}

impl MassPixel {
    pub fn is_set(&self) -> bool {
        self.z > 0.0
    }

    fn clear(&mut self) {
        self.z = 0.0;
    }
}

/// One translucent depth interval `[z, z + range)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustPixel {
    pub color: Color,
    pub z: f64, // near end
    pub range: f64, // current length
    pub max_range: f64, // length of the full, unshortened halo at this pixel
}

impl DustPixel {
    pub fn new(z: f64, color: Color, range: f64, max_range: f64) -> Self {
        Self { color, z, range, max_range }
    }

    /// Far end of the interval
    pub fn end(&self) -> f64 {
        self.z + self.range
    }

    /// range / max_range, where anything above [`OPAQUE`] counts as fully opaque
    pub fn opacity(&self) -> f64 {
        let op = (self.range / self.max_range).min(1.0);
        if op > OPAQUE {
            1.0
        } else {
            op
        }
    }

    pub fn is_large_enough(&self) -> bool {
        self.range > MIN_DUST_RANGE && self.max_range > MIN_DUST_MAX_RANGE
    }

    fn overlaps(&self, other: &DustPixel) -> bool {
        self.z < other.end() && other.z < self.end()
    }

    /// The part of `self` between `from` and `to`
    fn cut(&self, from: f64, to: f64) -> DustPixel {
        DustPixel { z: from, range: to - from, ..*self }
    }

    fn into_valid(self) -> Option<DustPixel> {
        self.is_large_enough().then_some(self)
    }
}

/// Dust intervals of one coordinate
///
/// Live intervals occupy `slots[first..]`, stored back to front: the farthest
/// interval sits at `first`, the nearest at the end. Slots before `first` are
/// free. New storage is only appended when no free slot is left, so a drained
/// chain keeps its capacity for the next frame.
#[derive(Debug, Clone, Default)]
pub struct DustChain {
    slots: Vec<DustPixel>,
    first: usize,
}

impl DustChain {
    pub fn is_empty(&self) -> bool {
        self.first >= self.slots.len()
    }

    /// Number of live intervals
    pub fn len(&self) -> usize {
        self.slots.len() - self.first
    }

    /// Number of slots, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live intervals, farthest first
    pub fn back_to_front(&self) -> &[DustPixel] {
        &self.slots[self.first..]
    }

    /// Sum of the opacities of all live intervals, capped at one
    pub fn total_opacity(&self) -> f64 {
        self.back_to_front().iter().map(DustPixel::opacity).sum::<f64>().min(1.0)
    }

    fn clear(&mut self) {
        self.first = self.slots.len();
    }

    /// Absolute index of the nearest live interval overlapping `dust`
    fn nearest_overlap(&self, dust: &DustPixel) -> Option<usize> {
        (self.first..self.slots.len()).rev().find(|&i| self.slots[i].overlaps(dust))
    }

    fn insert(&mut self, dust: DustPixel) -> Result<(), TryReserveError> {
        // number of live intervals farther than the new one
        let farther = self.back_to_front().partition_point(|d| d.z > dust.z);
        let at = self.first + farther;

        if self.first > 0 {
            // move the farther ones one slot back into the free space
            self.slots.copy_within(self.first..at, self.first - 1);
            self.first -= 1;
            self.slots[at - 1] = dust;
        } else {
            self.slots.try_reserve(1)?;
            self.slots.insert(at, dust);
        }
        Ok(())
    }

    fn remove(&mut self, at: usize) {
        self.slots.copy_within(self.first..at, self.first + 1);
        self.first += 1;
    }

    /// Drop every interval starting at or behind `z` and cut the one reaching over it
    fn invalidate_behind(&mut self, z: f64) {
        let behind = self.back_to_front().partition_point(|d| d.z >= z);
        self.first += behind;

        if !self.is_empty() {
            let first = self.first;
            let d = &mut self.slots[first];
            if d.end() > z {
                d.range = z - d.z;
                if !d.is_large_enough() {
                    self.first += 1;
                }
            }
        }
    }
}

/// The outcome of splitting a new interval against an existing one
struct Split {
    existing: Option<DustPixel>, // what the existing slot holds afterwards, None frees it
    pieces: SmallVec<[DustPixel; 3]>, // still to be placed
    opaque_from: Option<f64>, // set if the blended segment hides everything behind its end
}

/// Split `new` against the overlapping `old`
///
/// ```text
/// A:  new  |-------|            B:  new  |---------------|
///     old      |--------|           old      |-----|
///          |new|seg|old|                 |new|seg|new|
///
/// C:  new      |---|            D:  new        |-------|
///     old  |-----------|            old  |--------|
///          |old|seg|old|                 |old|seg|new|
/// ```
fn split(old: &DustPixel, new: &DustPixel) -> Split {
    let (old_end, new_end) = (old.end(), new.end());

    // extent of the blended segment
    let (seg_z, seg_end) = (old.z.max(new.z), old_end.min(new_end));

    let mut pieces: SmallVec<[DustPixel; 3]> = SmallVec::new();
    let existing;

    if new.z <= old.z {
        pieces.extend(new.cut(new.z, old.z).into_valid());
        if new_end <= old_end {
            // A: the old interval is pushed back behind the segment
            existing = old.cut(new_end, old_end).into_valid();
        } else {
            // B: the segment takes the old slot, the rest of the new one is placed again
            existing = None;
            pieces.extend(new.cut(old_end, new_end).into_valid());
        }
    } else {
        existing = old.cut(old.z, new.z).into_valid();
        if new_end <= old_end {
            // C: the far remainder of the old interval is placed again
            pieces.extend(old.cut(new_end, old_end).into_valid());
        } else {
            // D
            pieces.extend(new.cut(old_end, new_end).into_valid());
        }
    }

    let seg_range = seg_end - seg_z;
    let op_new = seg_range / new.max_range;
    let op_old = seg_range / old.max_range;
    let op = op_new + op_old;

    let segment = DustPixel {
        color: (new.color * op_new + old.color * op_old) / op,
        z: seg_z,
        range: seg_range,
        max_range: seg_range / op,
    };

    let mut opaque_from = None;
    if segment.is_large_enough() {
        if segment.opacity() >= 1.0 {
            opaque_from = Some(segment.end());
        }
        pieces.push(segment);
    }

    Split { existing, pieces, opaque_from }
}

/// The compositor state of one screen coordinate
#[derive(Debug, Clone, Default)]
pub struct PixelCell {
    pub mass: MassPixel,
    pub dust: DustChain,
}

impl PixelCell {
    /// Store an opaque write if it is strictly nearer than the current one
    pub fn write_mass(&mut self, z: f64, color: Color, near_plane: f64) -> bool {
        let z = z.max(near_plane);
        if self.mass.is_set() && z >= self.mass.z {
            return false;
        }
        self.mass = MassPixel { color, z };
        self.dust.invalidate_behind(z);
        true
    }

    /// Clip `dust` to what is in front of the camera and of the mass.
    /// Returns None if nothing of it can be seen.
    fn visible_part(&self, mut dust: DustPixel) -> Option<DustPixel> {
        if dust.end() < MIN_DUST_RANGE {
            return None;
        }
        if dust.z < MIN_DUST_RANGE {
            dust.range = dust.end() - MIN_DUST_RANGE;
            dust.z = MIN_DUST_RANGE;
        }
        if self.mass.is_set() {
            if dust.z >= self.mass.z {
                return None;
            }
            if dust.end() > self.mass.z {
                dust.range = self.mass.z - dust.z;
            }
        }
        dust.into_valid()
    }

    /// Add a translucent interval, splitting it against everything it overlaps.
    /// Returns false if it was rejected as invisible or too small.
    pub fn write_dust(&mut self, dust: DustPixel) -> Result<bool, TryReserveError> {
        let Some(dust) = self.visible_part(dust) else {
            return Ok(false);
        };

        let mut pending: SmallVec<[DustPixel; 8]> = SmallVec::new();
        pending.push(dust);

        // nothing at or behind this depth survives an opaque segment
        let mut occluded = f64::INFINITY;
        let mut steps = 0;

        while let Some(mut piece) = pending.pop() {
            if piece.z >= occluded {
                continue;
            }
            if piece.end() > occluded {
                piece.range = occluded - piece.z;
                if !piece.is_large_enough() {
                    continue;
                }
            }

            steps += 1;
            if steps > MAX_SPLIT_STEPS {
                debug_assert!(false, "dust split did not converge");
                break;
            }

            let Some(at) = self.dust.nearest_overlap(&piece) else {
                self.dust.insert(piece)?;
                continue;
            };

            let old = self.dust.slots[at];
            let result = split(&old, &piece);

            match result.existing {
                Some(kept) => self.dust.slots[at] = kept,
                None => self.dust.remove(at),
            }

            if let Some(end) = result.opaque_from {
                self.dust.invalidate_behind(end);
                occluded = occluded.min(end);
            }

            pending.extend(result.pieces);
        }

        Ok(true)
    }

    /// Blend everything at this coordinate into one color and drain the cell
    ///
    /// Starts with the mass (or black), then lays every dust interval over it
    /// from the farthest to the nearest.
    pub fn resolve(&mut self) -> Color {
        let mut result = if self.mass.is_set() { self.mass.color } else { Color::zeros() };

        for dust in self.dust.back_to_front() {
            let op = dust.opacity();
            result = result * (1.0 - op) + dust.color * op;
        }

        self.dust.clear();
        self.mass.clear();

        result
    }
}

/// Mass and dust buffers for a whole frame
#[derive(Debug)]
pub struct DepthCompositor {
    width: usize,
    height: usize,
    near_plane: f64, // masses nearer than this are pushed back onto it
    cells: Vec<Mutex<PixelCell>>,
}

impl DepthCompositor {
    pub fn new(width: usize, height: usize, near_plane: f64) -> Result<Self, CompositorError> {
        let count = width * height;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(count)
            .map_err(|_| CompositorError::Exhausted { x: width, y: height })?;
        cells.extend((0..count).map(|_| Mutex::new(PixelCell::default())));

        Ok(Self {
            width,
            height,
            near_plane,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn cell(&self, x: usize, y: usize) -> &Mutex<PixelCell> {
        &self.cells[y * self.width + x]
    }

    /// Opaque write at `(x, y)`, accepted only if strictly nearer than any before
    pub fn write_mass(&self, x: usize, y: usize, z: f64, color: Color) -> bool {
        self.cell(x, y).lock().write_mass(z, color, self.near_plane)
    }

    /// Translucent write of `[z, z + range)` at `(x, y)`
    pub fn write_dust(&self, x: usize, y: usize, z: f64, color: Color, range: f64, max_range: f64) -> Result<bool, CompositorError> {
        if range <= MIN_DUST_RANGE || max_range <= MIN_DUST_MAX_RANGE {
            return Ok(false);
        }
        self.cell(x, y)
            .lock()
            .write_dust(DustPixel::new(z, color, range, max_range))
            .map_err(|_| CompositorError::Exhausted { x, y })
    }

    /// Depth of the mass at `(x, y)`, if any
    pub fn mass_depth(&self, x: usize, y: usize) -> Option<f64> {
        let cell = self.cell(x, y).lock();
        cell.mass.is_set().then_some(cell.mass.z)
    }

    /// Live dust intervals at `(x, y)`, nearest first
    pub fn dust_at(&self, x: usize, y: usize) -> Vec<DustPixel> {
        self.cell(x, y).lock().dust.back_to_front().iter().rev().copied().collect()
    }

    /// Accumulated dust opacity at `(x, y)`
    pub fn dust_opacity(&self, x: usize, y: usize) -> f64 {
        self.cell(x, y).lock().dust.total_opacity()
    }

    /// Final color of `(x, y)`; the cell is empty afterwards
    pub fn resolve_pixel(&self, x: usize, y: usize) -> Color {
        self.cell(x, y).lock().resolve()
    }

    /// Drop everything without resolving
    pub fn clear(&self) {
        for cell in &self.cells {
            let mut cell = cell.lock();
            cell.dust.clear();
            cell.mass.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Color {
        Color::new(255.0, 255.0, 255.0)
    }

    fn dust(z: f64, range: f64) -> DustPixel {
        DustPixel::new(z, white(), range, 10.0)
    }

    #[test]
    fn chain_is_stored_back_to_front() {
        let mut cell = PixelCell::default();
        cell.write_dust(dust(5.0, 1.0)).unwrap();
        cell.write_dust(dust(20.0, 1.0)).unwrap();
        cell.write_dust(dust(10.0, 1.0)).unwrap();

        let zs: Vec<f64> = cell.dust.back_to_front().iter().map(|d| d.z).collect();
        assert_eq!(zs, vec![20.0, 10.0, 5.0]);
    }

    #[test]
    fn drained_chain_reuses_its_slots() {
        let mut cell = PixelCell::default();
        cell.write_dust(dust(5.0, 1.0)).unwrap();
        cell.write_dust(dust(10.0, 1.0)).unwrap();
        assert_eq!(cell.dust.capacity(), 2);

        cell.resolve();
        assert!(cell.dust.is_empty());

        cell.write_dust(dust(7.0, 1.0)).unwrap();
        cell.write_dust(dust(3.0, 1.0)).unwrap();
        assert_eq!(cell.dust.capacity(), 2);
        assert_eq!(cell.dust.len(), 2);
    }

    #[test]
    fn removal_keeps_order() {
        let mut chain = DustChain::default();
        for z in [1.0, 4.0, 7.0] {
            chain.insert(dust(z, 1.0)).unwrap();
        }
        // live: [7, 4, 1], remove the middle one
        chain.remove(1);
        let zs: Vec<f64> = chain.back_to_front().iter().map(|d| d.z).collect();
        assert_eq!(zs, vec![7.0, 1.0]);
        assert_eq!(chain.capacity(), 3);
    }

    #[test]
    fn split_case_d_shortens_both() {
        let old = dust(10.0, 4.0);
        let new = dust(12.0, 4.0);
        let s = split(&old, &new);

        let kept = s.existing.unwrap();
        assert_eq!((kept.z, kept.end()), (10.0, 12.0));

        let zs: Vec<(f64, f64)> = s.pieces.iter().map(|p| (p.z, p.end())).collect();
        assert!(zs.contains(&(14.0, 16.0)));
        assert!(zs.contains(&(12.0, 14.0)));
    }

    #[test]
    fn split_segment_adds_opacity() {
        let old = dust(10.0, 4.0);
        let new = dust(10.0, 4.0);
        let s = split(&old, &new);

        // identical intervals collapse into the segment alone
        assert!(s.existing.is_none());
        assert_eq!(s.pieces.len(), 1);
        let seg = s.pieces[0];
        approx::assert_relative_eq!(seg.opacity(), 0.8, epsilon = 1e-12);
    }
}
